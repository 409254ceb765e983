//! 保存済みレイアウトモジュール
//!
//! 読み込んだデータセットを名前付きで保存する。
//! 新しい順に最大12件。同名で保存すると古い方を置き換える。

use crate::error::{PalaceError, Result};
use crate::storage::{load_json, save_json, KeyValueStore, SAVED_LAYOUTS_STORAGE_KEY};
use chrono::{Local, TimeZone};
use palace_common::hash_string;
use serde::{Deserialize, Serialize};

/// 保存件数の上限
pub const MAX_SAVED_LAYOUTS: usize = 12;
/// 保存名の最小文字数
pub const MIN_SAVE_NAME_CHARS: usize = 2;

/// 保存済みレイアウト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedLayout {
    pub id: String,
    pub name: String,
    /// 保存時刻（UNIXミリ秒）
    pub saved_at: i64,
    #[serde(alias = "tsvText")]
    pub raw_text: String,
    pub asset_root: String,
    pub dataset_signature: String,
}

impl SavedLayout {
    /// 表示用の保存時刻（ローカル時刻）
    pub fn saved_at_display(&self) -> String {
        Local
            .timestamp_millis_opt(self.saved_at)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| self.saved_at.to_string())
    }
}

/// 保存名を検証（前後空白を除いて2文字以上）
pub fn validate_save_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.chars().count() < MIN_SAVE_NAME_CHARS {
        return Err(PalaceError::InvalidSaveName(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

/// 保存済みレイアウト一覧（新しい順）
#[derive(Debug, Clone, Default)]
pub struct SavedLayouts {
    entries: Vec<SavedLayout>,
}

impl SavedLayouts {
    /// 保存領域から読み込み
    ///
    /// 形式の合わないエントリは警告を出して捨てる。
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let raw: Vec<serde_json::Value> =
            match load_json::<serde_json::Value>(store, SAVED_LAYOUTS_STORAGE_KEY) {
                Ok(Some(serde_json::Value::Array(items))) => items,
                Ok(Some(_)) | Ok(None) => Vec::new(),
                Err(e) => {
                    tracing::warn!("Unable to read saved layouts: {}", e);
                    Vec::new()
                }
            };

        let entries = raw
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<SavedLayout>(value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Dropping unreadable saved layout: {}", e);
                    None
                }
            })
            .collect();

        Self { entries }
    }

    /// 保存（失敗は警告ログのみ）
    pub fn persist(&self, store: &mut dyn KeyValueStore) {
        if let Err(e) = save_json(store, SAVED_LAYOUTS_STORAGE_KEY, &self.entries) {
            tracing::warn!("Failed to store layouts: {}", e);
        }
    }

    /// 新しいレイアウトを追加
    ///
    /// 先頭に挿入し、同名の既存エントリを除き、12件に切り詰める。
    pub fn save(
        &mut self,
        name: &str,
        raw_text: &str,
        asset_root: &str,
        dataset_signature: &str,
        saved_at: i64,
        store: &mut dyn KeyValueStore,
    ) -> Result<SavedLayout> {
        let name = validate_save_name(name)?;
        let entry = SavedLayout {
            id: format!(
                "{}-{}",
                saved_at,
                hash_string(&format!("{}{}", name, dataset_signature))
            ),
            name: name.clone(),
            saved_at,
            raw_text: raw_text.to_string(),
            asset_root: asset_root.to_string(),
            dataset_signature: dataset_signature.to_string(),
        };

        self.entries.retain(|item| item.name != name);
        self.entries.insert(0, entry.clone());
        self.entries.truncate(MAX_SAVED_LAYOUTS);
        self.persist(store);

        Ok(entry)
    }

    /// IDで削除（確認なし）
    pub fn delete(&mut self, id: &str, store: &mut dyn KeyValueStore) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        let removed = self.entries.len() != before;
        if removed {
            self.persist(store);
        }
        removed
    }

    /// IDまたは名前で検索
    pub fn find(&self, id_or_name: &str) -> Option<&SavedLayout> {
        self.entries
            .iter()
            .find(|e| e.id == id_or_name)
            .or_else(|| self.entries.iter().find(|e| e.name == id_or_name))
    }

    pub fn entries(&self) -> &[SavedLayout] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
