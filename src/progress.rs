//! 学習進捗モジュール
//!
//! 「見た」「聞いた」カードIDの集合をデータセット署名と一緒に保存する。
//! 署名が一致しない読み込みでは両方を空に戻し、すぐに保存し直す。
//! 保持する署名は常に1つだけ（以前のデータセットの進捗は残らない）。

use crate::storage::{load_json, save_json, KeyValueStore, PROGRESS_STORAGE_KEY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 保存形式
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(default)]
    pub signature: Option<String>,
    pub seen: Vec<String>,
    pub heard: Vec<String>,
}

/// 照合結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// 署名一致、進捗を維持
    Kept,
    /// 署名不一致、進捗をリセット
    Reset,
}

/// 進捗
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    signature: Option<String>,
    seen: BTreeSet<String>,
    heard: BTreeSet<String>,
}

impl Progress {
    /// 保存領域から読み込み
    ///
    /// 読めない・壊れている場合は空の進捗。
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match load_json::<ProgressRecord>(store, PROGRESS_STORAGE_KEY) {
            Ok(Some(record)) => Self {
                signature: record.signature,
                seen: record.seen.into_iter().collect(),
                heard: record.heard.into_iter().collect(),
            },
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!("Unable to parse stored progress: {}", e);
                Self::default()
            }
        }
    }

    /// 署名と照合
    pub fn reconcile(&mut self, signature: &str, store: &mut dyn KeyValueStore) -> Reconciliation {
        if self.signature.as_deref() == Some(signature) {
            return Reconciliation::Kept;
        }
        self.signature = Some(signature.to_string());
        self.seen.clear();
        self.heard.clear();
        self.persist(store);
        Reconciliation::Reset
    }

    /// 「見た」を記録（初回のみ保存）
    pub fn mark_seen(&mut self, anchor_id: &str, store: &mut dyn KeyValueStore) -> bool {
        let added = self.seen.insert(anchor_id.to_string());
        if added {
            self.persist(store);
        }
        added
    }

    /// 「聞いた」を記録（初回のみ保存）
    pub fn mark_heard(&mut self, anchor_id: &str, store: &mut dyn KeyValueStore) -> bool {
        let added = self.heard.insert(anchor_id.to_string());
        if added {
            self.persist(store);
        }
        added
    }

    /// 保存（署名がなければ何もしない）
    ///
    /// 失敗しても警告ログのみ。
    pub fn persist(&self, store: &mut dyn KeyValueStore) {
        if self.signature.is_none() {
            return;
        }
        let record = ProgressRecord {
            signature: self.signature.clone(),
            seen: self.seen.iter().cloned().collect(),
            heard: self.heard.iter().cloned().collect(),
        };
        if let Err(e) = save_json(store, PROGRESS_STORAGE_KEY, &record) {
            tracing::warn!("Failed to persist progress: {}", e);
        }
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn is_seen(&self, anchor_id: &str) -> bool {
        self.seen.contains(anchor_id)
    }

    pub fn is_heard(&self, anchor_id: &str) -> bool {
        self.heard.contains(anchor_id)
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn heard_count(&self) -> usize {
        self.heard.len()
    }

    /// 表示用（`Seen: n / total` と `Heard: n / total`）
    pub fn summary(&self, total: usize) -> (String, String) {
        (
            format!("Seen: {} / {}", self.seen.len(), total),
            format!("Heard: {} / {}", self.heard.len(), total),
        )
    }
}
