//! 現在のセッション
//!
//! CLIは呼び出しごとにプロセスが終わるため、読み込み中のデータセットと
//! シャッフルのシードを保存しておき、次回同じレイアウトを再構築する。

use crate::storage::{load_json, save_json, KeyValueStore, SESSION_STORAGE_KEY};
use serde::{Deserialize, Serialize};

/// 保存されるセッション
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub raw_text: String,
    pub asset_root: String,
    /// 表示名（ファイル名や保存名）
    pub label: String,
    #[serde(default)]
    pub saved_id: Option<String>,
    pub seed: u64,
    #[serde(default)]
    pub active_room: Option<String>,
    #[serde(default)]
    pub active_page: usize,
    #[serde(default)]
    pub reveal_target: bool,
}

impl Session {
    /// 読み込み（なし・壊れている場合は None）
    pub fn load(store: &dyn KeyValueStore) -> Option<Self> {
        match load_json::<Session>(store, SESSION_STORAGE_KEY) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Unable to restore session: {}", e);
                None
            }
        }
    }

    /// 保存（失敗は警告ログのみ）
    pub fn persist(&self, store: &mut dyn KeyValueStore) {
        if let Err(e) = save_json(store, SESSION_STORAGE_KEY, self) {
            tracing::warn!("Failed to store session: {}", e);
        }
    }

    pub fn clear(store: &mut dyn KeyValueStore) {
        if let Err(e) = store.remove(SESSION_STORAGE_KEY) {
            tracing::warn!("Failed to clear session: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn sample() -> Session {
        Session {
            raw_text: "a\tA\t\t".into(),
            asset_root: "./".into(),
            label: "deck".into(),
            saved_id: None,
            seed: 42,
            active_room: Some("kitchen".into()),
            active_page: 1,
            reveal_target: false,
        }
    }

    #[test]
    fn test_persist_and_load() {
        let mut store = MemoryStore::new();
        assert!(Session::load(&store).is_none());

        sample().persist(&mut store);
        assert_eq!(Session::load(&store), Some(sample()));

        Session::clear(&mut store);
        assert!(Session::load(&store).is_none());
    }

    #[test]
    fn test_corrupted_session_is_none() {
        let mut store = MemoryStore::new();
        store.set(SESSION_STORAGE_KEY, "[]").unwrap();
        assert!(Session::load(&store).is_none());
    }

    #[test]
    fn test_optional_fields_default() {
        let mut store = MemoryStore::new();
        store
            .set(
                SESSION_STORAGE_KEY,
                r#"{"rawText": "a\tA\t\t", "assetRoot": "./", "label": "x", "seed": 7}"#,
            )
            .unwrap();
        let session = Session::load(&store).unwrap();
        assert_eq!(session.seed, 7);
        assert_eq!(session.active_page, 0);
        assert!(session.active_room.is_none());
    }
}
