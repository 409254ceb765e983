//! キー・バリュー保存領域
//!
//! 進捗・保存済みレイアウト・セッションを固定キーで永続化する。
//! ファイル版は1キー1JSONファイル。

use crate::error::{PalaceError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

/// 進捗の保存キー
pub const PROGRESS_STORAGE_KEY: &str = "memory-palace-progress-v1";
/// 保存済みレイアウトの保存キー
pub const SAVED_LAYOUTS_STORAGE_KEY: &str = "memory-palace-saves-v1";
/// 現在のセッションの保存キー
pub const SESSION_STORAGE_KEY: &str = "memory-palace-session-v1";

/// 永続化先の抽象
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// JSONとして読み込み（キーがなければ None）
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// JSONとして保存
pub fn save_json<T: Serialize>(store: &mut dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

/// ディレクトリ上のファイル保存領域
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// 保存先ディレクトリを指定して開く（なければ作成）
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// 既定の保存先（データディレクトリ/memory-palace）
    pub fn default_dir() -> Result<PathBuf> {
        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| PalaceError::Storage("データディレクトリが見つかりません".into()))?;
        Ok(base.join("memory-palace"))
    }

    /// キーに対応するファイルパス
    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let mut reader = BufReader::new(File::open(&path)?);
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        Ok(Some(raw))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        use std::io::Write;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            writer.write_all(value.as_bytes())?;
            writer.flush()?;
        }
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// メモリ上の保存領域（テスト・一時利用）
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = JsonFileStore::open(dir.path()).unwrap();

        assert!(store.get("missing").unwrap().is_none());
        store.set(PROGRESS_STORAGE_KEY, "{\"a\":1}").unwrap();
        assert_eq!(store.get(PROGRESS_STORAGE_KEY).unwrap().as_deref(), Some("{\"a\":1}"));

        store.remove(PROGRESS_STORAGE_KEY).unwrap();
        assert!(store.get(PROGRESS_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_file_store_key_sanitized() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = JsonFileStore::open(dir.path()).unwrap();
        let path = store.path_for("../escape/key");
        assert_eq!(path.parent().unwrap(), dir.path());
    }

    #[test]
    fn test_json_helpers() {
        let mut store = MemoryStore::new();
        save_json(&mut store, "numbers", &vec![1, 2, 3]).unwrap();
        let loaded: Option<Vec<i32>> = load_json(&store, "numbers").unwrap();
        assert_eq!(loaded, Some(vec![1, 2, 3]));

        let missing: Option<Vec<i32>> = load_json(&store, "nothing").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_load_json_corrupted() {
        let mut store = MemoryStore::new();
        store.set("bad", "{ invalid json }").unwrap();
        let result: Result<Option<Vec<i32>>> = load_json(&store, "bad");
        assert!(matches!(result, Err(PalaceError::JsonParse(_))));
    }
}
