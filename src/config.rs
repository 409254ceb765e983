use crate::error::{PalaceError, Result};
use palace_common::config::ConfigIssue;
use palace_common::PalaceConfig;
use std::path::{Path, PathBuf};

/// 設定ファイルの場所と中身
#[derive(Debug, Clone)]
pub struct Settings {
    pub path: PathBuf,
    pub palace: PalaceConfig,
}

impl Settings {
    /// 設定を読み込む
    ///
    /// `--config` 指定があればそのファイル、なければ既定パス。
    /// 読めない・壊れている場合は致命的エラー（部屋を組み立てられない）。
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        let palace = PalaceConfig::from_file(&path).map_err(|e| {
            PalaceError::Config(format!("{} ({})", e, path.display()))
        })?;

        for issue in palace.issues() {
            match issue {
                ConfigIssue::MissingRoomOrder => tracing::error!("{}", issue),
                ConfigIssue::MissingRoom(_) => tracing::warn!("{}", issue),
            }
        }

        Ok(Self { path, palace })
    }

    /// 組み込みの既定設定を書き出す（既存ファイルは上書きしない）
    pub fn init(explicit: Option<&Path>) -> Result<PathBuf> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if path.exists() {
            return Err(PalaceError::Config(format!(
                "設定ファイルが既に存在します: {}",
                path.display()
            )));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&PalaceConfig::builtin())?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    pub fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .ok_or_else(|| PalaceError::Config("設定ディレクトリが見つかりません".into()))?;
        Ok(base.join("memory-palace").join("config.json"))
    }

    /// 表示用の要約
    pub fn summary(&self) -> Vec<String> {
        let palace = &self.palace;
        let mut lines = vec![format!("設定ファイル: {}", self.path.display())];
        lines.push(format!(
            "アセットルート: {}",
            palace.asset_root.as_deref().unwrap_or("(未設定)")
        ));
        lines.push(format!("部屋数: {}", palace.room_order().len()));
        for room_id in palace.room_order() {
            let marker = if palace.room(room_id).is_some() { " " } else { "!" };
            lines.push(format!(
                "  {} {:<10} {:<16} 容量 {}",
                marker,
                room_id,
                palace.room_label(room_id),
                palace.room_capacity(room_id)
            ));
        }
        for issue in palace.issues() {
            lines.push(format!("⚠ {}", issue));
        }
        lines
    }
}
