use thiserror::Error;

#[derive(Error, Debug)]
pub enum PalaceError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("TSVに有効な行がありません: {0}")]
    EmptyDataset(String),

    #[error("データセットが読み込まれていません。先に `memory-palace load <TSV>` を実行してください")]
    NoDataset,

    #[error("保存名は2文字以上にしてください: {0:?}")]
    InvalidSaveName(String),

    #[error("保存済みレイアウトが見つかりません: {0}")]
    SavedLayoutNotFound(String),

    #[error("不明な部屋: {0}")]
    UnknownRoom(String),

    #[error("不明なカード: {0}")]
    UnknownAnchor(String),

    #[error("音声キューが再生中です")]
    AudioQueueBusy,

    #[error("音声再生エラー: {0}")]
    Audio(String),

    #[error("保存領域エラー: {0}")]
    Storage(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),
}

impl PalaceError {
    /// 利用者の入力ミスによるもの（状態は変更されていない）
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            PalaceError::EmptyDataset(_)
                | PalaceError::NoDataset
                | PalaceError::InvalidSaveName(_)
                | PalaceError::SavedLayoutNotFound(_)
                | PalaceError::UnknownRoom(_)
                | PalaceError::UnknownAnchor(_)
                | PalaceError::AudioQueueBusy
        )
    }
}

pub type Result<T> = std::result::Result<T, PalaceError>;
