//! データセットの型定義
//!
//! CLIと対話ブラウザで共有される型:
//! - Record: TSV 1行をパースした結果
//! - Anchor: Record に ID とアセットルートを付与したもの（部屋に配置される単位）
//! - RowWarning: スキップした行の情報

use serde::{Deserialize, Serialize};

/// TSV 1行分のレコード
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// 学習対象の語（1列目）
    pub source_text: String,

    /// 訳語（2列目）
    pub target_text: String,

    /// `<img src="...">` から抽出した画像参照
    #[serde(default)]
    pub image_ref: Option<String>,

    /// `[sound:...]` から抽出した音声参照
    #[serde(default)]
    pub audio_ref: Option<String>,

    /// 採用された行の中での位置（0始まり）。アンカーIDに使う
    pub row_index: usize,

    /// 入力テキスト上の物理行番号（1始まり、診断用）
    #[serde(default)]
    pub line_number: usize,
}

impl Record {
    /// 検索対象テキスト（小文字化済み）
    pub fn search_text(&self) -> String {
        format!("{} {}", self.source_text, self.target_text).to_lowercase()
    }
}

/// 部屋に配置されるカード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    /// `anchor-` で始まる安定ID
    pub id: String,

    /// 正規化済みアセットルート（末尾 `/`）
    pub asset_root: String,

    #[serde(flatten)]
    pub record: Record,
}

impl Anchor {
    pub fn source_text(&self) -> &str {
        &self.record.source_text
    }

    pub fn target_text(&self) -> &str {
        &self.record.target_text
    }

    /// 音声参照があるか
    pub fn has_audio(&self) -> bool {
        self.record.audio_ref.is_some()
    }
}

/// スキップ理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 列数不足
    MissingColumns { found: usize },
    /// 1列目・2列目とも空
    MissingText,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingColumns { found } => {
                write!(f, "expected 4 columns (found {})", found)
            }
            SkipReason::MissingText => write!(f, "missing text"),
        }
    }
}

/// スキップされた行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowWarning {
    /// 物理行番号（1始まり）
    pub line: usize,
    pub reason: SkipReason,
}

impl std::fmt::Display for RowWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Skipping row {}: {}.", self.line, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_serializes_flat() {
        let anchor = Anchor {
            id: "anchor-abc".into(),
            asset_root: "./media/".into(),
            record: Record {
                source_text: "кошка".into(),
                target_text: "cat".into(),
                image_ref: Some("cat.jpg".into()),
                audio_ref: None,
                row_index: 0,
                line_number: 1,
            },
        };

        let json = serde_json::to_value(&anchor).unwrap();
        assert_eq!(json["id"], "anchor-abc");
        assert_eq!(json["sourceText"], "кошка");
        assert_eq!(json["imageRef"], "cat.jpg");
        assert!(json["audioRef"].is_null());
    }

    #[test]
    fn test_row_warning_display() {
        let warning = RowWarning {
            line: 3,
            reason: SkipReason::MissingColumns { found: 3 },
        };
        let display = warning.to_string();
        assert!(display.contains("row 3"));
        assert!(display.contains("expected 4 columns"));
    }

    #[test]
    fn test_search_text_lowercase() {
        let record = Record {
            source_text: "Дом".into(),
            target_text: "House".into(),
            ..Default::default()
        };
        assert_eq!(record.search_text(), "дом house");
    }
}
