//! TSVパーサー
//!
//! 単語カードのTSV（`原語 \t 訳語 \t <img src="..."> \t [sound:...]`）を
//! Record のリストに変換する。不正な行は個別にスキップし、全体は止めない。

use crate::types::{Record, RowWarning, SkipReason};
use regex::Regex;

/// 必須列数
pub const REQUIRED_COLUMNS: usize = 4;

/// パース結果
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    /// 採用された行（入力順）
    pub records: Vec<Record>,
    /// スキップされた行
    pub warnings: Vec<RowWarning>,
}

impl ParseOutcome {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// TSVテキストをパース
///
/// - 空行・空白のみの行は黙ってスキップ
/// - 4列未満の行は警告付きでスキップ
/// - 1列目・2列目が両方空の行は警告付きでスキップ
/// - 5列目以降は無視
///
/// # Examples
/// ```
/// use palace_common::parse_tsv;
///
/// let text = "кошка\tcat\t<img src=\"cat.jpg\">\t[sound:cat.mp3]";
/// let outcome = parse_tsv(text);
/// assert_eq!(outcome.records.len(), 1);
/// assert_eq!(outcome.records[0].audio_ref.as_deref(), Some("cat.mp3"));
/// ```
pub fn parse_tsv(text: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    for (index, raw_line) in text.split('\n').enumerate() {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        let line_number = index + 1;

        if line.trim().is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < REQUIRED_COLUMNS {
            skip(
                &mut outcome,
                line_number,
                SkipReason::MissingColumns { found: parts.len() },
            );
            continue;
        }

        let source_text = parts[0].trim();
        let target_text = parts[1].trim();
        if source_text.is_empty() && target_text.is_empty() {
            skip(&mut outcome, line_number, SkipReason::MissingText);
            continue;
        }

        let row_index = outcome.records.len();
        outcome.records.push(Record {
            source_text: source_text.to_string(),
            target_text: target_text.to_string(),
            image_ref: extract_image_src(parts[2].trim()),
            audio_ref: extract_audio_src(parts[3].trim()),
            row_index,
            line_number,
        });
    }

    outcome
}

fn skip(outcome: &mut ParseOutcome, line: usize, reason: SkipReason) {
    outcome.warnings.push(RowWarning { line, reason });
}

/// `<img>` タグ断片から src 属性値を抽出
pub fn extract_image_src(html_snippet: &str) -> Option<String> {
    lazy_static::lazy_static! {
        static ref SRC_RE: Regex = Regex::new(r#"(?i)src\s*=\s*["']([^"']+)["']"#).unwrap();
    }

    if html_snippet.is_empty() {
        return None;
    }
    SRC_RE
        .captures(html_snippet)
        .and_then(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str()))
}

/// `[sound:NAME]` から NAME を抽出
pub fn extract_audio_src(audio_tag: &str) -> Option<String> {
    lazy_static::lazy_static! {
        static ref SOUND_RE: Regex = Regex::new(r"(?i)\[sound:([^\]]+)\]").unwrap();
    }

    if audio_tag.is_empty() {
        return None;
    }
    SOUND_RE
        .captures(audio_tag)
        .and_then(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str()))
}

/// HTMLエンティティをデコード（`&amp;` → `&` など）
pub fn decode_entities(value: &str) -> String {
    html_escape::decode_html_entities(value).into_owned()
}
