//! データセット指紋・アンカーID生成
//!
//! 32bitローリングハッシュ（`h = h * 31 + c`、UTF-16単位）を36進で表現する。
//! 保存済みデータとの互換のため、ハッシュの入力と区切り文字は変更しないこと。

use crate::types::Record;

/// フィールド区切り（U+241F SYMBOL FOR UNIT SEPARATOR）
pub const FIELD_SEPARATOR: char = '\u{241F}';
/// 行区切り（U+241E SYMBOL FOR RECORD SEPARATOR）
pub const ROW_SEPARATOR: char = '\u{241E}';
/// アンカーIDの接頭辞
pub const ANCHOR_ID_PREFIX: &str = "anchor-";

/// 文字列ハッシュ
///
/// # Examples
/// ```
/// use palace_common::fingerprint::hash_string;
///
/// assert_eq!(hash_string(""), "0");
/// assert_eq!(hash_string("a"), "2p");
/// ```
pub fn hash_string(input: &str) -> String {
    let mut hash: i32 = 0;
    for unit in input.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }
    to_base36(i64::from(hash).unsigned_abs())
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while value > 0 {
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}

/// データセット署名
///
/// アセットルートやファイル名は含まない。
pub fn dataset_signature(records: &[Record]) -> String {
    let row_sep = ROW_SEPARATOR.to_string();
    let source = records
        .iter()
        .map(|r| {
            format!(
                "{}{sep}{}{sep}{}{sep}{}",
                r.source_text,
                r.target_text,
                r.image_ref.as_deref().unwrap_or(""),
                r.audio_ref.as_deref().unwrap_or(""),
                sep = FIELD_SEPARATOR,
            )
        })
        .collect::<Vec<_>>()
        .join(&row_sep);
    hash_string(&source)
}

/// アンカーID
///
/// 同じ内容・同じ位置なら再パースしても同じIDになる。
/// 別データセット間の衝突は許容している。
pub fn anchor_id(record: &Record) -> String {
    let composite = format!(
        "{}{sep}{}{sep}{}",
        record.source_text,
        record.target_text,
        record.row_index,
        sep = FIELD_SEPARATOR,
    );
    format!("{}{}", ANCHOR_ID_PREFIX, hash_string(&composite))
}
