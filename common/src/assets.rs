//! アセット参照の解決
//!
//! 画像・音声の参照をURLに変換する。
//! `http(s)://` と `data:` はそのまま、それ以外はアセットルートに連結する。

use crate::fingerprint::hash_string;
use serde::Serialize;

/// アセットルートの既定値
pub const DEFAULT_ASSET_ROOT: &str = "./";

/// アセット種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Audio,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKind::Image => write!(f, "image"),
            AssetKind::Audio => write!(f, "audio"),
        }
    }
}

/// アセットルートを正規化（空なら `./`、末尾 `/` を保証）
pub fn sanitize_asset_root(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return DEFAULT_ASSET_ROOT.to_string();
    }
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}

/// 絶対URL・data URIか
pub fn is_verbatim(path: &str) -> bool {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || path.starts_with("data:")
}

/// 参照をURLに解決
///
/// # Examples
/// ```
/// use palace_common::assets::build_asset_url;
///
/// assert_eq!(build_asset_url(Some("cat.jpg"), "media/").as_deref(), Some("media/cat.jpg"));
/// assert_eq!(
///     build_asset_url(Some("https://cdn.example/cat.jpg"), "media/").as_deref(),
///     Some("https://cdn.example/cat.jpg")
/// );
/// assert_eq!(build_asset_url(None, "media/"), None);
/// ```
pub fn build_asset_url(path: Option<&str>, asset_root: &str) -> Option<String> {
    let path = path.filter(|p| !p.is_empty())?;
    if is_verbatim(path) {
        return Some(path.to_string());
    }
    Some(format!("{}{}", asset_root, path))
}

/// URLから安定したアセットIDを作る
pub fn asset_id(url: &str) -> String {
    format!("asset-{}", hash_string(url))
}
