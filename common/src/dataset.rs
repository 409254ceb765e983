//! データセット構築
//!
//! TSVテキスト → パース → 署名 → アンカー生成 までの純粋な処理。
//! 状態への反映は呼び出し側で行う。

use crate::assets::sanitize_asset_root;
use crate::fingerprint::{anchor_id, dataset_signature};
use crate::parser::parse_tsv;
use crate::types::{Anchor, Record, RowWarning};

/// 読み込み済みデータセット
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub signature: String,
    pub asset_root: String,
    pub anchors: Vec<Anchor>,
    pub warnings: Vec<RowWarning>,
}

impl Dataset {
    /// TSVテキストから構築
    pub fn from_tsv(text: &str, asset_root: &str) -> Self {
        let outcome = parse_tsv(text);
        let asset_root = sanitize_asset_root(asset_root);
        let signature = dataset_signature(&outcome.records);
        let anchors = build_anchors(outcome.records, &asset_root);

        Self {
            signature,
            asset_root,
            anchors,
            warnings: outcome.warnings,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }
}

/// Record にIDとアセットルートを付与
pub fn build_anchors(records: Vec<Record>, asset_root: &str) -> Vec<Anchor> {
    records
        .into_iter()
        .map(|record| Anchor {
            id: anchor_id(&record),
            asset_root: asset_root.to_string(),
            record,
        })
        .collect()
}
