//! Memory Palace Common Library
//!
//! TSVデータセットから部屋・ページ配置までの純粋なパイプライン

pub mod types;
pub mod error;
pub mod parser;
pub mod fingerprint;
pub mod assets;
pub mod config;
pub mod dataset;
pub mod layout;
pub mod placement;

pub use types::{Anchor, Record, RowWarning, SkipReason};
pub use error::{Error, Result};
pub use parser::{parse_tsv, ParseOutcome};
pub use fingerprint::{anchor_id, dataset_signature, hash_string};
pub use config::PalaceConfig;
pub use dataset::Dataset;
pub use layout::{build_layout, paginate, RoomAssignment, RoomLayout, RoomPages};
pub use placement::{slot_for, GridSpec, Slot};
