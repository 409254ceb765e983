//! Memory Palace
//!
//! 単語カード（TSV）を部屋とページに配置し、閲覧・検索・再生・進捗管理を行う。
//! 純粋な配置計算は palace_common、状態と入出力はこのクレート。

pub mod audio;
pub mod browse;
pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod progress;
pub mod saved;
pub mod scene;
pub mod session;
pub mod storage;

pub use controller::PalaceController;
pub use error::{PalaceError, Result};
