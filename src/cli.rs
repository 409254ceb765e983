use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "memory-palace")]
#[command(about = "単語カードを記憶の部屋に配置して学習するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 設定ファイル（デフォルト: 設定ディレクトリ/memory-palace/config.json）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 保存先ディレクトリ（デフォルト: データディレクトリ/memory-palace）
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// TSVを読み込んで部屋に配置
    Load {
        /// TSVファイル（原語 / 訳語 / 画像タグ / 音声タグ）
        #[arg(required = true)]
        tsv: PathBuf,

        /// 画像・音声の基準パス（デフォルト: 設定の assetRoot）
        #[arg(short, long)]
        asset_root: Option<String>,

        /// シャッフルのシード（省略時は時刻）
        #[arg(long)]
        seed: Option<u64>,
    },

    /// 新しい並びで配置し直す
    Reshuffle {
        #[arg(long)]
        seed: Option<u64>,
    },

    /// 部屋の一覧
    Rooms,

    /// 部屋のページを表示
    Page {
        /// 部屋ID（デフォルト: 現在の部屋）
        #[arg(short, long)]
        room: Option<String>,

        /// ページ番号（1始まり）
        #[arg(short, long)]
        page: Option<usize>,

        /// 訳語を表示
        #[arg(long)]
        reveal: bool,

        /// 配置命令をJSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 表示中のページを検索
    Search {
        #[arg(required = true)]
        query: String,

        /// 結果を表示する部屋
        #[arg(short, long)]
        room: Option<String>,
    },

    /// カードを「見た」にする
    Seen {
        #[arg(required = true)]
        anchor_id: String,
    },

    /// カードの音声を再生
    Play {
        #[arg(required = true)]
        anchor_id: String,
    },

    /// ページの音声を順に再生
    PlayPage {
        #[arg(short, long)]
        room: Option<String>,

        /// ページ番号（1始まり）
        #[arg(short, long)]
        page: Option<usize>,
    },

    /// 学習進捗を表示
    Progress,

    /// 現在のデータセットを名前付きで保存
    Save {
        /// 保存名（省略時はファイル名）
        name: Option<String>,
    },

    /// 保存済みレイアウトの一覧
    Saved,

    /// 保存済みレイアウトを開く
    Open {
        /// IDまたは保存名
        #[arg(required = true)]
        id: String,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// 保存済みレイアウトを削除
    Delete {
        #[arg(required = true)]
        id: String,
    },

    /// 対話モードで部屋を巡る
    Browse,

    /// 設定ファイルの作成・表示
    Config {
        /// 既定の設定ファイルを作成
        #[arg(long)]
        init: bool,

        /// 設定の要約を表示
        #[arg(long)]
        show: bool,
    },
}
