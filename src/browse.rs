//! 対話式ブラウザ
//!
//! 部屋・ページを行き来しながらカードを見る・聞く・保存する。
//! 1行1コマンド。失敗は通知として表示し、ループは続ける。

use crate::audio::{play_anchor, play_page, AudioPlayer, AudioQueue};
use crate::controller::{Notice, NoticeLevel, PalaceController};
use crate::error::{PalaceError, Result};
use crate::scene::PageProjection;
use dialoguer::Input;

/// 対話アクション
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseAction {
    /// 次のページ
    NextPage,
    /// 前のページ
    PrevPage,
    /// 部屋を移動
    Room(String),
    /// 表示中のページを検索（空なら解除）
    Search(String),
    /// 訳語表示の切り替え
    Reveal,
    /// n番目のカードを見る
    Focus(usize),
    /// n番目のカードの音声を再生
    Play(usize),
    /// ページの音声を順に再生
    PlayPage,
    /// 名前を付けて保存（空なら既定名）
    Save(String),
    /// 保存済み一覧
    Saved,
    /// 保存済みを開く
    Open(String),
    /// 進捗
    Progress,
    /// 操作説明
    Help,
    /// 終了
    Quit,
    /// 解釈できない入力
    Unknown(String),
}

pub const HELP: &str =
    "操作: [n]次 [p]前 [r 部屋] [/ 語]検索 [t]訳表示 [f 番号]見る [a 番号]再生 [A]ページ再生 [w 名前]保存 [l]一覧 [o ID]開く [g]進捗 [q]終了";

/// 入力行をアクションに変換
pub fn parse_action(input: &str) -> BrowseAction {
    let trimmed = input.trim();
    let (command, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (trimmed, ""),
    };

    let index = |rest: &str| rest.parse::<usize>().ok().filter(|n| *n > 0);

    match command {
        "" | "n" => BrowseAction::NextPage,
        "p" => BrowseAction::PrevPage,
        "r" if !rest.is_empty() => BrowseAction::Room(rest.to_string()),
        "/" => BrowseAction::Search(rest.to_string()),
        "t" => BrowseAction::Reveal,
        "f" => index(rest).map_or_else(|| BrowseAction::Unknown(trimmed.to_string()), BrowseAction::Focus),
        "a" => index(rest).map_or_else(|| BrowseAction::Unknown(trimmed.to_string()), BrowseAction::Play),
        "A" => BrowseAction::PlayPage,
        "w" => BrowseAction::Save(rest.to_string()),
        "l" => BrowseAction::Saved,
        "o" if !rest.is_empty() => BrowseAction::Open(rest.to_string()),
        "g" => BrowseAction::Progress,
        "?" | "h" => BrowseAction::Help,
        "q" | "Q" => BrowseAction::Quit,
        _ if trimmed.starts_with('/') => BrowseAction::Search(trimmed[1..].trim().to_string()),
        _ => BrowseAction::Unknown(trimmed.to_string()),
    }
}

/// ページを表示用の行に整形
pub fn format_page(controller: &PalaceController, projection: &PageProjection) -> Vec<String> {
    let config = controller.config();
    let mut lines = vec![format!(
        "🏛 {} ({}){}",
        config.room_label(&projection.room_id),
        projection.room_id,
        projection
            .page_label()
            .map(|label| format!(" - {}", label))
            .unwrap_or_default()
    )];

    if projection.placements.is_empty() {
        lines.push("  (カードなし)".into());
    }

    let progress = controller.progress();
    for (i, placement) in projection.placements.iter().enumerate() {
        if !placement.visible {
            continue;
        }
        let seen = if progress.is_seen(&placement.anchor_id) { "✔" } else { " " };
        let heard = if progress.is_heard(&placement.anchor_id) { "♪" } else { " " };
        let target = if placement.target_visible {
            placement.target_text.as_str()
        } else {
            "･･･"
        };
        let audio = if placement.audio.is_missing() { " [mute]" } else { "" };
        let mark = if placement.highlighted { "*" } else { " " };
        lines.push(format!(
            " {}{:>2}. {}{} {} / {}{}  ({})",
            mark,
            i + 1,
            seen,
            heard,
            placement.source_text,
            target,
            audio,
            placement.anchor_id
        ));
    }

    for id in &projection.overflow {
        lines.push(format!("  ⚠ 表示枠外: {}", id));
    }
    lines
}

pub fn print_notices(notices: Vec<Notice>) {
    for notice in notices {
        match notice.level {
            NoticeLevel::Info => println!("  ℹ {}", notice.message),
            NoticeLevel::Warning => println!("  ⚠ {}", notice.message),
            NoticeLevel::Error => println!("  ✖ {}", notice.message),
        }
    }
}

fn prompt_action(room: &str) -> Result<BrowseAction> {
    let input: String = Input::new()
        .with_prompt(format!("[{}]", room))
        .allow_empty(true)
        .interact_text()
        .map_err(|e| PalaceError::CliExecution(e.to_string()))?;
    Ok(parse_action(&input))
}

/// 表示中ページのn番目（1始まり）のアンカーID
fn anchor_at(controller: &mut PalaceController, room: &str, n: usize) -> Result<String> {
    let projection = controller.project(room)?;
    projection
        .placements
        .get(n - 1)
        .map(|p| p.anchor_id.clone())
        .ok_or_else(|| PalaceError::UnknownAnchor(format!("#{}", n)))
}

/// 対話ループ
pub async fn run_browse<P: AudioPlayer>(
    controller: &mut PalaceController,
    queue: &AudioQueue,
    player: &P,
) -> Result<()> {
    if !controller.is_loaded() {
        return Err(PalaceError::NoDataset);
    }

    println!("{}", HELP);
    let mut redraw = true;

    loop {
        let Some(room) = controller.active_room().map(str::to_string) else {
            println!("部屋がありません（roomOrder を確認してください）");
            return Ok(());
        };

        if redraw {
            if let Some(projection) = controller.run("project", |c| c.project(&room)) {
                println!();
                for line in format_page(controller, &projection) {
                    println!("{}", line);
                }
            }
        }
        print_notices(controller.take_notices());

        redraw = true;
        match prompt_action(&room)? {
            BrowseAction::NextPage => {
                controller.run("next page", |c| c.change_page(&room, 1));
            }
            BrowseAction::PrevPage => {
                controller.run("previous page", |c| c.change_page(&room, -1));
            }
            BrowseAction::Room(target) => {
                if let Some(position) = controller.run("teleport", |c| {
                    c.set_active_room(&target)?;
                    c.teleport_target(&target)
                }) {
                    println!("  → {} ({})", controller.config().room_label(&target), position);
                }
            }
            BrowseAction::Search(query) => {
                if let Some(count) = controller.run("search", |c| c.search(&query)) {
                    if !query.trim().is_empty() {
                        println!("  {}件一致", count);
                    }
                }
            }
            BrowseAction::Reveal => {
                controller.run("reveal", |c| c.toggle_reveal());
            }
            BrowseAction::Focus(n) => {
                controller.run("focus", |c| {
                    let id = anchor_at(c, &room, n)?;
                    c.mark_seen(&id)
                });
            }
            BrowseAction::Play(n) => {
                let id = controller.run("play", |c| anchor_at(c, &room, n));
                if let Some(id) = id {
                    let result = play_anchor(controller, queue, player, &id).await;
                    controller.settle("play", result);
                }
            }
            BrowseAction::PlayPage => {
                let result = play_page(controller, queue, player, &room).await;
                if let Some(Some(report)) = controller.settle("play page", result) {
                    println!("  ♪ {}件再生", report.total());
                }
            }
            BrowseAction::Save(name) => {
                let name = if name.is_empty() {
                    controller.default_save_name().unwrap_or_default()
                } else {
                    name
                };
                if let Some(entry) = controller.run("save", |c| c.save_current(&name)) {
                    println!("  ✔ 保存しました: {} ({})", entry.name, entry.id);
                }
                redraw = false;
            }
            BrowseAction::Saved => {
                for entry in controller.saved_layouts() {
                    let active = if controller.active_saved_id() == Some(entry.id.as_str()) { "*" } else { " " };
                    println!("  {} {}  {}  {}", active, entry.id, entry.saved_at_display(), entry.name);
                }
                redraw = false;
            }
            BrowseAction::Open(id) => {
                if let Some(report) = controller.run("open", |c| c.open_saved(&id, None)) {
                    println!("  ✔ {} を開きました（{}枚）", report.label, report.anchors);
                }
            }
            BrowseAction::Progress => {
                let (seen, heard) = controller.progress_summary();
                println!("  {}  {}", seen, heard);
                redraw = false;
            }
            BrowseAction::Help => {
                println!("{}", HELP);
                redraw = false;
            }
            BrowseAction::Quit => {
                println!("終了します");
                return Ok(());
            }
            BrowseAction::Unknown(input) => {
                println!("  ? 不明な操作: {}", input);
                redraw = false;
            }
        }
    }
}
