//! サブコマンドの実行
//!
//! 1回の起動で1コマンドを実行する。失敗は呼び出し側で
//! `PalaceController::settle` に渡し、ログと通知に変換する。

use crate::audio::{self, AudioPlayer, AudioQueue};
use crate::browse;
use crate::cli::Commands;
use crate::controller::PalaceController;
use crate::error::{PalaceError, Result};
use crate::progress::Reconciliation;
use crate::scene::{project_room_shell, SceneRecorder, SceneSink};

/// ログ・通知に使うコマンド名
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Load { .. } => "load",
        Commands::Reshuffle { .. } => "reshuffle",
        Commands::Rooms => "rooms",
        Commands::Page { .. } => "page",
        Commands::Search { .. } => "search",
        Commands::Seen { .. } => "seen",
        Commands::Play { .. } => "play",
        Commands::PlayPage { .. } => "play-page",
        Commands::Progress => "progress",
        Commands::Save { .. } => "save",
        Commands::Saved => "saved",
        Commands::Open { .. } => "open",
        Commands::Delete { .. } => "delete",
        Commands::Browse => "browse",
        Commands::Config { .. } => "config",
    }
}

/// 部屋指定がなければ現在の部屋
fn resolve_room(controller: &PalaceController, room: Option<String>) -> Result<String> {
    match room {
        Some(room) => Ok(room),
        None => controller
            .active_room()
            .map(str::to_string)
            .ok_or_else(|| PalaceError::Config("部屋がありません（roomOrder を確認してください）".into())),
    }
}

fn print_page(controller: &mut PalaceController, room: &str, reveal: bool) -> Result<()> {
    let projection = controller.project_with(room, reveal.then_some(true))?;
    for line in browse::format_page(controller, &projection) {
        println!("{}", line);
    }
    Ok(())
}

fn print_rooms(controller: &PalaceController) -> Result<()> {
    let active = controller.active_room().map(str::to_string);
    let counts = controller.room_counts();
    if counts.is_empty() {
        for room in controller.config().room_order() {
            println!("   {:<10} {}", room, controller.config().room_label(room));
        }
    }
    for (room, count) in counts {
        let marker = if active.as_deref() == Some(room.as_str()) { "▶" } else { " " };
        let pages = controller.page_count(&room)?;
        let target = controller
            .teleport_target(&room)
            .map(|p| p.to_string())
            .unwrap_or_else(|_| "(設定なし)".into());
        println!(
            " {} {:<10} {:<16} {:>3}枚 {:>2}ページ  spawn {}",
            marker,
            room,
            controller.config().room_label(&room),
            count,
            pages,
            target
        );
    }
    for issue in controller.config().issues() {
        println!("⚠ {}", issue);
    }
    Ok(())
}

/// 1コマンドを実行
pub async fn execute<P: AudioPlayer>(
    command: Commands,
    controller: &mut PalaceController,
    player: &P,
) -> Result<()> {
    match command {
        Commands::Load { tsv, asset_root, seed } => {
            println!("🏛 memory-palace - 読み込み\n");
            let report = controller.load_file(&tsv, asset_root.as_deref(), seed)?;
            println!("✔ {}枚のカードを読み込み（スキップ {}行）", report.anchors, report.skipped);
            println!("✔ {}部屋に配置（シード {}）", report.rooms, report.seed);
            if report.reconciliation == Reconciliation::Reset {
                println!("- 新しいデータセットのため進捗をリセットしました");
            }
            println!("\n✅ 読み込み完了: {}", report.label);
        }

        Commands::Reshuffle { seed } => {
            let report = controller.reshuffle(seed)?;
            println!("✔ 並べ直しました（シード {}）", report.seed);
        }

        Commands::Rooms => print_rooms(controller)?,

        Commands::Page { room, page, reveal, json } => {
            let room = resolve_room(controller, room)?;
            controller.set_active_room(&room)?;
            if let Some(page) = page {
                controller.set_page(&room, page.saturating_sub(1))?;
            }

            if json {
                let projection = controller.project_with(&room, reveal.then_some(true))?;
                let mut recorder = SceneRecorder::default();
                if let Some(room_config) = controller.config().room(&room) {
                    for object in project_room_shell(&room, room_config) {
                        recorder.place(object);
                    }
                }
                projection.render(controller.config(), &mut recorder);
                let output = serde_json::json!({
                    "projection": projection,
                    "objects": recorder.objects,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_page(controller, &room, reveal)?;
            }
        }

        Commands::Search { query, room } => {
            let count = controller.search(&query)?;
            println!("✔ {}件一致: {:?}", count, query.trim());
            let room = resolve_room(controller, room)?;
            print_page(controller, &room, false)?;
        }

        Commands::Seen { anchor_id } => {
            if controller.mark_seen(&anchor_id)? {
                println!("✔ 見た: {}", anchor_id);
            } else {
                println!("- 記録済み: {}", anchor_id);
            }
            let (seen, _) = controller.progress_summary();
            println!("{}", seen);
        }

        Commands::Play { anchor_id } => {
            let queue = AudioQueue::default();
            if audio::play_anchor(controller, &queue, player, &anchor_id).await? {
                println!("♪ 再生: {}", anchor_id);
            }
        }

        Commands::PlayPage { room, page } => {
            let room = resolve_room(controller, room)?;
            if let Some(page) = page {
                controller.set_page(&room, page.saturating_sub(1))?;
            }
            let queue = AudioQueue::default().with_progress(true);
            if let Some(report) = audio::play_page(controller, &queue, player, &room).await? {
                println!(
                    "✔ {}件再生（タイムアウト {} / 失敗 {}）",
                    report.total(),
                    report.timed_out,
                    report.failed
                );
            }
        }

        Commands::Progress => {
            let (seen, heard) = controller.progress_summary();
            println!("{}\n{}", seen, heard);
        }

        Commands::Save { name } => {
            let name = match name {
                Some(name) => name,
                None => controller.default_save_name().ok_or(PalaceError::NoDataset)?,
            };
            let entry = controller.save_current(&name)?;
            println!("✔ 保存しました: {} ({})", entry.name, entry.id);
        }

        Commands::Saved => {
            if controller.saved_layouts().is_empty() {
                println!("保存済みレイアウトはありません");
            }
            for entry in controller.saved_layouts() {
                let active = if controller.active_saved_id() == Some(entry.id.as_str()) { "*" } else { " " };
                println!("{} {}  {}  {}", active, entry.id, entry.saved_at_display(), entry.name);
            }
        }

        Commands::Open { id, seed } => {
            let report = controller.open_saved(&id, seed)?;
            println!("✔ {} を開きました（{}枚、{}部屋）", report.label, report.anchors, report.rooms);
        }

        Commands::Delete { id } => {
            controller.delete_saved(&id)?;
            println!("✔ 保存済みレイアウトを削除しました ({})", id);
        }

        Commands::Browse => {
            let queue = AudioQueue::default().with_progress(true);
            browse::run_browse(controller, &queue, player).await?;
        }

        // 設定コマンドはコントローラを作る前に処理する
        Commands::Config { .. } => {}
    }
    Ok(())
}
