//! 音声再生モジュール
//!
//! 1枚ずつの再生と、ページ内の音声を順番に流すキュー。
//! キュー再生中は2本目のキューを受け付けない。
//! 各クリップは終了するか、6秒経つと次へ進む。

use crate::controller::{NoticeLevel, PalaceController};
use crate::error::{PalaceError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use palace_common::assets::is_verbatim;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 1クリップあたりの最大待ち時間
pub const CLIP_TIMEOUT: Duration = Duration::from_secs(6);

/// 再生する音声
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub anchor_id: String,
    pub url: String,
    pub volume: f32,
}

/// 音声の再生先
pub trait AudioPlayer {
    /// 再生が終わるまで待つ
    fn play(&self, clip: &AudioClip) -> impl Future<Output = Result<()>>;
}

/// 外部コマンドで再生（例: `ffplay -nodisp -autoexit`）
///
/// コマンドの末尾にURLを付けて実行する。
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    /// 設定の `audio.command` から作成（空なら None）
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl AudioPlayer for CommandPlayer {
    async fn play(&self, clip: &AudioClip) -> Result<()> {
        if !is_verbatim(&clip.url) && !Path::new(&clip.url).exists() {
            return Err(PalaceError::Audio(format!("音声ファイルがありません: {}", clip.url)));
        }

        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(&clip.url)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| PalaceError::Audio(format!("{} の実行に失敗: {}", self.program, e)))?;

        if !status.success() {
            return Err(PalaceError::Audio(format!(
                "{} failed (code {:?}): {}",
                self.program,
                status.code(),
                clip.url
            )));
        }
        Ok(())
    }
}

/// 再生せずにログだけ出す（プレイヤー未設定時）
#[derive(Debug, Clone, Default)]
pub struct LogPlayer;

impl AudioPlayer for LogPlayer {
    async fn play(&self, clip: &AudioClip) -> Result<()> {
        tracing::info!("Playing {} (volume {:.2})", clip.url, clip.volume);
        Ok(())
    }
}

/// 設定に応じたプレイヤー
#[derive(Debug, Clone)]
pub enum ConfiguredPlayer {
    Command(CommandPlayer),
    Log(LogPlayer),
}

impl ConfiguredPlayer {
    pub fn from_config(command: Option<&[String]>) -> Self {
        match command.and_then(CommandPlayer::from_command) {
            Some(player) => ConfiguredPlayer::Command(player),
            None => ConfiguredPlayer::Log(LogPlayer),
        }
    }
}

impl AudioPlayer for ConfiguredPlayer {
    async fn play(&self, clip: &AudioClip) -> Result<()> {
        match self {
            ConfiguredPlayer::Command(player) => player.play(clip).await,
            ConfiguredPlayer::Log(player) => player.play(clip).await,
        }
    }
}

/// 1クリップの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOutcome {
    Finished,
    TimedOut,
    Failed,
}

/// キュー全体の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueReport {
    pub finished: usize,
    pub timed_out: usize,
    pub failed: usize,
}

impl QueueReport {
    pub fn total(&self) -> usize {
        self.finished + self.timed_out + self.failed
    }
}

/// 順次再生キュー
#[derive(Debug, Clone)]
pub struct AudioQueue {
    active: Arc<AtomicBool>,
    clip_timeout: Duration,
    show_progress: bool,
}

impl Default for AudioQueue {
    fn default() -> Self {
        Self::new(CLIP_TIMEOUT)
    }
}

/// 終了時にフラグを下ろす
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl AudioQueue {
    pub fn new(clip_timeout: Duration) -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
            clip_timeout,
            show_progress: false,
        }
    }

    /// 端末に進捗バーを表示する
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// 1クリップを時間制限付きで再生
    pub async fn play_clip<P: AudioPlayer>(&self, player: &P, clip: &AudioClip) -> ClipOutcome {
        match tokio::time::timeout(self.clip_timeout, player.play(clip)).await {
            Ok(Ok(())) => ClipOutcome::Finished,
            Ok(Err(e)) => {
                tracing::warn!("Audio playback failed for {}: {}", clip.anchor_id, e);
                ClipOutcome::Failed
            }
            Err(_) => {
                tracing::debug!("Clip {} exceeded {:?}, advancing", clip.anchor_id, self.clip_timeout);
                ClipOutcome::TimedOut
            }
        }
    }

    /// 順番に再生し、各クリップの後に `on_done` を呼ぶ
    ///
    /// 既に再生中なら `AudioQueueBusy`。
    pub async fn play_all<P, F>(&self, player: &P, clips: &[AudioClip], mut on_done: F) -> Result<QueueReport>
    where
        P: AudioPlayer,
        F: FnMut(&AudioClip, ClipOutcome),
    {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PalaceError::AudioQueueBusy);
        }
        let _guard = ActiveGuard(self.active.clone());

        let bar = if self.show_progress {
            let bar = ProgressBar::new(clips.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        let mut report = QueueReport::default();
        for clip in clips {
            bar.set_message(clip.url.clone());
            let outcome = self.play_clip(player, clip).await;
            match outcome {
                ClipOutcome::Finished => report.finished += 1,
                ClipOutcome::TimedOut => report.timed_out += 1,
                ClipOutcome::Failed => report.failed += 1,
            }
            on_done(clip, outcome);
            bar.inc(1);
        }
        bar.finish_and_clear();

        Ok(report)
    }
}

/// 1枚の音声を再生して「聞いた」を記録
///
/// 音声がなければ通知して false。
pub async fn play_anchor<P: AudioPlayer>(
    controller: &mut PalaceController,
    queue: &AudioQueue,
    player: &P,
    anchor_id: &str,
) -> Result<bool> {
    let Some(clip) = controller.audio_clip(anchor_id)? else {
        controller.notify(NoticeLevel::Info, "No audio clip available.");
        return Ok(false);
    };

    controller.mark_heard(anchor_id)?;
    let outcome = queue.play_clip(player, &clip).await;
    Ok(outcome != ClipOutcome::Failed)
}

/// 部屋の現在ページの音声を順に再生
///
/// 音声が1つもなければ通知して `None`。
pub async fn play_page<P: AudioPlayer>(
    controller: &mut PalaceController,
    queue: &AudioQueue,
    player: &P,
    room_id: &str,
) -> Result<Option<QueueReport>> {
    let clips = controller.page_clips(room_id)?;
    if clips.is_empty() {
        controller.notify(NoticeLevel::Info, "No audio available on this page.");
        return Ok(None);
    }

    let report = queue
        .play_all(player, &clips, |clip, _| {
            if let Err(e) = controller.mark_heard(&clip.anchor_id) {
                tracing::warn!("Failed to record heard for {}: {}", clip.anchor_id, e);
            }
        })
        .await?;
    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use palace_common::PalaceConfig;
    use std::cell::RefCell;

    /// 指定時間待ってから終わるプレイヤー
    struct SleepPlayer {
        delay: Duration,
        played: RefCell<Vec<String>>,
    }

    impl SleepPlayer {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                played: RefCell::new(Vec::new()),
            }
        }
    }

    impl AudioPlayer for SleepPlayer {
        async fn play(&self, clip: &AudioClip) -> Result<()> {
            self.played.borrow_mut().push(clip.anchor_id.clone());
            tokio::time::sleep(self.delay).await;
            Ok(())
        }
    }

    struct FailingPlayer;

    impl AudioPlayer for FailingPlayer {
        async fn play(&self, _clip: &AudioClip) -> Result<()> {
            Err(PalaceError::Audio("broken".into()))
        }
    }

    fn clip(id: &str) -> AudioClip {
        AudioClip {
            anchor_id: id.into(),
            url: format!("media/{}.mp3", id),
            volume: 1.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_clips_advance_after_timeout() {
        let queue = AudioQueue::default();
        let player = SleepPlayer::new(Duration::from_secs(30));
        let mut done = Vec::new();

        let report = queue
            .play_all(&player, &[clip("a"), clip("b")], |c, outcome| {
                done.push((c.anchor_id.clone(), outcome));
            })
            .await
            .unwrap();

        assert_eq!(report.timed_out, 2);
        assert_eq!(
            done,
            vec![
                ("a".to_string(), ClipOutcome::TimedOut),
                ("b".to_string(), ClipOutcome::TimedOut)
            ]
        );
        assert!(!queue.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_clips_finish_in_order() {
        let queue = AudioQueue::default();
        let player = SleepPlayer::new(Duration::from_millis(500));

        let report = queue
            .play_all(&player, &[clip("a"), clip("b"), clip("c")], |_, _| {})
            .await
            .unwrap();

        assert_eq!(report.finished, 3);
        assert_eq!(*player.played.borrow(), vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_queue_is_rejected() {
        let queue = AudioQueue::default();
        let player = SleepPlayer::new(Duration::from_secs(1));
        let clips = [clip("a")];

        let (first, second) = tokio::join!(
            queue.play_all(&player, &clips, |_, _| {}),
            async {
                tokio::task::yield_now().await;
                queue.play_all(&player, &clips, |_, _| {}).await
            }
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(PalaceError::AudioQueueBusy)));
        assert!(!queue.is_active());
    }

    #[tokio::test]
    async fn test_failed_clip_does_not_stop_queue() {
        let queue = AudioQueue::default();
        let report = queue
            .play_all(&FailingPlayer, &[clip("a"), clip("b")], |_, _| {})
            .await
            .unwrap();
        assert_eq!(report.failed, 2);
        assert_eq!(report.total(), 2);
    }

    #[tokio::test]
    async fn test_command_player_missing_file() {
        let player = CommandPlayer::from_command(&["true".to_string()]).unwrap();
        let result = player.play(&clip("absent")).await;
        assert!(matches!(result, Err(PalaceError::Audio(_))));
    }

    const DECK: &str = "кошка\tcat\t\t[sound:cat.mp3]\n\
                        собака\tdog\t\t[sound:dog.mp3]\n\
                        дом\thouse\t\t";

    fn loaded_controller(text: &str) -> PalaceController {
        let config = PalaceConfig::from_json(r#"{"roomOrder": ["hall"], "rooms": {"hall": {}}}"#).unwrap();
        let mut controller = PalaceController::new(config, Box::new(MemoryStore::new()));
        controller.load_dataset(text, Some("media"), "deck.tsv", None, Some(3)).unwrap();
        controller
    }

    fn anchor_id_of(controller: &PalaceController, target: &str) -> String {
        controller
            .dataset()
            .unwrap()
            .anchors
            .iter()
            .find(|a| a.target_text() == target)
            .unwrap()
            .id
            .clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_anchor_marks_heard() {
        let mut controller = loaded_controller(DECK);
        let queue = AudioQueue::default();
        let player = SleepPlayer::new(Duration::from_millis(200));
        let cat = anchor_id_of(&controller, "cat");

        assert!(!controller.progress().is_heard(&cat));
        assert!(play_anchor(&mut controller, &queue, &player, &cat).await.unwrap());
        assert!(controller.progress().is_heard(&cat));
        assert_eq!(*player.played.borrow(), vec![cat]);
        assert!(controller.take_notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_anchor_without_clip_notifies() {
        let mut controller = loaded_controller(DECK);
        let queue = AudioQueue::default();
        let player = SleepPlayer::new(Duration::from_millis(200));
        let house = anchor_id_of(&controller, "house");

        assert!(!play_anchor(&mut controller, &queue, &player, &house).await.unwrap());
        assert!(!controller.progress().is_heard(&house));
        assert!(player.played.borrow().is_empty());

        let notices = controller.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, "No audio clip available.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_anchor_unknown_id() {
        let mut controller = loaded_controller(DECK);
        let queue = AudioQueue::default();
        let result = play_anchor(&mut controller, &queue, &LogPlayer, "anchor-nope").await;
        assert!(matches!(result, Err(PalaceError::UnknownAnchor(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_page_marks_each_clip_heard() {
        let mut controller = loaded_controller(DECK);
        let queue = AudioQueue::default();
        // 1本はタイムアウトするが、それでも「聞いた」になる
        let player = SleepPlayer::new(Duration::from_secs(10));

        let report = play_page(&mut controller, &queue, &player, "hall")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.timed_out, 2);
        let cat = anchor_id_of(&controller, "cat");
        let dog = anchor_id_of(&controller, "dog");
        let house = anchor_id_of(&controller, "house");
        assert!(controller.progress().is_heard(&cat));
        assert!(controller.progress().is_heard(&dog));
        assert!(!controller.progress().is_heard(&house));
        assert_eq!(controller.progress_summary().1, "Heard: 2 / 3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_page_without_audio_notifies() {
        let mut controller = loaded_controller("дом\thouse\t\t\nокно\twindow\t\t");
        let queue = AudioQueue::default();

        let report = play_page(&mut controller, &queue, &LogPlayer, "hall").await.unwrap();
        assert!(report.is_none());

        let notices = controller.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, "No audio available on this page.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_page_rejected_while_queue_busy() {
        let mut controller = loaded_controller(DECK);
        let queue = AudioQueue::default();
        let player = SleepPlayer::new(Duration::from_secs(1));
        let clips = [clip("other")];

        let (first, second) = tokio::join!(
            queue.play_all(&player, &clips, |_, _| {}),
            async {
                tokio::task::yield_now().await;
                play_page(&mut controller, &queue, &player, "hall").await
            }
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(PalaceError::AudioQueueBusy)));
        assert!(!controller.progress().is_heard(&anchor_id_of(&controller, "cat")));
        assert!(!queue.is_active());
    }

    #[test]
    fn test_configured_player_selection() {
        assert!(matches!(ConfiguredPlayer::from_config(None), ConfiguredPlayer::Log(_)));
        let empty: Vec<String> = Vec::new();
        assert!(matches!(
            ConfiguredPlayer::from_config(Some(empty.as_slice())),
            ConfiguredPlayer::Log(_)
        ));
        let command = vec!["ffplay".to_string(), "-nodisp".to_string()];
        assert!(matches!(
            ConfiguredPlayer::from_config(Some(command.as_slice())),
            ConfiguredPlayer::Command(_)
        ));
    }
}
