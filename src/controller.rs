//! アプリケーション状態
//!
//! データセット・レイアウト・進捗・保存済みレイアウトを1か所で保持する。
//! 各段階は palace_common の純粋関数で計算し、ここで反映だけを行う。
//! 利用者の入力ミスはエラーとして返し、状態は変更しない。

use crate::audio::AudioClip;
use crate::error::{PalaceError, Result};
use crate::progress::{Progress, Reconciliation};
use crate::saved::{SavedLayout, SavedLayouts};
use crate::scene::{project_page, teleport_target, AssetRegistry, PageProjection, ViewState};
use crate::session::Session;
use crate::storage::KeyValueStore;
use palace_common::assets::{build_asset_url, DEFAULT_ASSET_ROOT};
use palace_common::config::{ConfigIssue, Vec3};
use palace_common::layout::time_seed;
use palace_common::{build_layout, Anchor, Dataset, PalaceConfig, RoomLayout};
use std::collections::HashMap;
use std::path::Path;

/// アンカーIDからの逆引き
#[derive(Debug, Clone)]
pub struct AnchorEntry {
    pub anchor: Anchor,
    pub room_id: String,
    pub page: usize,
}

/// 通知の重要度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// 利用者向けの一時的な通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// 読み込み結果
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub label: String,
    pub signature: String,
    pub anchors: usize,
    pub skipped: usize,
    pub rooms: usize,
    pub seed: u64,
    pub reconciliation: Reconciliation,
}

/// 読み込み中のデータセットと表示状態
#[derive(Debug)]
struct LoadedPalace {
    dataset: Dataset,
    raw_text: String,
    label: String,
    saved_id: Option<String>,
    layout: RoomLayout,
    current_pages: HashMap<String, usize>,
    active_room: Option<String>,
    reveal_target: bool,
    query: String,
    index: HashMap<String, AnchorEntry>,
}

impl LoadedPalace {
    fn session(&self) -> Session {
        Session {
            raw_text: self.raw_text.clone(),
            asset_root: self.dataset.asset_root.clone(),
            label: self.label.clone(),
            saved_id: self.saved_id.clone(),
            seed: self.layout.seed,
            active_room: self.active_room.clone(),
            active_page: self
                .active_room
                .as_ref()
                .and_then(|room| self.current_pages.get(room).copied())
                .unwrap_or(0),
            reveal_target: self.reveal_target,
        }
    }

    fn current_page(&self, room_id: &str) -> usize {
        self.current_pages.get(room_id).copied().unwrap_or(0)
    }
}

/// 索引を構築（部屋・ページ単位）
fn build_index(layout: &RoomLayout) -> HashMap<String, AnchorEntry> {
    let mut index = HashMap::new();
    for room_id in layout.pages.room_ids() {
        for (page, anchors) in layout.pages.pages(room_id).iter().enumerate() {
            for anchor in anchors {
                index.insert(
                    anchor.id.clone(),
                    AnchorEntry {
                        anchor: anchor.clone(),
                        room_id: room_id.clone(),
                        page,
                    },
                );
            }
        }
    }
    index
}

/// 記憶の宮殿コントローラ
pub struct PalaceController {
    config: PalaceConfig,
    store: Box<dyn KeyValueStore>,
    progress: Progress,
    saved: SavedLayouts,
    loaded: Option<LoadedPalace>,
    registry: AssetRegistry,
    notices: Vec<Notice>,
}

impl PalaceController {
    /// 設定と保存領域から初期化（進捗・保存済みレイアウトを読み込む）
    pub fn new(config: PalaceConfig, store: Box<dyn KeyValueStore>) -> Self {
        let progress = Progress::load(store.as_ref());
        let saved = SavedLayouts::load(store.as_ref());
        Self {
            config,
            store,
            progress,
            saved,
            loaded: None,
            registry: AssetRegistry::new(),
            notices: Vec::new(),
        }
    }

    // ============================================
    // 通知
    // ============================================

    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    /// 溜まった通知を取り出す
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// 操作を実行し、失敗をログと通知に変換する
    pub fn run<T>(&mut self, action: &str, f: impl FnOnce(&mut Self) -> Result<T>) -> Option<T> {
        let result = f(self);
        self.settle(action, result)
    }

    /// 実行済みの結果を受け取り、失敗ならログと通知に変換する
    ///
    /// 非同期の操作（音声再生など）は `run` に渡せないのでこちらを使う。
    pub fn settle<T>(&mut self, action: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                if e.is_user_input() {
                    tracing::warn!("{}: {}", action, e);
                    self.notify(NoticeLevel::Warning, e.to_string());
                } else {
                    tracing::error!("{}: {}", action, e);
                    self.notify(NoticeLevel::Error, e.to_string());
                }
                None
            }
        }
    }

    // ============================================
    // 読み込み
    // ============================================

    /// 保存されたセッションを復元（なければ false）
    pub fn restore_session(&mut self) -> Result<bool> {
        let Some(session) = Session::load(self.store.as_ref()) else {
            return Ok(false);
        };

        // 読み込み時に報告済みなので、スキップ行の警告は繰り返さない
        self.install_dataset(
            &session.raw_text,
            Some(&session.asset_root),
            &session.label,
            session.saved_id.clone(),
            Some(session.seed),
            false,
        )?;

        if let Some(loaded) = self.loaded.as_mut() {
            if let Some(room) = session
                .active_room
                .filter(|room| loaded.layout.pages.room_ids().contains(room))
            {
                let pages = loaded.layout.pages.page_count(&room);
                loaded
                    .current_pages
                    .insert(room.clone(), session.active_page.min(pages - 1));
                loaded.active_room = Some(room);
            }
            loaded.reveal_target = session.reveal_target;
        }
        self.persist_session();
        Ok(true)
    }

    /// TSVファイルを読み込む
    pub fn load_file(&mut self, path: &Path, asset_root: Option<&str>, seed: Option<u64>) -> Result<LoadReport> {
        if !path.exists() {
            return Err(PalaceError::FileNotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        self.load_dataset(&text, asset_root, &label, None, seed)
    }

    /// データセットを読み込み、レイアウトを作り直す
    ///
    /// 有効な行がなければ何も変更せずにエラー。
    /// アセットルートは 引数 → 設定の assetRoot → `./` の順。
    pub fn load_dataset(
        &mut self,
        text: &str,
        asset_root: Option<&str>,
        label: &str,
        saved_id: Option<String>,
        seed: Option<u64>,
    ) -> Result<LoadReport> {
        self.install_dataset(text, asset_root, label, saved_id, seed, true)
    }

    /// `announce` が false ならスキップ行はデバッグログのみ
    fn install_dataset(
        &mut self,
        text: &str,
        asset_root: Option<&str>,
        label: &str,
        saved_id: Option<String>,
        seed: Option<u64>,
        announce: bool,
    ) -> Result<LoadReport> {
        let asset_root = asset_root
            .or(self.config.asset_root.as_deref())
            .unwrap_or(DEFAULT_ASSET_ROOT);
        let dataset = Dataset::from_tsv(text, asset_root);
        if dataset.is_empty() {
            return Err(PalaceError::EmptyDataset(label.to_string()));
        }

        if self.config.issues().contains(&ConfigIssue::MissingRoomOrder) {
            tracing::error!("{}", ConfigIssue::MissingRoomOrder);
        }

        let reconciliation = self.progress.reconcile(&dataset.signature, self.store.as_mut());
        let seed = seed.unwrap_or_else(time_seed);
        let config = &self.config;
        let layout = build_layout(&dataset.anchors, config.room_order(), seed, |room| {
            config.room_capacity(room)
        });

        let report = LoadReport {
            label: label.to_string(),
            signature: dataset.signature.clone(),
            anchors: dataset.len(),
            skipped: dataset.warnings.len(),
            rooms: layout.pages.room_ids().len(),
            seed,
            reconciliation,
        };

        tracing::debug!(
            "Loaded {} anchors (signature {}, seed {})",
            report.anchors,
            report.signature,
            seed
        );

        let index = build_index(&layout);
        let current_pages = layout
            .pages
            .room_ids()
            .iter()
            .map(|room| (room.clone(), 0))
            .collect();
        let active_room = layout.pages.room_ids().first().cloned();

        self.registry.clear();
        self.loaded = Some(LoadedPalace {
            dataset,
            raw_text: text.to_string(),
            label: label.to_string(),
            saved_id,
            layout,
            current_pages,
            active_room,
            reveal_target: false,
            query: String::new(),
            index,
        });
        self.persist_session();

        if report.skipped > 0 {
            if announce {
                if let Some(loaded) = &self.loaded {
                    for warning in &loaded.dataset.warnings {
                        tracing::warn!("{}", warning);
                    }
                }
                self.notify(
                    NoticeLevel::Warning,
                    format!("{}行をスキップしました", report.skipped),
                );
            } else {
                tracing::debug!("{} rows skipped in {}", report.skipped, label);
            }
        }

        Ok(report)
    }

    /// 新しいシードで並べ直す（各部屋のページは先頭に戻る）
    pub fn reshuffle(&mut self, seed: Option<u64>) -> Result<LoadReport> {
        let loaded = self.loaded.as_ref().ok_or(PalaceError::NoDataset)?;
        let text = loaded.raw_text.clone();
        let asset_root = loaded.dataset.asset_root.clone();
        let label = loaded.label.clone();
        let saved_id = loaded.saved_id.clone();
        self.install_dataset(&text, Some(&asset_root), &label, saved_id, seed, false)
    }

    /// 現在のセッション（未読み込みなら None）
    pub fn session_snapshot(&self) -> Option<Session> {
        self.loaded.as_ref().map(LoadedPalace::session)
    }

    fn persist_session(&mut self) {
        if let Some(loaded) = &self.loaded {
            loaded.session().persist(self.store.as_mut());
        }
    }

    fn loaded(&self) -> Result<&LoadedPalace> {
        self.loaded.as_ref().ok_or(PalaceError::NoDataset)
    }

    fn loaded_mut(&mut self) -> Result<&mut LoadedPalace> {
        self.loaded.as_mut().ok_or(PalaceError::NoDataset)
    }

    // ============================================
    // 参照
    // ============================================

    pub fn config(&self) -> &PalaceConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.loaded.as_ref().map(|l| &l.dataset)
    }

    pub fn layout(&self) -> Option<&RoomLayout> {
        self.loaded.as_ref().map(|l| &l.layout)
    }

    pub fn label(&self) -> Option<&str> {
        self.loaded.as_ref().map(|l| l.label.as_str())
    }

    pub fn active_saved_id(&self) -> Option<&str> {
        self.loaded.as_ref().and_then(|l| l.saved_id.as_deref())
    }

    pub fn reveal_target(&self) -> bool {
        self.loaded.as_ref().map(|l| l.reveal_target).unwrap_or(false)
    }

    /// アンカーIDから所在を引く
    pub fn entry(&self, anchor_id: &str) -> Result<&AnchorEntry> {
        self.loaded()?
            .index
            .get(anchor_id)
            .ok_or_else(|| PalaceError::UnknownAnchor(anchor_id.to_string()))
    }

    /// 部屋ごとの枚数（roomOrder順）
    pub fn room_counts(&self) -> Vec<(String, usize)> {
        match &self.loaded {
            Some(loaded) => loaded
                .layout
                .assignment
                .iter()
                .map(|(room, anchors)| (room.to_string(), anchors.len()))
                .collect(),
            None => Vec::new(),
        }
    }

    // ============================================
    // 部屋・ページ移動
    // ============================================

    pub fn active_room(&self) -> Option<&str> {
        self.loaded.as_ref().and_then(|l| l.active_room.as_deref())
    }

    fn require_room(&self, room_id: &str) -> Result<()> {
        if self.loaded()?.layout.pages.room_ids().iter().any(|r| r == room_id) {
            Ok(())
        } else {
            Err(PalaceError::UnknownRoom(room_id.to_string()))
        }
    }

    /// 部屋を切り替える
    pub fn set_active_room(&mut self, room_id: &str) -> Result<()> {
        self.require_room(room_id)?;
        self.loaded_mut()?.active_room = Some(room_id.to_string());
        self.persist_session();
        Ok(())
    }

    /// 現在のページ番号（0始まり）
    pub fn current_page(&self, room_id: &str) -> Result<usize> {
        self.require_room(room_id)?;
        Ok(self.loaded()?.current_page(room_id))
    }

    pub fn page_count(&self, room_id: &str) -> Result<usize> {
        self.require_room(room_id)?;
        Ok(self.loaded()?.layout.pages.page_count(room_id))
    }

    /// ページを相対移動（範囲内に丸める）
    pub fn change_page(&mut self, room_id: &str, delta: i64) -> Result<usize> {
        let current = self.current_page(room_id)? as i64;
        self.set_page(room_id, (current + delta).max(0) as usize)
    }

    /// ページを指定（範囲内に丸める）
    pub fn set_page(&mut self, room_id: &str, page: usize) -> Result<usize> {
        let last = self.page_count(room_id)? - 1;
        let page = page.min(last);
        self.loaded_mut()?.current_pages.insert(room_id.to_string(), page);
        self.persist_session();
        Ok(page)
    }

    /// ページ表示（2ページ以上のときのみ）
    pub fn page_label(&self, room_id: &str) -> Result<Option<String>> {
        let count = self.page_count(room_id)?;
        let page = self.current_page(room_id)?;
        Ok((count > 1).then(|| format!("Page {} / {}", page + 1, count)))
    }

    /// テレポート先
    pub fn teleport_target(&self, room_id: &str) -> Result<Vec3> {
        self.config
            .room(room_id)
            .map(teleport_target)
            .ok_or_else(|| PalaceError::UnknownRoom(room_id.to_string()))
    }

    // ============================================
    // 表示状態
    // ============================================

    /// 訳語表示を切り替える
    pub fn toggle_reveal(&mut self) -> Result<bool> {
        let loaded = self.loaded_mut()?;
        loaded.reveal_target = !loaded.reveal_target;
        let reveal = loaded.reveal_target;
        self.persist_session();
        Ok(reveal)
    }

    pub fn set_reveal(&mut self, reveal: bool) -> Result<()> {
        self.loaded_mut()?.reveal_target = reveal;
        self.persist_session();
        Ok(())
    }

    /// 表示中のページ全体を検索し、一致数を返す
    ///
    /// 空の検索語はハイライトを解除する。
    pub fn search(&mut self, query: &str) -> Result<usize> {
        let loaded = self.loaded_mut()?;
        loaded.query = query.to_string();
        let loaded = &*loaded;
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(0);
        }

        let count = loaded
            .layout
            .pages
            .room_ids()
            .iter()
            .flat_map(|room| loaded.layout.pages.page(room, loaded.current_page(room)))
            .filter(|anchor| anchor.record.search_text().contains(&needle))
            .count();
        Ok(count)
    }

    /// 部屋の現在ページを投影する
    pub fn project(&mut self, room_id: &str) -> Result<PageProjection> {
        self.project_with(room_id, None)
    }

    /// 訳語表示を一時的に上書きして投影する
    pub fn project_with(&mut self, room_id: &str, reveal: Option<bool>) -> Result<PageProjection> {
        self.require_room(room_id)?;
        if self.config.room(room_id).is_none() {
            return Err(PalaceError::Config(
                ConfigIssue::MissingRoom(room_id.to_string()).to_string(),
            ));
        }

        let loaded = self.loaded.as_ref().ok_or(PalaceError::NoDataset)?;
        let page = loaded.current_page(room_id);
        let view = ViewState {
            reveal_target: reveal.unwrap_or(loaded.reveal_target),
            query: loaded.query.clone(),
        };
        Ok(project_page(
            &self.config,
            room_id,
            page,
            loaded.layout.pages.page_count(room_id),
            loaded.layout.pages.page(room_id, page),
            &view,
            &mut self.registry,
        ))
    }

    // ============================================
    // 進捗
    // ============================================

    /// 「見た」を記録（新規なら true）
    pub fn mark_seen(&mut self, anchor_id: &str) -> Result<bool> {
        self.entry(anchor_id)?;
        Ok(self.progress.mark_seen(anchor_id, self.store.as_mut()))
    }

    /// 「聞いた」を記録（新規なら true）
    pub fn mark_heard(&mut self, anchor_id: &str) -> Result<bool> {
        self.entry(anchor_id)?;
        Ok(self.progress.mark_heard(anchor_id, self.store.as_mut()))
    }

    /// `Seen: n / total` と `Heard: n / total`
    pub fn progress_summary(&self) -> (String, String) {
        let total = self.dataset().map(|d| d.len()).unwrap_or(0);
        self.progress.summary(total)
    }

    // ============================================
    // 音声
    // ============================================

    /// アンカーの音声（なければ None）
    pub fn audio_clip(&self, anchor_id: &str) -> Result<Option<AudioClip>> {
        let entry = self.entry(anchor_id)?;
        Ok(self.clip_for(&entry.anchor))
    }

    /// 部屋の現在ページにある音声（表示順）
    pub fn page_clips(&self, room_id: &str) -> Result<Vec<AudioClip>> {
        self.require_room(room_id)?;
        let loaded = self.loaded()?;
        Ok(loaded
            .layout
            .pages
            .page(room_id, loaded.current_page(room_id))
            .iter()
            .filter_map(|anchor| self.clip_for(anchor))
            .collect())
    }

    fn clip_for(&self, anchor: &Anchor) -> Option<AudioClip> {
        build_asset_url(anchor.record.audio_ref.as_deref(), &anchor.asset_root).map(|url| AudioClip {
            anchor_id: anchor.id.clone(),
            url,
            volume: self.config.audio.volume(),
        })
    }

    // ============================================
    // 保存済みレイアウト
    // ============================================

    pub fn saved_layouts(&self) -> &[SavedLayout] {
        self.saved.entries()
    }

    /// 既定の保存名（表示名から拡張子を除いたもの）
    pub fn default_save_name(&self) -> Option<String> {
        let label = self.label()?;
        let name = match label.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => stem,
            _ => label,
        };
        Some(name.to_string())
    }

    /// 現在のデータセットを名前付きで保存
    pub fn save_current(&mut self, name: &str) -> Result<SavedLayout> {
        let loaded = self.loaded.as_ref().ok_or(PalaceError::NoDataset)?;
        let saved_at = chrono::Utc::now().timestamp_millis();
        let entry = self.saved.save(
            name,
            &loaded.raw_text,
            &loaded.dataset.asset_root,
            &loaded.dataset.signature,
            saved_at,
            self.store.as_mut(),
        )?;

        if let Some(loaded) = self.loaded.as_mut() {
            loaded.saved_id = Some(entry.id.clone());
            loaded.label = entry.name.clone();
        }
        self.persist_session();
        Ok(entry)
    }

    /// 保存済みレイアウトを開く（ID優先、なければ名前）
    pub fn open_saved(&mut self, id_or_name: &str, seed: Option<u64>) -> Result<LoadReport> {
        let entry = self
            .saved
            .find(id_or_name)
            .cloned()
            .ok_or_else(|| PalaceError::SavedLayoutNotFound(id_or_name.to_string()))?;
        self.load_dataset(
            &entry.raw_text,
            Some(&entry.asset_root),
            &entry.name,
            Some(entry.id.clone()),
            seed,
        )
    }

    /// 保存済みレイアウトを削除（確認なし）
    pub fn delete_saved(&mut self, id: &str) -> Result<()> {
        if !self.saved.delete(id, self.store.as_mut()) {
            return Err(PalaceError::SavedLayoutNotFound(id.to_string()));
        }
        let was_active = self
            .loaded
            .as_ref()
            .map(|l| l.saved_id.as_deref() == Some(id))
            .unwrap_or(false);
        if was_active {
            if let Some(loaded) = self.loaded.as_mut() {
                loaded.saved_id = None;
            }
            self.persist_session();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    const TSV: &str = "кошка\tcat\t<img src=\"cat.jpg\">\t[sound:cat.mp3]\n\
                       собака\tdog\t\t[sound:dog.mp3]\n\
                       дом\thouse\t\t\n\
                       окно\twindow\t\t\n\
                       стол\ttable\t\t";

    fn config() -> PalaceConfig {
        PalaceConfig::from_json(
            r#"{
                "roomOrder": ["kitchen", "park"],
                "rooms": {
                    "kitchen": { "position": { "x": 0, "y": 0, "z": 0 },
                                 "spawnOffset": { "x": 1, "y": 0, "z": 2 } },
                    "park": { "theme": "exterior" }
                },
                "roomCap": { "default": 2 }
            }"#,
        )
        .unwrap()
    }

    fn controller() -> PalaceController {
        PalaceController::new(config(), Box::new(MemoryStore::new()))
    }

    fn loaded() -> PalaceController {
        let mut c = controller();
        c.load_dataset(TSV, Some("media"), "words.tsv", None, Some(7)).unwrap();
        c
    }

    #[test]
    fn test_load_builds_layout_and_index() {
        let c = loaded();
        let dataset = c.dataset().unwrap();
        assert_eq!(dataset.len(), 5);
        assert_eq!(dataset.asset_root, "media/");

        let counts = c.room_counts();
        assert_eq!(counts, vec![("kitchen".to_string(), 3), ("park".to_string(), 2)]);
        assert_eq!(c.page_count("kitchen").unwrap(), 2);
        assert_eq!(c.active_room(), Some("kitchen"));

        for anchor in &dataset.anchors {
            let entry = c.entry(&anchor.id).unwrap();
            assert_eq!(entry.anchor.id, anchor.id);
        }
    }

    #[test]
    fn test_empty_dataset_leaves_state() {
        let mut c = loaded();
        let signature = c.dataset().unwrap().signature.clone();

        let result = c.load_dataset("\n  \nonly-one-column\n", None, "empty.tsv", None, None);
        assert!(matches!(result, Err(PalaceError::EmptyDataset(_))));
        assert_eq!(c.dataset().unwrap().signature, signature);
        assert_eq!(c.label(), Some("words.tsv"));
    }

    #[test]
    fn test_same_seed_same_layout() {
        let a = loaded();
        let b = loaded();
        let ids = |c: &PalaceController| {
            c.layout()
                .unwrap()
                .assignment
                .anchors("kitchen")
                .iter()
                .map(|a| a.id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn test_change_page_clamps() {
        let mut c = loaded();
        assert_eq!(c.change_page("kitchen", 1).unwrap(), 1);
        assert_eq!(c.change_page("kitchen", 5).unwrap(), 1);
        assert_eq!(c.change_page("kitchen", -9).unwrap(), 0);
        assert_eq!(c.page_label("kitchen").unwrap().as_deref(), Some("Page 1 / 2"));
        assert_eq!(c.page_label("park").unwrap(), None);
    }

    #[test]
    fn test_unknown_room() {
        let mut c = loaded();
        assert!(matches!(c.set_active_room("attic"), Err(PalaceError::UnknownRoom(_))));
        assert!(matches!(c.change_page("attic", 1), Err(PalaceError::UnknownRoom(_))));
        assert_eq!(c.active_room(), Some("kitchen"));
    }

    #[test]
    fn test_reshuffle_resets_pages() {
        let mut c = loaded();
        c.set_page("kitchen", 1).unwrap();
        let report = c.reshuffle(Some(99)).unwrap();
        assert_eq!(report.seed, 99);
        assert_eq!(c.current_page("kitchen").unwrap(), 0);
        assert_eq!(report.reconciliation, Reconciliation::Kept);
    }

    #[test]
    fn test_seen_and_heard() {
        let mut c = loaded();
        let id = c.dataset().unwrap().anchors[0].id.clone();

        assert!(c.mark_seen(&id).unwrap());
        assert!(!c.mark_seen(&id).unwrap());
        assert!(c.mark_heard(&id).unwrap());
        assert!(matches!(c.mark_seen("anchor-nope"), Err(PalaceError::UnknownAnchor(_))));

        let (seen, heard) = c.progress_summary();
        assert_eq!(seen, "Seen: 1 / 5");
        assert_eq!(heard, "Heard: 1 / 5");
    }

    /// 表示中ページの訳語一覧
    fn visible_targets(c: &PalaceController) -> Vec<String> {
        ["kitchen", "park"]
            .iter()
            .flat_map(|room| {
                let page = c.current_page(room).unwrap();
                c.layout().unwrap().pages.page(room, page).to_vec()
            })
            .map(|anchor| anchor.target_text().to_string())
            .collect()
    }

    #[test]
    fn test_search_counts_current_pages() {
        let mut c = loaded();
        let visible = visible_targets(&c);
        // kitchen 1ページ目に2枚、park に2枚
        assert_eq!(visible.len(), 4);

        assert_eq!(c.search("").unwrap(), 0);
        assert_eq!(c.search("zzz").unwrap(), 0);

        // ラテン文字の "o" を含むのは dog / house / window だけ
        let with_o = ["dog", "house", "window"];
        let expected = visible.iter().filter(|t| with_o.contains(&t.as_str())).count();
        assert_eq!(c.search("O").unwrap(), expected);

        // ページを進めると対象が入れ替わる
        c.change_page("kitchen", 1).unwrap();
        let visible = visible_targets(&c);
        assert_eq!(visible.len(), 3);
        let expected = visible.iter().filter(|t| with_o.contains(&t.as_str())).count();
        assert_eq!(c.search("o").unwrap(), expected);

        let cat_visible = visible.iter().any(|t| t == "cat") as usize;
        assert_eq!(c.search("  CAT ").unwrap(), cat_visible);
    }

    #[test]
    fn test_audio_clips() {
        let c = loaded();
        let dataset = c.dataset().unwrap();
        let cat = dataset.anchors.iter().find(|a| a.target_text() == "cat").unwrap();
        let house = dataset.anchors.iter().find(|a| a.target_text() == "house").unwrap();

        let clip = c.audio_clip(&cat.id).unwrap().unwrap();
        assert_eq!(clip.url, "media/cat.mp3");
        assert!(c.audio_clip(&house.id).unwrap().is_none());
    }

    #[test]
    fn test_save_requires_dataset() {
        let mut c = controller();
        assert!(matches!(c.save_current("deck"), Err(PalaceError::NoDataset)));
        assert!(c.saved_layouts().is_empty());
    }

    #[test]
    fn test_save_open_delete() {
        let mut c = loaded();
        assert_eq!(c.default_save_name().as_deref(), Some("words"));

        let entry = c.save_current("words").unwrap();
        assert_eq!(c.active_saved_id(), Some(entry.id.as_str()));
        assert!(matches!(c.save_current("w"), Err(PalaceError::InvalidSaveName(_))));
        assert_eq!(c.saved_layouts().len(), 1);

        let report = c.open_saved("words", Some(1)).unwrap();
        assert_eq!(report.anchors, 5);
        assert_eq!(c.active_saved_id(), Some(entry.id.as_str()));

        c.delete_saved(&entry.id).unwrap();
        assert!(c.active_saved_id().is_none());
        assert!(matches!(c.delete_saved(&entry.id), Err(PalaceError::SavedLayoutNotFound(_))));
    }

    #[test]
    fn test_teleport_target() {
        let c = loaded();
        let target = c.teleport_target("kitchen").unwrap();
        assert_eq!(target, Vec3::new(1.0, 1.6, 2.0));
    }

    #[test]
    fn test_run_turns_errors_into_notices() {
        let mut c = controller();
        let result = c.run("save", |c| c.save_current("deck"));
        assert!(result.is_none());

        let notices = c.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
        assert!(c.take_notices().is_empty());
    }

    #[test]
    fn test_settle_reports_display_message() {
        let mut c = loaded();
        let result = c.save_current("x");
        assert!(c.settle("save", result).is_none());

        let notices = c.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, "保存名は2文字以上にしてください: \"x\"");
        assert!(c.saved_layouts().is_empty());

        let result = c.mark_seen("anchor-nope");
        assert!(c.settle("seen", result).is_none());
        assert_eq!(c.take_notices()[0].message, "不明なカード: anchor-nope");

        assert_eq!(c.settle("noop", Ok(3)), Some(3));
        assert!(c.take_notices().is_empty());
    }

    #[test]
    fn test_skipped_rows_are_announced_once() {
        let text = format!("{}\nbroken\trow", TSV);
        let mut store = MemoryStore::new();
        {
            let mut c = PalaceController::new(config(), Box::new(MemoryStore::new()));
            let report = c.load_dataset(&text, None, "words.tsv", None, Some(5)).unwrap();
            assert_eq!(report.skipped, 1);
            let notices = c.take_notices();
            assert_eq!(notices.len(), 1);
            assert_eq!(notices[0].message, "1行をスキップしました");

            c.reshuffle(Some(6)).unwrap();
            assert!(c.take_notices().is_empty());
            c.session_snapshot().unwrap().persist(&mut store);
        }

        let mut restored = PalaceController::new(config(), Box::new(store));
        assert!(restored.restore_session().unwrap());
        assert_eq!(restored.dataset().unwrap().warnings.len(), 1);
        assert!(restored.take_notices().is_empty());
    }

    #[test]
    fn test_missing_room_config_is_not_rendered() {
        let config = PalaceConfig::from_json(
            r#"{ "roomOrder": ["hall", "ghost"], "rooms": { "hall": {} } }"#,
        )
        .unwrap();
        let mut c = PalaceController::new(config, Box::new(MemoryStore::new()));
        c.load_dataset(TSV, None, "words.tsv", None, Some(3)).unwrap();

        // 割り当ては受ける
        assert_eq!(c.room_counts()[1].0, "ghost");
        assert!(c.project("hall").is_ok());
        assert!(matches!(c.project("ghost"), Err(PalaceError::Config(_))));
    }

    #[test]
    fn test_session_restores_layout() {
        let mut store = MemoryStore::new();
        {
            let mut c = PalaceController::new(config(), Box::new(MemoryStore::new()));
            c.load_dataset(TSV, Some("media"), "words.tsv", None, Some(11)).unwrap();
            c.set_active_room("park").unwrap();
            c.session_snapshot().unwrap().persist(&mut store);
        }

        let mut restored = PalaceController::new(config(), Box::new(store));
        assert!(restored.restore_session().unwrap());
        assert_eq!(restored.active_room(), Some("park"));
        assert_eq!(restored.layout().unwrap().seed, 11);
    }
}
