//! シーン投影モジュール
//!
//! レイアウト結果（部屋・ページ・アンカー）を3Dシーンへの配置命令に変換する。
//! 描画エンジンは `SceneSink` の向こう側にあり、ここは状態を持たない。
//! アセットが解決できない場合は画像をプレースホルダ、音声をミュート表示にする。

use palace_common::assets::{asset_id, build_asset_url, is_verbatim, AssetKind};
use palace_common::config::{PalaceConfig, RoomConfig, Vec3};
use palace_common::placement::{
    slot_for, Slot, Wall, EYE_HEIGHT, IMAGE_DEPTH_OFFSET, IMAGE_HEIGHT, IMAGE_WIDTH, PANEL_HEIGHT,
    PANEL_WIDTH,
};
use palace_common::Anchor;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

// ============================================
// 色・表示定数
// ============================================

pub const PLACEHOLDER_IMAGE_SRC: &str = "#placeholder-image";
pub const ANCHOR_PANEL_COLOR: &str = "#f8fafc";
pub const HIGHLIGHT_PANEL_COLOR: &str = "#fff4d6";
pub const MUTE_LABEL: &str = "[mute]";

const DEFAULT_SOURCE_COLOR: &str = "#111";
const DEFAULT_TARGET_COLOR: &str = "#444";
const DEFAULT_WRAP_CHARS: u32 = 40;

// ============================================
// シーンへの配置命令
// ============================================

/// 配置するオブジェクトの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectKind {
    Floor,
    Ceiling,
    Wall,
    Boundary,
    TeleportPad,
    Panel,
    Image,
    SourceText,
    TargetText,
    Hitbox,
    Sound,
    MuteIndicator,
}

/// 材質
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Material {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    pub opacity: f32,
}

/// 寸法
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

/// 配置命令（位置・寸法・材質）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneObject {
    pub id: String,
    pub kind: ObjectKind,
    pub position: Vec3,
    pub rotation: Vec3,
    pub size: Size,
    pub material: Material,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub visible: bool,
}

impl SceneObject {
    fn new(id: String, kind: ObjectKind, position: Vec3) -> Self {
        Self {
            id,
            kind,
            position,
            rotation: Vec3::default(),
            size: Size::default(),
            material: Material {
                opacity: 1.0,
                ..Default::default()
            },
            text: None,
            visible: true,
        }
    }

    fn sized(mut self, width: f32, height: f32, depth: f32) -> Self {
        self.size = Size { width, height, depth };
        self
    }

    fn rotated(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = Vec3::new(x, y, z);
        self
    }

    fn colored(mut self, color: &str, opacity: f32) -> Self {
        self.material.color = Some(color.to_string());
        self.material.opacity = opacity;
        self
    }
}

/// 描画エンジン側の受け口
pub trait SceneSink {
    fn place(&mut self, object: SceneObject);
}

/// 配置命令を記録するだけのシンク
#[derive(Debug, Clone, Default)]
pub struct SceneRecorder {
    pub objects: Vec<SceneObject>,
}

impl SceneSink for SceneRecorder {
    fn place(&mut self, object: SceneObject) {
        self.objects.push(object);
    }
}

// ============================================
// アセット登録
// ============================================

/// 解決済みアセットの登録表（URL → アセットID）
///
/// ローカルパスは存在確認を行い、なければ登録しない。
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    entries: HashMap<String, Option<String>>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// URLを登録してアセットIDを返す（失敗時 None）
    pub fn ensure(&mut self, url: &str, kind: AssetKind) -> Option<String> {
        if let Some(existing) = self.entries.get(url) {
            return existing.clone();
        }
        let resolved = if is_verbatim(url) || Path::new(url).exists() {
            Some(format!("#{}", asset_id(url)))
        } else {
            tracing::warn!("Failed to load {} asset: {}", kind, url);
            None
        };
        self.entries.insert(url.to_string(), resolved.clone());
        resolved
    }

    /// 全消去（データセット再読み込み時）
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// アセットの使われ方
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum AssetUse {
    /// 解決済み
    Resolved { url: String, asset_id: String },
    /// 参照なし、または読み込み失敗
    Missing,
}

impl AssetUse {
    fn resolve(reference: Option<&str>, asset_root: &str, kind: AssetKind, registry: &mut AssetRegistry) -> Self {
        let Some(url) = build_asset_url(reference, asset_root) else {
            return AssetUse::Missing;
        };
        match registry.ensure(&url, kind) {
            Some(asset_id) => AssetUse::Resolved { url, asset_id },
            None => AssetUse::Missing,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            AssetUse::Resolved { url, .. } => Some(url),
            AssetUse::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, AssetUse::Missing)
    }
}

// ============================================
// ページ投影
// ============================================

/// 表示状態（訳語表示・検索語）
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub reveal_target: bool,
    pub query: String,
}

impl ViewState {
    /// 小文字化・前後空白除去済みの検索語
    pub fn normalized_query(&self) -> String {
        self.query.trim().to_lowercase()
    }
}

/// 1枚分の配置結果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorPlacement {
    pub anchor_id: String,
    pub room_id: String,
    pub source_text: String,
    pub target_text: String,
    pub slot: Slot,
    /// ワールド座標（部屋位置 + スロット位置）
    pub world_position: Vec3,
    pub image: AssetUse,
    pub audio: AssetUse,
    pub target_visible: bool,
    pub visible: bool,
    pub highlighted: bool,
}

impl AnchorPlacement {
    /// 配置命令に展開
    pub fn objects(&self, config: &PalaceConfig) -> Vec<SceneObject> {
        let base = self.world_position;
        let yaw = self.slot.rotation_y;
        let id = &self.anchor_id;
        let facing = match self.slot.wall {
            Wall::Back => 1.0,
            Wall::Front => -1.0,
        };
        let at = |dz: f32, dy: f32| Vec3::new(base.x, base.y + dy, base.z + dz * facing);
        let text = &config.text;

        let panel_color = if self.highlighted {
            HIGHLIGHT_PANEL_COLOR
        } else {
            ANCHOR_PANEL_COLOR
        };

        let mut objects = vec![
            SceneObject::new(format!("{}-panel", id), ObjectKind::Panel, base)
                .sized(PANEL_WIDTH, PANEL_HEIGHT, 0.0)
                .rotated(0.0, yaw, 0.0)
                .colored(panel_color, 0.96),
        ];

        let mut image = SceneObject::new(format!("{}-image", id), ObjectKind::Image, at(IMAGE_DEPTH_OFFSET, 0.0))
            .sized(IMAGE_WIDTH, IMAGE_HEIGHT, 0.0)
            .rotated(0.0, yaw, 0.0);
        image.material.src = Some(match &self.image {
            AssetUse::Resolved { asset_id, .. } => asset_id.clone(),
            AssetUse::Missing => PLACEHOLDER_IMAGE_SRC.to_string(),
        });
        objects.push(image);

        let wrap = text.wrap_chars.unwrap_or(DEFAULT_WRAP_CHARS) as f32;
        let mut source = SceneObject::new(
            format!("{}-source", id),
            ObjectKind::SourceText,
            at(IMAGE_DEPTH_OFFSET, PANEL_HEIGHT / 2.0 - 0.45),
        )
        .sized(PANEL_WIDTH * 1.05, 0.0, wrap)
        .rotated(0.0, yaw, 0.0)
        .colored(text.source_color.as_deref().unwrap_or(DEFAULT_SOURCE_COLOR), 1.0);
        source.text = Some(self.source_text.clone());
        objects.push(source);

        let mut target = SceneObject::new(
            format!("{}-target", id),
            ObjectKind::TargetText,
            at(IMAGE_DEPTH_OFFSET, -(PANEL_HEIGHT / 2.0) + 0.55),
        )
        .sized(PANEL_WIDTH * 1.05, 0.0, wrap)
        .rotated(0.0, yaw, 0.0)
        .colored(text.target_color.as_deref().unwrap_or(DEFAULT_TARGET_COLOR), 1.0);
        target.text = Some(self.target_text.clone());
        target.visible = self.target_visible;
        objects.push(target);

        objects.push(
            SceneObject::new(format!("{}-hitbox", id), ObjectKind::Hitbox, at(0.15, 0.0))
                .sized(PANEL_WIDTH + 0.2, PANEL_HEIGHT + 0.3, 0.6)
                .rotated(0.0, yaw, 0.0)
                .colored("#000000", 0.0),
        );

        match &self.audio {
            AssetUse::Resolved { asset_id, .. } => {
                let mut sound = SceneObject::new(format!("{}-sound", id), ObjectKind::Sound, base);
                sound.material.src = Some(asset_id.clone());
                sound.material.opacity = config.audio.volume();
                objects.push(sound);
            }
            AssetUse::Missing => {
                let mut mute = SceneObject::new(format!("{}-mute", id), ObjectKind::MuteIndicator, at(0.02, -1.1))
                    .sized(1.2, 0.0, 0.0)
                    .rotated(0.0, yaw, 0.0)
                    .colored("#888", 1.0);
                mute.text = Some(MUTE_LABEL.to_string());
                objects.push(mute);
            }
        }

        if !self.visible {
            for object in &mut objects {
                object.visible = false;
            }
        }
        objects
    }
}

/// 1ページ分の投影結果
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageProjection {
    pub room_id: String,
    pub page: usize,
    pub page_count: usize,
    pub placements: Vec<AnchorPlacement>,
    /// 段数を超えて表示できなかったアンカーID
    pub overflow: Vec<String>,
    pub matches: usize,
}

impl PageProjection {
    /// ページ表示（2ページ以上のときのみ）
    pub fn page_label(&self) -> Option<String> {
        (self.page_count > 1).then(|| format!("Page {} / {}", self.page + 1, self.page_count))
    }

    /// シーンへ配置
    pub fn render(&self, config: &PalaceConfig, sink: &mut dyn SceneSink) {
        for placement in &self.placements {
            for object in placement.objects(config) {
                sink.place(object);
            }
        }
    }
}

/// 部屋の1ページを投影
pub fn project_page(
    config: &PalaceConfig,
    room_id: &str,
    page: usize,
    page_count: usize,
    anchors: &[Anchor],
    view: &ViewState,
    registry: &mut AssetRegistry,
) -> PageProjection {
    let grid = config.grid_for(room_id);
    let room_position = config.room(room_id).map(|r| r.position).unwrap_or_default();
    let query = view.normalized_query();

    let mut projection = PageProjection {
        room_id: room_id.to_string(),
        page,
        page_count,
        ..Default::default()
    };

    for (index, anchor) in anchors.iter().enumerate() {
        let Some(slot) = slot_for(index, &grid) else {
            projection.overflow.push(anchor.id.clone());
            continue;
        };

        let matched = !query.is_empty() && anchor.record.search_text().contains(&query);
        if matched {
            projection.matches += 1;
        }

        projection.placements.push(AnchorPlacement {
            anchor_id: anchor.id.clone(),
            room_id: room_id.to_string(),
            source_text: anchor.source_text().to_string(),
            target_text: anchor.target_text().to_string(),
            slot,
            world_position: Vec3::new(
                room_position.x + slot.position.x,
                room_position.y + slot.position.y,
                room_position.z + slot.position.z,
            ),
            image: AssetUse::resolve(anchor.record.image_ref.as_deref(), &anchor.asset_root, AssetKind::Image, registry),
            audio: AssetUse::resolve(anchor.record.audio_ref.as_deref(), &anchor.asset_root, AssetKind::Audio, registry),
            target_visible: view.reveal_target,
            visible: query.is_empty() || matched,
            highlighted: matched,
        });
    }

    if !projection.overflow.is_empty() {
        tracing::warn!(
            "Room {} is out of visible slots; consider increasing tiers or capacity.",
            room_id
        );
    }

    projection
}

// ============================================
// 部屋の外殻
// ============================================

/// テレポート先（部屋位置 + spawnOffset、高さは目線）
pub fn teleport_target(room: &RoomConfig) -> Vec3 {
    let spawn = room.spawn_offset.unwrap_or_default();
    Vec3::new(
        room.position.x + spawn.x,
        room.position.y + EYE_HEIGHT,
        room.position.z + spawn.z,
    )
}

/// 床・天井・壁（屋外は境界リング）・テレポート台
pub fn project_room_shell(room_id: &str, room: &RoomConfig) -> Vec<SceneObject> {
    let (w, h, d) = (room.width(), room.height(), room.depth());
    let origin = room.position;
    let at = |x: f32, y: f32, z: f32| Vec3::new(origin.x + x, origin.y + y, origin.z + z);
    let exterior = room.is_exterior();

    let pick = |custom: &Option<String>, outdoor: &str, indoor: &str| {
        custom
            .clone()
            .unwrap_or_else(|| (if exterior { outdoor } else { indoor }).to_string())
    };
    let floor_color = pick(&room.colors.floor, "#94d5a8", "#dfe3f2");
    let wall_color = pick(&room.colors.walls, "#c8e6ff", "#b8c2dd");
    let ceiling_color = pick(&room.colors.ceiling, "#f1f5f9", "#e9ecf7");

    let mut objects = vec![
        SceneObject::new(format!("room-{}-floor", room_id), ObjectKind::Floor, at(0.0, 0.0, 0.0))
            .sized(w, d, 0.0)
            .rotated(-90.0, 0.0, 0.0)
            .colored(&floor_color, 1.0),
        SceneObject::new(format!("room-{}-ceiling", room_id), ObjectKind::Ceiling, at(0.0, h, 0.0))
            .sized(w, d, 0.0)
            .rotated(90.0, 0.0, 0.0)
            .colored(&ceiling_color, if exterior { 0.0 } else { 1.0 }),
    ];

    if exterior {
        let radius = w.min(d) / 2.0;
        let ring_color = room.colors.walls.as_deref().unwrap_or("#7dc2d6");
        objects.push(
            SceneObject::new(format!("room-{}-boundary", room_id), ObjectKind::Boundary, at(0.0, 0.0, 0.0))
                .sized(radius - 1.0, radius, 0.0)
                .rotated(-90.0, 0.0, 0.0)
                .colored(ring_color, 0.2),
        );
    } else {
        let walls = [
            (at(0.0, h / 2.0, -d / 2.0), 0.0, w, 0.25),
            (at(w / 2.0, h / 2.0, 0.0), -90.0, 0.25, d),
            (at(0.0, h / 2.0, d / 2.0), 180.0, w, 0.25),
            (at(-w / 2.0, h / 2.0, 0.0), 90.0, 0.25, d),
        ];
        for (i, (position, yaw, width, depth)) in walls.into_iter().enumerate() {
            objects.push(
                SceneObject::new(format!("room-{}-wall-{}", room_id, i), ObjectKind::Wall, position)
                    .sized(width, h, depth)
                    .rotated(0.0, yaw, 0.0)
                    .colored(&wall_color, 0.98),
            );
        }
    }

    let spawn = room.spawn_offset.unwrap_or(Vec3::new(0.0, 0.01, 2.0));
    objects.push(
        SceneObject::new(format!("room-{}-teleport", room_id), ObjectKind::TeleportPad, at(spawn.x, spawn.y, spawn.z))
            .sized(1.2, 0.0, 0.0)
            .rotated(-90.0, 0.0, 0.0)
            .colored("#3bc9db", 0.35),
    );

    objects
}
