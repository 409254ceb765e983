//! 設定ドキュメント（config.json）の型定義
//!
//! 部屋の並び・寸法・グリッド・容量などを定義する。
//! キーは camelCase。

use crate::error::{Error, Result};
use crate::placement::GridSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 部屋容量の組み込み既定値
pub const DEFAULT_ROOM_CAPACITY: i64 = 12;

/// 3次元ベクトル
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.x, self.y, self.z)
    }
}

/// 部屋の寸法
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dimensions {
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub depth: Option<f32>,
}

/// 部屋の配色
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomColors {
    pub floor: Option<String>,
    pub walls: Option<String>,
    pub ceiling: Option<String>,
}

/// カード配置グリッド
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridConfig {
    #[serde(alias = "gridCols")]
    pub cols: Option<u32>,
    #[serde(alias = "gridRows")]
    pub rows: Option<u32>,
    pub tiers: Option<u32>,
    pub cell_width: Option<f32>,
    pub cell_height: Option<f32>,
    pub base_height: Option<f32>,
}

/// 部屋定義
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomConfig {
    pub label: Option<String>,
    pub position: Vec3,
    pub dimensions: Dimensions,
    pub colors: RoomColors,
    pub spawn_offset: Option<Vec3>,
    pub grid: Option<GridConfig>,
    /// `exterior` なら屋外（壁・天井なし）
    pub theme: Option<String>,
}

impl RoomConfig {
    pub fn width(&self) -> f32 {
        self.dimensions.width.unwrap_or(12.0)
    }

    pub fn height(&self) -> f32 {
        self.dimensions.height.unwrap_or(4.0)
    }

    pub fn depth(&self) -> f32 {
        self.dimensions.depth.unwrap_or(12.0)
    }

    pub fn is_exterior(&self) -> bool {
        self.theme.as_deref() == Some("exterior")
    }
}

/// 部屋容量（`default` と部屋ごとの上書き）
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoomCap {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<i64>,
    #[serde(flatten)]
    pub rooms: HashMap<String, i64>,
}

/// 数値なら整数に切り捨て、それ以外は未指定扱い
fn cap_number(value: &serde_json::Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|n| n.trunc() as i64))
}

impl<'de> Deserialize<'de> for RoomCap {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let mut cap = Self::default();
        let Some(entries) = value.as_object() else {
            return Ok(cap);
        };

        for (key, raw) in entries {
            let Some(number) = cap_number(raw) else {
                continue;
            };
            if key == "default" {
                cap.default = Some(number);
            } else {
                cap.rooms.insert(key.clone(), number);
            }
        }
        Ok(cap)
    }
}

/// テキスト表示設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextConfig {
    #[serde(alias = "ruColor")]
    pub source_color: Option<String>,
    #[serde(alias = "enColor")]
    pub target_color: Option<String>,
    pub wrap_chars: Option<u32>,
}

/// 音声設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub volume: Option<f32>,
    /// 外部プレイヤーコマンド（例: `["ffplay", "-nodisp", "-autoexit"]`）
    pub command: Option<Vec<String>>,
}

impl AudioConfig {
    pub fn volume(&self) -> f32 {
        self.volume.unwrap_or(1.0)
    }
}

/// 設定ドキュメント
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PalaceConfig {
    pub asset_root: Option<String>,
    pub room_order: Option<Vec<String>>,
    pub rooms: HashMap<String, RoomConfig>,
    pub room_cap: RoomCap,
    pub placement: Option<GridConfig>,
    pub text: TextConfig,
    pub audio: AudioConfig,
}

/// 設定の問題点（致命的ではない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    /// roomOrder がない
    MissingRoomOrder,
    /// roomOrder にあるが rooms に定義がない
    MissingRoom(String),
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigIssue::MissingRoomOrder => write!(f, "Missing roomOrder in config.json"),
            ConfigIssue::MissingRoom(id) => write!(f, "Room config missing for id \"{}\"", id),
        }
    }
}

impl PalaceConfig {
    /// JSON文字列から読み込み
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// JSONファイルから読み込み
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!("config not found: {}", path.display())));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// 部屋の並び（未設定なら空）
    pub fn room_order(&self) -> &[String] {
        self.room_order.as_deref().unwrap_or(&[])
    }

    pub fn room(&self, room_id: &str) -> Option<&RoomConfig> {
        self.rooms.get(room_id)
    }

    /// 部屋の表示名（label がなければID）
    pub fn room_label<'a>(&'a self, room_id: &'a str) -> &'a str {
        self.room(room_id)
            .and_then(|r| r.label.as_deref())
            .unwrap_or(room_id)
    }

    /// 問題点の列挙
    pub fn issues(&self) -> Vec<ConfigIssue> {
        let Some(order) = &self.room_order else {
            return vec![ConfigIssue::MissingRoomOrder];
        };
        order
            .iter()
            .filter(|id| !self.rooms.contains_key(id.as_str()))
            .map(|id| ConfigIssue::MissingRoom(id.clone()))
            .collect()
    }

    /// 部屋容量
    ///
    /// 部屋ごとの上書き（正の値のみ）→ `default` → 組み込み既定値 の順。
    /// 0以下は「無制限・1ページ」として扱われる。
    pub fn room_capacity(&self, room_id: &str) -> i64 {
        match self.room_cap.rooms.get(room_id) {
            Some(&cap) if cap > 0 => cap,
            _ => self.room_cap.default.unwrap_or(DEFAULT_ROOM_CAPACITY),
        }
    }

    /// 部屋のグリッド設定を解決
    ///
    /// 部屋の `grid` → 全体の `placement` → 既定値（4×3、2段）。
    pub fn grid_for(&self, room_id: &str) -> GridSpec {
        let room = self.room(room_id);
        let global = self.placement.as_ref();
        let depth = room.map(|r| r.depth()).unwrap_or(12.0);

        let Some(grid) = room.and_then(|r| r.grid.as_ref()).or(global) else {
            return GridSpec {
                depth,
                ..GridSpec::default()
            };
        };

        let fallback = GridSpec::default();
        GridSpec {
            cols: grid.cols.unwrap_or(fallback.cols),
            rows: grid.rows.unwrap_or(fallback.rows),
            tiers: grid.tiers.unwrap_or(1).max(1),
            cell_width: grid
                .cell_width
                .or_else(|| global.and_then(|g| g.cell_width))
                .unwrap_or(fallback.cell_width),
            cell_height: grid
                .cell_height
                .or_else(|| global.and_then(|g| g.cell_height))
                .unwrap_or(fallback.cell_height),
            base_height: grid
                .base_height
                .or_else(|| global.and_then(|g| g.base_height))
                .unwrap_or(fallback.base_height),
            depth,
        }
    }

    /// 組み込みの既定設定（9部屋）
    pub fn builtin() -> Self {
        const ROOMS: &[(&str, &str, bool)] = &[
            ("entrance", "Entrance Hall", false),
            ("kitchen", "Kitchen", false),
            ("park", "City Park", true),
            ("bar", "Corner Bar", false),
            ("museum", "Museum", false),
            ("living", "Living Room", false),
            ("clinic", "Clinic", false),
            ("street", "Main Street", true),
            ("school", "School", false),
        ];

        let mut config = Self {
            asset_root: Some("./media/".into()),
            room_order: Some(ROOMS.iter().map(|(id, _, _)| id.to_string()).collect()),
            placement: Some(GridConfig {
                cols: Some(4),
                rows: Some(3),
                tiers: Some(2),
                cell_width: Some(2.4),
                cell_height: Some(2.8),
                base_height: Some(1.6),
            }),
            ..Default::default()
        };
        config.room_cap.default = Some(DEFAULT_ROOM_CAPACITY);

        for (i, (id, label, exterior)) in ROOMS.iter().enumerate() {
            let (col, row) = ((i % 3) as f32, (i / 3) as f32);
            let room = RoomConfig {
                label: Some(label.to_string()),
                position: Vec3::new((col - 1.0) * 20.0, 0.0, (row - 1.0) * -20.0),
                dimensions: Dimensions {
                    width: Some(if *exterior { 16.0 } else { 12.0 }),
                    height: Some(4.0),
                    depth: Some(if *exterior { 14.0 } else { 12.0 }),
                },
                spawn_offset: Some(Vec3::new(0.0, 0.01, 2.0)),
                theme: exterior.then(|| "exterior".to_string()),
                ..Default::default()
            };
            config.rooms.insert(id.to_string(), room);
        }

        config
    }
}
