//! 配置グリッドモジュール
//!
//! ページ内のカード番号から、部屋ローカル座標の配置を求める。
//! 1段（tier）= `cols × rows` 枠。偶数段は奥の壁、奇数段は手前の壁に貼る。

use crate::config::Vec3;
use serde::Serialize;

// ============================================
// カードパネル寸法（シーン単位 = m）
// ============================================

/// 背景パネル
pub const PANEL_WIDTH: f32 = 2.2;
pub const PANEL_HEIGHT: f32 = 2.6;

/// 画像
pub const IMAGE_WIDTH: f32 = 1.8;
pub const IMAGE_HEIGHT: f32 = 1.2;
pub const IMAGE_DEPTH_OFFSET: f32 = 0.05;

/// 壁からの離隔
pub const WALL_INSET: f32 = 0.4;

/// 視点の高さ
pub const EYE_HEIGHT: f32 = 1.6;

// ============================================
// グリッド設定
// ============================================

/// 解決済みグリッド
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub cols: u32,
    pub rows: u32,
    /// 1以上
    pub tiers: u32,
    pub cell_width: f32,
    pub cell_height: f32,
    pub base_height: f32,
    /// 部屋の奥行き
    pub depth: f32,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            cols: 4,
            rows: 3,
            tiers: 2,
            cell_width: 1.8,
            cell_height: 1.6,
            base_height: 1.2,
            depth: 12.0,
        }
    }
}

impl GridSpec {
    /// 1段あたりの枠数
    pub fn slots_per_tier(&self) -> usize {
        (self.cols.max(1) * self.rows.max(1)) as usize
    }

    /// 表示可能な枠数
    pub fn visible_slots(&self) -> usize {
        self.slots_per_tier() * self.tiers.max(1) as usize
    }
}

/// 貼り付け先の壁
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Wall {
    Back,
    Front,
}

/// 1枚分の配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub tier: u32,
    pub row: u32,
    pub col: u32,
    pub wall: Wall,
    pub position: Vec3,
    /// Y軸回転（度）
    pub rotation_y: f32,
}

/// ページ内番号から配置を計算
///
/// 段数を超えた場合は `None`（表示されないがIDでは参照できる）。
pub fn slot_for(index: usize, grid: &GridSpec) -> Option<Slot> {
    let cols = grid.cols.max(1);
    let rows = grid.rows.max(1);
    let per_tier = grid.slots_per_tier();

    let tier = (index / per_tier) as u32;
    if tier >= grid.tiers.max(1) {
        return None;
    }
    let slot = (index % per_tier) as u32;
    let row = slot / cols;
    let col = slot % cols;

    let center_x = (col as f32 - (cols - 1) as f32 / 2.0) * grid.cell_width;
    let total_height = (rows - 1) as f32 * grid.cell_height;
    let center_y = grid.base_height + total_height / 2.0 - row as f32 * grid.cell_height;
    let wall_offset = grid.depth / 2.0 - WALL_INSET;

    let (wall, sign, rotation_y) = if tier % 2 == 0 {
        (Wall::Back, -1.0, 0.0)
    } else {
        (Wall::Front, 1.0, 180.0)
    };

    Some(Slot {
        tier,
        row,
        col,
        wall,
        position: Vec3::new(center_x, center_y, sign * wall_offset),
        rotation_y,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(cols: u32, rows: u32, tiers: u32) -> GridSpec {
        GridSpec {
            cols,
            rows,
            tiers,
            ..GridSpec::default()
        }
    }

    #[test]
    fn test_first_slot_is_top_left_back_wall() {
        let g = grid(4, 3, 2);
        let slot = slot_for(0, &g).unwrap();
        assert_eq!((slot.tier, slot.row, slot.col), (0, 0, 0));
        assert_eq!(slot.wall, Wall::Back);
        // (0 - 1.5) * 1.8
        assert!((slot.position.x - -2.7).abs() < 0.001);
        // 1.2 + 3.2/2 - 0
        assert!((slot.position.y - 2.8).abs() < 0.001);
        assert!((slot.position.z - -5.6).abs() < 0.001);
        assert_eq!(slot.rotation_y, 0.0);
    }

    #[test]
    fn test_second_tier_goes_to_front_wall() {
        let g = grid(4, 3, 2);
        let slot = slot_for(12, &g).unwrap();
        assert_eq!(slot.tier, 1);
        assert_eq!(slot.wall, Wall::Front);
        assert!(slot.position.z > 0.0);
        assert_eq!(slot.rotation_y, 180.0);
    }

    #[test]
    fn test_row_and_col_progression() {
        let g = grid(4, 3, 1);
        let slot = slot_for(5, &g).unwrap();
        assert_eq!((slot.row, slot.col), (1, 1));
        let above = slot_for(1, &g).unwrap();
        assert!(above.position.y > slot.position.y);
    }

    #[test]
    fn test_overflow_beyond_tiers() {
        let g = grid(2, 2, 1);
        assert!(slot_for(3, &g).is_some());
        assert!(slot_for(4, &g).is_none());
        assert_eq!(g.visible_slots(), 4);
    }

    #[test]
    fn test_zero_sized_grid_is_clamped() {
        let g = grid(0, 0, 0);
        assert_eq!(g.slots_per_tier(), 1);
        assert!(slot_for(0, &g).is_some());
        assert!(slot_for(1, &g).is_none());
    }
}
