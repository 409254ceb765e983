//! 部屋割り当て・ページ分割モジュール
//!
//! ## 処理フロー
//! 1. アンカー全体のコピーをシャッフル（シード指定可能なFisher-Yates）
//! 2. シャッフル後の位置 i を `rooms[i % 部屋数]` に割り当て（ラウンドロビン）
//! 3. 部屋ごとに容量でページ分割（空の部屋も空ページ1枚を持つ）

use crate::types::Anchor;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;

/// シードを与えてアンカーをシャッフル
///
/// 同じシードなら同じ並びになる。本番は [`time_seed`] を使う。
pub fn shuffle_anchors(anchors: &[Anchor], seed: u64) -> Vec<Anchor> {
    let mut shuffled = anchors.to_vec();
    let mut rng = StdRng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);
    shuffled
}

/// 現在時刻からシードを生成
pub fn time_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// 固定長でページ分割
///
/// - `per_page <= 0` は無制限（1ページ）
/// - 空リストでも空ページを1枚返す
///
/// # Examples
/// ```
/// use palace_common::paginate;
///
/// assert_eq!(paginate(&[1, 2, 3, 4, 5], 2), vec![vec![1, 2], vec![3, 4], vec![5]]);
/// assert_eq!(paginate::<i32>(&[], 2), vec![Vec::<i32>::new()]);
/// assert_eq!(paginate(&[1, 2, 3], 0), vec![vec![1, 2, 3]]);
/// ```
pub fn paginate<T: Clone>(items: &[T], per_page: i64) -> Vec<Vec<T>> {
    if per_page <= 0 {
        return vec![items.to_vec()];
    }
    let pages: Vec<Vec<T>> = items
        .chunks(per_page as usize)
        .map(|chunk| chunk.to_vec())
        .collect();
    if pages.is_empty() {
        vec![Vec::new()]
    } else {
        pages
    }
}

/// 部屋ID → 割り当てられたアンカー（シャッフル後の順）
#[derive(Debug, Clone, Default)]
pub struct RoomAssignment {
    order: Vec<String>,
    by_room: HashMap<String, Vec<Anchor>>,
}

impl RoomAssignment {
    /// 部屋のアンカー（割り当てなしなら空）
    pub fn anchors(&self, room_id: &str) -> &[Anchor] {
        self.by_room.get(room_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 部屋順で走査
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Anchor])> + '_ {
        self.order
            .iter()
            .map(move |id| (id.as_str(), self.anchors(id)))
    }

    /// 割り当て総数
    pub fn total(&self) -> usize {
        self.by_room.values().map(Vec::len).sum()
    }

    pub fn room_ids(&self) -> &[String] {
        &self.order
    }
}

/// ラウンドロビンで部屋に割り当て
///
/// 部屋が空なら何も割り当てない。
pub fn assign_round_robin(shuffled: Vec<Anchor>, rooms: &[String]) -> RoomAssignment {
    let mut assignment = RoomAssignment::default();
    for room_id in rooms {
        if !assignment.by_room.contains_key(room_id) {
            assignment.order.push(room_id.clone());
            assignment.by_room.insert(room_id.clone(), Vec::new());
        }
    }
    if rooms.is_empty() {
        return assignment;
    }

    for (idx, anchor) in shuffled.into_iter().enumerate() {
        let room_id = &rooms[idx % rooms.len()];
        if let Some(list) = assignment.by_room.get_mut(room_id) {
            list.push(anchor);
        }
    }
    assignment
}

/// 部屋ID → ページ列
#[derive(Debug, Clone, Default)]
pub struct RoomPages {
    order: Vec<String>,
    by_room: HashMap<String, Vec<Vec<Anchor>>>,
}

impl RoomPages {
    /// 部屋のページ列
    pub fn pages(&self, room_id: &str) -> &[Vec<Anchor>] {
        self.by_room.get(room_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 指定ページ（範囲外は空）
    pub fn page(&self, room_id: &str, page: usize) -> &[Anchor] {
        self.pages(room_id)
            .get(page)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// ページ数（未知の部屋も空ページ1枚として数える）
    pub fn page_count(&self, room_id: &str) -> usize {
        self.pages(room_id).len().max(1)
    }

    pub fn room_ids(&self) -> &[String] {
        &self.order
    }

    /// アンカーが何ページ目にあるか
    pub fn locate(&self, room_id: &str, anchor_id: &str) -> Option<usize> {
        self.pages(room_id)
            .iter()
            .position(|page| page.iter().any(|a| a.id == anchor_id))
    }
}

/// 割り当て結果を部屋ごとにページ分割
pub fn paginate_rooms(
    assignment: &RoomAssignment,
    capacity_of: impl Fn(&str) -> i64,
) -> RoomPages {
    let mut pages = RoomPages::default();
    for (room_id, anchors) in assignment.iter() {
        pages.order.push(room_id.to_string());
        pages
            .by_room
            .insert(room_id.to_string(), paginate(anchors, capacity_of(room_id)));
    }
    pages
}

/// レイアウト全体（割り当て + ページ）
#[derive(Debug, Clone, Default)]
pub struct RoomLayout {
    pub seed: u64,
    pub assignment: RoomAssignment,
    pub pages: RoomPages,
}

/// シャッフル → 割り当て → ページ分割
pub fn build_layout(
    anchors: &[Anchor],
    rooms: &[String],
    seed: u64,
    capacity_of: impl Fn(&str) -> i64,
) -> RoomLayout {
    let shuffled = shuffle_anchors(anchors, seed);
    let assignment = assign_round_robin(shuffled, rooms);
    let pages = paginate_rooms(&assignment, capacity_of);
    RoomLayout {
        seed,
        assignment,
        pages,
    }
}
