//! 保存済みレイアウトテスト
//!
//! 件数上限・同名置き換え・再読み込みを検証

use memory_palace::saved::{SavedLayouts, MAX_SAVED_LAYOUTS};
use memory_palace::storage::{JsonFileStore, MemoryStore};
use memory_palace::PalaceController;
use palace_common::PalaceConfig;
use tempfile::tempdir;

const DECK: &str = "кошка\tcat\t<img src=\"cat.jpg\">\t[sound:cat.mp3]\nсобака\tdog\t\t";

fn loaded() -> PalaceController {
    let mut c = PalaceController::new(PalaceConfig::builtin(), Box::new(MemoryStore::new()));
    c.load_dataset(DECK, Some("media"), "animals.tsv", None, Some(5)).unwrap();
    c
}

/// 13件保存すると12件に切り詰められ、最も古いものが消える
#[test]
fn test_save_cap() {
    let mut c = loaded();
    for i in 0..13 {
        c.save_current(&format!("deck {}", i)).unwrap();
    }

    let names: Vec<&str> = c.saved_layouts().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names.len(), MAX_SAVED_LAYOUTS);
    assert_eq!(names[0], "deck 12");
    assert!(!names.contains(&"deck 0"));
}

/// 同名で保存すると置き換わり、件数は変わらない
#[test]
fn test_save_replace_keeps_count() {
    let mut c = loaded();
    c.save_current("animals").unwrap();
    c.save_current("other").unwrap();
    assert_eq!(c.saved_layouts().len(), 2);

    let replaced = c.save_current("  animals ").unwrap();
    assert_eq!(c.saved_layouts().len(), 2);
    assert_eq!(c.saved_layouts()[0].id, replaced.id);
    assert_eq!(c.saved_layouts()[0].name, "animals");
}

/// 開くと保存時のテキストとアセットルートで再構築される
#[test]
fn test_open_rebuilds_dataset() {
    let mut c = loaded();
    let entry = c.save_current("animals").unwrap();
    let signature = c.dataset().unwrap().signature.clone();

    c.load_dataset("дом\thouse\t\t", None, "house.tsv", None, Some(1)).unwrap();
    assert_ne!(c.dataset().unwrap().signature, signature);

    c.open_saved(&entry.id, Some(1)).unwrap();
    let dataset = c.dataset().unwrap();
    assert_eq!(dataset.signature, signature);
    assert_eq!(dataset.asset_root, "media/");
    assert_eq!(c.label(), Some("animals"));
    assert_eq!(c.active_saved_id(), Some(entry.id.as_str()));
}

/// ファイル保存領域に永続化される
#[test]
fn test_saved_layouts_persist_to_disk() {
    let dir = tempdir().expect("Failed to create temp dir");

    {
        let store = JsonFileStore::open(dir.path()).unwrap();
        let mut c = PalaceController::new(PalaceConfig::builtin(), Box::new(store));
        c.load_dataset(DECK, None, "animals.tsv", None, Some(5)).unwrap();
        c.save_current("animals").unwrap();
    }

    let store = JsonFileStore::open(dir.path()).unwrap();
    let layouts = SavedLayouts::load(&store);
    assert_eq!(layouts.len(), 1);
    assert_eq!(layouts.entries()[0].raw_text, DECK);
}
