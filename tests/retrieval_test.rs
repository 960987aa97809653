mod helpers;

use chrono::{Duration, NaiveDate};
use tempfile::TempDir;

use helpers::{date, test_store};
use pictolog::diary::ranking::RankingPolicy;
use pictolog::diary::{ArtStyle, DiaryStore, Mood, SimilarEntry};

fn today() -> NaiveDate {
    date("2024-06-10")
}

fn texts(entries: &[SimilarEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.text.as_str()).collect()
}

fn save(store: &mut DiaryStore, text: &str, days_ago: i64, mood: Mood) -> String {
    store
        .save(text, today() - Duration::days(days_ago), ArtStyle::WaterColor, mood, None)
        .unwrap()
}

#[test]
fn far_candidates_are_cut_before_ranking() {
    let tmp = TempDir::new().unwrap();
    let mut store = test_store(tmp.path());
    save(&mut store, "sunny beach", 1, Mood::Happy); // distance 0
    save(&mut store, "sunny office", 1, Mood::Happy); // distance 0.5
    save(&mut store, "gloomy", 1, Mood::Sad); // distance ~1.7

    let found = store.retrieve_similar_on("sunny beach", 3, None, today()).unwrap();
    assert_eq!(texts(&found), vec!["sunny beach", "sunny office"]);
}

#[test]
fn opposite_entries_never_surface() {
    let tmp = TempDir::new().unwrap();
    let mut store = test_store(tmp.path());
    for i in 0..5 {
        save(&mut store, "gloomy gloomy", i, Mood::Sad);
    }

    let found = store.retrieve_similar_on("sunny", 5, None, today()).unwrap();
    assert!(found.is_empty());
}

#[test]
fn recent_entry_wins_at_equal_distance() {
    let tmp = TempDir::new().unwrap();
    let mut store = test_store(tmp.path());
    let old = save(&mut store, "kite at the beach", 9, Mood::Excited);
    let new = save(&mut store, "kite at the beach", 0, Mood::Excited);

    let found = store.retrieve_similar_on("beach kite", 2, None, today()).unwrap();
    let ids: Vec<&str> = found.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec![new.as_str(), old.as_str()]);
}

#[test]
fn similarity_dominates_with_high_alpha() {
    let tmp = TempDir::new().unwrap();
    let mut store = test_store(tmp.path()).with_policy(RankingPolicy {
        alpha: 0.95,
        max_distance: 1.0,
    });
    save(&mut store, "coffee at the office", 0, Mood::Neutral);
    save(&mut store, "cat on the beach", 30, Mood::Neutral);

    let found = store.retrieve_similar_on("cat beach", 2, None, today()).unwrap();
    assert_eq!(found[0].text, "cat on the beach");
}

#[test]
fn order_is_independent_of_save_order() {
    let entries = [
        ("sunny beach", 3),
        ("sunny park", 0),
        ("beach cat", 1),
        ("sunny beach kite", 7),
        ("exam stress", 0),
    ];

    let run = |order: &[usize]| {
        let tmp = TempDir::new().unwrap();
        let mut store = test_store(tmp.path());
        for &i in order {
            let (text, days) = entries[i];
            save(&mut store, text, days, Mood::Happy);
        }
        store
            .retrieve_similar_on("sunny beach", 5, None, today())
            .unwrap()
            .into_iter()
            .map(|e| e.text)
            .collect::<Vec<_>>()
    };

    let forward = run(&[0, 1, 2, 3, 4]);
    let backward = run(&[4, 3, 2, 1, 0]);
    assert_eq!(forward, backward);
    assert_eq!(forward[0], "sunny beach");
}

#[test]
fn mood_filter_restricts_candidates() {
    let tmp = TempDir::new().unwrap();
    let mut store = test_store(tmp.path());
    save(&mut store, "sunny beach", 0, Mood::Happy);
    save(&mut store, "sunny beach", 0, Mood::Anxious);
    save(&mut store, "sunny beach kite", 2, Mood::Anxious);

    let found = store
        .retrieve_similar_on("sunny beach", 3, Some(Mood::Anxious), today())
        .unwrap();
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|e| e.metadata.mood == Mood::Anxious));

    let none = store
        .retrieve_similar_on("sunny beach", 3, Some(Mood::Excited), today())
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn returns_at_most_k() {
    let tmp = TempDir::new().unwrap();
    let mut store = test_store(tmp.path());
    // stays inside the k * 3 candidate pool, where ties are arbitrary
    for i in 0..8 {
        save(&mut store, "park with the cat", i, Mood::Happy);
    }

    let found = store.retrieve_similar_on("cat park", 3, None, today()).unwrap();
    assert_eq!(found.len(), 3);
    // same distance everywhere, so the three most recent days win
    let dates: Vec<NaiveDate> = found.iter().map(|e| e.metadata.date).collect();
    assert_eq!(dates, vec![today(), today() - Duration::days(1), today() - Duration::days(2)]);

    assert!(store.retrieve_similar_on("cat park", 0, None, today()).unwrap().is_empty());
}

#[test]
fn empty_store_recalls_nothing() {
    let tmp = TempDir::new().unwrap();
    let store = test_store(tmp.path());
    assert!(store.retrieve_similar_on("anything", 3, None, today()).unwrap().is_empty());
}
