mod helpers;

use tempfile::TempDir;

use helpers::{date, files_under, png, store_with, test_index, FailingWrites, RejectingIndex};
use pictolog::diary::artifact::FsArtifactStorage;
use pictolog::diary::{ArtStyle, DiaryError, Mood};

#[test]
fn failed_image_write_commits_nothing() {
    let tmp = TempDir::new().unwrap();
    let mut store = store_with(test_index(), FailingWrites, tmp.path());
    store
        .save("earlier entry", date("2024-01-01"), ArtStyle::Sketch, Mood::Neutral, None)
        .unwrap();
    assert_eq!(store.count().unwrap(), 1);

    let err = store
        .save("with picture", date("2024-01-01"), ArtStyle::Sketch, Mood::Neutral, Some(&png()))
        .unwrap_err();

    assert!(matches!(err, DiaryError::ArtifactWrite { .. }));
    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(store.load_by_date(date("2024-01-01")).unwrap().len(), 1);
}

#[test]
fn failed_index_write_removes_the_image() {
    let tmp = TempDir::new().unwrap();
    let mut store = store_with(RejectingIndex(test_index()), FsArtifactStorage, tmp.path());

    let err = store
        .save("never indexed", date("2024-09-09"), ArtStyle::Cyberpunk, Mood::Anxious, Some(&png()))
        .unwrap_err();

    match err {
        DiaryError::IndexWrite(msg) => assert!(msg.contains("database is locked")),
        other => panic!("expected IndexWrite, got {other:?}"),
    }
    assert!(files_under(tmp.path()).is_empty());
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn unrecognized_image_bytes_are_rejected_up_front() {
    let err = pictolog::diary::ImageData::from_bytes(b"definitely not an image".to_vec())
        .unwrap_err();
    assert!(matches!(err, DiaryError::Validation(_)));
}
