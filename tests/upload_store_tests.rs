use bytes::Bytes;
use event_api::uploads::{ImageUpload, UploadStore, PUBLIC_PREFIX};

fn test_uploads() -> (tempfile::TempDir, UploadStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = UploadStore::new(dir.path().join("uploads"), 1024).unwrap();
    (dir, store)
}

fn png(bytes: &[u8]) -> ImageUpload {
    ImageUpload::new("cover.png", Some("image/png"), Bytes::copy_from_slice(bytes), 1024).unwrap()
}

#[tokio::test]
async fn test_save_writes_under_generated_name() {
    let (dir, store) = test_uploads();

    let path = store.save(&png(b"\x89PNG fake")).await.unwrap();
    assert!(path.starts_with(PUBLIC_PREFIX));
    assert!(path.ends_with(".png"));

    let name = path.strip_prefix(PUBLIC_PREFIX).unwrap();
    assert!(name.starts_with("image-"));
    let on_disk = dir.path().join("uploads").join(name);
    assert_eq!(std::fs::read(on_disk).unwrap(), b"\x89PNG fake");
}

#[tokio::test]
async fn test_same_upload_saved_twice_gets_two_names() {
    let (_dir, store) = test_uploads();
    let upload = png(b"data");

    let first = store.save(&upload).await.unwrap();
    let second = store.save(&upload).await.unwrap();
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_remove_deletes_file() {
    let (_dir, store) = test_uploads();

    let path = store.save(&png(b"data")).await.unwrap();
    let name = path.strip_prefix(PUBLIC_PREFIX).unwrap().to_string();
    assert!(store.resolve(&name).unwrap().exists());

    store.remove(&path).await.unwrap();
    assert!(!store.resolve(&name).unwrap().exists());

    // Removing again is a no-op
    store.remove(&path).await.unwrap();
}

#[tokio::test]
async fn test_remove_ignores_foreign_paths() {
    let (dir, store) = test_uploads();
    let outside = dir.path().join("keep.txt");
    std::fs::write(&outside, b"keep").unwrap();

    store.remove("/uploads/../keep.txt").await.unwrap();
    store.remove("/elsewhere/keep.txt").await.unwrap();
    assert!(outside.exists());
}

#[test]
fn test_max_size_is_reported() {
    let (_dir, store) = test_uploads();
    assert_eq!(store.max_size(), 1024);
}
