use puffnotesapp::error::PuffError;
use puffnotesapp::model::BackingId;
use puffnotesapp::naming::resolve_available_name;
use puffnotesapp::store::local::{FixedFolder, LocalStore};
use puffnotesapp::store::{BindOutcome, NoteStore};
use std::fs;
use tempfile::TempDir;

async fn bound(temp: &TempDir) -> LocalStore {
    let store = LocalStore::new(FixedFolder::new(temp.path()));
    assert_eq!(store.bind_root().await.unwrap(), BindOutcome::Bound);
    store
}

#[tokio::test]
async fn write_then_read_round_trips() {
    let temp = TempDir::new().unwrap();
    let store = bound(&temp).await;

    let id = store
        .write_document("lecture.md", "# Week 1\n", None)
        .await
        .unwrap();

    assert_eq!(id.as_str(), "lecture.md");
    assert_eq!(store.read_document(&id).await.unwrap(), "# Week 1\n");
    assert_eq!(
        fs::read_to_string(temp.path().join("lecture.md")).unwrap(),
        "# Week 1\n"
    );
}

#[tokio::test]
async fn overwrite_leaves_no_temporary_files() {
    let temp = TempDir::new().unwrap();
    let store = bound(&temp).await;
    let id = store.write_document("a.md", "one", None).await.unwrap();

    store.write_document("a.md", "two", Some(&id)).await.unwrap();

    let files: Vec<String> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files, vec!["a.md"]);
    assert_eq!(store.read_document(&id).await.unwrap(), "two");
}

#[tokio::test]
async fn listing_skips_hidden_and_foreign_files() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("b.md"), "b").unwrap();
    fs::write(temp.path().join("a.md"), "a").unwrap();
    fs::write(temp.path().join("todo.txt"), "x").unwrap();
    fs::write(temp.path().join(".draft.md"), "x").unwrap();
    fs::create_dir(temp.path().join("folder.md")).unwrap();
    let store = bound(&temp).await;

    let names: Vec<String> = store
        .list_documents()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();

    assert_eq!(names, vec!["a.md", "b.md"]);
}

#[tokio::test]
async fn first_saves_probe_for_free_names() {
    let temp = TempDir::new().unwrap();
    let store = bound(&temp).await;

    for expected in ["untitled.md", "untitled-1.md", "untitled-2.md"] {
        let name = resolve_available_name(&store, "untitled").await.unwrap();
        assert_eq!(name, expected);
        store.write_document(&name, "", None).await.unwrap();
    }
}

#[tokio::test]
async fn delete_reports_whether_anything_was_removed() {
    let temp = TempDir::new().unwrap();
    let store = bound(&temp).await;
    let id = store.write_document("gone.md", "x", None).await.unwrap();

    assert!(store.delete_document(&id).await.unwrap());
    assert!(!store.delete_document(&id).await.unwrap());
    assert!(matches!(
        store.read_document(&id).await,
        Err(PuffError::NotFound(_))
    ));
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let temp = TempDir::new().unwrap();
    let store = bound(&temp).await;

    let err = store
        .read_document(&BackingId::new("nope.md"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}
