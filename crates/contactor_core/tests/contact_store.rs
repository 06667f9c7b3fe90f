use contactor_core::{
    record_file_name, Contact, ContactId, ContactPatch, ContactRepository, DeleteOutcome,
    FileContactRepository, RepoError, StoreConfig,
};
use std::path::Path;
use tempfile::TempDir;

async fn open_store(dir: &TempDir) -> FileContactRepository {
    FileContactRepository::open(StoreConfig::under_documents(dir.path()))
        .await
        .unwrap()
}

fn record_files(root: &Path) -> Vec<String> {
    let mut names = std::fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect::<Vec<_>>();
    names.sort();
    names
}

#[tokio::test]
async fn open_creates_contacts_directory_and_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let repo = open_store(&dir).await;

    assert!(dir.path().join("contacts").is_dir());
    repo.ensure_ready().await.unwrap();
    repo.ensure_ready().await.unwrap();
    assert!(repo.read_all().await.unwrap().contacts.is_empty());
}

#[tokio::test]
async fn create_then_read_all_contains_exactly_one_equal_record() {
    let dir = TempDir::new().unwrap();
    let repo = open_store(&dir).await;

    let contact = Contact::new("Bob Stone", "555-0100", Some("file:///bob.jpg".to_string()));
    repo.create(&contact).await.unwrap();

    let scan = repo.read_all().await.unwrap();
    assert_eq!(scan.contacts, vec![contact.clone()]);
    assert!(scan.malformed.is_empty());
    assert_eq!(
        record_files(repo.root()),
        vec![record_file_name("Bob Stone", contact.id.as_str())]
    );
}

#[tokio::test]
async fn record_file_uses_wire_shape_with_explicit_null_photo() {
    let dir = TempDir::new().unwrap();
    let repo = open_store(&dir).await;

    let id = ContactId::parse("abc123").unwrap();
    let contact = Contact::with_id(id, "Ann", "555-0111", None);
    repo.create(&contact).await.unwrap();

    let raw = std::fs::read_to_string(repo.root().join("Ann-abc123.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["id"], "abc123");
    assert_eq!(json["name"], "Ann");
    assert_eq!(json["phoneNumber"], "555-0111");
    assert!(json.get("photo").is_some());
    assert!(json["photo"].is_null());
}

#[tokio::test]
async fn create_rejects_duplicate_id() {
    let dir = TempDir::new().unwrap();
    let repo = open_store(&dir).await;

    let contact = Contact::new("Bob", "555-0100", None);
    repo.create(&contact).await.unwrap();

    let mut clash = contact.clone();
    clash.name = "Another Bob".to_string();
    let err = repo.create(&clash).await.unwrap_err();
    assert!(matches!(err, RepoError::DuplicateId(id) if id == contact.id));
    assert_eq!(repo.read_all().await.unwrap().contacts.len(), 1);
}

#[tokio::test]
async fn create_rejects_invalid_record_without_writing() {
    let dir = TempDir::new().unwrap();
    let repo = open_store(&dir).await;

    let err = repo
        .create(&Contact::new("", "555-0100", None))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert!(record_files(repo.root()).is_empty());
}

#[tokio::test]
async fn update_renames_file_and_leaves_no_orphan() {
    let dir = TempDir::new().unwrap();
    let repo = open_store(&dir).await;

    let contact = Contact::new("Bob", "555-0100", None);
    repo.create(&contact).await.unwrap();

    let updated = repo
        .update(
            &contact.id,
            ContactPatch {
                name: Some("Robert".to_string()),
                ..ContactPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.id, contact.id);
    assert_eq!(updated.name, "Robert");
    assert_eq!(updated.phone_number, "555-0100");

    let scan = repo.read_all().await.unwrap();
    assert_eq!(scan.contacts, vec![updated]);
    assert_eq!(
        record_files(repo.root()),
        vec![record_file_name("Robert", contact.id.as_str())]
    );
}

#[tokio::test]
async fn update_without_name_change_overwrites_in_place() {
    let dir = TempDir::new().unwrap();
    let repo = open_store(&dir).await;

    let contact = Contact::new("Bob", "555-0100", Some("file:///old.png".to_string()));
    repo.create(&contact).await.unwrap();

    repo.update(
        &contact.id,
        ContactPatch {
            phone_number: Some("555-0199".to_string()),
            photo: Some(None),
            ..ContactPatch::default()
        },
    )
    .await
    .unwrap();

    let loaded = repo.get(&contact.id).await.unwrap().unwrap();
    assert_eq!(loaded.phone_number, "555-0199");
    assert_eq!(loaded.photo, None);
    assert_eq!(record_files(repo.root()).len(), 1);
}

#[tokio::test]
async fn update_unknown_id_is_not_found() {
    let dir = TempDir::new().unwrap();
    let repo = open_store(&dir).await;

    let missing = ContactId::generate();
    let err = repo
        .update(&missing, ContactPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}

#[tokio::test]
async fn update_rejects_blank_name_and_keeps_old_file() {
    let dir = TempDir::new().unwrap();
    let repo = open_store(&dir).await;

    let contact = Contact::new("Bob", "555-0100", None);
    repo.create(&contact).await.unwrap();

    let err = repo
        .update(
            &contact.id,
            ContactPatch {
                name: Some("   ".to_string()),
                ..ContactPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(repo.read_all().await.unwrap().contacts, vec![contact]);
}

#[tokio::test]
async fn update_finds_records_written_by_another_store_instance() {
    let dir = TempDir::new().unwrap();
    let first = open_store(&dir).await;
    let second = open_store(&dir).await;

    let contact = Contact::new("Bob", "555-0100", None);
    first.create(&contact).await.unwrap();

    let updated = second
        .update(
            &contact.id,
            ContactPatch {
                name: Some("Bobby".to_string()),
                ..ContactPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Bobby");
    assert_eq!(first.read_all().await.unwrap().contacts, vec![updated]);
}

#[tokio::test]
async fn delete_removes_record_and_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let repo = open_store(&dir).await;

    let keep = Contact::new("Alice", "555-0101", None);
    let drop = Contact::new("Bob", "555-0102", None);
    repo.create(&keep).await.unwrap();
    repo.create(&drop).await.unwrap();

    assert_eq!(repo.delete(&drop.id).await.unwrap(), DeleteOutcome::Removed);
    assert_eq!(
        repo.delete(&drop.id).await.unwrap(),
        DeleteOutcome::AlreadyAbsent
    );

    let scan = repo.read_all().await.unwrap();
    assert!(scan.contacts.iter().all(|contact| contact.id != drop.id));
    assert_eq!(scan.contacts, vec![keep]);
}

#[tokio::test]
async fn delete_follows_rename_made_by_another_store_instance() {
    let dir = TempDir::new().unwrap();
    let first = open_store(&dir).await;
    let contact = Contact::new("Bob", "555-0100", None);
    first.create(&contact).await.unwrap();

    let second = open_store(&dir).await;
    second
        .update(
            &contact.id,
            ContactPatch {
                name: Some("Robert".to_string()),
                ..ContactPatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(first.delete(&contact.id).await.unwrap(), DeleteOutcome::Removed);
    assert!(record_files(first.root()).is_empty());
}

#[tokio::test]
async fn read_all_reports_malformed_files_and_keeps_valid_ones() {
    let dir = TempDir::new().unwrap();
    let repo = open_store(&dir).await;

    let a = Contact::new("Alice", "555-0101", None);
    let b = Contact::new("Bob", "555-0102", None);
    repo.create(&a).await.unwrap();
    repo.create(&b).await.unwrap();
    std::fs::write(repo.root().join("Broken-xyz.json"), "{\"id\": ").unwrap();

    let scan = repo.read_all().await.unwrap();
    assert_eq!(scan.contacts.len(), 2);
    assert!(scan.contacts.contains(&a));
    assert!(scan.contacts.contains(&b));
    assert_eq!(scan.malformed.len(), 1);
    assert_eq!(scan.malformed[0].file_name, "Broken-xyz.json");
}

#[tokio::test]
async fn read_all_deduplicates_by_id_first_file_name_wins() {
    let dir = TempDir::new().unwrap();
    let repo = open_store(&dir).await;

    std::fs::write(
        repo.root().join("A_copy-dup1.json"),
        r#"{"id":"dup1","name":"A copy","phoneNumber":"1","photo":null}"#,
    )
    .unwrap();
    std::fs::write(
        repo.root().join("B_copy-dup1.json"),
        r#"{"id":"dup1","name":"B copy","phoneNumber":"2","photo":null}"#,
    )
    .unwrap();

    let scan = repo.read_all().await.unwrap();
    assert_eq!(scan.contacts.len(), 1);
    assert_eq!(scan.contacts[0].name, "A copy");
    assert!(scan.malformed.is_empty());
}

#[tokio::test]
async fn read_all_ignores_foreign_and_temp_files() {
    let dir = TempDir::new().unwrap();
    let repo = open_store(&dir).await;

    std::fs::write(repo.root().join("README.txt"), "not a contact").unwrap();
    std::fs::write(repo.root().join(".Bob-abc.json.tmp"), "{").unwrap();

    let scan = repo.read_all().await.unwrap();
    assert!(scan.contacts.is_empty());
    assert!(scan.malformed.is_empty());
}

#[tokio::test]
async fn open_sweeps_leftover_temp_files() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("contacts");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join(".Bob-abc.json.tmp"), "{\"id\":").unwrap();

    let repo = open_store(&dir).await;
    assert!(record_files(repo.root()).is_empty());
}

#[tokio::test]
async fn get_returns_none_for_unknown_id() {
    let dir = TempDir::new().unwrap();
    let repo = open_store(&dir).await;
    assert!(repo.get(&ContactId::generate()).await.unwrap().is_none());
}

#[tokio::test]
async fn reads_and_edits_records_with_hyphenated_uuid_ids() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("contacts");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(
        root.join("Bob-550e8400-e29b-41d4-a716-446655440000.json"),
        r#"{"id":"550e8400-e29b-41d4-a716-446655440000","name":"Bob","phoneNumber":"555-0100","photo":null}"#,
    )
    .unwrap();

    let repo = open_store(&dir).await;
    let scan = repo.read_all().await.unwrap();
    assert!(scan.malformed.is_empty());
    assert_eq!(scan.contacts.len(), 1);
    assert_eq!(
        scan.contacts[0].id.as_str(),
        "550e8400-e29b-41d4-a716-446655440000"
    );

    repo.update(
        &scan.contacts[0].id,
        ContactPatch {
            name: Some("Robert".to_string()),
            ..ContactPatch::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(
        record_files(repo.root()),
        vec!["Robert-550e8400-e29b-41d4-a716-446655440000.json"]
    );
}

#[tokio::test]
async fn create_refuses_file_name_held_by_another_id() {
    let dir = TempDir::new().unwrap();
    let repo = open_store(&dir).await;

    let first = Contact::with_id(ContactId::parse("b-c").unwrap(), "a", "555-0100", None);
    repo.create(&first).await.unwrap();

    let second = Contact::with_id(ContactId::parse("c").unwrap(), "a-b", "555-0101", None);
    let err = repo.create(&second).await.unwrap_err();
    assert!(matches!(
        err,
        RepoError::FileNameTaken { ref file_name, ref holder }
            if file_name == "a-b-c.json" && *holder == first.id
    ));
    assert_eq!(repo.read_all().await.unwrap().contacts, vec![first]);
}
