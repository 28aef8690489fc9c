use jsontable_core::{DbError, DocumentStore, Record, RecordId, StoreOptions, TableRegistry};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Invoice {
    id: Option<RecordId>,
    total_cents: i64,
}

impl Record for Invoice {
    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }
}

fn read_json(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[test]
fn open_with_registry_creates_file_with_empty_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    let mut registry = TableRegistry::new();
    registry.register_name("user").unwrap();
    registry.register::<Invoice>().unwrap();

    DocumentStore::open_with_registry(StoreOptions::new(&path), &registry).unwrap();

    assert_eq!(
        read_json(&path),
        json!([
            { "table": "user", "data": [] },
            { "table": "invoice", "data": [] }
        ])
    );
}

#[test]
fn empty_registry_still_creates_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");

    DocumentStore::open_with_registry(StoreOptions::new(&path), &TableRegistry::new()).unwrap();

    assert_eq!(read_json(&path), json!([]));
}

#[test]
fn ensure_tables_keeps_existing_records_and_appends_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    let existing = json!([
        { "table": "user", "data": [{ "id": "5f1c3a52-7f0e-4c55-9d43-0e8f1f6f2b10", "name": "Ann" }] }
    ]);
    std::fs::write(&path, serde_json::to_vec(&existing).unwrap()).unwrap();

    let store = DocumentStore::open(StoreOptions::new(&path)).unwrap();
    let mut registry = TableRegistry::new();
    registry.register_name("user").unwrap();
    registry.register_name("order").unwrap();

    let added = registry.ensure_tables(&store).unwrap();
    assert_eq!(added, vec!["order"]);
    assert_eq!(
        read_json(&path),
        json!([
            { "table": "user", "data": [{ "id": "5f1c3a52-7f0e-4c55-9d43-0e8f1f6f2b10", "name": "Ann" }] },
            { "table": "order", "data": [] }
        ])
    );

    assert!(registry.ensure_tables(&store).unwrap().is_empty());
}

#[test]
fn bootstrap_refuses_document_with_duplicate_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    let duplicated = json!([
        { "table": "user", "data": [] },
        { "table": "user", "data": [] }
    ]);
    std::fs::write(&path, serde_json::to_vec(&duplicated).unwrap()).unwrap();
    let before = std::fs::read(&path).unwrap();

    let mut registry = TableRegistry::new();
    registry.register_name("user").unwrap();
    let err = DocumentStore::open_with_registry(StoreOptions::new(&path), &registry).unwrap_err();

    assert!(matches!(err, DbError::DuplicateTable(name) if name == "user"));
    assert_eq!(std::fs::read(&path).unwrap(), before);
}
