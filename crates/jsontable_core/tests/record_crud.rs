use jsontable_core::{
    DocumentStore, JsonRepository, Record, RecordId, RepoError, Repository, StoreOptions,
    TableLookup, TableRegistry,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: Option<RecordId>,
    name: String,
}

impl Record for User {
    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Order {
    id: Option<RecordId>,
    item: String,
    quantity: u32,
}

impl Record for Order {
    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }
}

fn user(name: &str) -> User {
    User {
        id: None,
        name: name.to_string(),
    }
}

fn open_store(dir: &tempfile::TempDir) -> DocumentStore {
    let mut registry = TableRegistry::new();
    registry.register::<User>().unwrap();
    registry.register::<Order>().unwrap();
    DocumentStore::open_with_registry(StoreOptions::new(dir.path().join("db.json")), &registry)
        .unwrap()
}

#[test]
fn save_assigns_id_and_get_by_id_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let repo = JsonRepository::<User>::try_new(&store).unwrap();

    let mut ann = user("Ann");
    let id = repo.save(&mut ann).unwrap();
    assert_eq!(ann.id, Some(id));

    let loaded = repo.get_by_id(id).unwrap().unwrap();
    assert_eq!(loaded, ann);
}

#[test]
fn save_with_existing_id_updates_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let repo = JsonRepository::<User>::try_new(&store).unwrap();

    let mut first = user("first");
    let mut ann = user("Ann");
    let mut last = user("last");
    repo.save(&mut first).unwrap();
    let id = repo.save(&mut ann).unwrap();
    repo.save(&mut last).unwrap();

    let mut renamed = User {
        id: Some(id),
        name: "Annie".to_string(),
    };
    assert_eq!(repo.save(&mut renamed).unwrap(), id);

    let all = repo.get_all().unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[1], renamed);
    assert_eq!(all.iter().filter(|u| u.id == Some(id)).count(), 1);
}

#[test]
fn save_with_unseen_caller_id_inserts() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let repo = JsonRepository::<User>::try_new(&store).unwrap();

    let chosen = Uuid::new_v4();
    let mut imported = User {
        id: Some(chosen),
        name: "imported".to_string(),
    };
    assert_eq!(repo.save(&mut imported).unwrap(), chosen);
    assert_eq!(repo.count().unwrap(), 1);
    assert!(repo.exists(chosen).unwrap());
}

#[test]
fn delete_missing_id_returns_false_and_keeps_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let repo = JsonRepository::<User>::try_new(&store).unwrap();
    repo.save(&mut user("Ann")).unwrap();

    let before = std::fs::read(store.path()).unwrap();
    assert!(!repo.delete_by_id(Uuid::new_v4()).unwrap());
    assert_eq!(std::fs::read(store.path()).unwrap(), before);
}

#[test]
fn delete_present_id_removes_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let repo = JsonRepository::<User>::try_new(&store).unwrap();

    let id = repo.save(&mut user("Ann")).unwrap();
    let other = repo.save(&mut user("Bob")).unwrap();

    assert!(repo.delete_by_id(id).unwrap());
    assert_eq!(store.last_operated_id(), Some(id));
    assert!(repo.get_by_id(id).unwrap().is_none());
    assert!(repo.get_by_id(other).unwrap().is_some());
}

#[test]
fn last_operated_id_ignores_failed_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let repo = JsonRepository::<User>::try_new(&store).unwrap();

    let id = repo.save(&mut user("Ann")).unwrap();
    assert!(!repo.delete_by_id(Uuid::new_v4()).unwrap());
    assert_eq!(store.last_operated_id(), Some(id));
}

#[test]
fn save_then_get_all_survives_fresh_store_handle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    let saved = {
        let store = open_store(&dir);
        let repo = JsonRepository::<User>::try_new(&store).unwrap();
        let mut ann = user("Ann");
        repo.save(&mut ann).unwrap();

        let all = repo.get_all().unwrap();
        assert_eq!(all, vec![ann.clone()]);
        ann
    };

    let reopened = DocumentStore::open(StoreOptions::new(&path)).unwrap();
    let repo = JsonRepository::<User>::try_new(&reopened).unwrap();
    assert_eq!(repo.get_all().unwrap(), vec![saved]);
}

#[test]
fn replace_all_with_missing_id_leaves_file_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let repo = JsonRepository::<User>::try_new(&store).unwrap();
    repo.save(&mut user("Ann")).unwrap();

    let before = std::fs::read(store.path()).unwrap();
    let records = vec![
        User {
            id: Some(Uuid::new_v4()),
            name: "ok".to_string(),
        },
        user("no id"),
    ];
    let err = repo.replace_all(&records).unwrap_err();

    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(std::fs::read(store.path()).unwrap(), before);
}

#[test]
fn replace_all_overwrites_table() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let repo = JsonRepository::<User>::try_new(&store).unwrap();
    repo.save(&mut user("Ann")).unwrap();

    let replacement = vec![User {
        id: Some(Uuid::new_v4()),
        name: "Zed".to_string(),
    }];
    repo.replace_all(&replacement).unwrap();

    assert_eq!(repo.get_all().unwrap(), replacement);
}

#[test]
fn tables_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let users = JsonRepository::<User>::try_new(&store).unwrap();
    let orders = JsonRepository::<Order>::try_new(&store).unwrap();

    let mut order = Order {
        id: None,
        item: "book".to_string(),
        quantity: 2,
    };
    let order_id = orders.save(&mut order).unwrap();
    users.save(&mut user("Ann")).unwrap();
    users.save(&mut user("Bob")).unwrap();

    assert_eq!(orders.get_all().unwrap(), vec![order]);
    assert!(users.get_by_id(order_id).unwrap().is_none());
    assert_eq!(users.count().unwrap(), 2);
}

#[test]
fn duplicate_ids_on_disk_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::open(StoreOptions::new(dir.path().join("db.json"))).unwrap();
    let id = Uuid::new_v4();
    let raw = serde_json::json!([{
        "table": "user",
        "data": [
            { "id": id.to_string(), "name": "a" },
            { "id": id.to_string(), "name": "b" }
        ]
    }]);
    std::fs::write(store.path(), serde_json::to_vec(&raw).unwrap()).unwrap();
    let repo = JsonRepository::<User>::try_new(&store).unwrap();

    let err = repo.get_by_id(id).unwrap_err();
    assert!(matches!(err, RepoError::DuplicateId { count: 2, .. }));

    let err = repo
        .save(&mut User {
            id: Some(id),
            name: "c".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, RepoError::DuplicateId { .. }));
}

#[test]
fn unknown_table_reads_empty_but_is_distinguishable() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::open(StoreOptions::new(dir.path().join("db.json"))).unwrap();
    let repo = JsonRepository::<Order>::try_new(&store).unwrap();

    assert!(repo.get_all().unwrap().is_empty());
    assert_eq!(repo.load_table().unwrap(), TableLookup::Unknown);
    assert!(!repo.delete_by_id(Uuid::new_v4()).unwrap());
    assert!(!store.path().exists());
}

#[test]
fn unreadable_document_is_an_error_not_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::open(StoreOptions::new(dir.path().join("db.json"))).unwrap();
    std::fs::write(store.path(), "not json").unwrap();
    let repo = JsonRepository::<User>::try_new(&store).unwrap();

    assert!(matches!(repo.get_all(), Err(RepoError::Db(_))));
    assert!(matches!(
        repo.save(&mut user("Ann")),
        Err(RepoError::Db(_))
    ));
    assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "not json");
}

#[test]
fn concurrent_saves_do_not_lose_updates() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let store = &store;
            scope.spawn(move || {
                let repo = JsonRepository::<User>::try_new(store).unwrap();
                for n in 0..5 {
                    repo.save(&mut user(&format!("w{worker}-{n}"))).unwrap();
                }
            });
        }
    });

    let repo = JsonRepository::<User>::try_new(&store).unwrap();
    assert_eq!(repo.count().unwrap(), 20);
}

#[test]
fn separate_handles_on_one_file_do_not_lose_updates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    drop(open_store(&dir));

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let path = &path;
            scope.spawn(move || {
                let store = DocumentStore::open(StoreOptions::new(path)).unwrap();
                let repo = JsonRepository::<User>::try_new(&store).unwrap();
                for n in 0..5 {
                    repo.save(&mut user(&format!("w{worker}-{n}"))).unwrap();
                }
            });
        }
    });

    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert!(raw.is_array());
    let store = DocumentStore::open(StoreOptions::new(&path)).unwrap();
    let repo = JsonRepository::<User>::try_new(&store).unwrap();
    assert_eq!(repo.count().unwrap(), 20);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn user_and_order_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let users = JsonRepository::<User>::try_new(&store).unwrap();
    let orders = JsonRepository::<Order>::try_new(&store).unwrap();

    let mut ann = user("Ann");
    let id = users.save(&mut ann).unwrap();

    let all = users.get_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, Some(id));
    assert_eq!(all[0].name, "Ann");
    assert!(orders.get_all().unwrap().is_empty());

    assert!(users.delete_by_id(id).unwrap());
    assert!(users.get_all().unwrap().is_empty());
    assert_eq!(orders.load_table().unwrap(), TableLookup::Present(Vec::new()));
    assert_eq!(store.table_names().unwrap(), vec!["user", "order"]);
}
