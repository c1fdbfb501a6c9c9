use marginalia_core::{
    AnnotationDraft, Coordinator, DocumentStore, EntryDraft, MemoryDocumentStore,
    SqliteDocumentStore,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

const WORKERS: usize = 8;
const PER_WORKER: usize = 25;

fn concurrent_creates_get_unique_ids(store: Arc<dyn DocumentStore>) {
    let coordinator = Arc::new(Coordinator::over_store(store));
    let parent = coordinator
        .create_entry(&EntryDraft::new("shared", "parent"))
        .unwrap();

    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let coordinator = Arc::clone(&coordinator);
            let parent_id = parent.id.clone();
            thread::spawn(move || {
                let mut ids = Vec::with_capacity(PER_WORKER * 2);
                for n in 0..PER_WORKER {
                    let entry = coordinator
                        .create_entry(&EntryDraft::new(format!("w{worker}-{n}"), "body"))
                        .unwrap();
                    ids.push(entry.id);
                    let note = coordinator
                        .create_annotation(&parent_id, &AnnotationDraft::unbound("A", "X"))
                        .unwrap();
                    ids.push(note.id);
                }
                ids
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(seen.insert(id), "identifier handed out twice");
        }
    }

    assert_eq!(seen.len(), WORKERS * PER_WORKER * 2);
    assert_eq!(
        coordinator.list_entries().unwrap().len(),
        WORKERS * PER_WORKER + 1
    );
    assert_eq!(
        coordinator.list_annotations(&parent.id).unwrap().len(),
        WORKERS * PER_WORKER
    );

    let deletion = coordinator.delete_entry(&parent.id).unwrap();
    assert_eq!(deletion.annotations.len(), WORKERS * PER_WORKER);
}

#[test]
fn memory_store_handles_parallel_creates() {
    concurrent_creates_get_unique_ids(Arc::new(MemoryDocumentStore::new()));
}

#[test]
fn sqlite_store_handles_parallel_creates() {
    concurrent_creates_get_unique_ids(Arc::new(SqliteDocumentStore::open_in_memory().unwrap()));
}
