mod common;

use std::fs;
use std::sync::Arc;

use dropsave_core::{JobRecord, JobStatus, JobTable};
use dropsave_engine::{
    ensure_state_dir, FileBackend, JobStore, MemoryBackend, StateDir, StorageBackend, TASKS_KEY,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn record(id: &str) -> JobRecord {
    JobRecord::added(format!("/{id}.txt"), format!("http://x/{id}"), id, 7)
}

#[test]
fn file_store_survives_reopen() {
    common::init_logging();
    let temp = TempDir::new().unwrap();
    let state_dir = temp.path().join("state");

    {
        let store = JobStore::open(Arc::new(FileBackend::new(&state_dir)));
        store.put("J1", record("J1")).unwrap();
        store.put("J2", record("J2")).unwrap();
        store.delete("J1").unwrap();
    }

    let reopened = JobStore::open(Arc::new(FileBackend::new(&state_dir)));
    let jobs = reopened.get();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs.get("J2"), Some(&record("J2")));
    assert!(state_dir.join("tasks.json").is_file());
}

#[test]
fn persisted_layout_is_single_tasks_entry() {
    common::init_logging();
    let backend = Arc::new(MemoryBackend::new());
    let store = JobStore::open(backend.clone());

    store.put("J1", record("J1")).unwrap();

    let raw = backend.read(TASKS_KEY).unwrap().expect("tasks entry");
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["J1"]["status"], "added");
    assert_eq!(value["J1"]["path"], "/J1.txt");
}

#[test]
fn corrupt_state_loads_empty_and_is_kept_aside() {
    common::init_logging();
    let backend = Arc::new(MemoryBackend::with_entry(TASKS_KEY, "{not json"));

    let store = JobStore::open(backend.clone());
    assert!(store.get().is_empty());
    store.put("J1", record("J1")).unwrap();

    assert_eq!(backend.corrupt_copy(TASKS_KEY).as_deref(), Some("{not json"));
    assert_eq!(store.get().len(), 1);
}

#[test]
fn unknown_status_in_file_is_preserved_before_overwrite() {
    common::init_logging();
    let temp = TempDir::new().unwrap();
    let state = StateDir::new(temp.path());
    let raw = r#"{"J1":{"path":"/a","url":"http://x/a","id":"J1","status":"paused"}}"#;
    state.write(TASKS_KEY, raw).unwrap();

    let store = JobStore::open(Arc::new(FileBackend::new(temp.path())));
    store.put("J2", record("J2")).unwrap();

    assert_eq!(fs::read_to_string(state.corrupt_path(TASKS_KEY)).unwrap(), raw);
    assert_eq!(store.get().len(), 1);
}

#[test]
fn stores_sharing_a_directory_see_each_others_writes() {
    common::init_logging();
    let temp = TempDir::new().unwrap();
    let backend = FileBackend::new(temp.path().join("state"));
    let watcher = JobStore::open(Arc::new(backend.clone()));
    let submitter = JobStore::open(Arc::new(backend.clone()));
    watcher.put("J1", record("J1")).unwrap();

    submitter.put("J2", record("J2")).unwrap();
    let mut done = record("J1");
    done.status = Some(JobStatus::Complete);
    watcher.put("J1", done.clone()).unwrap();

    let raw = fs::read_to_string(backend.path_for(TASKS_KEY)).unwrap();
    let on_disk: JobTable = serde_json::from_str(&raw).unwrap();
    assert_eq!(on_disk.len(), 2);
    assert_eq!(on_disk.get("J1"), Some(&done));
    assert_eq!(on_disk.get("J2"), Some(&record("J2")));
    assert_eq!(submitter.get(), on_disk);
}

#[test]
fn job_deleted_elsewhere_is_not_written_back() {
    common::init_logging();
    let temp = TempDir::new().unwrap();
    let backend = FileBackend::new(temp.path());
    let watcher = JobStore::open(Arc::new(backend.clone()));
    watcher.put("J1", record("J1")).unwrap();
    watcher.put("J2", record("J2")).unwrap();

    let other = JobStore::open(Arc::new(backend));
    other.delete("J1").unwrap();
    watcher.put("J3", record("J3")).unwrap();

    let jobs = watcher.get();
    assert!(!jobs.contains("J1"));
    assert!(jobs.contains("J2"));
    assert!(jobs.contains("J3"));
}

#[test]
fn concurrent_writers_lose_nothing() {
    common::init_logging();
    let temp = TempDir::new().unwrap();
    let dir = temp.path().to_path_buf();

    let writers: Vec<_> = (0..4)
        .map(|writer| {
            let dir = dir.clone();
            std::thread::spawn(move || {
                let store = JobStore::open(Arc::new(FileBackend::new(dir)));
                for n in 0..5 {
                    let id = format!("W{writer}-{n}");
                    store.put(id.clone(), record(&id)).unwrap();
                }
            })
        })
        .collect();
    for handle in writers {
        handle.join().unwrap();
    }

    let jobs = JobStore::open(Arc::new(FileBackend::new(&dir))).get();
    assert_eq!(jobs.len(), 20);
}

#[test]
fn empty_merge_and_missing_delete_write_nothing() {
    common::init_logging();
    let backend = Arc::new(MemoryBackend::new());
    let store = JobStore::open(backend.clone());
    store.put("J1", record("J1")).unwrap();
    assert_eq!(backend.write_count(), 1);

    assert_eq!(store.merge(JobTable::new()).unwrap(), 0);
    assert_eq!(store.delete("nope").unwrap(), None);

    assert_eq!(backend.write_count(), 1);
}

#[test]
fn merge_is_idempotent_and_overwrites_only_given_keys() {
    common::init_logging();
    let store = JobStore::open(Arc::new(MemoryBackend::new()));
    store.put("J1", record("J1")).unwrap();
    store.put("J2", record("J2")).unwrap();
    let mut done = record("J1");
    done.status = Some(JobStatus::Complete);
    let partial: JobTable = [("J1".to_string(), done.clone())].into_iter().collect();

    store.merge(partial.clone()).unwrap();
    let once = store.get();
    store.merge(partial).unwrap();

    assert_eq!(store.get(), once);
    assert_eq!(once.get("J1"), Some(&done));
    assert_eq!(once.get("J2"), Some(&record("J2")));
}

#[test]
fn failed_write_leaves_store_unchanged() {
    common::init_logging();
    let temp = TempDir::new().unwrap();
    let not_a_dir = temp.path().join("plain_file");
    fs::write(&not_a_dir, "x").unwrap();
    let store = JobStore::open(Arc::new(FileBackend::new(&not_a_dir)));

    let result = store.put("J1", record("J1"));

    assert!(result.is_err());
    assert!(store.get().is_empty());
}

#[test]
fn creates_missing_state_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("nested").join("state");
    assert!(!new_dir.exists());
    ensure_state_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn state_dir_replaces_entry_file() {
    let temp = TempDir::new().unwrap();
    let state = StateDir::new(temp.path());

    let first = state.write(TASKS_KEY, "{}").unwrap();
    let second = state.write(TASKS_KEY, "{\"a\":1}").unwrap();

    assert_eq!(first, second);
    assert_eq!(first, temp.path().join("tasks.json"));
    assert_eq!(state.read(TASKS_KEY).unwrap().as_deref(), Some("{\"a\":1}"));
    assert_eq!(state.read("missing").unwrap(), None);
}

#[test]
fn entry_lock_is_released_on_drop() {
    let temp = TempDir::new().unwrap();
    let state = StateDir::new(temp.path().join("state"));

    let first = state.lock(TASKS_KEY).unwrap();
    drop(first);
    let second = state.lock(TASKS_KEY);

    assert!(second.is_ok());
    assert!(temp.path().join("state").join("tasks.lock").is_file());
}
