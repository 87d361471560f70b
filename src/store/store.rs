use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::models::{NewTask, Task, TaskPatch, TaskStatus};

use super::error::Result;
use super::keys::{decode_task_key, encode_file_key, encode_task_key};

/// Fjall-backed persistent storage for task documents
///
/// The store is pure CRUD; state-machine rules live in the worker. Each
/// mutation merges into the existing record and refreshes `updated_at`.
#[derive(Clone)]
pub struct TaskStore {
    keyspace: Keyspace,
    tasks: PartitionHandle,
    files: PartitionHandle,
    /// Serializes get-then-put merges; without it a worker's terminal write
    /// and a handler's flag patch can overwrite each other's fields.
    write_lock: Arc<Mutex<()>>,
}

impl TaskStore {
    /// Open or create a task store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening task store at: {}", path.display());

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;

        let tasks = keyspace.open_partition("tasks", PartitionCreateOptions::default())?;
        let files = keyspace.open_partition("files", PartitionCreateOptions::default())?;

        info!("Task store opened successfully");
        Ok(Self {
            keyspace,
            tasks,
            files,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Create a new pending task and persist it.
    ///
    /// The identifier is assigned here and is the only external handle to
    /// the task from then on.
    pub fn create(&self, input: NewTask) -> Result<Task> {
        let now = Utc::now();
        let task = Task {
            id: new_task_id(),
            url: input.url,
            just_audio: input.just_audio,
            check_codec: input.check_codec,
            status: TaskStatus::Pending,
            file: None,
            name: None,
            is_h265: None,
            thumbnail: None,
            duration: None,
            uploader: None,
            has_bars: None,
            error: None,
            raw: None,
            created_at: now,
            updated_at: now,
        };

        self.put(&task)?;
        debug!(task_id = %task.id, "Created task");
        Ok(task)
    }

    /// Get a task by id. Malformed ids are simply not found.
    pub fn get(&self, task_id: &str) -> Result<Option<Task>> {
        let key = encode_task_key(task_id);
        match self.tasks.get(key)? {
            Some(value) => {
                let task = serde_json::from_slice(&value)?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    /// All tasks, newest first.
    pub fn list_all(&self) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        for item in self.tasks.iter() {
            let (key, value) = item?;
            if decode_task_key(&key).is_none() {
                continue;
            }
            let task: Task = serde_json::from_slice(&value)?;
            tasks.push(task);
        }
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }

    /// Merge a patch into the task and refresh `updated_at`.
    ///
    /// The merge is atomic per record: the lock keeps concurrent patches
    /// (worker terminal write, `hasBars` flag, replaced-file clear) from
    /// reading stale state and dropping each other's fields.
    ///
    /// Returns `Ok(false)` when the record no longer exists — a task may be
    /// deleted while its download is still in flight, and the terminal write
    /// must tolerate that instead of recreating the record.
    pub fn update(&self, task_id: &str, patch: TaskPatch) -> Result<bool> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let Some(mut task) = self.get(task_id)? else {
            return Ok(false);
        };

        task.apply(patch);
        task.updated_at = Utc::now();
        self.put(&task)?;

        debug!(task_id = %task.id, status = ?task.status, "Updated task");
        Ok(true)
    }

    /// Same merge semantics as [`TaskStore::update`], located via the
    /// produced file name instead of the id.
    pub fn update_by_file(&self, file_name: &str, patch: TaskPatch) -> Result<bool> {
        let key = encode_file_key(file_name);
        let Some(value) = self.files.get(key)? else {
            return Ok(false);
        };
        let task_id = String::from_utf8_lossy(&value).to_string();
        self.update(&task_id, patch)
    }

    /// Remove a task record. Idempotent: deleting an unknown id succeeds.
    ///
    /// Takes the same lock as [`TaskStore::update`] so an in-flight merge
    /// cannot resurrect a record that was deleted between its read and write.
    pub fn delete(&self, task_id: &str) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(task) = self.get(task_id)? {
            if let Some(file) = &task.file {
                self.files.remove(encode_file_key(file))?;
            }
        }
        self.tasks.remove(encode_task_key(task_id))?;
        debug!(task_id, "Deleted task");
        Ok(())
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Health check - verify the keyspace is readable
    pub fn health_check(&self) -> Result<()> {
        let _ = self.tasks.get(b"task:")?;
        Ok(())
    }

    fn put(&self, task: &Task) -> Result<()> {
        let key = encode_task_key(&task.id);
        let value = serde_json::to_vec(task)?;
        self.tasks.insert(key, value)?;

        // Keep the file-name index in step with the record
        if let Some(file) = &task.file {
            self.files.insert(encode_file_key(file), task.id.as_bytes())?;
        }

        Ok(())
    }
}

/// Fresh 24-character lowercase-hex task identifier.
fn new_task_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..24].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::TaskError;
    use tempfile::TempDir;

    fn create_test_store() -> (TaskStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = TaskStore::open(temp_dir.path().join("test_tasks")).unwrap();
        (store, temp_dir)
    }

    fn new_input(url: &str) -> NewTask {
        NewTask {
            url: url.to_string(),
            just_audio: false,
            check_codec: false,
        }
    }

    #[test]
    fn test_create_assigns_id_and_pending_status() {
        let (store, _temp) = create_test_store();

        let task = store.create(new_input("https://example.com/v")).unwrap();

        assert_eq!(task.id.len(), 24);
        assert!(task.id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.file.is_none());
        assert!(task.error.is_none());
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn test_create_and_get() {
        let (store, _temp) = create_test_store();

        let created = store.create(new_input("https://example.com/v")).unwrap();
        let fetched = store.get(&created.id).unwrap().unwrap();

        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.url, "https://example.com/v");
    }

    #[test]
    fn test_get_nonexistent_and_malformed() {
        let (store, _temp) = create_test_store();
        assert!(store.get("0123456789abcdef01234567").unwrap().is_none());
        assert!(store.get("not-even-an-id").unwrap().is_none());
    }

    #[test]
    fn test_list_all_newest_first() {
        let (store, _temp) = create_test_store();

        let first = store.create(new_input("https://example.com/1")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = store.create(new_input("https://example.com/2")).unwrap();

        let tasks = store.list_all().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, second.id);
        assert_eq!(tasks[1].id, first.id);
    }

    #[test]
    fn test_update_merges_and_bumps_updated_at() {
        let (store, _temp) = create_test_store();
        let task = store.create(new_input("https://example.com/v")).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        let found = store
            .update(&task.id, TaskPatch::status(TaskStatus::Downloading))
            .unwrap();
        assert!(found);

        let updated = store.get(&task.id).unwrap().unwrap();
        assert_eq!(updated.status, TaskStatus::Downloading);
        assert_eq!(updated.url, task.url);
        assert!(updated.updated_at > task.updated_at);
    }

    #[test]
    fn test_update_missing_record_is_noop() {
        let (store, _temp) = create_test_store();
        let found = store
            .update(
                "0123456789abcdef01234567",
                TaskPatch::status(TaskStatus::Done),
            )
            .unwrap();
        assert!(!found);
    }

    #[test]
    fn test_update_by_file() {
        let (store, _temp) = create_test_store();
        let task = store.create(new_input("https://example.com/v")).unwrap();

        let file = format!("{}.mp4", task.id);
        store
            .update(
                &task.id,
                TaskPatch {
                    status: Some(TaskStatus::Done),
                    file: Some(file.clone()),
                    ..TaskPatch::default()
                },
            )
            .unwrap();

        let found = store
            .update_by_file(
                &file,
                TaskPatch {
                    has_bars: Some(false),
                    ..TaskPatch::default()
                },
            )
            .unwrap();
        assert!(found);

        let updated = store.get(&task.id).unwrap().unwrap();
        assert_eq!(updated.has_bars, Some(false));

        assert!(
            !store
                .update_by_file("unknown.mp4", TaskPatch::default())
                .unwrap()
        );
    }

    #[test]
    fn test_error_patch_leaves_result_fields_empty() {
        let (store, _temp) = create_test_store();
        let task = store.create(new_input("https://example.com/v")).unwrap();

        store
            .update(
                &task.id,
                TaskPatch {
                    status: Some(TaskStatus::Error),
                    error: Some(TaskError::new("DOWNLOAD_FAILED", "exit status 1")),
                    ..TaskPatch::default()
                },
            )
            .unwrap();

        let failed = store.get(&task.id).unwrap().unwrap();
        assert_eq!(failed.status, TaskStatus::Error);
        assert_eq!(failed.error.as_ref().unwrap().code, "DOWNLOAD_FAILED");
        assert!(failed.file.is_none());
        assert!(failed.name.is_none());
        assert!(failed.is_h265.is_none());
    }

    #[test]
    fn test_delete_is_idempotent_and_clears_file_index() {
        let (store, _temp) = create_test_store();
        let task = store.create(new_input("https://example.com/v")).unwrap();
        let file = format!("{}.mp4", task.id);

        store
            .update(
                &task.id,
                TaskPatch {
                    file: Some(file.clone()),
                    ..TaskPatch::default()
                },
            )
            .unwrap();

        store.delete(&task.id).unwrap();
        assert!(store.get(&task.id).unwrap().is_none());
        assert!(!store.update_by_file(&file, TaskPatch::default()).unwrap());

        // Second delete of the same id is not an error
        store.delete(&task.id).unwrap();
    }

    #[test]
    fn test_concurrent_merges_keep_both_writers_fields() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        let (store, _temp) = create_test_store();

        // A worker's terminal write racing a hasBars flag patch on the same
        // record: after both land, neither writer's fields may be missing.
        for _ in 0..100 {
            let task = store.create(new_input("https://example.com/v")).unwrap();
            let file = format!("{}.mp4", task.id);
            let barrier = Arc::new(Barrier::new(2));

            let terminal = {
                let store = store.clone();
                let task_id = task.id.clone();
                let file = file.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    store
                        .update(
                            &task_id,
                            TaskPatch {
                                status: Some(TaskStatus::Done),
                                file: Some(file),
                                ..TaskPatch::default()
                            },
                        )
                        .unwrap();
                })
            };

            let flag = {
                let store = store.clone();
                let task_id = task.id.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    store
                        .update(
                            &task_id,
                            TaskPatch {
                                has_bars: Some(true),
                                ..TaskPatch::default()
                            },
                        )
                        .unwrap();
                })
            };

            terminal.join().unwrap();
            flag.join().unwrap();

            let merged = store.get(&task.id).unwrap().unwrap();
            assert_eq!(merged.status, TaskStatus::Done);
            assert_eq!(merged.file.as_deref(), Some(file.as_str()));
            assert_eq!(merged.has_bars, Some(true));
        }
    }

    #[test]
    fn test_persistence_across_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tasks");

        let id = {
            let store = TaskStore::open(&path).unwrap();
            let task = store.create(new_input("https://example.com/v")).unwrap();
            store.persist().unwrap();
            task.id
        };

        let store = TaskStore::open(&path).unwrap();
        let task = store.get(&id).unwrap().unwrap();
        assert_eq!(task.url, "https://example.com/v");
    }
}
