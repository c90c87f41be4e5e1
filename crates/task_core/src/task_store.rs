use crate::error::AppError;
use crate::model::{Task, now_timestamp};
use crate::storage::record::{self, Record};
use crate::storage::{ReadOutcome, StorageBackend, StoreLock};
use std::collections::HashSet;

/// A persisted row that could not be turned into a task during load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// 1-based position in the file, counting the header as row 1.
    pub row: usize,
    pub reason: String,
}

/// The task collection for one invocation.
///
/// The collection is read from the backend on first access and written back
/// in full after every successful mutation. Mutations take the backend's lock,
/// re-read the collection and hold the lock until after the write.
pub struct TaskStore<B> {
    backend: B,
    tasks: Vec<Task>,
    skipped: Vec<SkippedRecord>,
    loaded: bool,
}

impl<B: StorageBackend> TaskStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            tasks: Vec::new(),
            skipped: Vec::new(),
            loaded: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Tasks currently held in memory, in stored order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Rows dropped by the last load.
    pub fn skipped_records(&self) -> &[SkippedRecord] {
        &self.skipped
    }

    pub fn load(&mut self) -> Result<(), AppError> {
        if self.loaded {
            return Ok(());
        }

        let records = match self.backend.read_all()? {
            ReadOutcome::Missing => {
                tracing::debug!("task file does not exist yet, starting empty");
                Vec::new()
            }
            ReadOutcome::Records(records) => records,
        };

        let mut tasks = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();
        let mut seen = HashSet::new();

        for (index, fields) in records.iter().enumerate() {
            let row = index + 2;
            let reason = match record::decode(fields) {
                Ok(task) if seen.insert(task.id) => {
                    tasks.push(task);
                    continue;
                }
                Ok(task) => format!("duplicate ID {}", task.id),
                Err(err) => err.message().to_string(),
            };

            tracing::warn!(row, %reason, "skipping malformed task record");
            skipped.push(SkippedRecord { row, reason });
        }

        tracing::debug!(tasks = tasks.len(), skipped = skipped.len(), "loaded tasks");
        self.tasks = tasks;
        self.skipped = skipped;
        self.loaded = true;
        Ok(())
    }

    pub fn add(&mut self, description: &str) -> Result<Task, AppError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(AppError::invalid_input("description is required"));
        }

        let _lock = self.lock_and_reload()?;

        let task = Task::new(self.next_id()?, description, now_timestamp()?);
        self.tasks.push(task.clone());
        self.persist()?;

        tracing::debug!(id = task.id, "added task");
        Ok(task)
    }

    /// Tasks in stored order, leaving out completed ones unless asked.
    pub fn list(
        &mut self,
        include_completed: bool,
    ) -> Result<impl Iterator<Item = &Task> + '_, AppError> {
        self.load()?;
        Ok(self
            .tasks
            .iter()
            .filter(move |task| include_completed || !task.is_complete))
    }

    /// Mark a task complete. Completing an already completed task succeeds.
    pub fn complete(&mut self, id: u64) -> Result<Task, AppError> {
        let _lock = self.lock_and_reload()?;

        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| AppError::task_not_found(id))?;
        task.is_complete = true;
        let completed = task.clone();
        self.persist()?;

        tracing::debug!(id, "completed task");
        Ok(completed)
    }

    pub fn delete(&mut self, id: u64) -> Result<Task, AppError> {
        let _lock = self.lock_and_reload()?;

        let index = self
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| AppError::task_not_found(id))?;
        let removed = self.tasks.remove(index);
        self.persist()?;

        tracing::debug!(id, "deleted task");
        Ok(removed)
    }

    /// `max(ids) + 1`, or 1 for an empty collection. Deleting the highest id
    /// lets the next add reuse it.
    fn next_id(&self) -> Result<u64, AppError> {
        match self.tasks.iter().map(|task| task.id).max() {
            None => Ok(1),
            Some(max) => max
                .checked_add(1)
                .ok_or_else(|| AppError::invalid_data("task ID space exhausted")),
        }
    }

    /// Take the backend lock and re-read the collection under it, so a
    /// mutation never writes back rows read before the lock was held.
    fn lock_and_reload(&mut self) -> Result<StoreLock, AppError> {
        let lock = self.backend.lock()?;
        self.loaded = false;
        self.load()?;
        Ok(lock)
    }

    fn persist(&mut self) -> Result<(), AppError> {
        let records: Vec<Record> = self.tasks.iter().map(record::encode).collect();
        if let Err(err) = self.backend.write_all(&records) {
            // The durable copy is untouched; drop ours so it is re-read.
            self.tasks.clear();
            self.skipped.clear();
            self.loaded = false;
            return Err(err);
        }
        Ok(())
    }
}
