use crate::error::AppError;
use crate::storage::{ReadOutcome, Record, StorageBackend, StoreLock};
use std::cell::{Cell, RefCell};

/// Backend that keeps records in memory, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: RefCell<Option<Vec<Record>>>,
    fail_writes: Cell<bool>,
    writes: Cell<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: RefCell::new(Some(records)),
            ..Self::default()
        }
    }

    /// Make subsequent writes fail with an I/O error, leaving content as is.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub fn records(&self) -> Option<Vec<Record>> {
        self.records.borrow().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl StorageBackend for MemoryBackend {
    fn read_all(&self) -> Result<ReadOutcome, AppError> {
        Ok(match self.records.borrow().as_ref() {
            Some(records) => ReadOutcome::Records(records.clone()),
            None => ReadOutcome::Missing,
        })
    }

    fn write_all(&self, records: &[Record]) -> Result<(), AppError> {
        if self.fail_writes.get() {
            return Err(AppError::io("memory backend is read-only"));
        }
        *self.records.borrow_mut() = Some(records.to_vec());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn lock(&self) -> Result<StoreLock, AppError> {
        Ok(StoreLock::unlocked())
    }
}
