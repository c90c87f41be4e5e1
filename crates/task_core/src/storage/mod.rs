//! Persistence for the task collection.
//!
//! A [`StorageBackend`] reads and writes the whole collection as flat
//! [`Record`]s. It never sees [`Task`](crate::model::Task) values; the
//! [`record`] codec converts between the two.

pub mod csv_store;
pub mod lock;
pub mod memory;
pub mod record;

use crate::error::AppError;
pub use lock::StoreLock;
pub use record::{HEADER, Record};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The backing resource has never been written.
    Missing,
    /// Data rows in stored order, header excluded.
    Records(Vec<Record>),
}

pub trait StorageBackend {
    fn read_all(&self) -> Result<ReadOutcome, AppError>;

    /// Replace the stored content with [`HEADER`] followed by `records`.
    ///
    /// On error the previous content must remain intact.
    fn write_all(&self, records: &[Record]) -> Result<(), AppError>;

    /// Take the exclusive lock guarding a load-mutate-save cycle.
    fn lock(&self) -> Result<StoreLock, AppError>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for &B {
    fn read_all(&self) -> Result<ReadOutcome, AppError> {
        (**self).read_all()
    }

    fn write_all(&self, records: &[Record]) -> Result<(), AppError> {
        (**self).write_all(records)
    }

    fn lock(&self) -> Result<StoreLock, AppError> {
        (**self).lock()
    }
}
