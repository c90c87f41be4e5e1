use crate::error::AppError;
use crate::storage::lock::{DEFAULT_LOCK_TIMEOUT_MS, StoreLock};
use crate::storage::{HEADER, ReadOutcome, Record, StorageBackend};
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Stores the collection as a CSV file with a header row.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so readers see either the old or the new collection.
/// Mutations are serialised through `<file>.lock`.
#[derive(Debug, Clone)]
pub struct CsvBackend {
    path: PathBuf,
    lock_timeout_ms: u64,
}

impl CsvBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn csv_error(&self, err: csv::Error) -> AppError {
        let message = format!("{}: {}", self.path.display(), err);
        if err.is_io_error() {
            AppError::io(message)
        } else {
            AppError::invalid_data(message)
        }
    }
}

impl StorageBackend for CsvBackend {
    fn read_all(&self) -> Result<ReadOutcome, AppError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(ReadOutcome::Missing),
            Err(err) => {
                return Err(AppError::io(format!("{}: {}", self.path.display(), err)));
            }
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut records = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let row = result.map_err(|err| self.csv_error(err))?;
            if index == 0 {
                if !row.iter().eq(HEADER) {
                    tracing::debug!(path = %self.path.display(), "first row is not the expected header");
                }
                continue;
            }
            records.push(row.iter().map(str::to_string).collect());
        }

        tracing::debug!(path = %self.path.display(), rows = records.len(), "read task file");
        Ok(ReadOutcome::Records(records))
    }

    fn write_all(&self, records: &[Record]) -> Result<(), AppError> {
        let dir = self.parent_dir();
        std::fs::create_dir_all(dir).map_err(|err| AppError::io(err.to_string()))?;

        // NamedTempFile is created with mode 0600 on Unix; the rename keeps it.
        let mut temp = NamedTempFile::new_in(dir)
            .map_err(|err| AppError::io(format!("{}: {}", dir.display(), err)))?;
        {
            let mut writer = csv::Writer::from_writer(temp.as_file_mut());
            writer
                .write_record(HEADER)
                .map_err(|err| self.csv_error(err))?;
            for record in records {
                writer
                    .write_record(record)
                    .map_err(|err| self.csv_error(err))?;
            }
            writer.flush().map_err(|err| AppError::io(err.to_string()))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|err| AppError::io(err.to_string()))?;

        temp.persist(&self.path)
            .map_err(|err| AppError::io(format!("{}: {}", self.path.display(), err.error)))?;

        tracing::debug!(path = %self.path.display(), rows = records.len(), "wrote task file");
        Ok(())
    }

    fn lock(&self) -> Result<StoreLock, AppError> {
        StoreLock::acquire(&self.lock_path(), self.lock_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::CsvBackend;
    use crate::storage::{ReadOutcome, Record, StorageBackend};
    use std::fs;
    use tempfile::TempDir;

    fn record(values: &[&str]) -> Record {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn missing_file_reads_as_missing() {
        let dir = TempDir::new().unwrap();
        let backend = CsvBackend::new(dir.path().join("tasks.csv"));

        assert_eq!(backend.read_all().unwrap(), ReadOutcome::Missing);
    }

    #[test]
    fn empty_and_header_only_files_have_no_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.csv");
        let backend = CsvBackend::new(&path);

        fs::write(&path, "").unwrap();
        assert_eq!(backend.read_all().unwrap(), ReadOutcome::Records(Vec::new()));

        fs::write(&path, "ID,Description,CreatedAt,IsComplete\n").unwrap();
        assert_eq!(backend.read_all().unwrap(), ReadOutcome::Records(Vec::new()));
    }

    #[test]
    fn write_all_puts_header_first() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.csv");
        let backend = CsvBackend::new(&path);

        backend
            .write_all(&[record(&["1", "buy milk", "2025-12-20 09:30:00", "false"])])
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "ID,Description,CreatedAt,IsComplete",
                "1,buy milk,2025-12-20 09:30:00,false"
            ]
        );
    }

    #[test]
    fn quoted_descriptions_survive_round_trip() {
        let dir = TempDir::new().unwrap();
        let backend = CsvBackend::new(dir.path().join("tasks.csv"));
        let records = vec![
            record(&["1", "milk, eggs, bread", "2025-12-20 09:30:00", "false"]),
            record(&["2", "say \"hi\"\nthen leave", "2025-12-20 09:31:00", "true"]),
        ];

        backend.write_all(&records).unwrap();

        assert_eq!(backend.read_all().unwrap(), ReadOutcome::Records(records));
    }

    #[test]
    fn write_all_replaces_previous_content() {
        let dir = TempDir::new().unwrap();
        let backend = CsvBackend::new(dir.path().join("tasks.csv"));

        backend
            .write_all(&[
                record(&["1", "a", "2025-12-20 09:30:00", "false"]),
                record(&["2", "b", "2025-12-20 09:30:00", "false"]),
            ])
            .unwrap();
        backend
            .write_all(&[record(&["2", "b", "2025-12-20 09:30:00", "true"])])
            .unwrap();

        assert_eq!(
            backend.read_all().unwrap(),
            ReadOutcome::Records(vec![record(&["2", "b", "2025-12-20 09:30:00", "true"])])
        );
    }

    #[test]
    fn write_all_leaves_no_temporary_files() {
        let dir = TempDir::new().unwrap();
        let backend = CsvBackend::new(dir.path().join("tasks.csv"));

        backend.write_all(&[]).unwrap();
        backend.write_all(&[]).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["tasks.csv".to_string()]);
    }

    #[test]
    fn write_all_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("tasks.csv");
        let backend = CsvBackend::new(&path);

        backend.write_all(&[]).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn ragged_rows_are_returned_for_the_caller_to_judge() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.csv");
        fs::write(
            &path,
            "ID,Description,CreatedAt,IsComplete\n1,ok,2025-12-20 09:30:00,false\n2,short\n\n",
        )
        .unwrap();

        let outcome = CsvBackend::new(&path).read_all().unwrap();

        assert_eq!(
            outcome,
            ReadOutcome::Records(vec![
                record(&["1", "ok", "2025-12-20 09:30:00", "false"]),
                record(&["2", "short"]),
            ])
        );
    }

    #[test]
    fn failed_write_keeps_existing_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("tasks.csv");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep.txt"), "keep").unwrap();

        let err = CsvBackend::new(&target).write_all(&[]).unwrap_err();

        assert_eq!(err.code(), "io_error");
        assert_eq!(fs::read_to_string(target.join("keep.txt")).unwrap(), "keep");
    }

    #[test]
    fn lock_uses_sibling_lock_file() {
        let dir = TempDir::new().unwrap();
        let backend = CsvBackend::new(dir.path().join("tasks.csv")).with_lock_timeout(60);

        let lock = backend.lock().unwrap();
        assert_eq!(lock.path(), Some(dir.path().join("tasks.csv.lock").as_path()));

        let err = backend.lock().unwrap_err();
        assert_eq!(err.code(), "lock_timeout");
    }
}
