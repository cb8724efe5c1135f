pub mod record;

pub use record::{CouponRecord, COLUMNS};

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{} has columns {found:?}, expected {expected:?}", .path.display())]
    SchemaMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Append-only CSV log of coupon mentions.
///
/// Every append holds the mutex for the whole write and emits the row with a
/// single `write_all`, so rows from concurrent handlers never interleave.
/// The header of a non-empty file is re-read before each append.
#[derive(Clone)]
pub struct CouponLog {
    path: Arc<Mutex<PathBuf>>,
}

impl CouponLog {
    /// Open the log at `path`. The file is created lazily on the first append;
    /// if it already has content, its header must match [`COLUMNS`].
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        if has_content(path)? {
            verify_header(path)?;
        }

        info!("Coupon log ready at: {}", path.display());
        Ok(Self {
            path: Arc::new(Mutex::new(path.to_path_buf())),
        })
    }

    /// Append one record, writing the header first if the file is new or empty.
    pub async fn append(&self, record: &CouponRecord) -> Result<(), LedgerError> {
        let path = self.path.lock().await;

        let write_header = !has_content(&path)?;
        if !write_header {
            verify_header(&path)?;
        }

        let row = record::encode_row(record, write_header)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&*path)
            .map_err(|source| io_error(&path, source))?;
        file.write_all(&row)
            .and_then(|_| file.flush())
            .map_err(|source| io_error(&path, source))?;

        if write_header {
            debug!("Wrote coupon log header to {}", path.display());
        }
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> LedgerError {
    LedgerError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn has_content(path: &Path) -> Result<bool, LedgerError> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(meta.len() > 0),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(io_error(path, source)),
    }
}

fn verify_header(path: &Path) -> Result<(), LedgerError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    let found: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    if found.iter().map(String::as_str).ne(COLUMNS) {
        return Err(LedgerError::SchemaMismatch {
            path: path.to_path_buf(),
            expected: COLUMNS.iter().map(|c| c.to_string()).collect(),
            found,
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Read back every row of the log at `path`.
    pub(crate) fn read_records(path: &Path) -> Vec<CouponRecord> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader.deserialize().map(|r| r.unwrap()).collect()
    }

    fn header_count(path: &Path) -> usize {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter(|l| *l == COLUMNS.join(","))
            .count()
    }

    #[tokio::test]
    async fn test_first_append_creates_file_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coupons.csv");
        let log = CouponLog::open(&path).unwrap();
        assert!(!path.exists());

        log.append(&CouponRecord::new("Ana", "cupom SAVE20", "2024-01-15 10:30:00"))
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "display_name,text,formatted_timestamp\nAna,cupom SAVE20,2024-01-15 10:30:00\n"
        );
    }

    #[tokio::test]
    async fn test_header_written_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coupons.csv");
        let log = CouponLog::open(&path).unwrap();

        for i in 0..5 {
            log.append(&CouponRecord::new(format!("user{}", i), "code ABCD", "t"))
                .await
                .unwrap();
        }

        assert_eq!(header_count(&path), 1);
        assert_eq!(read_records(&path).len(), 5);
    }

    #[tokio::test]
    async fn test_reopen_appends_without_new_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coupons.csv");

        CouponLog::open(&path)
            .unwrap()
            .append(&CouponRecord::new("a", "b", "c"))
            .await
            .unwrap();
        CouponLog::open(&path)
            .unwrap()
            .append(&CouponRecord::new("d", "e", "f"))
            .await
            .unwrap();

        assert_eq!(header_count(&path), 1);
        assert_eq!(
            read_records(&path),
            vec![CouponRecord::new("a", "b", "c"), CouponRecord::new("d", "e", "f")]
        );
    }

    #[tokio::test]
    async fn test_empty_existing_file_gets_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coupons.csv");
        std::fs::write(&path, "").unwrap();

        let log = CouponLog::open(&path).unwrap();
        log.append(&CouponRecord::new("a", "b", "c")).await.unwrap();
        assert_eq!(header_count(&path), 1);
    }

    #[test]
    fn test_open_rejects_foreign_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coupons.csv");
        std::fs::write(&path, "nome,texto,data_hora\nAna,x,y\n").unwrap();

        match CouponLog::open(&path) {
            Err(LedgerError::SchemaMismatch { found, .. }) => {
                assert_eq!(found, vec!["nome", "texto", "data_hora"]);
            }
            other => panic!("expected schema mismatch, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_append_rejects_file_replaced_with_foreign_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coupons.csv");
        let log = CouponLog::open(&path).unwrap();

        std::fs::write(&path, "a,b\n1,2\n").unwrap();
        let err = log
            .append(&CouponRecord::new("x", "y", "z"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::SchemaMismatch { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_append_rejects_swap_after_earlier_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coupons.csv");
        let log = CouponLog::open(&path).unwrap();
        log.append(&CouponRecord::new("a", "b", "c")).await.unwrap();

        std::fs::write(&path, "a,b\n1,2\n").unwrap();
        let err = log
            .append(&CouponRecord::new("x", "y", "z"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::SchemaMismatch { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("coupons.csv");
        let log = CouponLog::open(&path).unwrap();

        let err = log
            .append(&CouponRecord::new("x", "y", "z"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Io { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_appends_stay_row_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coupons.csv");
        let log = CouponLog::open(&path).unwrap();

        let mut handles = Vec::new();
        for i in 0..50 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                let text = format!("cupom CODE{:04}\n{}", i, "x".repeat(2048));
                log.append(&CouponRecord::new(format!("user{}", i), text, "t"))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let records = read_records(&path);
        assert_eq!(records.len(), 50);
        assert_eq!(header_count(&path), 1);
        for record in &records {
            let n: usize = record.display_name.trim_start_matches("user").parse().unwrap();
            assert!(record.text.starts_with(&format!("cupom CODE{:04}\n", n)));
        }
    }
}
