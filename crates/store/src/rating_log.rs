//! CSV-backed rating log.
//!
//! Rows are appended as ratings arrive and only the most recent row may be
//! amended afterwards. An amendment keeps every byte before the last record,
//! re-serializes that record, and publishes the result with a rename so a
//! crash mid-write never leaves a truncated log behind.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use shiptrack_core::domain::rating::{RatingLogEntry, Sentiment};

pub const RATING_LOG_HEADER: [&str; 5] = ["timestamp", "user_id", "rating", "summary", "sentiment"];

#[derive(Debug, Error)]
pub enum RatingLogError {
    #[error("rating log io failure: {0}")]
    Io(#[from] io::Error),
    #[error("rating log csv failure: {0}")]
    Csv(#[from] csv::Error),
    #[error("could not replace rating log: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("rating log `{0}` has no entries to amend")]
    Empty(PathBuf),
    #[error("rating log task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Summary text and sentiment written onto the latest rating row. Either field
/// may be empty, e.g. when summarization failed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Amendment {
    pub summary: String,
    pub sentiment: String,
}

impl Amendment {
    pub fn new(summary: impl Into<String>, sentiment: Option<Sentiment>) -> Self {
        Self {
            summary: summary.into(),
            sentiment: sentiment.map(|value| value.as_str().to_string()).unwrap_or_default(),
        }
    }
}

#[async_trait]
pub trait RatingLog: Send + Sync {
    async fn append(&self, entry: RatingLogEntry) -> Result<(), RatingLogError>;

    async fn entries(&self) -> Result<Vec<RatingLogEntry>, RatingLogError>;

    async fn last_entry(&self) -> Result<Option<RatingLogEntry>, RatingLogError> {
        Ok(self.entries().await?.pop())
    }

    /// Rewrites the most recent row with the given summary fields and returns it.
    async fn amend_last(&self, amendment: Amendment) -> Result<RatingLogEntry, RatingLogError>;
}

pub struct CsvRatingLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvRatingLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RatingLog for CsvRatingLog {
    async fn append(&self, entry: RatingLogEntry) -> Result<(), RatingLogError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        let entry = tokio::task::spawn_blocking(move || {
            append_entry(&path, &entry)?;
            Ok::<_, RatingLogError>(entry)
        })
        .await??;
        debug!(
            event_name = "store.rating_log.appended",
            path = %self.path.display(),
            user_id = %entry.user_id,
            rating = %entry.rating,
            "rating appended"
        );
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<RatingLogEntry>, RatingLogError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_entries(&path)).await?
    }

    async fn amend_last(&self, amendment: Amendment) -> Result<RatingLogEntry, RatingLogError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        let amended =
            tokio::task::spawn_blocking(move || amend_last_entry(&path, &amendment)).await??;
        debug!(
            event_name = "store.rating_log.amended",
            path = %self.path.display(),
            user_id = %amended.user_id,
            "latest rating amended"
        );
        Ok(amended)
    }
}

fn append_entry(path: &Path, entry: &RatingLogEntry) -> Result<(), RatingLogError> {
    let needs_header = match fs::metadata(path) {
        Ok(metadata) => metadata.len() == 0,
        Err(error) if error.kind() == io::ErrorKind::NotFound => true,
        Err(error) => return Err(error.into()),
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let unterminated = !needs_header && last_byte(path)?.is_some_and(|byte| byte != b'\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if unterminated {
        file.write_all(b"\n")?;
    }
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    if needs_header {
        writer.write_record(RATING_LOG_HEADER)?;
    }
    writer.write_record(entry_record(entry))?;
    writer.flush()?;
    Ok(())
}

fn last_byte(path: &Path) -> Result<Option<u8>, RatingLogError> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut byte = [0_u8; 1];
    file.read_exact(&mut byte)?;
    Ok(Some(byte[0]))
}

fn read_entries(path: &Path) -> Result<Vec<RatingLogEntry>, RatingLogError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(error.into()),
    };

    let mut reader = ReaderBuilder::new().flexible(true).from_reader(bytes.as_slice());
    let headers = reader.headers()?.clone();
    let mut entries = Vec::new();
    for record in reader.records() {
        entries.push(record?.deserialize(Some(&headers))?);
    }
    Ok(entries)
}

fn amend_last_entry(path: &Path, amendment: &Amendment) -> Result<RatingLogEntry, RatingLogError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Err(RatingLogError::Empty(path.to_path_buf()))
        }
        Err(error) => return Err(error.into()),
    };

    let mut reader = ReaderBuilder::new().flexible(true).from_reader(bytes.as_slice());
    let headers = reader.headers()?.clone();
    let mut record = StringRecord::new();
    let mut last: Option<(usize, StringRecord)> = None;
    while reader.read_record(&mut record)? {
        let offset = record.position().map(|position| position.byte()).unwrap_or_default();
        last = Some((usize::try_from(offset).unwrap_or(bytes.len()), record.clone()));
    }

    let Some((offset, last_record)) = last else {
        return Err(RatingLogError::Empty(path.to_path_buf()));
    };
    // After a `\r\n` terminator the reported position sits on the `\n`.
    let offset = offset.min(bytes.len());
    let offset = offset
        + bytes[offset..].iter().take_while(|&&byte| byte == b'\r' || byte == b'\n').count();

    let mut entry: RatingLogEntry = last_record.deserialize(Some(&headers))?;
    entry.summary = amendment.summary.clone();
    entry.sentiment = amendment.sentiment.clone();

    let mut rewritten = Vec::with_capacity(bytes.len() + amendment.summary.len());
    rewritten.extend_from_slice(&bytes[..offset]);
    {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(&mut rewritten);
        writer.write_record(entry_record(&entry))?;
        writer.flush()?;
    }

    replace_atomically(path, &rewritten)?;
    Ok(entry)
}

fn replace_atomically(path: &Path, contents: &[u8]) -> Result<(), RatingLogError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".ratings_log.")
        .suffix(".csv.tmp")
        .tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

fn entry_record(entry: &RatingLogEntry) -> [&str; 5] {
    [&entry.timestamp, &entry.user_id, &entry.rating, &entry.summary, &entry.sentiment]
}
