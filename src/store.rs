//! Recording store: metadata rows in SQLite paired with content files on disk.
//!
//! Ordering rules the store keeps:
//! - upload writes and syncs the content file before the row is inserted, so a row
//!   is never visible without its content
//! - delete removes the content file first and the row second; a failed file removal
//!   is logged and the row is removed anyway

use chrono::Local;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::constants::{
    default_title, generate_stored_filename, CREATED_AT_FORMAT, UPLOADS_ROUTE_PREFIX,
};
use crate::error::{Result, StoreError};
use crate::queries::recordings;

/// Attempts at finding a free stored name before giving up
const MAX_NAME_ATTEMPTS: usize = 5;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// One uploaded clip as persisted in the recordings table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub id: i64,
    pub title: String,
    /// Name the client sent with the upload
    pub filename: String,
    /// Service-relative path of the content, e.g. `uploads/video-1730000000000-123.webm`
    pub filepath: String,
    pub filesize: i64,
    pub created_at: String,
}

impl Recording {
    fn from_row(row: &SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            filename: row.try_get("filename")?,
            filepath: row.try_get("filepath")?,
            filesize: row.try_get("filesize")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

pub struct RecordingStore {
    pool: SqlitePool,
    uploads_dir: PathBuf,
}

impl RecordingStore {
    /// Wrap an already initialised pool; `uploads_dir` must exist
    pub fn new(pool: SqlitePool, uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            uploads_dir: uploads_dir.into(),
        }
    }

    /// Open the database, create the schema and the content directory
    pub async fn open(db_path: &Path, uploads_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(uploads_dir)
            .await
            .map_err(StoreError::StorageWrite)?;
        let pool = crate::db::open_database_connection(db_path).await?;
        crate::db::init_database_schema(&pool).await?;
        info!("Content directory: {}", uploads_dir.display());
        Ok(Self::new(pool, uploads_dir))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Close the pool; called once the server has stopped
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Store a new clip read from `content` and insert its row
    ///
    /// A content write failure leaves no row behind. A row insert failure after a
    /// successful write leaves the content file orphaned on disk.
    pub async fn create<R>(&self, mut content: R, original_name: &str) -> Result<Recording>
    where
        R: AsyncRead + Unpin,
    {
        let (stored_name, mut file) = self.create_unique_file().await?;
        let content_path = self.uploads_dir.join(&stored_name);

        let filesize = match copy_content(&mut content, &mut file).await {
            Ok(n) => n,
            Err(e) => {
                warn!(
                    "Upload aborted, partial content left at {}: {}",
                    content_path.display(),
                    e
                );
                return Err(e);
            }
        };
        drop(file);

        let now = Local::now();
        let title = default_title(now.timestamp_millis());
        let created_at = now.format(CREATED_AT_FORMAT).to_string();
        let filepath = format!("{}/{}", UPLOADS_ROUTE_PREFIX, stored_name);

        let sql = recordings::insert(&title, original_name, &filepath, filesize, &created_at);
        let result = match sqlx::query(&sql).execute(&self.pool).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    "Failed to insert recording row, content orphaned at {}: {}",
                    content_path.display(),
                    e
                );
                return Err(e.into());
            }
        };

        let recording = Recording {
            id: result.last_insert_rowid(),
            title,
            filename: original_name.to_string(),
            filepath,
            filesize,
            created_at,
        };
        info!(
            "Stored recording {} ({} bytes) at {}",
            recording.id, recording.filesize, recording.filepath
        );
        Ok(recording)
    }

    /// All recordings, newest first
    pub async fn list(&self) -> Result<Vec<Recording>> {
        let rows = sqlx::query(&recordings::select_all())
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| Recording::from_row(row).map_err(StoreError::from))
            .collect()
    }

    pub async fn get(&self, id: i64) -> Result<Recording> {
        let row = sqlx::query(&recordings::select_by_id(id))
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;
        Ok(Recording::from_row(&row)?)
    }

    /// Change the title of a recording; renaming to the current title succeeds
    pub async fn rename(&self, id: i64, new_title: &str) -> Result<()> {
        if new_title.is_empty() {
            return Err(StoreError::Validation("Title is required.".to_string()));
        }

        let result = sqlx::query(&recordings::update_title(id, new_title))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        debug!("Renamed recording {} to {:?}", id, new_title);
        Ok(())
    }

    /// Remove the content file, then the row
    pub async fn delete(&self, id: i64) -> Result<()> {
        let filepath: Option<String> = sqlx::query_scalar(&recordings::select_filepath_by_id(id))
            .fetch_optional(&self.pool)
            .await?;
        let filepath = filepath.ok_or(StoreError::NotFound(id))?;

        match self.content_path(&filepath) {
            Some(path) => {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    warn!(
                        "Failed to delete content file {} of recording {}: {}",
                        path.display(),
                        id,
                        e
                    );
                }
            }
            None => warn!(
                "Recording {} has filepath {:?} outside the content directory, not removing it",
                id, filepath
            ),
        }

        let result = sqlx::query(&recordings::delete_by_id(id))
            .execute(&self.pool)
            .await?;
        // A concurrent delete removed the row between lookup and removal
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        info!("Deleted recording {}", id);
        Ok(())
    }

    /// Resolve a stored `filepath` to its location in the content directory
    ///
    /// Returns None for anything that is not `uploads/<single file name>`.
    pub fn content_path(&self, filepath: &str) -> Option<PathBuf> {
        let name = filepath
            .strip_prefix(UPLOADS_ROUTE_PREFIX)?
            .strip_prefix('/')?;
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(file_name)), None) => Some(self.uploads_dir.join(file_name)),
            _ => None,
        }
    }

    /// Create a new content file under a name no other upload holds
    async fn create_unique_file(&self) -> Result<(String, File)> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let stored_name = generate_stored_filename(Local::now().timestamp_millis());
            let path = self.uploads_dir.join(&stored_name);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((stored_name, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("Stored name {} already taken, retrying", stored_name);
                }
                Err(e) => return Err(StoreError::StorageWrite(e)),
            }
        }
        Err(StoreError::StorageWrite(std::io::Error::new(
            ErrorKind::AlreadyExists,
            "could not find a free name for the recording",
        )))
    }
}

/// Copy everything from `content` into `file` and sync it to disk
/// Read and write failures are reported separately
async fn copy_content<R>(content: &mut R, file: &mut File) -> Result<i64>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut total: i64 = 0;
    loop {
        let n = content
            .read(&mut buf)
            .await
            .map_err(StoreError::ContentRead)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])
            .await
            .map_err(StoreError::StorageWrite)?;
        total += n as i64;
    }
    file.flush().await.map_err(StoreError::StorageWrite)?;
    file.sync_all().await.map_err(StoreError::StorageWrite)?;
    Ok(total)
}
