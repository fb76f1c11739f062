use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, Transaction, params};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result, StorageError};
use crate::format::DocumentFormat;
use crate::model::{
    DocumentInfo, ExtractedImage, ExtractedTable, ExtractionResult, FontStyle, ImageFormat, Link,
    SourceLocation, TextSegment,
};
use crate::storage::Storage;

/// Schema version written to `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

const MIGRATION: &str = include_str!("../../migrations/0001_init.sql");

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Appends each saved result to a SQLite database.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteStorage;

impl Storage for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn save(&self, data: &ExtractionResult, destination: &Path) -> Result<()> {
        let mut store = SqliteStore::open(destination)?;
        let id = store.insert(data)?;
        info!(
            backend = self.name(),
            destination = %destination.display(),
            file = %data.document.file_name,
            document_id = id,
            "saved extraction"
        );
        Ok(())
    }
}

/// A stored document and its row counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub id: i64,
    pub info: DocumentInfo,
    /// RFC 3339 time of the save
    pub extracted_at: String,
    pub text_count: usize,
    pub link_count: usize,
    pub image_count: usize,
    pub table_count: usize,
}

/// A stored document with all of its rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDocument {
    pub summary: DocumentSummary,
    pub text: Vec<TextSegment>,
    pub links: Vec<Link>,
    pub images: Vec<ExtractedImage>,
    pub tables: Vec<ExtractedTable>,
}

/// Read and write access to a docsift database.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

const SUMMARY_SELECT: &str = "SELECT d.id, d.file_name, d.file_path, d.file_size, d.file_type, d.format, d.sha256,
        d.page_count, d.extracted_at,
        (SELECT COUNT(*) FROM text_segments WHERE document_id = d.id),
        (SELECT COUNT(*) FROM links WHERE document_id = d.id),
        (SELECT COUNT(*) FROM images WHERE document_id = d.id),
        (SELECT COUNT(*) FROM tables WHERE document_id = d.id)
     FROM documents d";

/// Busy and locked databases map to [`StorageError::Locked`].
fn sqlite_error(err: rusqlite::Error, path: &Path) -> Error {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err
        && matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    {
        return Error::Storage(StorageError::Locked(path.to_path_buf()));
    }
    Error::Storage(StorageError::Sqlite(err))
}

fn to_sql_error(err: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(err))
}

fn from_sql_error(column: usize, err: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

fn image_format_name(format: ImageFormat) -> rusqlite::Result<String> {
    match serde_json::to_value(format).map_err(to_sql_error)? {
        serde_json::Value::String(name) => Ok(name),
        other => Ok(other.to_string()),
    }
}

fn image_format_from_name(name: String, column: usize) -> rusqlite::Result<ImageFormat> {
    serde_json::from_value(serde_json::Value::String(name)).map_err(|e| from_sql_error(column, e))
}

impl SqliteStore {
    /// Open or create a database, creating the schema on first use.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path).map_err(|e| sqlite_error(e, &path))?;
        let store = Self { conn, path };
        store.configure().map_err(|e| sqlite_error(e, &store.path))?;
        store.migrate()?;
        Ok(store)
    }

    fn configure(&self) -> rusqlite::Result<()> {
        self.conn.busy_timeout(BUSY_TIMEOUT)?;
        self.conn.pragma_update(None, "foreign_keys", true)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(|e| sqlite_error(e, &self.path))?;
        if version > SCHEMA_VERSION {
            return Err(StorageError::SchemaTooNew {
                found: version,
                supported: SCHEMA_VERSION,
            }
            .into());
        }
        if version < SCHEMA_VERSION {
            debug!(path = %self.path.display(), from = version, to = SCHEMA_VERSION, "creating schema");
            self.conn
                .execute_batch(MIGRATION)
                .map_err(|e| sqlite_error(e, &self.path))?;
        }
        Ok(())
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a result as a new document in one transaction.
    pub fn insert(&mut self, data: &ExtractionResult) -> Result<i64> {
        let tx = self.conn.transaction().map_err(|e| sqlite_error(e, &self.path))?;
        let id = insert_result(&tx, data).map_err(|e| sqlite_error(e, &self.path))?;
        tx.commit().map_err(|e| sqlite_error(e, &self.path))?;
        Ok(id)
    }

    /// Every stored document, oldest first.
    pub fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        self.summaries(&format!("{SUMMARY_SELECT} ORDER BY d.id"), &[])
    }

    /// Documents whose file name equals `name`.
    pub fn find_by_name(&self, name: &str) -> Result<Vec<DocumentSummary>> {
        self.summaries(&format!("{SUMMARY_SELECT} WHERE d.file_name = ?1 ORDER BY d.id"), &[&name])
    }

    fn summaries(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<DocumentSummary>> {
        let run = || -> rusqlite::Result<Vec<DocumentSummary>> {
            let mut stmt = self.conn.prepare(sql)?;
            let rows = stmt.query_map(args, summary_from_row)?;
            rows.collect()
        };
        run().map_err(|e| sqlite_error(e, &self.path))
    }

    /// A document with all of its rows, or `None` if `id` is unknown.
    pub fn query_document(&self, id: i64) -> Result<Option<StoredDocument>> {
        self.load_document(id).map_err(|e| sqlite_error(e, &self.path))
    }

    fn load_document(&self, id: i64) -> rusqlite::Result<Option<StoredDocument>> {
        let Some(summary) = self
            .conn
            .query_row(&format!("{SUMMARY_SELECT} WHERE d.id = ?1"), [id], summary_from_row)
            .optional()?
        else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT page, shape, text, heading_level, font, font_size, bold, italic, font IS NOT NULL OR font_size IS NOT NULL OR bold OR italic
             FROM text_segments WHERE document_id = ?1 ORDER BY seq",
        )?;
        let text = stmt
            .query_map([id], |row| {
                let has_style: bool = row.get(8)?;
                Ok(TextSegment {
                    location: location(row.get(0)?, row.get(1)?),
                    text: row.get(2)?,
                    heading_level: row.get(3)?,
                    style: has_style
                        .then(|| -> rusqlite::Result<FontStyle> {
                            Ok(FontStyle {
                                font: row.get(4)?,
                                size: row.get::<_, Option<f64>>(5)?.map(|s| s as f32),
                                bold: row.get(6)?,
                                italic: row.get(7)?,
                            })
                        })
                        .transpose()?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT page, shape, url, text FROM links WHERE document_id = ?1 ORDER BY seq")?;
        let links = stmt
            .query_map([id], |row| {
                Ok(Link {
                    location: location(row.get(0)?, row.get(1)?),
                    url: row.get(2)?,
                    text: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT page, shape, name, format, alt_text, width, height, data
             FROM images WHERE document_id = ?1 ORDER BY seq",
        )?;
        let images = stmt
            .query_map([id], |row| {
                Ok(ExtractedImage {
                    location: location(row.get(0)?, row.get(1)?),
                    name: row.get(2)?,
                    format: image_format_from_name(row.get(3)?, 3)?,
                    alt_text: row.get(4)?,
                    width: row.get(5)?,
                    height: row.get(6)?,
                    data: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT table_index, page, shape, table_data FROM tables WHERE document_id = ?1 ORDER BY table_index",
        )?;
        let tables = stmt
            .query_map([id], |row| {
                let data: String = row.get(3)?;
                Ok(ExtractedTable {
                    index: row.get::<_, i64>(0)? as usize,
                    location: location(row.get(1)?, row.get(2)?),
                    rows: serde_json::from_str(&data).map_err(|e| from_sql_error(3, e))?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(StoredDocument {
            summary,
            text,
            links,
            images,
            tables,
        }))
    }

    /// Remove a document and its rows. Returns whether it existed.
    pub fn delete_document(&mut self, id: i64) -> Result<bool> {
        let remove = |tx: &Transaction<'_>| -> rusqlite::Result<bool> {
            for table in ["text_segments", "links", "images", "tables"] {
                tx.execute(&format!("DELETE FROM {table} WHERE document_id = ?1"), [id])?;
            }
            Ok(tx.execute("DELETE FROM documents WHERE id = ?1", [id])? > 0)
        };
        let tx = self.conn.transaction().map_err(|e| sqlite_error(e, &self.path))?;
        let existed = remove(&tx).map_err(|e| sqlite_error(e, &self.path))?;
        tx.commit().map_err(|e| sqlite_error(e, &self.path))?;
        if existed {
            info!(path = %self.path.display(), document_id = id, "deleted document");
        }
        Ok(existed)
    }
}

fn location(page: u32, shape: Option<String>) -> SourceLocation {
    SourceLocation { page, shape }
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentSummary> {
    let format: String = row.get(5)?;
    let format = DocumentFormat::from_extension(&format).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown document format '{format}'").into(),
        )
    })?;
    let count = |i: usize| -> rusqlite::Result<usize> { Ok(row.get::<_, i64>(i)? as usize) };
    Ok(DocumentSummary {
        id: row.get(0)?,
        info: DocumentInfo {
            file_name: row.get(1)?,
            file_path: row.get(2)?,
            file_size: row.get::<_, i64>(3)? as u64,
            file_type: row.get(4)?,
            format,
            sha256: row.get(6)?,
            page_count: row.get(7)?,
        },
        extracted_at: row.get(8)?,
        text_count: count(9)?,
        link_count: count(10)?,
        image_count: count(11)?,
        table_count: count(12)?,
    })
}

fn insert_result(tx: &Transaction<'_>, data: &ExtractionResult) -> rusqlite::Result<i64> {
    let info = &data.document;
    tx.execute(
        "INSERT INTO documents (file_path, file_name, file_size, file_type, format, sha256, page_count, extracted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            info.file_path,
            info.file_name,
            info.file_size as i64,
            info.file_type,
            info.format.extension(),
            info.sha256,
            info.page_count,
            Utc::now().to_rfc3339(),
        ],
    )?;
    let id = tx.last_insert_rowid();

    let mut stmt = tx.prepare_cached(
        "INSERT INTO text_segments (document_id, seq, page, shape, text, heading_level, font, font_size, bold, italic)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    for (seq, segment) in data.text.iter().enumerate() {
        let style = segment.style.as_ref();
        stmt.execute(params![
            id,
            seq as i64,
            segment.location.page,
            segment.location.shape,
            segment.text,
            segment.heading_level,
            style.and_then(|s| s.font.as_deref()),
            style.and_then(|s| s.size).map(f64::from),
            style.is_some_and(|s| s.bold),
            style.is_some_and(|s| s.italic),
        ])?;
    }

    let mut stmt = tx.prepare_cached(
        "INSERT INTO links (document_id, seq, page, shape, url, text) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for (seq, link) in data.links.iter().enumerate() {
        stmt.execute(params![
            id,
            seq as i64,
            link.location.page,
            link.location.shape,
            link.url,
            link.text,
        ])?;
    }

    let mut stmt = tx.prepare_cached(
        "INSERT INTO images (document_id, seq, page, shape, name, format, mime_type, alt_text, width, height, data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;
    for (seq, image) in data.images.iter().enumerate() {
        stmt.execute(params![
            id,
            seq as i64,
            image.location.page,
            image.location.shape,
            image.name,
            image_format_name(image.format)?,
            image.format.mime_type(),
            image.alt_text,
            image.width,
            image.height,
            image.data,
        ])?;
    }

    let mut stmt = tx.prepare_cached(
        "INSERT INTO tables (document_id, table_index, page, shape, row_count, column_count, table_data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for table in &data.tables {
        let grid = serde_json::to_string(&table.rows).map_err(to_sql_error)?;
        stmt.execute(params![
            id,
            table.index as i64,
            table.location.page,
            table.location.shape,
            table.row_count() as i64,
            table.column_count() as i64,
            grid,
        ])?;
    }
    Ok(id)
}
