//! [`StudentStore`]: SQLite-backed persistence for student records.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use thiserror::Error;

use crate::crypto::{ComparisonDigest, EncryptedBlob, FieldKind};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS student (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        name          TEXT NOT NULL,
        email         BLOB NOT NULL,
        mobile        BLOB NOT NULL,
        email_digest  BLOB UNIQUE,
        mobile_digest BLOB UNIQUE,
        student_class TEXT,
        created       TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        modified      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )";

const SELECT_STUDENT: &str =
    "SELECT id, name, email, mobile, student_class, created, modified FROM student";

/// Errors produced by the store layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another record already holds this comparison digest.
    #[error("a record with the same {} digest already exists", .0.name())]
    DigestConflict(FieldKind),

    /// A previous holder of the connection lock panicked.
    #[error("store connection lock poisoned")]
    Poisoned,

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// The encrypted contact fields of one stored record, borrowed by the
/// duplicate checker.
#[derive(Debug, Clone)]
pub struct CandidateRecord {
    pub id: i64,
    pub email: EncryptedBlob,
    pub mobile: EncryptedBlob,
}

/// A record ready to insert. Contact fields are already encrypted.
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub email: EncryptedBlob,
    pub mobile: EncryptedBlob,
    /// `None` only for legacy rows imported without a digest.
    pub email_digest: Option<ComparisonDigest>,
    pub mobile_digest: Option<ComparisonDigest>,
    pub student_class: Option<String>,
}

/// A full stored record as read back for display.
#[derive(Debug, Clone)]
pub struct StoredStudent {
    pub id: i64,
    pub name: String,
    pub email: EncryptedBlob,
    pub mobile: EncryptedBlob,
    pub student_class: Option<String>,
    pub created: String,
    pub modified: String,
}

/// Narrows [`StudentStore::list`]. An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentFilter {
    /// Exact `student_class` match.
    pub class: Option<String>,
    /// Case-insensitive substring of `name` or `student_class`.
    pub search: Option<String>,
    /// Lower bound on `created`, compared as text (`YYYY-MM-DD` or a full
    /// timestamp).
    pub since: Option<String>,
}

impl StudentFilter {
    fn where_clause(&self) -> (String, Vec<String>) {
        let mut clauses = Vec::new();
        let mut args = Vec::new();
        if let Some(class) = &self.class {
            args.push(class.clone());
            clauses.push(format!("student_class = ?{}", args.len()));
        }
        if let Some(search) = &self.search {
            args.push(format!("%{}%", escape_like(search)));
            let n = args.len();
            clauses.push(format!(
                "(name LIKE ?{n} ESCAPE '\\' OR student_class LIKE ?{n} ESCAPE '\\')"
            ));
        }
        if let Some(since) = &self.since {
            args.push(since.clone());
            clauses.push(format!("created >= ?{}", args.len()));
        }
        if clauses.is_empty() {
            (String::new(), args)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), args)
        }
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Shared handle to the student table.
///
/// A single connection sits behind a mutex; [`StudentStore::lock`] hands out
/// a guard so a caller can read candidates and insert in one critical section.
#[derive(Clone, Debug)]
pub struct StudentStore {
    conn: Arc<Mutex<Connection>>,
}

impl StudentStore {
    /// Open the database at `path`, or an in-memory database when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the file cannot be opened or the
    /// schema cannot be created.
    pub fn open(path: Option<&str>) -> Result<Self, StoreError> {
        let conn = match path {
            Some(p) => {
                let conn = Connection::open(p)?;
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
                conn
            }
            None => Connection::open_in_memory()?,
        };
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::open(None)
    }

    /// Acquire exclusive access to the connection.
    pub fn lock(&self) -> Result<StoreGuard<'_>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(StoreGuard { conn })
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let guard = self.lock()?;
        let n: i64 = guard
            .conn
            .query_row("SELECT COUNT(*) FROM student", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or_default())
    }

    /// Records matching `filter`, newest first.
    pub fn list(&self, filter: &StudentFilter) -> Result<Vec<StoredStudent>, StoreError> {
        let (where_clause, args) = filter.where_clause();
        let guard = self.lock()?;
        let mut stmt = guard.conn.prepare(&format!(
            "{SELECT_STUDENT}{where_clause} ORDER BY created DESC, id DESC"
        ))?;
        let rows = stmt.query_map(params_from_iter(args.iter()), stored_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get(&self, id: i64) -> Result<Option<StoredStudent>, StoreError> {
        let guard = self.lock()?;
        let student = guard
            .conn
            .query_row(
                &format!("{SELECT_STUDENT} WHERE id = ?1"),
                params![id],
                stored_from_row,
            )
            .optional()?;
        Ok(student)
    }

    /// Delete a record. Returns `false` if no record had this id.
    pub fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let guard = self.lock()?;
        let n = guard
            .conn
            .execute("DELETE FROM student WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }
}

/// Exclusive access to the store for a check-then-insert sequence.
pub struct StoreGuard<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl StoreGuard<'_> {
    /// Every record's id and encrypted contact fields, in no particular order.
    pub fn candidates(&self) -> Result<Vec<CandidateRecord>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT id, email, mobile FROM student")?;
        let rows = stmt.query_map([], |row| {
            Ok(CandidateRecord {
                id: row.get(0)?,
                email: EncryptedBlob::from(row.get::<_, Vec<u8>>(1)?),
                mobile: EncryptedBlob::from(row.get::<_, Vec<u8>>(2)?),
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Insert a record and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DigestConflict`] if either digest is already
    /// stored, which closes the window between a duplicate scan and the insert.
    pub fn insert(&self, student: &NewStudent) -> Result<i64, StoreError> {
        let result = self.conn.execute(
            "INSERT INTO student (name, email, mobile, email_digest, mobile_digest, student_class)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                student.name,
                student.email.as_bytes(),
                student.mobile.as_bytes(),
                student.email_digest.as_ref().map(ComparisonDigest::as_bytes),
                student.mobile_digest.as_ref().map(ComparisonDigest::as_bytes),
                student.student_class,
            ],
        );
        match result {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(e) => Err(classify_insert_error(e)),
        }
    }
}

fn classify_insert_error(e: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(ref err, Some(ref msg)) = e {
        if err.code == ErrorCode::ConstraintViolation {
            if msg.contains("student.email_digest") {
                return StoreError::DigestConflict(FieldKind::Email);
            }
            if msg.contains("student.mobile_digest") {
                return StoreError::DigestConflict(FieldKind::Mobile);
            }
        }
    }
    StoreError::Sqlite(e)
}

fn stored_from_row(row: &Row<'_>) -> rusqlite::Result<StoredStudent> {
    Ok(StoredStudent {
        id: row.get(0)?,
        name: row.get(1)?,
        email: EncryptedBlob::from(row.get::<_, Vec<u8>>(2)?),
        mobile: EncryptedBlob::from(row.get::<_, Vec<u8>>(3)?),
        student_class: row.get(4)?,
        created: row.get(5)?,
        modified: row.get(6)?,
    })
}
