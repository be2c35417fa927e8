//! User accounts on SQLite.
//!
//! A single connection behind a `Mutex`. Every method is blocking; async
//! callers wrap them in `spawn_blocking`.

pub mod password;

pub use password::PasswordHasher;

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("email address is already registered")]
    EmailTaken,

    #[error("database connection lock poisoned")]
    Poisoned,
}

/// Registration payload.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub dob: String,
    pub mobile_number: String,
}

/// A stored account, without its password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub email: String,
}

pub struct UserStore {
    conn: Mutex<Connection>,
    path: String,
    hasher: PasswordHasher,
}

impl UserStore {
    /// Open the database named by a `DATABASE_URL` value.
    ///
    /// Accepts a plain path, `sqlite://<path>`, `sqlite:<path>` or `:memory:`.
    pub fn open(url: &str) -> Result<Self, StoreError> {
        let path = database_path(url);
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        Self::with_connection(conn, path.to_string(), PasswordHasher::default())
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(
            Connection::open_in_memory()?,
            ":memory:".to_string(),
            PasswordHasher::default(),
        )
    }

    /// Replace the password hasher (tests use a low work factor).
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    fn with_connection(
        conn: Connection,
        path: String,
        hasher: PasswordHasher,
    ) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(conn),
            path,
            hasher,
        };
        store.init()?;
        info!(path = %store.path, "User store ready");
        Ok(store)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                dob TEXT,
                mobile_number TEXT
            );
            ",
        )?;
        Ok(())
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        let user = conn
            .query_row(
                "SELECT id, first_name, email FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        first_name: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// Insert a new account. Fails with [`StoreError::EmailTaken`] when the
    /// email is already registered.
    pub fn create_user(&self, new: &NewUser) -> Result<User, StoreError> {
        let password_hash = self.hasher.hash(&new.password);
        let conn = self.lock()?;

        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM users WHERE email = ?1",
                params![new.email],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(StoreError::EmailTaken);
        }

        let inserted = conn.execute(
            "INSERT INTO users (first_name, last_name, email, password_hash, dob, mobile_number)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.first_name,
                new.last_name,
                new.email,
                password_hash,
                new.dob,
                new.mobile_number
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::EmailTaken);
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        debug!(id, "Registered user");
        Ok(User {
            id,
            first_name: new.first_name.clone(),
            email: new.email.clone(),
        })
    }

    /// The account for `email` when `password` matches, else `None`.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, StoreError> {
        let row = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT id, first_name, email, password_hash FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok((
                        User {
                            id: row.get(0)?,
                            first_name: row.get(1)?,
                            email: row.get(2)?,
                        },
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?
        };

        Ok(row.and_then(|(user, hash)| self.hasher.verify(&hash, password).then_some(user)))
    }
}

/// Strip the `sqlite:` scheme from a `DATABASE_URL` value.
pub fn database_path(url: &str) -> &str {
    let url = url.trim();
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
}
