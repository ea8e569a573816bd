//! # Database
//!
//! SQLite persistence for reminders, users and their favorite places.
//! The handle is cheap to clone; all clones share one connection.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Reminder status machine columns, users and favorites tables
//! - 1.0.0: Initial schema

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use sqlite::{Connection, State, Statement};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::features::reminders::{
    NewReminder, Reminder, ReminderError, ReminderStatus, ReminderStore,
};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS reminders (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        stop_name TEXT NOT NULL,
        route_id TEXT NOT NULL,
        eta INTEGER NOT NULL,
        advance_minutes INTEGER NOT NULL,
        status TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_reminders_status_eta ON reminders (status, eta);
    CREATE INDEX IF NOT EXISTS idx_reminders_user ON reminders (user_id);

    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS favorites (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        lat REAL NOT NULL,
        lng REAL NOT NULL,
        address TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_favorites_user ON favorites (user_id);
";

const REMINDER_COLUMNS: &str =
    "id, user_id, stop_name, route_id, eta, advance_minutes, status, created_at, updated_at";

/// A saved place a user can search from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub favorites: Vec<Favorite>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and apply the schema
    pub async fn new(path: &str) -> Result<Self> {
        let connection = sqlite::open(path)?;
        connection.execute(SCHEMA)?;
        info!("Database ready at {path}");
        Ok(Database {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Private in-memory database, mainly for tests
    pub async fn in_memory() -> Result<Self> {
        Self::new(":memory:").await
    }

    pub async fn insert_reminder(&self, new: &NewReminder, now: DateTime<Utc>) -> Result<Reminder> {
        let reminder = Reminder {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: new.user_id.clone(),
            stop_name: new.stop_name.clone(),
            route_id: new.route_id.clone(),
            eta: new.eta,
            advance_minutes: new.advance_minutes,
            status: ReminderStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(format!(
            "INSERT INTO reminders ({REMINDER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))?;
        statement.bind((1, reminder.id.as_str()))?;
        statement.bind((2, reminder.user_id.as_str()))?;
        statement.bind((3, reminder.stop_name.as_str()))?;
        statement.bind((4, reminder.route_id.as_str()))?;
        statement.bind((5, reminder.eta.timestamp_millis()))?;
        statement.bind((6, reminder.advance_minutes))?;
        statement.bind((7, reminder.status.as_str()))?;
        statement.bind((8, now.timestamp_millis()))?;
        statement.bind((9, now.timestamp_millis()))?;
        run_to_completion(&mut statement)?;

        debug!("Stored reminder {} for user {}", reminder.id, reminder.user_id);
        Ok(reminder)
    }

    pub async fn find_reminder(&self, id: &str) -> Result<Option<Reminder>> {
        let conn = self.connection.lock().await;
        let mut statement =
            conn.prepare(format!("SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = ?"))?;
        statement.bind((1, id))?;
        if let State::Row = statement.next()? {
            Ok(Some(read_reminder(&statement)?))
        } else {
            Ok(None)
        }
    }

    /// Active reminders with an ETA strictly after `after`
    pub async fn active_reminders_after(&self, after: DateTime<Utc>) -> Result<Vec<Reminder>> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders
             WHERE status = ? AND eta > ?
             ORDER BY eta ASC, created_at ASC, rowid ASC"
        ))?;
        statement.bind((1, ReminderStatus::Active.as_str()))?;
        statement.bind((2, after.timestamp_millis()))?;
        read_reminders(&mut statement)
    }

    pub async fn active_reminders_for_user(&self, user_id: &str) -> Result<Vec<Reminder>> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders
             WHERE user_id = ? AND status = ?
             ORDER BY eta ASC, created_at ASC, rowid ASC"
        ))?;
        statement.bind((1, user_id))?;
        statement.bind((2, ReminderStatus::Active.as_str()))?;
        read_reminders(&mut statement)
    }

    /// Overwrite a reminder's status. Returns `false` when the id is unknown.
    pub async fn set_reminder_status(
        &self,
        id: &str,
        status: ReminderStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.connection.lock().await;

        let mut exists = conn.prepare("SELECT 1 FROM reminders WHERE id = ?")?;
        exists.bind((1, id))?;
        if exists.next()? != State::Row {
            return Ok(false);
        }

        let mut statement =
            conn.prepare("UPDATE reminders SET status = ?, updated_at = ? WHERE id = ?")?;
        statement.bind((1, status.as_str()))?;
        statement.bind((2, now.timestamp_millis()))?;
        statement.bind((3, id))?;
        run_to_completion(&mut statement)?;
        Ok(true)
    }

    /// The user and their favorites, or `None` if they never saved anything
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.connection.lock().await;

        let mut statement = conn.prepare("SELECT created_at, updated_at FROM users WHERE id = ?")?;
        statement.bind((1, user_id))?;
        if statement.next()? != State::Row {
            return Ok(None);
        }
        let created_at = from_millis(statement.read::<i64, _>("created_at")?)?;
        let updated_at = from_millis(statement.read::<i64, _>("updated_at")?)?;

        let mut favorites_stmt = conn.prepare(
            "SELECT name, lat, lng, address FROM favorites WHERE user_id = ? ORDER BY id ASC",
        )?;
        favorites_stmt.bind((1, user_id))?;
        let mut favorites = Vec::new();
        while let State::Row = favorites_stmt.next()? {
            favorites.push(Favorite {
                name: favorites_stmt.read::<String, _>("name")?,
                lat: favorites_stmt.read::<f64, _>("lat")?,
                lng: favorites_stmt.read::<f64, _>("lng")?,
                address: favorites_stmt.read::<String, _>("address")?,
            });
        }

        Ok(Some(User {
            id: user_id.to_string(),
            favorites,
            created_at,
            updated_at,
        }))
    }

    /// Append a favorite, creating the user on first use
    pub async fn add_favorite(&self, user_id: &str, favorite: &Favorite) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let conn = self.connection.lock().await;

        conn.execute("BEGIN")?;
        let result = (|| -> Result<()> {
            let mut upsert = conn.prepare(
                "INSERT INTO users (id, created_at, updated_at) VALUES (?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET updated_at = excluded.updated_at",
            )?;
            upsert.bind((1, user_id))?;
            upsert.bind((2, now))?;
            upsert.bind((3, now))?;
            run_to_completion(&mut upsert)?;

            let mut insert = conn.prepare(
                "INSERT INTO favorites (user_id, name, lat, lng, address, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )?;
            insert.bind((1, user_id))?;
            insert.bind((2, favorite.name.as_str()))?;
            insert.bind((3, favorite.lat))?;
            insert.bind((4, favorite.lng))?;
            insert.bind((5, favorite.address.as_str()))?;
            insert.bind((6, now))?;
            run_to_completion(&mut insert)
        })();

        match result {
            Ok(()) => {
                conn.execute("COMMIT")?;
                info!("Saved favorite '{}' for user {user_id}", favorite.name);
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = conn.execute("ROLLBACK") {
                    error!("Failed to roll back favorite for user {user_id}: {rollback}");
                }
                Err(e)
            }
        }
    }
}

fn run_to_completion(statement: &mut Statement<'_>) -> Result<()> {
    while statement.next()? != State::Done {}
    Ok(())
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| anyhow!("Timestamp out of range: {ms}"))
}

fn read_reminder(statement: &Statement<'_>) -> Result<Reminder> {
    let status: String = statement.read("status")?;
    Ok(Reminder {
        id: statement.read("id")?,
        user_id: statement.read("user_id")?,
        stop_name: statement.read("stop_name")?,
        route_id: statement.read("route_id")?,
        eta: from_millis(statement.read("eta")?)?,
        advance_minutes: statement.read("advance_minutes")?,
        status: status.parse()?,
        created_at: from_millis(statement.read("created_at")?)?,
        updated_at: from_millis(statement.read("updated_at")?)?,
    })
}

fn read_reminders(statement: &mut Statement<'_>) -> Result<Vec<Reminder>> {
    let mut reminders = Vec::new();
    while let State::Row = statement.next()? {
        reminders.push(read_reminder(statement)?);
    }
    Ok(reminders)
}

#[async_trait]
impl ReminderStore for Database {
    async fn create_reminder(
        &self,
        new: &NewReminder,
        now: DateTime<Utc>,
    ) -> Result<Reminder, ReminderError> {
        self.insert_reminder(new, now)
            .await
            .map_err(ReminderError::store)
    }

    async fn get_reminder(&self, id: &str) -> Result<Option<Reminder>, ReminderError> {
        self.find_reminder(id).await.map_err(ReminderError::store)
    }

    async fn get_active_reminders(
        &self,
        after: DateTime<Utc>,
    ) -> Result<Vec<Reminder>, ReminderError> {
        self.active_reminders_after(after)
            .await
            .map_err(ReminderError::store)
    }

    async fn update_reminder_status(
        &self,
        id: &str,
        status: ReminderStatus,
        now: DateTime<Utc>,
    ) -> Result<(), ReminderError> {
        match self.set_reminder_status(id, status, now).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ReminderError::NotFound(id.to_string())),
            Err(e) => Err(ReminderError::store(e)),
        }
    }

    async fn get_user_reminders(&self, user_id: &str) -> Result<Vec<Reminder>, ReminderError> {
        self.active_reminders_for_user(user_id)
            .await
            .map_err(ReminderError::store)
    }
}
