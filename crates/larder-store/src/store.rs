use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::changes::{ChangeHub, Subscription, Table};
use crate::error::{Result, StoreError};
use crate::models::{FoodItem, UserSettings, WasteLog, WasteReason, WasteSummary, SETTINGS_ID};

/// Schema version written to `PRAGMA user_version`
pub const SCHEMA_VERSION: i64 = 1;

const FOOD_COLUMNS: &str =
    "id, name, category, purchased_at, expires_at, quantity, unit, consumed_at, photo_path";

const WASTE_COLUMNS: &str =
    "id, food_item_id, food_name, category, quantity, unit, reason, wasted_at, estimated_value";

/// SQLite-backed storage for food items, waste logs and settings
///
/// One connection behind a mutex: writes are serialized by the lock, and
/// every committed write is announced on the change hub after the lock is
/// released.
pub struct Store {
    conn: Mutex<Connection>,
    changes: ChangeHub,
}

impl Store {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Throwaway database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            changes: ChangeHub::new(),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                found: version,
                supported: SCHEMA_VERSION,
            });
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS food_items (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                purchased_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                quantity INTEGER NOT NULL,
                unit TEXT NOT NULL,
                consumed INTEGER NOT NULL DEFAULT 0,
                consumed_at INTEGER,
                photo_path TEXT,
                CHECK ((consumed = 0) = (consumed_at IS NULL))
            );
            CREATE INDEX IF NOT EXISTS idx_food_items_expires
                ON food_items(consumed, expires_at);

            CREATE TABLE IF NOT EXISTS waste_logs (
                id TEXT PRIMARY KEY NOT NULL,
                food_item_id TEXT NOT NULL,
                food_name TEXT NOT NULL,
                category TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                unit TEXT NOT NULL,
                reason TEXT NOT NULL,
                wasted_at INTEGER NOT NULL,
                estimated_value REAL
            );
            CREATE INDEX IF NOT EXISTS idx_waste_logs_wasted
                ON waste_logs(wasted_at);

            CREATE TABLE IF NOT EXISTS user_settings (
                id INTEGER PRIMARY KEY NOT NULL,
                notifications_enabled INTEGER NOT NULL,
                daily_reminder_time TEXT NOT NULL,
                expiration_warning_days INTEGER NOT NULL
            );",
        )?;

        if version < SCHEMA_VERSION {
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            debug!("Initialized schema version {}", SCHEMA_VERSION);
        }

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Register for change notifications on the given tables
    pub fn subscribe<F>(&self, tables: &[Table], callback: F) -> Subscription
    where
        F: Fn(Table) + Send + Sync + 'static,
    {
        self.changes.subscribe(tables, callback)
    }

    // ---------------------------------------------------------------
    // Food items
    // ---------------------------------------------------------------

    pub fn insert_food_item(&self, item: &FoodItem) -> Result<()> {
        {
            let conn = self.conn()?;
            conn.execute(
                &format!(
                    "INSERT INTO food_items ({}, consumed)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    FOOD_COLUMNS
                ),
                params![
                    item.id,
                    item.name,
                    item.category,
                    item.purchased_at.timestamp_millis(),
                    item.expires_at.timestamp_millis(),
                    item.quantity,
                    item.unit,
                    item.consumed_at.map(|t| t.timestamp_millis()),
                    item.photo_path,
                    item.is_consumed(),
                ],
            )
            .map_err(StoreError::from_write)?;
        }

        debug!("Inserted food item {} ({})", item.id, item.name);
        self.changes.notify(Table::FoodItems);
        Ok(())
    }

    /// Replace every column of an existing item
    pub fn update_food_item(&self, item: &FoodItem) -> Result<()> {
        let changed = {
            let conn = self.conn()?;
            conn.execute(
                "UPDATE food_items
                 SET name = ?2, category = ?3, purchased_at = ?4, expires_at = ?5,
                     quantity = ?6, unit = ?7, consumed = ?8, consumed_at = ?9,
                     photo_path = ?10
                 WHERE id = ?1",
                params![
                    item.id,
                    item.name,
                    item.category,
                    item.purchased_at.timestamp_millis(),
                    item.expires_at.timestamp_millis(),
                    item.quantity,
                    item.unit,
                    item.is_consumed(),
                    item.consumed_at.map(|t| t.timestamp_millis()),
                    item.photo_path,
                ],
            )
            .map_err(StoreError::from_write)?
        };

        if changed == 0 {
            return Err(StoreError::NotFound(item.id.clone()));
        }

        self.changes.notify(Table::FoodItems);
        Ok(())
    }

    pub fn delete_food_item(&self, id: &str) -> Result<()> {
        let changed = {
            let conn = self.conn()?;
            conn.execute("DELETE FROM food_items WHERE id = ?1", params![id])?
        };

        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        debug!("Deleted food item {}", id);
        self.changes.notify(Table::FoodItems);
        Ok(())
    }

    /// Set the consumed flag and timestamp
    ///
    /// Returns `false` when the item was already consumed; the original
    /// timestamp is kept in that case.
    pub fn mark_consumed(&self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        let changed = {
            let conn = self.conn()?;
            let changed = conn.execute(
                "UPDATE food_items SET consumed = 1, consumed_at = ?2
                 WHERE id = ?1 AND consumed = 0",
                params![id, at.timestamp_millis()],
            )?;

            if changed == 0 {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM food_items WHERE id = ?1)",
                    params![id],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(StoreError::NotFound(id.to_string()));
                }
            }
            changed
        };

        if changed == 0 {
            debug!("Food item {} was already consumed", id);
            return Ok(false);
        }

        self.changes.notify(Table::FoodItems);
        Ok(true)
    }

    pub fn food_item(&self, id: &str) -> Result<Option<FoodItem>> {
        let conn = self.conn()?;
        let item = conn
            .query_row(
                &format!("SELECT {} FROM food_items WHERE id = ?1", FOOD_COLUMNS),
                params![id],
                food_item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    /// Non-consumed items, soonest expiration first
    pub fn active_food_items(&self) -> Result<Vec<FoodItem>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM food_items WHERE consumed = 0 ORDER BY expires_at ASC",
            FOOD_COLUMNS
        ))?;
        let items = stmt
            .query_map([], food_item_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    /// Non-consumed items expiring at or before `threshold`
    pub fn expiring_food_items(&self, threshold: DateTime<Utc>) -> Result<Vec<FoodItem>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM food_items
             WHERE consumed = 0 AND expires_at <= ?1
             ORDER BY expires_at ASC",
            FOOD_COLUMNS
        ))?;
        let items = stmt
            .query_map(params![threshold.timestamp_millis()], food_item_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn count_active(&self) -> Result<u64> {
        self.count_where("consumed = 0")
    }

    pub fn count_consumed(&self) -> Result<u64> {
        self.count_where("consumed = 1")
    }

    fn count_where(&self, predicate: &str) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM food_items WHERE {}", predicate),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ---------------------------------------------------------------
    // Waste logs
    // ---------------------------------------------------------------

    /// Write the waste snapshot and drop the item in one transaction
    ///
    /// If the item is already gone the whole thing is rolled back and
    /// `NotFound` is returned, so no orphan log is left behind.
    pub fn record_waste(&self, log: &WasteLog) -> Result<()> {
        {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;

            tx.execute(
                &format!(
                    "INSERT INTO waste_logs ({})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    WASTE_COLUMNS
                ),
                params![
                    log.id,
                    log.food_item_id,
                    log.food_name,
                    log.category,
                    log.quantity,
                    log.unit,
                    log.reason.as_str(),
                    log.wasted_at.timestamp_millis(),
                    log.estimated_value,
                ],
            )
            .map_err(StoreError::from_write)?;

            let deleted = tx.execute(
                "DELETE FROM food_items WHERE id = ?1",
                params![log.food_item_id],
            )?;
            if deleted == 0 {
                // Dropping the transaction rolls back the insert
                return Err(StoreError::NotFound(log.food_item_id.clone()));
            }

            tx.commit()?;
        }

        info!("Logged waste of {} ({})", log.food_name, log.reason);
        self.changes.notify(Table::WasteLogs);
        self.changes.notify(Table::FoodItems);
        Ok(())
    }

    /// All waste logs, newest first, optionally limited to an inclusive range
    pub fn waste_logs(&self, range: Option<(DateTime<Utc>, DateTime<Utc>)>) -> Result<Vec<WasteLog>> {
        let conn = self.conn()?;
        let logs = match range {
            Some((start, end)) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM waste_logs
                     WHERE wasted_at >= ?1 AND wasted_at <= ?2
                     ORDER BY wasted_at DESC",
                    WASTE_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(
                        params![start.timestamp_millis(), end.timestamp_millis()],
                        waste_log_from_row,
                    )?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM waste_logs ORDER BY wasted_at DESC",
                    WASTE_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], waste_log_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        Ok(logs)
    }

    pub fn waste_summary_since(&self, start: DateTime<Utc>) -> Result<WasteSummary> {
        let conn = self.conn()?;
        let (quantity, events, value): (Option<i64>, i64, Option<f64>) = conn.query_row(
            "SELECT SUM(quantity), COUNT(*), SUM(estimated_value)
             FROM waste_logs WHERE wasted_at >= ?1",
            params![start.timestamp_millis()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(WasteSummary {
            total_quantity: quantity.unwrap_or(0) as u64,
            events: events as u64,
            total_value: value.unwrap_or(0.0),
        })
    }

    // ---------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------

    pub fn settings(&self) -> Result<Option<UserSettings>> {
        let conn = self.conn()?;
        let settings = conn
            .query_row(
                "SELECT notifications_enabled, daily_reminder_time, expiration_warning_days
                 FROM user_settings WHERE id = ?1",
                params![SETTINGS_ID],
                |row| {
                    Ok(UserSettings {
                        notifications_enabled: row.get(0)?,
                        daily_reminder_time: row.get(1)?,
                        expiration_warning_days: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(settings)
    }

    /// Read the settings row, writing the defaults first if there is none
    pub fn settings_or_default(&self) -> Result<UserSettings> {
        let created = {
            let conn = self.conn()?;
            Self::ensure_settings_row(&conn)?
        };
        if created {
            self.changes.notify(Table::UserSettings);
        }

        self.settings()?
            .ok_or_else(|| StoreError::Corrupt("settings row vanished after insert".into()))
    }

    pub fn save_settings(&self, settings: &UserSettings) -> Result<()> {
        {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO user_settings
                     (id, notifications_enabled, daily_reminder_time, expiration_warning_days)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     notifications_enabled = excluded.notifications_enabled,
                     daily_reminder_time = excluded.daily_reminder_time,
                     expiration_warning_days = excluded.expiration_warning_days",
                params![
                    SETTINGS_ID,
                    settings.notifications_enabled,
                    settings.daily_reminder_time,
                    settings.expiration_warning_days,
                ],
            )?;
        }
        self.changes.notify(Table::UserSettings);
        Ok(())
    }

    pub fn set_notifications_enabled(&self, enabled: bool) -> Result<()> {
        self.update_settings_column("notifications_enabled", enabled as i64)
    }

    pub fn set_warning_days(&self, days: u32) -> Result<()> {
        self.update_settings_column("expiration_warning_days", days as i64)
    }

    fn update_settings_column(&self, column: &str, value: i64) -> Result<()> {
        {
            let conn = self.conn()?;
            Self::ensure_settings_row(&conn)?;
            conn.execute(
                &format!("UPDATE user_settings SET {} = ?2 WHERE id = ?1", column),
                params![SETTINGS_ID, value],
            )?;
        }
        self.changes.notify(Table::UserSettings);
        Ok(())
    }

    fn ensure_settings_row(conn: &Connection) -> Result<bool> {
        let defaults = UserSettings::default();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO user_settings
                 (id, notifications_enabled, daily_reminder_time, expiration_warning_days)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                SETTINGS_ID,
                defaults.notifications_enabled,
                defaults.daily_reminder_time,
                defaults.expiration_warning_days,
            ],
        )?;
        Ok(inserted > 0)
    }
}

fn millis_to_utc(idx: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Integer,
            format!("timestamp out of range: {}", millis).into(),
        )
    })
}

fn food_item_from_row(row: &Row<'_>) -> rusqlite::Result<FoodItem> {
    let consumed_at = match row.get::<_, Option<i64>>(7)? {
        Some(millis) => Some(millis_to_utc(7, millis)?),
        None => None,
    };

    Ok(FoodItem {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        purchased_at: millis_to_utc(3, row.get(3)?)?,
        expires_at: millis_to_utc(4, row.get(4)?)?,
        quantity: row.get(5)?,
        unit: row.get(6)?,
        consumed_at,
        photo_path: row.get(8)?,
    })
}

fn waste_log_from_row(row: &Row<'_>) -> rusqlite::Result<WasteLog> {
    let raw_reason: String = row.get(6)?;
    let reason = raw_reason.parse::<WasteReason>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(WasteLog {
        id: row.get(0)?,
        food_item_id: row.get(1)?,
        food_name: row.get(2)?,
        category: row.get(3)?,
        quantity: row.get(4)?,
        unit: row.get(5)?,
        reason,
        wasted_at: millis_to_utc(7, row.get(7)?)?,
        estimated_value: row.get(8)?,
    })
}
