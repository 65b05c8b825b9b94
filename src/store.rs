// 🗃️ Movement History Store - read side consulted by duplicate detection
// Trait plus two adapters: in-memory (optionally CSV-loaded) and SQLite

use crate::error::StoreError;
use crate::movement::{MovementKind, ParamKey};
use crate::parser::StockMovement;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

// ============================================================================
// CORE TYPES
// ============================================================================

/// A movement already recorded by the external store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalMovement {
    pub id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub user: Option<String>,
}

impl HistoricalMovement {
    pub fn new(id: impl Into<String>, name: impl Into<String>, quantity: f64, timestamp: DateTime<Utc>) -> Self {
        HistoricalMovement {
            id: id.into(),
            name: name.into(),
            quantity,
            unit: None,
            timestamp,
            location: None,
            category: None,
            user: None,
        }
    }

    /// Builder pattern: add unit
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Builder pattern: add location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl From<&StockMovement> for HistoricalMovement {
    fn from(movement: &StockMovement) -> Self {
        let location_key = match movement.kind {
            MovementKind::In => ParamKey::From,
            MovementKind::Out => ParamKey::To,
            MovementKind::Adjust => ParamKey::Project,
        };

        HistoricalMovement {
            id: movement.id.to_string(),
            name: movement.item_name.clone(),
            quantity: movement.quantity,
            unit: movement.unit.clone(),
            timestamp: movement.created_at,
            location: movement.parameters.get(location_key).map(str::to_string),
            category: movement.category.clone(),
            user: Some(movement.logged_by.clone()),
        }
    }
}

/// Read-only access to recent movements, newest first
pub trait MovementHistoryStore: Send + Sync {
    fn get_movements_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<HistoricalMovement>, StoreError>> + Send;
}

impl<S: MovementHistoryStore> MovementHistoryStore for Arc<S> {
    fn get_movements_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<HistoricalMovement>, StoreError>> + Send {
        (**self).get_movements_since(cutoff)
    }
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// Read a CSV whose header row matches HistoricalMovement's fields
pub fn load_history_csv(csv_path: &Path) -> Result<Vec<HistoricalMovement>, StoreError> {
    let mut rdr = csv::Reader::from_path(csv_path)?;

    let mut movements = Vec::new();
    for result in rdr.deserialize() {
        let movement: HistoricalMovement = result?;
        movements.push(movement);
    }

    debug!(count = movements.len(), path = %csv_path.display(), "loaded movement history");
    Ok(movements)
}

#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    movements: RwLock<Vec<HistoricalMovement>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_movements(movements: Vec<HistoricalMovement>) -> Self {
        InMemoryHistoryStore {
            movements: RwLock::new(movements),
        }
    }

    pub fn from_csv(csv_path: &Path) -> Result<Self, StoreError> {
        Ok(Self::with_movements(load_history_csv(csv_path)?))
    }

    pub fn record(&self, movement: HistoricalMovement) -> Result<(), StoreError> {
        let mut guard = self
            .movements
            .write()
            .map_err(|_| StoreError::Unavailable("history lock poisoned".to_string()))?;
        guard.push(movement);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.movements.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<HistoricalMovement>, StoreError> {
        let guard = self
            .movements
            .read()
            .map_err(|_| StoreError::Unavailable("history lock poisoned".to_string()))?;

        let mut recent: Vec<HistoricalMovement> =
            guard.iter().filter(|m| m.timestamp >= cutoff).cloned().collect();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(recent)
    }
}

impl MovementHistoryStore for InMemoryHistoryStore {
    async fn get_movements_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<HistoricalMovement>, StoreError> {
        self.snapshot_since(cutoff)
    }
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<(), StoreError> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS movements (
            id TEXT PRIMARY KEY,
            item_name TEXT NOT NULL,
            quantity REAL NOT NULL,
            unit TEXT,
            timestamp TEXT NOT NULL,
            location TEXT,
            category TEXT,
            user_name TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_movements_timestamp ON movements(timestamp)",
        [],
    )?;

    Ok(())
}

/// Fixed-width UTC text so that string order equals time order
fn timestamp_text(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        setup_database(&conn)?;
        Ok(SqliteHistoryStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
    }

    /// Insert movements, skipping ids already present. Returns how many were new.
    pub fn insert_movements(&self, movements: &[HistoricalMovement]) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let mut inserted = 0;
        let mut duplicates = 0;

        for m in movements {
            let result = conn.execute(
                "INSERT INTO movements (id, item_name, quantity, unit, timestamp, location, category, user_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    m.id,
                    m.name,
                    m.quantity,
                    m.unit,
                    timestamp_text(&m.timestamp),
                    m.location,
                    m.category,
                    m.user,
                ],
            );

            match result {
                Ok(_) => inserted += 1,
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    duplicates += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        debug!(inserted, duplicates, "stored movement history");
        Ok(inserted)
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM movements", [], |row| row.get(0))?;
        Ok(count)
    }

    fn query_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<HistoricalMovement>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, item_name, quantity, unit, timestamp, location, category, user_name
             FROM movements
             WHERE timestamp >= ?1
             ORDER BY timestamp DESC",
        )?;

        let rows = stmt
            .query_map(params![timestamp_text(&cutoff)], |row| {
                let ts: String = row.get(4)?;
                let timestamp = DateTime::parse_from_rfc3339(&ts)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
                    })?;

                Ok(HistoricalMovement {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    quantity: row.get(2)?,
                    unit: row.get(3)?,
                    timestamp,
                    location: row.get(5)?,
                    category: row.get(6)?,
                    user: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

impl MovementHistoryStore for SqliteHistoryStore {
    // Local SQLite queries are short; they run inline on the calling task
    async fn get_movements_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<HistoricalMovement>, StoreError> {
        self.query_since(cutoff)
    }
}

// ============================================================================
// TESTS
// ============================================================================
