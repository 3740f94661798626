//! SQLite ticket store
//!
//! Persists support tickets using SQLx and SQLite. Tickets are only ever
//! appended; nothing in the service updates or deletes a row.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use tokio::sync::Mutex;

use crate::{Result, Ticket, TicketStatus};

/// Prefix marking a question as a ticket-creation command
pub const TICKET_SENTINEL: &str = "ACTION_CREATE_TICKET:";

const CREATE_TICKETS_TABLE: &str = "CREATE TABLE IF NOT EXISTS tickets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT,
    status TEXT
)";

/// Clean a raw ticket description
///
/// Removes the sentinel token and surrounding whitespace; an empty result
/// is replaced by `placeholder`.
pub fn normalize_description(raw: &str, placeholder: &str) -> String {
    let description = raw.replace(TICKET_SENTINEL, "");
    let description = description.trim();
    if description.is_empty() {
        placeholder.to_string()
    } else {
        description.to_string()
    }
}

/// Trait for ticket persistence
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Insert a new ticket and return it with its assigned id
    async fn create(&self, description: &str, status: TicketStatus) -> Result<Ticket>;

    /// Get ticket by ID
    async fn get(&self, id: i64) -> Result<Option<Ticket>>;

    /// Number of stored tickets
    async fn count(&self) -> Result<i64>;

    /// Check the store is reachable
    async fn ping(&self) -> bool;
}

/// Ticket row from database
#[derive(Debug, FromRow)]
struct TicketRow {
    id: i64,
    description: Option<String>,
    status: Option<String>,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Ticket {
            id: row.id,
            description: row.description.unwrap_or_default(),
            status: row.status.unwrap_or_default(),
        }
    }
}

/// SQLite ticket store
pub struct SqliteTicketStore {
    pool: SqlitePool,
    /// Serializes insert + `last_insert_rowid` so ids are never shared
    write_lock: Mutex<()>,
}

impl SqliteTicketStore {
    /// Open (creating if missing) the database at `url` and ensure the schema
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let store = Self::from_pool(pool);
        store.init_schema().await?;
        tracing::info!(url, "Ticket store ready");
        Ok(store)
    }

    /// Private in-memory database
    pub async fn in_memory() -> Result<Self> {
        // Every connection to :memory: is a separate database, so pin one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self::from_pool(pool);
        store.init_schema().await?;
        Ok(store)
    }

    /// Create from an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the `tickets` table if it does not exist
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TICKETS_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl TicketRepository for SqliteTicketStore {
    async fn create(&self, description: &str, status: TicketStatus) -> Result<Ticket> {
        let _guard = self.write_lock.lock().await;

        let result = sqlx::query("INSERT INTO tickets (description, status) VALUES (?, ?)")
            .bind(description)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        let ticket = Ticket {
            id: result.last_insert_rowid(),
            description: description.to_string(),
            status: status.as_str().to_string(),
        };
        tracing::info!(ticket_id = ticket.id, "Support ticket created");

        Ok(ticket)
    }

    async fn get(&self, id: i64) -> Result<Option<Ticket>> {
        let row: Option<TicketRow> =
            sqlx::query_as("SELECT id, description, status FROM tickets WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Ticket::from))
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
