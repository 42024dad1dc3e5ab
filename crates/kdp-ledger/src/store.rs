//! SQLite storage for royalties, portfolios and users
//!
//! Reconciliation passes run inside one transaction per account: the
//! existing rows are loaded, diffed against the incoming drafts and rewritten
//! before a single commit. Dropping the transaction on error rolls it back.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::constants;
use crate::error::{LedgerError, Result};
use crate::models::{PortfolioDraft, PortfolioRecord, RoyaltyDraft, RoyaltyRecord, UserRecord};
use crate::reconcile;

/// Ledger database wrapper
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

/// Row type for royalties queries
#[derive(FromRow)]
struct RoyaltyRow {
    id: i64,
    account_identifier: String,
    book_title: String,
    ebook_royalties: String,
    print_royalties: String,
    kenp_royalties: String,
    total_royalties: String,
    total_royalties_usd: String,
    last_month_royalty: Option<String>,
    portfolio_id: Option<i64>,
    created_at: String,
    updated_at: String,
}

/// Row type for portfolios queries
#[derive(FromRow)]
struct PortfolioRow {
    id: i64,
    account_identifier: String,
    portfolio_name: String,
    spend: String,
    created_at: String,
    updated_at: String,
}

/// Row type for users queries
#[derive(FromRow)]
struct UserRow {
    id: i64,
    email: String,
    hashed_password: String,
    created_at: String,
}

const ROYALTY_COLUMNS: &str = "id, account_identifier, book_title, ebook_royalties, print_royalties,
     kenp_royalties, total_royalties, total_royalties_usd, last_month_royalty,
     portfolio_id, created_at, updated_at";

const PORTFOLIO_COLUMNS: &str = "id, account_identifier, portfolio_name, spend, created_at, updated_at";

impl Store {
    /// Open or create the ledger database
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // WAL plus a busy timeout keeps concurrent CLI runs from hitting SQLITE_BUSY
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(constants::SQLITE_BUSY_TIMEOUT_MS))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let store = Self { pool };
        store.init_schema().await?;
        info!("Opened ledger database at {}", path.display());

        Ok(store)
    }

    /// Private in-memory database.
    ///
    /// Every pooled connection to `:memory:` is a separate database, so the
    /// pool holds exactly one connection and never recycles it.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "
            -- Advertising portfolios per account
            CREATE TABLE IF NOT EXISTS portfolios (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_identifier TEXT NOT NULL,
                portfolio_name TEXT NOT NULL,
                spend TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_portfolios_identity
             ON portfolios(account_identifier, portfolio_name)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "
            -- Royalties per book; the portfolio link is cleared when the portfolio goes away
            CREATE TABLE IF NOT EXISTS royalties (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_identifier TEXT NOT NULL,
                book_title TEXT NOT NULL,
                ebook_royalties TEXT NOT NULL,
                print_royalties TEXT NOT NULL,
                kenp_royalties TEXT NOT NULL,
                total_royalties TEXT NOT NULL,
                total_royalties_usd TEXT NOT NULL,
                last_month_royalty TEXT,
                portfolio_id INTEGER REFERENCES portfolios(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_royalties_identity
             ON royalties(account_identifier, book_title)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_royalties_portfolio ON royalties(portfolio_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "
            -- Registered users (password hashing happens upstream)
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                hashed_password TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Royalties
    // =========================================================================

    /// Get all royalties for one account
    pub async fn royalties_by_account(&self, account: &str) -> Result<Vec<RoyaltyRecord>> {
        let rows: Vec<RoyaltyRow> = sqlx::query_as(&format!(
            "SELECT {ROYALTY_COLUMNS} FROM royalties WHERE account_identifier = ? ORDER BY id"
        ))
        .bind(account)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RoyaltyRecord::from).collect())
    }

    /// Get every royalty across accounts
    pub async fn all_royalties(&self) -> Result<Vec<RoyaltyRecord>> {
        let rows: Vec<RoyaltyRow> =
            sqlx::query_as(&format!("SELECT {ROYALTY_COLUMNS} FROM royalties ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(RoyaltyRecord::from).collect())
    }

    /// Get a royalty by ID
    pub async fn royalty_by_id(&self, id: i64) -> Result<Option<RoyaltyRecord>> {
        let row: Option<RoyaltyRow> =
            sqlx::query_as(&format!("SELECT {ROYALTY_COLUMNS} FROM royalties WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(RoyaltyRecord::from))
    }

    /// Royalties referencing a portfolio
    pub async fn royalties_for_portfolio(&self, portfolio_id: i64) -> Result<Vec<RoyaltyRecord>> {
        let rows: Vec<RoyaltyRow> = sqlx::query_as(&format!(
            "SELECT {ROYALTY_COLUMNS} FROM royalties WHERE portfolio_id = ? ORDER BY id"
        ))
        .bind(portfolio_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RoyaltyRecord::from).collect())
    }

    /// Set or clear a royalty's portfolio reference, returns false if the royalty is missing
    pub async fn set_royalty_portfolio(&self, royalty_id: i64, portfolio_id: Option<i64>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE royalties SET portfolio_id = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(portfolio_id)
        .bind(royalty_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Reconcile an account's royalties against `drafts` (in a transaction for atomicity).
    ///
    /// With `capture_snapshot` every touched row gets `last_month_royalty` set
    /// to its total USD. Otherwise updates leave the snapshot alone and inserts
    /// start without one.
    pub async fn reconcile_royalties(
        &self,
        account: &str,
        drafts: Vec<RoyaltyDraft>,
        capture_snapshot: bool,
    ) -> Result<Vec<RoyaltyRecord>> {
        let mut tx = self.pool.begin().await?;

        let existing: Vec<RoyaltyRecord> = sqlx::query_as::<_, RoyaltyRow>(&format!(
            "SELECT {ROYALTY_COLUMNS} FROM royalties WHERE account_identifier = ? ORDER BY id"
        ))
        .bind(account)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(RoyaltyRecord::from)
        .collect();

        let plan = reconcile::plan(&existing, drafts);
        debug!("Royalty plan for {}: {}", account, plan);

        for id in &plan.deletes {
            sqlx::query("DELETE FROM royalties WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        for (id, draft) in &plan.updates {
            let snapshot = capture_snapshot.then_some(draft.total_royalties_usd.as_str());
            sqlx::query(
                "UPDATE royalties
                 SET ebook_royalties = ?, print_royalties = ?, kenp_royalties = ?,
                     total_royalties = ?, total_royalties_usd = ?,
                     last_month_royalty = COALESCE(?, last_month_royalty),
                     updated_at = datetime('now')
                 WHERE id = ?",
            )
            .bind(&draft.ebook_royalties)
            .bind(&draft.print_royalties)
            .bind(&draft.kenp_royalties)
            .bind(&draft.total_royalties)
            .bind(&draft.total_royalties_usd)
            .bind(snapshot)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        for draft in &plan.inserts {
            let snapshot = capture_snapshot.then_some(draft.total_royalties_usd.as_str());
            sqlx::query(
                "INSERT INTO royalties
                 (account_identifier, book_title, ebook_royalties, print_royalties, kenp_royalties,
                  total_royalties, total_royalties_usd, last_month_royalty)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(account)
            .bind(&draft.book_title)
            .bind(&draft.ebook_royalties)
            .bind(&draft.print_royalties)
            .bind(&draft.kenp_royalties)
            .bind(&draft.total_royalties)
            .bind(&draft.total_royalties_usd)
            .bind(snapshot)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("Reconciled royalties for {}: {}", account, plan);

        self.royalties_by_account(account).await
    }

    // =========================================================================
    // Portfolios
    // =========================================================================

    /// Get all portfolios for one account
    pub async fn portfolios_by_account(&self, account: &str) -> Result<Vec<PortfolioRecord>> {
        let rows: Vec<PortfolioRow> = sqlx::query_as(&format!(
            "SELECT {PORTFOLIO_COLUMNS} FROM portfolios WHERE account_identifier = ? ORDER BY id"
        ))
        .bind(account)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PortfolioRecord::from).collect())
    }

    /// Get every portfolio across accounts
    pub async fn all_portfolios(&self) -> Result<Vec<PortfolioRecord>> {
        let rows: Vec<PortfolioRow> =
            sqlx::query_as(&format!("SELECT {PORTFOLIO_COLUMNS} FROM portfolios ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(PortfolioRecord::from).collect())
    }

    /// Get a portfolio by ID
    pub async fn portfolio_by_id(&self, id: i64) -> Result<Option<PortfolioRecord>> {
        let row: Option<PortfolioRow> =
            sqlx::query_as(&format!("SELECT {PORTFOLIO_COLUMNS} FROM portfolios WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(PortfolioRecord::from))
    }

    /// Reconcile an account's portfolios against `drafts` (in a transaction for atomicity).
    ///
    /// Deleting a portfolio clears the reference on any royalty linked to it.
    pub async fn reconcile_portfolios(
        &self,
        account: &str,
        drafts: Vec<PortfolioDraft>,
    ) -> Result<Vec<PortfolioRecord>> {
        let mut tx = self.pool.begin().await?;

        let existing: Vec<PortfolioRecord> = sqlx::query_as::<_, PortfolioRow>(&format!(
            "SELECT {PORTFOLIO_COLUMNS} FROM portfolios WHERE account_identifier = ? ORDER BY id"
        ))
        .bind(account)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(PortfolioRecord::from)
        .collect();

        let plan = reconcile::plan(&existing, drafts);
        debug!("Portfolio plan for {}: {}", account, plan);

        for id in &plan.deletes {
            sqlx::query("DELETE FROM portfolios WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        for (id, draft) in &plan.updates {
            sqlx::query("UPDATE portfolios SET spend = ?, updated_at = datetime('now') WHERE id = ?")
                .bind(&draft.spend)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        for draft in &plan.inserts {
            sqlx::query(
                "INSERT INTO portfolios (account_identifier, portfolio_name, spend) VALUES (?, ?, ?)",
            )
            .bind(account)
            .bind(&draft.portfolio_name)
            .bind(&draft.spend)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("Reconciled portfolios for {}: {}", account, plan);

        self.portfolios_by_account(account).await
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Delete every royalty and portfolio of an account (in a transaction for atomicity)
    pub async fn purge_account(&self, account: &str) -> Result<PurgeStats> {
        let mut tx = self.pool.begin().await?;

        let royalties = sqlx::query("DELETE FROM royalties WHERE account_identifier = ?")
            .bind(account)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let portfolios = sqlx::query("DELETE FROM portfolios WHERE account_identifier = ?")
            .bind(account)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(PurgeStats { royalties, portfolios })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Register a user, returns Conflict if the email is taken
    pub async fn create_user(&self, email: &str, hashed_password: &str) -> Result<UserRecord> {
        let result = sqlx::query("INSERT INTO users (email, hashed_password) VALUES (?, ?)")
            .bind(email)
            .bind(hashed_password)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(LedgerError::Conflict(format!("Email already registered: {email}")));
            }
            Err(e) => return Err(e.into()),
        }

        self.find_user_by_email(email)
            .await?
            .ok_or_else(|| LedgerError::Conflict(format!("User {email} vanished after insert")))
    }

    /// Look up a user by email
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, hashed_password, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| UserRecord {
            id: r.id,
            email: r.email,
            hashed_password: r.hashed_password,
            created_at: r.created_at,
        }))
    }

    // =========================================================================
    // Utilities
    // =========================================================================

    /// Get database statistics
    pub async fn stats(&self) -> Result<StoreStats> {
        let royalties: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM royalties")
            .fetch_one(&self.pool)
            .await?;
        let linked: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM royalties WHERE portfolio_id IS NOT NULL")
                .fetch_one(&self.pool)
                .await?;
        let portfolios: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM portfolios")
            .fetch_one(&self.pool)
            .await?;
        let accounts: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM (
                 SELECT account_identifier FROM royalties
                 UNION
                 SELECT account_identifier FROM portfolios
             )",
        )
        .fetch_one(&self.pool)
        .await?;
        let users: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreStats {
            royalties: royalties.0 as u64,
            linked_royalties: linked.0 as u64,
            portfolios: portfolios.0 as u64,
            accounts: accounts.0 as u64,
            users: users.0 as u64,
        })
    }
}

// =============================================================================
// Helper types
// =============================================================================

impl From<RoyaltyRow> for RoyaltyRecord {
    fn from(r: RoyaltyRow) -> Self {
        RoyaltyRecord {
            id: r.id,
            account_identifier: r.account_identifier,
            book_title: r.book_title,
            ebook_royalties: r.ebook_royalties,
            print_royalties: r.print_royalties,
            kenp_royalties: r.kenp_royalties,
            total_royalties: r.total_royalties,
            total_royalties_usd: r.total_royalties_usd,
            last_month_royalty: r.last_month_royalty,
            portfolio_id: r.portfolio_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl From<PortfolioRow> for PortfolioRecord {
    fn from(r: PortfolioRow) -> Self {
        PortfolioRecord {
            id: r.id,
            account_identifier: r.account_identifier,
            portfolio_name: r.portfolio_name,
            spend: r.spend,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Rows removed by an account purge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PurgeStats {
    pub royalties: u64,
    pub portfolios: u64,
}

impl std::fmt::Display for PurgeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} royalties, {} portfolios", self.royalties, self.portfolios)
    }
}

/// Database statistics
#[derive(Debug)]
pub struct StoreStats {
    pub royalties: u64,
    pub linked_royalties: u64,
    pub portfolios: u64,
    pub accounts: u64,
    pub users: u64,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} royalties ({} linked), {} portfolios, {} accounts, {} users",
            self.royalties, self.linked_royalties, self.portfolios, self.accounts, self.users
        )
    }
}
