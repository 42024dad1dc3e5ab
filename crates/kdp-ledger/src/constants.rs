//! Centralized constants for the royalty ledger
//!
//! Selector defaults describe the current KDP dashboard markup. They can be
//! overridden per deployment in config.toml when the page structure changes.

// =============================================================================
// Royalty Dashboard Selectors
// =============================================================================

/// Per-book blocks: immediate children of the royalties item list
pub const ROYALTY_ROWS_SELECTOR: &str = "div.ui.items.no-margin.unstackable > div.item";

/// Book rows carry a cover image, summary rows don't
pub const ROYALTY_IMAGE_SELECTOR: &str = "img";

/// Book title inside a row
pub const ROYALTY_TITLE_SELECTOR: &str = ".truncate-overflow";

/// Right-aligned value columns: ebook, print, KENP, total, total USD
pub const ROYALTY_VALUES_SELECTOR: &str = ".sixteen.wide.computer.column .row .right.aligned.column";

// =============================================================================
// Advertising Portfolio Selectors
// =============================================================================

/// Portfolio name anchors
pub const PORTFOLIO_NAME_SELECTOR: &str = r#"a[data-e2e-id="entityNameRenderer"]"#;

/// Spend cells
pub const PORTFOLIO_SPEND_SELECTOR: &str =
    r#"div[data-e2e-id="tableCell_cell_spend"] div[data-e2e-id="currencyRenderer"]"#;

// =============================================================================
// Extraction Fallbacks
// =============================================================================

/// Number of monetary columns in a royalty row
pub const ROYALTY_VALUE_COLUMNS: usize = 5;

/// Title used when a row has no truncate element
pub const TITLE_PLACEHOLDER: &str = "Title Not Found";

/// Value used for every monetary column of a degraded row
pub const ZERO_PLACEHOLDER: &str = "0.00";

/// Currency symbol used when formatting amounts for display
pub const CURRENCY_SYMBOL: &str = "$";

// =============================================================================
// File Names
// =============================================================================

/// Default config file path
pub const CONFIG_FILE: &str = "config.toml";

/// Ledger database filename (inside the data directory)
pub const DATABASE_FILENAME: &str = "ledger.sqlite";

/// Royalties export CSV filename
pub const ROYALTIES_EXPORT_FILENAME: &str = "royalties.csv";

/// Portfolios export CSV filename
pub const PORTFOLIOS_EXPORT_FILENAME: &str = "portfolios.csv";

// =============================================================================
// SQLite
// =============================================================================

/// Busy timeout so concurrent CLI invocations wait instead of failing
pub const SQLITE_BUSY_TIMEOUT_MS: u64 = 5_000;
