//! Records flowing through the pipeline
//!
//! Raw rows come straight out of the extractor, drafts are aggregated rows
//! ready for reconciliation, and records are what the store persists.

use serde::{Deserialize, Serialize};

// =============================================================================
// Extractor Output
// =============================================================================

/// One royalty block as it appears in the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRoyaltyRow {
    pub book_title: String,
    pub ebook_royalties: String,
    pub print_royalties: String,
    pub kenp_royalties: String,
    pub total_royalties: String,
    pub total_royalties_usd: String,
    /// True when the value columns were missing and placeholders were used
    #[serde(skip)]
    pub degraded: bool,
}

/// One portfolio name/spend pair as it appears in the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPortfolioRow {
    pub portfolio_name: String,
    pub spend: String,
}

// =============================================================================
// Aggregator Output
// =============================================================================

/// Royalty totals for one book title, monetary fields formatted for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoyaltyDraft {
    pub book_title: String,
    pub ebook_royalties: String,
    pub print_royalties: String,
    pub kenp_royalties: String,
    pub total_royalties: String,
    pub total_royalties_usd: String,
}

/// Spend total for one portfolio name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioDraft {
    pub portfolio_name: String,
    pub spend: String,
}

// =============================================================================
// Persisted Records
// =============================================================================

/// Royalty row as stored, identity = (account_identifier, book_title)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoyaltyRecord {
    pub id: i64,
    pub account_identifier: String,
    pub book_title: String,
    pub ebook_royalties: String,
    pub print_royalties: String,
    pub kenp_royalties: String,
    pub total_royalties: String,
    pub total_royalties_usd: String,
    /// Total USD captured on the last day of a month
    pub last_month_royalty: Option<String>,
    /// Weak reference to a portfolio; cleared when the portfolio goes away
    pub portfolio_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Portfolio row as stored, identity = (account_identifier, portfolio_name)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRecord {
    pub id: i64,
    pub account_identifier: String,
    pub portfolio_name: String,
    pub spend: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Registered user; the password arrives already hashed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    #[serde(skip)]
    pub hashed_password: String,
    pub created_at: String,
}
