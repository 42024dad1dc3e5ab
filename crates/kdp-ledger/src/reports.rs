//! Report generation (CSV exports, dashboard metrics and console tables)

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::constants;
use crate::linkage::DashboardView;
use crate::models::{PortfolioRecord, RoyaltyRecord};
use crate::money::{format_usd, sum_amounts};

// =============================================================================
// Dashboard Metrics
// =============================================================================

/// Headline figures shown above the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    /// Account the figures are limited to, None for every account
    pub account: Option<String>,
    pub total_royalties_usd: f64,
    pub unique_books: usize,
    pub average_royalty_per_book: f64,
    pub total_ad_spend: f64,
    pub unique_portfolios: usize,
}

impl DashboardSummary {
    /// Compute the figures, optionally limited to one account
    pub fn compute(royalties: &[RoyaltyRecord], portfolios: &[PortfolioRecord], account: Option<&str>) -> Self {
        let in_scope = |acct: &str| account.is_none_or(|a| a == acct);

        let royalties: Vec<&RoyaltyRecord> = royalties
            .iter()
            .filter(|r| in_scope(&r.account_identifier))
            .collect();
        let portfolios: Vec<&PortfolioRecord> = portfolios
            .iter()
            .filter(|p| in_scope(&p.account_identifier))
            .collect();

        let total_royalties_usd = sum_amounts(royalties.iter().map(|r| r.total_royalties_usd.as_str()));
        let unique_books = royalties
            .iter()
            .map(|r| r.book_title.as_str())
            .collect::<HashSet<_>>()
            .len();
        let average_royalty_per_book = if unique_books == 0 {
            0.0
        } else {
            total_royalties_usd / unique_books as f64
        };

        let total_ad_spend = sum_amounts(portfolios.iter().map(|p| p.spend.as_str()));
        let unique_portfolios = portfolios
            .iter()
            .map(|p| p.portfolio_name.as_str())
            .collect::<HashSet<_>>()
            .len();

        Self {
            account: account.map(str::to_string),
            total_royalties_usd,
            unique_books,
            average_royalty_per_book,
            total_ad_spend,
            unique_portfolios,
        }
    }
}

/// Print summary to console
pub fn print_summary(summary: &DashboardSummary) {
    println!("\n============================================================");
    match &summary.account {
        Some(account) => println!("              ROYALTY SUMMARY ({})", account),
        None => println!("                    ROYALTY SUMMARY"),
    }
    println!("============================================================\n");

    println!("  Total Royalties:        {:>14}", format_usd(summary.total_royalties_usd));
    println!("  Unique Books:           {:>14}", summary.unique_books);
    println!("  Average per Book:       {:>14}", format_usd(summary.average_royalty_per_book));
    println!("  ----------------------------------------");
    println!("  Total Ad Spend:         {:>14}", format_usd(summary.total_ad_spend));
    println!("  Unique Portfolios:      {:>14}", summary.unique_portfolios);
    println!();
}

// =============================================================================
// Console Tables
// =============================================================================

#[derive(Tabled)]
struct RoyaltyTableRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Book")]
    book_title: String,
    #[tabled(rename = "eBook")]
    ebook: String,
    #[tabled(rename = "Print")]
    print: String,
    #[tabled(rename = "KENP")]
    kenp: String,
    #[tabled(rename = "Total USD")]
    total_usd: String,
    #[tabled(rename = "Last Month")]
    last_month: String,
    #[tabled(rename = "Portfolio")]
    portfolio: String,
}

impl From<&RoyaltyRecord> for RoyaltyTableRow {
    fn from(r: &RoyaltyRecord) -> Self {
        Self {
            id: r.id,
            account: r.account_identifier.clone(),
            book_title: r.book_title.clone(),
            ebook: r.ebook_royalties.clone(),
            print: r.print_royalties.clone(),
            kenp: r.kenp_royalties.clone(),
            total_usd: r.total_royalties_usd.clone(),
            last_month: r.last_month_royalty.clone().unwrap_or_else(|| "-".to_string()),
            portfolio: r.portfolio_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[derive(Tabled)]
struct PortfolioTableRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Portfolio")]
    portfolio_name: String,
    #[tabled(rename = "Spend")]
    spend: String,
    #[tabled(rename = "Updated")]
    updated_at: String,
}

impl From<&PortfolioRecord> for PortfolioTableRow {
    fn from(p: &PortfolioRecord) -> Self {
        Self {
            id: p.id,
            account: p.account_identifier.clone(),
            portfolio_name: p.portfolio_name.clone(),
            spend: p.spend.clone(),
            updated_at: p.updated_at.clone(),
        }
    }
}

/// Render royalties as a console table
pub fn royalty_table(royalties: &[RoyaltyRecord]) -> String {
    let rows: Vec<RoyaltyTableRow> = royalties.iter().map(RoyaltyTableRow::from).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Render portfolios as a console table
pub fn portfolio_table(portfolios: &[PortfolioRecord]) -> String {
    let rows: Vec<PortfolioTableRow> = portfolios.iter().map(PortfolioTableRow::from).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print the grouped dashboard to console
pub fn print_dashboard(view: &DashboardView) {
    println!("\n=== Linked Portfolios ({}) ===", view.linked_portfolios.len());
    for linked in &view.linked_portfolios {
        let p = &linked.portfolio;
        println!(
            "\n[{}] {} ({}), spend {}",
            p.id, p.portfolio_name, p.account_identifier, p.spend
        );
        println!("{}", royalty_table(&linked.royalties));
    }

    println!("\n=== Unlinked Portfolios ({}) ===", view.unlinked_portfolios.len());
    if !view.unlinked_portfolios.is_empty() {
        println!("{}", portfolio_table(&view.unlinked_portfolios));
    }

    println!("\n=== Unlinked Royalties ({}) ===", view.unlinked_royalties.len());
    if !view.unlinked_royalties.is_empty() {
        println!("{}", royalty_table(&view.unlinked_royalties));
    }
    println!();
}

// =============================================================================
// CSV Exports
// =============================================================================

/// Write any serializable records to a CSV file
fn export_to_csv<T: Serialize>(records: &[T], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Export royalties and portfolios into `output_dir`, returns the written paths
pub fn export_all(
    output_dir: &Path,
    royalties: &[RoyaltyRecord],
    portfolios: &[PortfolioRecord],
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let royalties_path = output_dir.join(constants::ROYALTIES_EXPORT_FILENAME);
    export_to_csv(royalties, &royalties_path)?;

    let portfolios_path = output_dir.join(constants::PORTFOLIOS_EXPORT_FILENAME);
    export_to_csv(portfolios, &portfolios_path)?;

    Ok(vec![royalties_path, portfolios_path])
}
