//! KDP royalty and advertising ledger
//!
//! Turns snapshots of the KDP royalties dashboard and the advertising console
//! into per-account records, keeps them reconciled against each new snapshot,
//! and lets royalties be linked to the portfolio that advertises them.
//!
//! Pipeline: [`extract`] → [`aggregate`] → [`reconcile`] (applied by
//! [`store`]). [`linkage`] and [`reports`] read the reconciled state.

pub mod aggregate;
pub mod calendar;
pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod linkage;
pub mod models;
pub mod money;
pub mod reconcile;
pub mod reports;
pub mod store;

#[cfg(test)]
mod fixtures;

use std::sync::Arc;
use tracing::{info, warn};

use calendar::{Clock, SystemClock};
use config::Config;
use error::Result;
use extract::Extractor;
use linkage::DashboardView;
use models::{PortfolioRecord, RoyaltyRecord};
use reports::DashboardSummary;
use store::{PurgeStats, Store};

/// Entry point tying extraction, reconciliation and linkage to one store
#[derive(Clone)]
pub struct Ledger {
    store: Store,
    extractor: Extractor,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    /// Build a ledger over `store` using the selectors from `config`
    pub fn new(store: Store, config: &Config) -> Result<Self> {
        Ok(Self {
            store,
            extractor: Extractor::new(&config.selectors)?,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock that decides month-end snapshots
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Extract, aggregate and reconcile a royalties dashboard snapshot
    pub async fn parse_royalties(&self, html: &str, account: &str) -> Result<Vec<RoyaltyRecord>> {
        let rows = self.extractor.extract_royalties(html)?;
        let degraded = rows.iter().filter(|r| r.degraded).count();
        if degraded > 0 {
            warn!("{} royalty rows for {} used placeholder values", degraded, account);
        }

        let drafts = aggregate::aggregate_royalties(&rows);
        let snapshot = reconcile::snapshot_due(self.clock.as_ref());
        if snapshot {
            info!("Month end: capturing last-month royalties for {}", account);
        }

        let records = self.store.reconcile_royalties(account, drafts, snapshot).await?;
        info!("{} royalties stored for {}", records.len(), account);
        Ok(records)
    }

    /// Extract, aggregate and reconcile an advertising console snapshot
    pub async fn parse_portfolios(&self, html: &str, account: &str) -> Result<Vec<PortfolioRecord>> {
        let rows = self.extractor.extract_portfolios(html)?;
        let drafts = aggregate::aggregate_portfolios(&rows);

        let records = self.store.reconcile_portfolios(account, drafts).await?;
        info!("{} portfolios stored for {}", records.len(), account);
        Ok(records)
    }

    // =========================================================================
    // Linkage
    // =========================================================================

    pub async fn link(&self, royalty_id: i64, portfolio_id: i64) -> Result<RoyaltyRecord> {
        linkage::link(&self.store, royalty_id, portfolio_id).await
    }

    pub async fn unlink(&self, royalty_id: i64) -> Result<RoyaltyRecord> {
        linkage::unlink(&self.store, royalty_id).await
    }

    pub async fn dashboard_view(&self) -> Result<DashboardView> {
        linkage::dashboard_view(&self.store).await
    }

    pub async fn portfolio_royalties(&self, portfolio_id: i64) -> Result<Vec<RoyaltyRecord>> {
        linkage::portfolio_royalties(&self.store, portfolio_id).await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn royalties(&self) -> Result<Vec<RoyaltyRecord>> {
        self.store.all_royalties().await
    }

    pub async fn portfolios(&self) -> Result<Vec<PortfolioRecord>> {
        self.store.all_portfolios().await
    }

    /// Dashboard figures, optionally for one account
    pub async fn summary(&self, account: Option<&str>) -> Result<DashboardSummary> {
        let royalties = self.store.all_royalties().await?;
        let portfolios = self.store.all_portfolios().await?;
        Ok(DashboardSummary::compute(&royalties, &portfolios, account))
    }

    /// Delete every royalty and portfolio of an account
    pub async fn purge(&self, account: &str) -> Result<PurgeStats> {
        let stats = self.store.purge_account(account).await?;
        info!("Purged {} for {}", stats, account);
        Ok(stats)
    }
}
