//! Royalty to portfolio links and the grouped dashboard view
//!
//! A royalty optionally references one portfolio. The dashboard groups
//! portfolios by whether any royalty points at them and lists the royalties
//! that point nowhere.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{LedgerError, Result};
use crate::models::{PortfolioRecord, RoyaltyRecord};
use crate::store::Store;

// =============================================================================
// Natural Ordering
// =============================================================================

/// One run of a title: text (lowercased) or digits (leading zeros stripped)
#[derive(Debug, Clone, PartialEq, Eq)]
enum Chunk {
    Text(String),
    Number(String),
}

impl Ord for Chunk {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Chunk::Text(a), Chunk::Text(b)) => a.cmp(b),
            // Longer digit run is the larger number once zeros are stripped
            (Chunk::Number(a), Chunk::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Chunk::Number(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Chunk {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Split into alternating text and digit runs, always starting with text.
///
/// Keys of two strings line up position by position, so text is compared
/// with text and digits with digits.
fn natural_key(s: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut in_digits = false;

    for ch in s.chars() {
        let is_digit = ch.is_ascii_digit();
        if is_digit != in_digits {
            chunks.push(finish_chunk(std::mem::take(&mut current), in_digits));
            in_digits = is_digit;
        }
        current.push(ch);
    }
    chunks.push(finish_chunk(current, in_digits));

    chunks
}

fn finish_chunk(run: String, digits: bool) -> Chunk {
    if digits {
        let trimmed = run.trim_start_matches('0');
        Chunk::Number(trimmed.to_string())
    } else {
        Chunk::Text(run.to_lowercase())
    }
}

/// Case-insensitive ordering with digit runs compared numerically
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b))
}

// =============================================================================
// Dashboard View
// =============================================================================

/// A portfolio together with the royalties that reference it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedPortfolio {
    #[serde(flatten)]
    pub portfolio: PortfolioRecord,
    pub royalties: Vec<RoyaltyRecord>,
}

/// Portfolios and royalties grouped by link state, each bucket in natural order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardView {
    pub linked_portfolios: Vec<LinkedPortfolio>,
    pub unlinked_portfolios: Vec<PortfolioRecord>,
    pub unlinked_royalties: Vec<RoyaltyRecord>,
}

/// Group records into the dashboard buckets.
///
/// A royalty whose reference does not match any given portfolio is listed
/// as unlinked.
pub fn build_dashboard(portfolios: Vec<PortfolioRecord>, royalties: Vec<RoyaltyRecord>) -> DashboardView {
    let mut by_portfolio: HashMap<i64, Vec<RoyaltyRecord>> = portfolios.iter().map(|p| (p.id, Vec::new())).collect();
    let mut unlinked_royalties = Vec::new();

    for royalty in royalties {
        match royalty.portfolio_id.and_then(|id| by_portfolio.get_mut(&id)) {
            Some(linked) => linked.push(royalty),
            None => {
                if let Some(id) = royalty.portfolio_id {
                    debug!("Royalty {} references unknown portfolio {}", royalty.id, id);
                }
                unlinked_royalties.push(royalty);
            }
        }
    }

    let mut linked_portfolios = Vec::new();
    let mut unlinked_portfolios = Vec::new();
    for portfolio in portfolios {
        let mut royalties = by_portfolio.remove(&portfolio.id).unwrap_or_default();
        if royalties.is_empty() {
            unlinked_portfolios.push(portfolio);
        } else {
            sort_royalties(&mut royalties);
            linked_portfolios.push(LinkedPortfolio { portfolio, royalties });
        }
    }

    linked_portfolios.sort_by(|a, b| natural_cmp(&a.portfolio.portfolio_name, &b.portfolio.portfolio_name));
    sort_portfolios(&mut unlinked_portfolios);
    sort_royalties(&mut unlinked_royalties);

    DashboardView {
        linked_portfolios,
        unlinked_portfolios,
        unlinked_royalties,
    }
}

fn sort_royalties(royalties: &mut [RoyaltyRecord]) {
    royalties.sort_by(|a, b| natural_cmp(&a.book_title, &b.book_title));
}

fn sort_portfolios(portfolios: &mut [PortfolioRecord]) {
    portfolios.sort_by(|a, b| natural_cmp(&a.portfolio_name, &b.portfolio_name));
}

// =============================================================================
// Link Operations
// =============================================================================

/// Point a royalty at a portfolio, NotFound if either is missing
pub async fn link(store: &Store, royalty_id: i64, portfolio_id: i64) -> Result<RoyaltyRecord> {
    if store.royalty_by_id(royalty_id).await?.is_none() {
        return Err(LedgerError::royalty_not_found(royalty_id));
    }
    if store.portfolio_by_id(portfolio_id).await?.is_none() {
        return Err(LedgerError::portfolio_not_found(portfolio_id));
    }

    store.set_royalty_portfolio(royalty_id, Some(portfolio_id)).await?;
    info!("Linked royalty {} to portfolio {}", royalty_id, portfolio_id);

    store
        .royalty_by_id(royalty_id)
        .await?
        .ok_or_else(|| LedgerError::royalty_not_found(royalty_id))
}

/// Clear a royalty's portfolio reference (no-op if already clear)
pub async fn unlink(store: &Store, royalty_id: i64) -> Result<RoyaltyRecord> {
    if !store.set_royalty_portfolio(royalty_id, None).await? {
        return Err(LedgerError::royalty_not_found(royalty_id));
    }
    info!("Unlinked royalty {}", royalty_id);

    store
        .royalty_by_id(royalty_id)
        .await?
        .ok_or_else(|| LedgerError::royalty_not_found(royalty_id))
}

/// Royalties referencing a portfolio, in natural order
pub async fn portfolio_royalties(store: &Store, portfolio_id: i64) -> Result<Vec<RoyaltyRecord>> {
    if store.portfolio_by_id(portfolio_id).await?.is_none() {
        return Err(LedgerError::portfolio_not_found(portfolio_id));
    }

    let mut royalties = store.royalties_for_portfolio(portfolio_id).await?;
    sort_royalties(&mut royalties);
    Ok(royalties)
}

/// Dashboard over every account
pub async fn dashboard_view(store: &Store) -> Result<DashboardView> {
    let portfolios = store.all_portfolios().await?;
    let royalties = store.all_royalties().await?;
    Ok(build_dashboard(portfolios, royalties))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PortfolioDraft, RoyaltyDraft};

    fn draft(title: &str) -> RoyaltyDraft {
        RoyaltyDraft {
            book_title: title.to_string(),
            ebook_royalties: "$1.00".to_string(),
            print_royalties: "$0.00".to_string(),
            kenp_royalties: "$0.00".to_string(),
            total_royalties: "$1.00".to_string(),
            total_royalties_usd: "$1.00".to_string(),
        }
    }

    fn portfolio(name: &str) -> PortfolioDraft {
        PortfolioDraft {
            portfolio_name: name.to_string(),
            spend: "$5.00".to_string(),
        }
    }

    fn titles(royalties: &[RoyaltyRecord]) -> Vec<&str> {
        royalties.iter().map(|r| r.book_title.as_str()).collect()
    }

    #[test]
    fn test_natural_order() {
        let mut names = vec!["Book 10", "Book 2", "Book 1"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["Book 1", "Book 2", "Book 10"]);
    }

    #[test]
    fn test_natural_order_ignores_case_and_leading_zeros() {
        assert_eq!(natural_cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(natural_cmp("BOOK 7", "book 7"), Ordering::Equal);
        assert_eq!(natural_cmp("Vol 007", "Vol 7"), Ordering::Equal);
        assert_eq!(natural_cmp("Vol 9", "Vol 010"), Ordering::Less);
        assert_eq!(natural_cmp("12 Rules", "3 Rules"), Ordering::Greater);
    }

    #[test]
    fn test_natural_order_huge_numbers() {
        assert_eq!(
            natural_cmp("Part 99999999999999999999999999999", "Part 100000000000000000000000000000"),
            Ordering::Less
        );
    }

    #[tokio::test]
    async fn test_link_and_unlink_move_buckets() {
        let store = Store::open_in_memory().await.unwrap();
        let portfolios = store.reconcile_portfolios("acct", vec![portfolio("Ads")]).await.unwrap();
        let royalties = store
            .reconcile_royalties("acct", vec![draft("Book 10"), draft("Book 2")], false)
            .await
            .unwrap();
        let ads = portfolios[0].id;

        let view = dashboard_view(&store).await.unwrap();
        assert!(view.linked_portfolios.is_empty());
        assert_eq!(view.unlinked_portfolios.len(), 1);
        assert_eq!(titles(&view.unlinked_royalties), vec!["Book 2", "Book 10"]);

        let linked = link(&store, royalties[0].id, ads).await.unwrap();
        assert_eq!(linked.portfolio_id, Some(ads));

        let view = dashboard_view(&store).await.unwrap();
        assert_eq!(view.linked_portfolios.len(), 1);
        assert_eq!(titles(&view.linked_portfolios[0].royalties), vec!["Book 10"]);
        assert!(view.unlinked_portfolios.is_empty());
        assert_eq!(titles(&view.unlinked_royalties), vec!["Book 2"]);

        unlink(&store, royalties[0].id).await.unwrap();
        // Second unlink is a no-op
        let cleared = unlink(&store, royalties[0].id).await.unwrap();
        assert_eq!(cleared.portfolio_id, None);

        let view = dashboard_view(&store).await.unwrap();
        assert!(view.linked_portfolios.is_empty());
        assert_eq!(titles(&view.unlinked_royalties), vec!["Book 2", "Book 10"]);
    }

    #[tokio::test]
    async fn test_link_missing_ids() {
        let store = Store::open_in_memory().await.unwrap();
        let royalties = store
            .reconcile_royalties("acct", vec![draft("Only")], false)
            .await
            .unwrap();

        let err = link(&store, 999, 1).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { entity: "Royalty", id: 999 }));

        let err = link(&store, royalties[0].id, 42).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { entity: "Portfolio", id: 42 }));

        // No state change on failure
        let royalty = store.royalty_by_id(royalties[0].id).await.unwrap().unwrap();
        assert_eq!(royalty.portfolio_id, None);

        let err = unlink(&store, 999).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_link_survives_reingestion() {
        let store = Store::open_in_memory().await.unwrap();
        let portfolios = store.reconcile_portfolios("acct", vec![portfolio("Ads")]).await.unwrap();
        let royalties = store
            .reconcile_royalties("acct", vec![draft("Linked Book")], false)
            .await
            .unwrap();
        link(&store, royalties[0].id, portfolios[0].id).await.unwrap();

        let mut updated = draft("Linked Book");
        updated.total_royalties_usd = "$9.00".to_string();
        let after = store.reconcile_royalties("acct", vec![updated], false).await.unwrap();

        assert_eq!(after[0].id, royalties[0].id);
        assert_eq!(after[0].portfolio_id, Some(portfolios[0].id));
        assert_eq!(after[0].total_royalties_usd, "$9.00");
    }

    #[tokio::test]
    async fn test_portfolio_royalties() {
        let store = Store::open_in_memory().await.unwrap();
        let portfolios = store.reconcile_portfolios("acct", vec![portfolio("Ads")]).await.unwrap();
        let royalties = store
            .reconcile_royalties("acct", vec![draft("Book 3"), draft("book 1"), draft("Other")], false)
            .await
            .unwrap();
        let ads = portfolios[0].id;

        link(&store, royalties[0].id, ads).await.unwrap();
        link(&store, royalties[1].id, ads).await.unwrap();

        let linked = portfolio_royalties(&store, ads).await.unwrap();
        assert_eq!(titles(&linked), vec!["book 1", "Book 3"]);

        let err = portfolio_royalties(&store, ads + 100).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { entity: "Portfolio", .. }));
    }

    #[test]
    fn test_dangling_reference_is_unlinked() {
        let royalty = RoyaltyRecord {
            id: 1,
            account_identifier: "acct".into(),
            book_title: "Orphan".into(),
            ebook_royalties: "$0.00".into(),
            print_royalties: "$0.00".into(),
            kenp_royalties: "$0.00".into(),
            total_royalties: "$0.00".into(),
            total_royalties_usd: "$0.00".into(),
            last_month_royalty: None,
            portfolio_id: Some(77),
            created_at: String::new(),
            updated_at: String::new(),
        };

        let view = build_dashboard(vec![], vec![royalty]);
        assert_eq!(titles(&view.unlinked_royalties), vec!["Orphan"]);
    }
}
