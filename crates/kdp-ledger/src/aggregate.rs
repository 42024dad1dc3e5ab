//! Merge duplicate rows that share an identity key
//!
//! The dashboards can render the same title or portfolio more than once
//! (paginated fragments). Reconciliation expects one row per key, so amounts
//! are summed here and reformatted for display.
//!
//! Only `total_royalties_usd` is known to be dollars. Marketplace columns
//! keep the currency symbol of the first token that carries one.

use std::collections::HashMap;

use crate::models::{PortfolioDraft, RawPortfolioRow, RawRoyaltyRow, RoyaltyDraft};
use crate::money::{currency_prefix, format_amount, format_usd, to_amount};

/// Running sum of one display column in the currency it was rendered in
#[derive(Default)]
struct Column {
    amount: f64,
    symbol: Option<String>,
}

impl Column {
    fn add(&mut self, token: &str) {
        self.amount += to_amount(token);
        if self.symbol.is_none() {
            self.symbol = currency_prefix(token).map(str::to_string);
        }
    }

    fn render(&self) -> String {
        format_amount(self.amount, self.symbol.as_deref().unwrap_or_default())
    }
}

#[derive(Default)]
struct RoyaltyTotals {
    ebook: Column,
    print: Column,
    kenp: Column,
    total: Column,
    total_usd: f64,
}

/// Collapse royalty rows by book title, first appearance decides order
pub fn aggregate_royalties(rows: &[RawRoyaltyRow]) -> Vec<RoyaltyDraft> {
    let mut order: Vec<&str> = Vec::new();
    let mut totals: HashMap<&str, RoyaltyTotals> = HashMap::new();

    for row in rows {
        let entry = totals.entry(row.book_title.as_str()).or_insert_with(|| {
            order.push(row.book_title.as_str());
            RoyaltyTotals::default()
        });
        entry.ebook.add(&row.ebook_royalties);
        entry.print.add(&row.print_royalties);
        entry.kenp.add(&row.kenp_royalties);
        entry.total.add(&row.total_royalties);
        entry.total_usd += to_amount(&row.total_royalties_usd);
    }

    order
        .into_iter()
        .filter_map(|title| {
            let t = totals.remove(title)?;
            Some(RoyaltyDraft {
                book_title: title.to_string(),
                ebook_royalties: t.ebook.render(),
                print_royalties: t.print.render(),
                kenp_royalties: t.kenp.render(),
                total_royalties: t.total.render(),
                total_royalties_usd: format_usd(t.total_usd),
            })
        })
        .collect()
}

/// Collapse portfolio rows by name, summing spend
pub fn aggregate_portfolios(rows: &[RawPortfolioRow]) -> Vec<PortfolioDraft> {
    let mut order: Vec<&str> = Vec::new();
    let mut spend: HashMap<&str, Column> = HashMap::new();

    for row in rows {
        spend
            .entry(row.portfolio_name.as_str())
            .or_insert_with(|| {
                order.push(row.portfolio_name.as_str());
                Column::default()
            })
            .add(&row.spend);
    }

    order
        .into_iter()
        .filter_map(|name| {
            let column = spend.remove(name)?;
            Some(PortfolioDraft {
                portfolio_name: name.to_string(),
                spend: column.render(),
            })
        })
        .collect()
}
