//! Record extraction from dashboard HTML
//!
//! Extraction is best-effort: rows that match a block but lack sub-fields
//! are kept with placeholder values, and selectors that match nothing yield
//! an empty result. Only a document that cannot be parsed at all is an error.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::config::SelectorConfig;
use crate::constants::{ROYALTY_VALUE_COLUMNS, TITLE_PLACEHOLDER, ZERO_PLACEHOLDER};
use crate::error::{LedgerError, Result};
use crate::models::{RawPortfolioRow, RawRoyaltyRow};

/// Compiled selectors for both dashboard schemas
#[derive(Debug, Clone)]
pub struct Extractor {
    royalty_rows: Selector,
    royalty_image: Selector,
    royalty_title: Selector,
    royalty_values: Selector,
    portfolio_name: Selector,
    portfolio_spend: Selector,
}

impl Extractor {
    /// Compile every configured selector up front so a bad config fails fast
    pub fn new(selectors: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            royalty_rows: compile(&selectors.royalty_rows)?,
            royalty_image: compile(&selectors.royalty_image)?,
            royalty_title: compile(&selectors.royalty_title)?,
            royalty_values: compile(&selectors.royalty_values)?,
            portfolio_name: compile(&selectors.portfolio_name)?,
            portfolio_spend: compile(&selectors.portfolio_spend)?,
        })
    }

    /// Extract per-book royalty rows in document order.
    ///
    /// Blocks without an image are summary rows and are skipped. Blocks with
    /// fewer than five value columns are emitted with every amount set to
    /// the zero placeholder.
    pub fn extract_royalties(&self, html: &str) -> Result<Vec<RawRoyaltyRow>> {
        let doc = parse_document(html)?;

        let mut rows = Vec::new();
        let mut matched = 0usize;

        for block in doc.select(&self.royalty_rows) {
            matched += 1;

            if block.select(&self.royalty_image).next().is_none() {
                debug!("Skipping summary row (no image)");
                continue;
            }

            let book_title = block
                .select(&self.royalty_title)
                .next()
                .map(collect_text)
                .unwrap_or_else(|| TITLE_PLACEHOLDER.to_string());

            let values: Vec<String> = block.select(&self.royalty_values).map(collect_text).collect();

            let row = if values.len() >= ROYALTY_VALUE_COLUMNS {
                RawRoyaltyRow {
                    book_title,
                    ebook_royalties: values[0].clone(),
                    print_royalties: values[1].clone(),
                    kenp_royalties: values[2].clone(),
                    total_royalties: values[3].clone(),
                    total_royalties_usd: values[4].clone(),
                    degraded: false,
                }
            } else {
                warn!(
                    "Royalty row '{}' has {} of {} value columns, using placeholders",
                    book_title,
                    values.len(),
                    ROYALTY_VALUE_COLUMNS
                );
                RawRoyaltyRow {
                    book_title,
                    ebook_royalties: ZERO_PLACEHOLDER.to_string(),
                    print_royalties: ZERO_PLACEHOLDER.to_string(),
                    kenp_royalties: ZERO_PLACEHOLDER.to_string(),
                    total_royalties: ZERO_PLACEHOLDER.to_string(),
                    total_royalties_usd: ZERO_PLACEHOLDER.to_string(),
                    degraded: true,
                }
            };

            rows.push(row);
        }

        if matched == 0 {
            warn!("No royalty blocks matched the row selector");
        }
        debug!("Extracted {} royalty rows from {} blocks", rows.len(), matched);

        Ok(rows)
    }

    /// Extract portfolio name/spend pairs.
    ///
    /// Names and spends come from two independent selections paired by
    /// position, so the output is as long as the shorter of the two.
    pub fn extract_portfolios(&self, html: &str) -> Result<Vec<RawPortfolioRow>> {
        let doc = parse_document(html)?;

        let names: Vec<String> = doc.select(&self.portfolio_name).map(collect_text).collect();
        let spends: Vec<String> = doc.select(&self.portfolio_spend).map(collect_text).collect();

        if names.is_empty() {
            warn!("No portfolio names matched the name selector");
        }
        if spends.is_empty() {
            warn!("No spend values matched the spend selector");
        }
        // TODO: pair by the shared grid row once the console markup exposes a row container
        if names.len() != spends.len() {
            warn!(
                "Portfolio name count ({}) differs from spend count ({}); pairing by position",
                names.len(),
                spends.len()
            );
        }

        let rows: Vec<RawPortfolioRow> = names
            .into_iter()
            .zip(spends)
            .map(|(portfolio_name, spend)| RawPortfolioRow { portfolio_name, spend })
            .collect();

        debug!("Extracted {} portfolio rows", rows.len());
        Ok(rows)
    }
}

// =============================================================================
// Helper functions
// =============================================================================

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| LedgerError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// html5ever recovers from any malformed markup, so an empty document is
/// the only input without a tree to walk.
fn parse_document(html: &str) -> Result<Html> {
    if html.trim().is_empty() {
        return Err(LedgerError::Parse("document is empty".to_string()));
    }
    Ok(Html::parse_document(html))
}

/// Text content with each text node trimmed and joined by single spaces
fn collect_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{portfolio_page, portfolio_row, royalty_block, royalty_page, summary_block};

    fn extractor() -> Extractor {
        Extractor::new(&SelectorConfig::default()).unwrap()
    }

    #[test]
    fn test_summary_row_is_skipped() {
        let html = royalty_page(&[
            summary_block(),
            royalty_block(
                Some("Book Title 1"),
                true,
                &["$1.00", "$2.00", "$3.00", "$6.00", "$6.00"],
            ),
        ]);

        let rows = extractor().extract_royalties(&html).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].book_title, "Book Title 1");
        assert_eq!(rows[0].ebook_royalties, "$1.00");
        assert_eq!(rows[0].print_royalties, "$2.00");
        assert_eq!(rows[0].kenp_royalties, "$3.00");
        assert_eq!(rows[0].total_royalties, "$6.00");
        assert_eq!(rows[0].total_royalties_usd, "$6.00");
        assert!(!rows[0].degraded);
    }

    #[test]
    fn test_rows_without_image_never_appear() {
        let html = royalty_page(&[
            royalty_block(Some("No Cover"), false, &["$1.00", "$1.00", "$1.00", "$3.00", "$3.00"]),
            royalty_block(Some("Has Cover"), true, &["$1.00", "$1.00", "$1.00", "$3.00", "$3.00"]),
            royalty_block(Some("Also No Cover"), false, &[]),
        ]);

        let rows = extractor().extract_royalties(&html).unwrap();
        let titles: Vec<&str> = rows.iter().map(|r| r.book_title.as_str()).collect();
        assert_eq!(titles, vec!["Has Cover"]);
    }

    #[test]
    fn test_missing_columns_degrade_to_placeholders() {
        let html = royalty_page(&[royalty_block(Some("Short Row"), true, &["$1.00", "$2.00", "$3.00"])]);

        let rows = extractor().extract_royalties(&html).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert!(row.degraded);
        assert_eq!(row.book_title, "Short Row");
        for value in [
            &row.ebook_royalties,
            &row.print_royalties,
            &row.kenp_royalties,
            &row.total_royalties,
            &row.total_royalties_usd,
        ] {
            assert_eq!(value, ZERO_PLACEHOLDER);
        }
    }

    #[test]
    fn test_missing_title_uses_placeholder() {
        let html = royalty_page(&[royalty_block(None, true, &["$1", "$1", "$1", "$3", "$3"])]);

        let rows = extractor().extract_royalties(&html).unwrap();
        assert_eq!(rows[0].book_title, TITLE_PLACEHOLDER);
    }

    #[test]
    fn test_empty_title_element_is_kept_empty() {
        // Placeholder only stands in for a missing element
        let html = royalty_page(&[royalty_block(Some("  "), true, &["$1", "$1", "$1", "$3", "$3"])]);

        let rows = extractor().extract_royalties(&html).unwrap();
        assert_eq!(rows[0].book_title, "");
    }

    #[test]
    fn test_document_order_is_preserved() {
        let values = ["$1.00", "$0.00", "$0.00", "$1.00", "$1.00"];
        let html = royalty_page(&[
            royalty_block(Some("Zeta"), true, &values),
            royalty_block(Some("Alpha"), true, &values),
            royalty_block(Some("Mu"), true, &values),
        ]);

        let rows = extractor().extract_royalties(&html).unwrap();
        let titles: Vec<&str> = rows.iter().map(|r| r.book_title.as_str()).collect();
        assert_eq!(titles, vec!["Zeta", "Alpha", "Mu"]);
    }

    #[test]
    fn test_no_container_yields_empty() {
        let rows = extractor()
            .extract_royalties("<html><body><p>Session expired</p></body></html>")
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_empty_document_is_parse_failure() {
        let err = extractor().extract_royalties("   \n ").unwrap_err();
        assert!(matches!(err, LedgerError::Parse(_)));

        let err = extractor().extract_portfolios("").unwrap_err();
        assert!(matches!(err, LedgerError::Parse(_)));
    }

    #[test]
    fn test_malformed_markup_still_extracts() {
        // Unclosed tags are repaired by the tree builder
        let html = royalty_page(&[royalty_block(
            Some("Broken &amp; Fixed"),
            true,
            &["$1.00", "$2.00", "$3.00", "$6.00", "$6.00"],
        )])
        .replace("</body></html>", "<div><span>");

        let rows = extractor().extract_royalties(&html).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].book_title, "Broken & Fixed");
    }

    #[test]
    fn test_portfolios_paired_by_position() {
        let html = portfolio_page(&[
            portfolio_row("Portfolio 1 Name", "$61.66"),
            portfolio_row("Portfolio 2 Name", "$123.45"),
        ]);

        let rows = extractor().extract_portfolios(&html).unwrap();
        assert_eq!(
            rows,
            vec![
                RawPortfolioRow {
                    portfolio_name: "Portfolio 1 Name".into(),
                    spend: "$61.66".into()
                },
                RawPortfolioRow {
                    portfolio_name: "Portfolio 2 Name".into(),
                    spend: "$123.45".into()
                },
            ]
        );
    }

    #[test]
    fn test_portfolio_zip_truncates_to_shorter() {
        let mut html = portfolio_page(&[
            portfolio_row("First", "$1.00"),
            portfolio_row("Second", "$2.00"),
        ]);
        html = html.replace(
            r#"<a data-e2e-id="entityNameRenderer" class="sc-qPNpY gUSggg" href="/cm/portfolios/A262GKTNS7B93Y">Second</a>"#,
            "",
        );

        let rows = extractor().extract_portfolios(&html).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].portfolio_name, "First");
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let selectors = SelectorConfig {
            royalty_rows: "div[".to_string(),
            ..SelectorConfig::default()
        };

        let err = Extractor::new(&selectors).unwrap_err();
        assert!(matches!(err, LedgerError::Selector { .. }));
    }
}
