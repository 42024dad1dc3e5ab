//! HTML fixtures shaped like the KDP dashboards, shared by the test modules

/// One `div.item` block of the royalties estimator.
///
/// `image` controls whether the cover thumbnail is present; summary rows
/// render without one.
pub fn royalty_block(title: Option<&str>, image: bool, values: &[&str]) -> String {
    let cover = if image {
        r#"<div class="ui tiny image"><img src="https://m.media-amazon.com/images/I/cover.jpg" alt=""></div>"#
    } else {
        ""
    };

    let title_html = match title {
        Some(t) => format!(r#"<div class="middle aligned column truncate-overflow">{t}</div>"#),
        None => r#"<div class="middle aligned column">untitled</div>"#.to_string(),
    };

    let value_html: String = values
        .iter()
        .map(|v| {
            format!(
                r#"<div class="computer only right aligned middle aligned two wide computer column">{v}</div>"#
            )
        })
        .collect();

    format!(
        r#"
        <div class="item">
            {cover}
            <div class="content">
                <div class="ui vertically divided grid">
                    <div class="row panel-title-new header-height">
                        <div class="ui container padded equal width grid floating-text header-height">
                            <div class="five wide computer column">
                                <div class="ui grid header-height">{title_html}</div>
                            </div>
                        </div>
                        <div class="ui container padded equal width grid header-height">
                            <div class="sixteen wide computer column">
                                <div class="ui equal width grid header-height">
                                    <div class="row">{value_html}</div>
                                </div>
                            </div>
                        </div>
                    </div>
                </div>
            </div>
        </div>"#
    )
}

/// Wrap blocks in the royalties item list container
pub fn royalty_page(blocks: &[String]) -> String {
    format!(
        r#"<html><body><div id="report">
        <div class="ui items no-margin unstackable">{}</div>
        </div></body></html>"#,
        blocks.concat()
    )
}

/// The summary row KDP renders above the books
pub fn summary_block() -> String {
    royalty_block(
        Some("All 5 books"),
        false,
        &["$0.00", "$55.86", "$0.79", "$56.65", "$56.65"],
    )
}

/// One row of the advertising console grid: name cell and spend cell
pub fn portfolio_row(name: &str, spend: &str) -> String {
    format!(
        r#"
        <div style="height: 50px; position: relative;">
            <div class="BottomLeftGrid_ScrollWrapper">
                <div data-e2e-id="tableCell_cell_name" class="sc-jxllNA iqzjfr">
                    <div class="styles-module__baseCellStyles_VxPntQ0I6YzClYStXxBm">
                        <div><a data-e2e-id="entityNameRenderer" class="sc-qPNpY gUSggg" href="/cm/portfolios/A262GKTNS7B93Y">{name}</a></div>
                    </div>
                </div>
            </div>
            <div class="ReactVirtualized__Grid" role="grid">
                <div data-e2e-id="tableCell_cell_spend" class="sc-jxllNA iqzjfr">
                    <div class="styles-module__baseCellStyles_VxPntQ0I6YzClYStXxBm">
                        <div data-e2e-id="currencyRenderer" class="sc-pYOYC fXMHSK">{spend}<br></div>
                    </div>
                </div>
            </div>
        </div>"#
    )
}

pub fn portfolio_page(rows: &[String]) -> String {
    format!("<html><body>{}</body></html>", rows.concat())
}
