//! `ul.generalLawsList` listings (malegislature.gov)
//!
//! Parts, chapters and sections are anchors in `ul.generalLawsList`, each
//! carrying a `span.{kind}` with the number and a `span.{kind}Title` with the
//! name. Titles sit in a Bootstrap accordion instead, so a listing page is
//! ready once either is present. Section text is the first paragraph opening
//! with "Section".

use super::{normalize_whitespace, selector, ChildLink, ExtractionStrategy};
use crate::crawler::Page;
use crate::hierarchy::NodeKind;
use crate::url::resolve_href;
use scraper::{ElementRef, Html};
use url::Url;

const LIST_LINKS: &str = "ul.generalLawsList > li > a";
const ACCORDION_PANELS: &str = "#accordion .panel";
const LISTING_MARKER: &str = "ul.generalLawsList, #accordion";

/// Strategy for sites that list children in `ul.generalLawsList`
#[derive(Debug, Clone)]
pub struct ListStrategy {
    base_url: Url,
}

impl ListStrategy {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    fn list_links(&self, document: &Html, kind: NodeKind) -> Vec<ChildLink> {
        let Some(link_sel) = selector(LIST_LINKS) else {
            return Vec::new();
        };

        document
            .select(&link_sel)
            .filter_map(|anchor| {
                let url = resolve_href(anchor.value().attr("href")?, &self.base_url)?;
                Some(ChildLink {
                    label: span_label(&anchor, kind),
                    url,
                })
            })
            .collect()
    }

    /// Reads title panels from the accordion
    ///
    /// Panel anchors are toggles, so when the href does not lead anywhere the
    /// title URL is built from the part page: `{part}/Title{N}`.
    fn accordion_links(&self, document: &Html, page: &Page) -> Vec<ChildLink> {
        let (Some(panel_sel), Some(anchor_sel), Some(title_sel)) = (
            selector(ACCORDION_PANELS),
            selector(".glTitle.panel-title a"),
            selector(".panel-title"),
        ) else {
            return Vec::new();
        };

        let mut links = Vec::new();
        for panel in document.select(&panel_sel) {
            let Some(anchor) = panel.select(&anchor_sel).next() else {
                continue;
            };
            let display = normalize_whitespace(&anchor.text().collect::<String>());
            let number = display.trim_start_matches("Title").trim().to_string();
            if number.is_empty() {
                continue;
            }

            let url = anchor
                .value()
                .attr("href")
                .filter(|href| !href.trim().starts_with('#'))
                .and_then(|href| resolve_href(href, &self.base_url))
                .unwrap_or_else(|| {
                    let part = page.url.as_str().trim_end_matches('/');
                    format!("{}/Title{}", part, number)
                });

            let description = panel
                .select(&title_sel)
                .nth(1)
                .map(|el| normalize_whitespace(&el.text().collect::<String>()))
                .unwrap_or_default();

            let label = if description.is_empty() {
                display
            } else {
                format!("{} | {}", display, description)
            };

            links.push(ChildLink { label, url });
        }

        links
    }
}

impl ExtractionStrategy for ListStrategy {
    fn list_children(&self, page: &Page, kind: NodeKind) -> Vec<ChildLink> {
        let document = Html::parse_document(&page.html);

        // Part pages nest each title's chapter list inside its panel
        if kind == NodeKind::Title {
            let titles = self.accordion_links(&document, page);
            if !titles.is_empty() {
                return titles;
            }
        }

        self.list_links(&document, kind)
    }

    fn extract_text(&self, page: &Page) -> Option<String> {
        let document = Html::parse_document(&page.html);
        let p_sel = selector("p")?;

        document
            .select(&p_sel)
            .map(|p| p.text().collect::<String>().trim().to_string())
            .find(|text| text.starts_with("Section"))
    }

    fn listing_marker(&self) -> &str {
        LISTING_MARKER
    }

    fn content_marker(&self) -> &str {
        "p"
    }
}

/// Builds `"{span.kind} | {span.kindTitle}"`, or the anchor text when either
/// span is missing
fn span_label(anchor: &ElementRef<'_>, kind: NodeKind) -> String {
    let span_text = |css: &str| -> Option<String> {
        let sel = selector(css)?;
        let text = normalize_whitespace(&anchor.select(&sel).next()?.text().collect::<String>());
        (!text.is_empty()).then_some(text)
    };

    let name = kind.as_str();
    match (
        span_text(&format!("span.{}", name)),
        span_text(&format!("span.{}Title", name)),
    ) {
        (Some(number), Some(title)) => format!("{} | {}", number, title),
        _ => normalize_whitespace(&anchor.text().collect::<String>()),
    }
}
