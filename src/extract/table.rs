//! Header-matched table listings (codes.ohio.gov, statutes.capitol.texas.gov)
//!
//! Listing pages carry several tables; the one holding the children has a
//! `<th>` naming the child level ("Title", "Chapter", "Section"). Ohio keeps
//! section bodies in `.laws-body` with a "Last updated" line nearby; Texas
//! prints plain paragraphs, the first opening with `Sec. N. NAME.`.

use super::{normalize_whitespace, selector, ChildLink, ExtractionStrategy};
use crate::crawler::Page;
use crate::hierarchy::NodeKind;
use crate::store::SectionDetails;
use crate::url::resolve_href;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use url::Url;

const LAST_UPDATED: &str = "Last updated";

static SECTION_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Sec\.\s+(\d+(?:\.\d+)*[A-Za-z]?)\.\s+([A-Z][A-Z0-9\s;,'()\-]*?)\.(?:\s|$)")
        .expect("Invalid section heading regex")
});

/// Where a section page keeps its text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionBody {
    /// Paragraphs inside `.laws-body`
    LawsBody,
    /// Every paragraph of the page except centered banners, heading stripped
    HeadedParagraphs,
}

/// Strategy for sites that list children in header-matched tables
#[derive(Debug, Clone)]
pub struct TableStrategy {
    base_url: Url,
    body: SectionBody,
}

impl TableStrategy {
    /// Tables with `.laws-body` sections (Ohio)
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            body: SectionBody::LawsBody,
        }
    }

    /// Tables with `Sec. N. NAME.` paragraph sections (Texas)
    pub fn texas(base_url: Url) -> Self {
        Self {
            base_url,
            body: SectionBody::HeadedParagraphs,
        }
    }

    /// Finds the first table with a header cell containing `header`
    fn find_table<'a>(document: &'a Html, header: &str) -> Option<ElementRef<'a>> {
        let table_sel = selector("table")?;
        let th_sel = selector("th")?;

        document.select(&table_sel).find(|table| {
            table
                .select(&th_sel)
                .any(|th| th.text().collect::<String>().contains(header))
        })
    }
}

impl ExtractionStrategy for TableStrategy {
    fn list_children(&self, page: &Page, kind: NodeKind) -> Vec<ChildLink> {
        let document = Html::parse_document(&page.html);

        let Some(table) = Self::find_table(&document, kind.header()) else {
            tracing::debug!("No '{}' table on {}", kind.header(), page.url);
            return Vec::new();
        };

        let (Some(row_sel), Some(link_sel)) = (selector("tr"), selector("a[href]")) else {
            return Vec::new();
        };

        let mut links = Vec::new();
        for row in table.select(&row_sel) {
            let Some(anchor) = row.select(&link_sel).next() else {
                continue;
            };
            let Some(url) = anchor
                .value()
                .attr("href")
                .and_then(|href| resolve_href(href, &self.base_url))
            else {
                continue;
            };

            let mut label = normalize_whitespace(&anchor.text().collect::<String>());
            // Section rows read "Section 101.01 | Definitions." and the
            // trailing sentence is not part of the name.
            if kind == NodeKind::Section {
                label = cut_section_name(&label);
            }

            links.push(ChildLink { label, url });
        }

        links
    }

    fn extract_text(&self, page: &Page) -> Option<String> {
        let document = Html::parse_document(&page.html);

        let paragraphs = match self.body {
            SectionBody::LawsBody => laws_body_paragraphs(&document)?,
            SectionBody::HeadedParagraphs => headed_paragraphs(&document)?,
        };

        if paragraphs.is_empty() {
            return None;
        }

        Some(paragraphs.join("\n"))
    }

    fn extract_details(&self, page: &Page) -> SectionDetails {
        let document = Html::parse_document(&page.html);

        match self.body {
            SectionBody::LawsBody => SectionDetails {
                last_updated: last_updated(&document),
                ..SectionDetails::default()
            },
            SectionBody::HeadedParagraphs => {
                let heading = plain_paragraphs(&document)
                    .unwrap_or_default()
                    .iter()
                    .find_map(|text| {
                        SECTION_HEADING
                            .captures(text)
                            .map(|caps| (caps[1].to_string(), normalize_whitespace(&caps[2])))
                    });

                match heading {
                    Some((number, name)) => SectionDetails {
                        heading_number: Some(number),
                        heading_name: Some(name),
                        ..SectionDetails::default()
                    },
                    None => SectionDetails::default(),
                }
            }
        }
    }

    fn listing_marker(&self) -> &str {
        "table"
    }

    fn content_marker(&self) -> &str {
        "body"
    }
}

fn laws_body_paragraphs(document: &Html) -> Option<Vec<String>> {
    let body_sel = selector(".laws-body")?;
    let p_sel = selector("p")?;

    let body = document.select(&body_sel).next()?;
    Some(
        body.select(&p_sel)
            .map(|p| p.text().collect::<String>().trim().to_string())
            .collect(),
    )
}

/// Trimmed text of every non-centered paragraph on the page
fn plain_paragraphs(document: &Html) -> Option<Vec<String>> {
    let p_sel = selector("body p:not(.center)")?;
    Some(
        document
            .select(&p_sel)
            .map(|p| p.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty())
            .collect(),
    )
}

/// Plain paragraphs with the first `Sec. N. NAME.` heading removed
fn headed_paragraphs(document: &Html) -> Option<Vec<String>> {
    let mut stripped = false;
    let paragraphs = plain_paragraphs(document)?
        .into_iter()
        .filter_map(|text| {
            if stripped {
                return Some(text);
            }
            let Some(found) = SECTION_HEADING.find(&text) else {
                return Some(text);
            };
            stripped = true;
            let rest = format!("{}{}", &text[..found.start()], &text[found.end()..]);
            let rest = rest.trim();
            (!rest.is_empty()).then(|| rest.to_string())
        })
        .collect();
    Some(paragraphs)
}

/// Date from the paragraph reading "Last updated ..."
fn last_updated(document: &Html) -> Option<String> {
    let p_sel = selector("p")?;
    document
        .select(&p_sel)
        .map(|p| normalize_whitespace(&p.text().collect::<String>()))
        .find_map(|text| {
            let date = text.split_once(LAST_UPDATED)?.1.trim();
            (!date.is_empty()).then(|| date.to_string())
        })
}

/// Truncates the display part of a section label at its first `.`
///
/// The number before the `|` keeps its dots.
fn cut_section_name(label: &str) -> String {
    match label.split_once('|') {
        Some((head, tail)) => {
            let name = tail.split('.').next().unwrap_or_default();
            format!("{}| {}", head, name.trim())
        }
        None => label.split('.').next().unwrap_or_default().to_string(),
    }
}
