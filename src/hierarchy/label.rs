//! Display-label parsing for hierarchy links
//!
//! Listing pages show links as `"Chapter 5 | Definitions"`. The number is the
//! second word before the `|`, the label is whatever follows it.

/// Number token used when a label carries no parsable number
pub const UNNUMBERED: &str = "0";

/// A link label split into its number and its display text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLabel {
    pub number: String,
    pub label: String,
}

/// Splits a raw link label into number and display text
///
/// # Rules
///
/// - Split on `|` and trim every part
/// - The first part split on whitespace yields the number (second word)
/// - Without a second `|` segment the number is `"0"` and the label is the
///   whole first part
///
/// # Example
///
/// ```
/// use statute_crawler::hierarchy::parse_label;
///
/// let parsed = parse_label("Chapter 5 | Definitions");
/// assert_eq!(parsed.number, "5");
/// assert_eq!(parsed.label, "Definitions");
///
/// let bare = parse_label("Chapter 5");
/// assert_eq!(bare.number, "0");
/// assert_eq!(bare.label, "Chapter 5");
/// ```
pub fn parse_label(raw: &str) -> ParsedLabel {
    let mut parts = raw.split('|').map(str::trim);
    let head = parts.next().unwrap_or_default();

    match parts.next() {
        Some(tail) => ParsedLabel {
            number: head
                .split_whitespace()
                .nth(1)
                .unwrap_or(UNNUMBERED)
                .to_string(),
            label: tail.to_string(),
        },
        None => ParsedLabel {
            number: UNNUMBERED.to_string(),
            label: head.to_string(),
        },
    }
}
