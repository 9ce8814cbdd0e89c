//! Legal-code hierarchy model
//!
//! The link expander builds a tree of [`HierarchyNode`]s; the scheduler works
//! from the flat list of [`LeafDescriptor`]s (or [`ChapterDescriptor`]s) taken
//! from that tree; finished records are attached back for tree output.

mod label;

pub use label::{parse_label, ParsedLabel, UNNUMBERED};

use crate::extract::ChildLink;
use crate::store::SectionRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Level of a node in the legal-code hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Part,
    Title,
    Chapter,
    Section,
}

impl NodeKind {
    /// Position from the top of the hierarchy
    pub fn depth(&self) -> u8 {
        match self {
            Self::Part => 0,
            Self::Title => 1,
            Self::Chapter => 2,
            Self::Section => 3,
        }
    }

    /// Lowercase name, as used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Part => "part",
            Self::Title => "title",
            Self::Chapter => "chapter",
            Self::Section => "section",
        }
    }

    /// Header text a listing table for this level carries
    pub fn header(&self) -> &'static str {
        match self {
            Self::Part => "Part",
            Self::Title => "Title",
            Self::Chapter => "Chapter",
            Self::Section => "Section",
        }
    }
}

/// One node of the crawled hierarchy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyNode {
    pub kind: NodeKind,
    pub number: String,
    pub label: String,
    pub url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HierarchyNode>,
    /// Section text; empty on sections until the crawl fills it, absent on
    /// every other kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl HierarchyNode {
    /// Builds a childless node from a discovered link
    pub fn from_link(kind: NodeKind, link: &ChildLink) -> Self {
        let parsed = parse_label(&link.label);
        Self {
            kind,
            number: parsed.number,
            label: parsed.label,
            url: link.url.clone(),
            children: Vec::new(),
            text: (kind == NodeKind::Section).then(String::new),
        }
    }

    fn from_record(record: &SectionRecord) -> Self {
        Self {
            kind: NodeKind::Section,
            number: record.section_number.clone(),
            label: record.section_label.clone(),
            url: record.url.clone(),
            children: Vec::new(),
            text: Some(record.text.clone()),
        }
    }
}

/// A section queued for the crawl scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafDescriptor {
    pub chapter_number: String,
    pub chapter_url: String,
    pub section_number: String,
    pub section_label: String,
    pub url: String,
    /// Position of the section within its chapter listing
    pub section_index: usize,
    /// Position of the work item that produced this leaf (the leaf itself,
    /// or its chapter under worker-side discovery)
    pub position: usize,
}

impl LeafDescriptor {
    /// Composite store key, `chapter{N}_section{M}`
    pub fn key(&self) -> String {
        section_key(&self.chapter_number, &self.section_number)
    }
}

/// Formats the composite key of a section
pub fn section_key(chapter_number: &str, section_number: &str) -> String {
    format!("chapter{}_section{}", chapter_number, section_number)
}

/// A chapter queued for worker-side section discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDescriptor {
    pub number: String,
    pub label: String,
    pub url: String,
    /// Position of the chapter in the worklist
    pub position: usize,
}

/// Collects every section of the tree as a leaf descriptor, depth-first
///
/// The parent of a section plays the chapter role. Sections at the top of
/// the tree belong to chapter `"0"` with an empty chapter URL.
pub fn collect_leaves(tree: &[HierarchyNode]) -> Vec<LeafDescriptor> {
    let mut leaves = Vec::new();
    collect_leaves_into(tree, UNNUMBERED, "", &mut leaves);
    leaves
}

fn collect_leaves_into(
    nodes: &[HierarchyNode],
    parent_number: &str,
    parent_url: &str,
    leaves: &mut Vec<LeafDescriptor>,
) {
    let mut section_index = 0;
    for node in nodes {
        if node.kind == NodeKind::Section {
            leaves.push(LeafDescriptor {
                chapter_number: parent_number.to_string(),
                chapter_url: parent_url.to_string(),
                section_number: node.number.clone(),
                section_label: node.label.clone(),
                url: node.url.clone(),
                section_index,
                position: leaves.len(),
            });
            section_index += 1;
        } else {
            collect_leaves_into(&node.children, &node.number, &node.url, leaves);
        }
    }
}

/// Collects every chapter node of the tree, depth-first
pub fn collect_chapters(tree: &[HierarchyNode]) -> Vec<ChapterDescriptor> {
    let mut chapters = Vec::new();
    let mut stack: Vec<&HierarchyNode> = tree.iter().rev().collect();

    while let Some(node) = stack.pop() {
        if node.kind == NodeKind::Chapter {
            chapters.push(ChapterDescriptor {
                number: node.number.clone(),
                label: node.label.clone(),
                url: node.url.clone(),
                position: chapters.len(),
            });
        }
        stack.extend(node.children.iter().rev());
    }

    chapters
}

/// Replaces the sections of the tree with the crawled records
///
/// Records are grouped by their chapter and placed under the matching node in
/// listing order. Nodes without records keep their children untouched.
pub fn attach_records<'a, I>(tree: &mut Vec<HierarchyNode>, records: I)
where
    I: IntoIterator<Item = &'a SectionRecord>,
{
    let mut groups: HashMap<(&str, &str), Vec<&SectionRecord>> = HashMap::new();
    for record in records {
        groups
            .entry((record.chapter_number.as_str(), record.chapter_url.as_str()))
            .or_default()
            .push(record);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|r| r.section_index);
    }

    attach_into(tree, UNNUMBERED, "", &groups);
}

fn attach_into(
    nodes: &mut Vec<HierarchyNode>,
    parent_number: &str,
    parent_url: &str,
    groups: &HashMap<(&str, &str), Vec<&SectionRecord>>,
) {
    if let Some(records) = groups.get(&(parent_number, parent_url)) {
        nodes.retain(|n| n.kind != NodeKind::Section);
        nodes.extend(records.iter().map(|r| HierarchyNode::from_record(r)));
    }

    for node in nodes.iter_mut().filter(|n| n.kind != NodeKind::Section) {
        let (number, url) = (node.number.clone(), node.url.clone());
        attach_into(&mut node.children, &number, &url, groups);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SectionStatus;

    fn node(kind: NodeKind, number: &str, url: &str, children: Vec<HierarchyNode>) -> HierarchyNode {
        HierarchyNode {
            kind,
            number: number.to_string(),
            label: format!("{} {}", kind.header(), number),
            url: url.to_string(),
            children,
            text: (kind == NodeKind::Section).then(String::new),
        }
    }

    fn sample_tree() -> Vec<HierarchyNode> {
        vec![node(
            NodeKind::Title,
            "1",
            "https://example.gov/title-1",
            vec![
                node(
                    NodeKind::Chapter,
                    "101",
                    "https://example.gov/chapter-101",
                    vec![
                        node(NodeKind::Section, "101.01", "https://example.gov/s/101.01", vec![]),
                        node(NodeKind::Section, "101.02", "https://example.gov/s/101.02", vec![]),
                    ],
                ),
                node(
                    NodeKind::Chapter,
                    "102",
                    "https://example.gov/chapter-102",
                    vec![node(NodeKind::Section, "102.01", "https://example.gov/s/102.01", vec![])],
                ),
            ],
        )]
    }

    fn record(leaf: &LeafDescriptor, text: &str) -> SectionRecord {
        SectionRecord::new(leaf, text.to_string(), SectionStatus::Extracted)
    }

    #[test]
    fn test_node_from_link() {
        let link = ChildLink {
            label: "Chapter 5 | Definitions".to_string(),
            url: "https://example.gov/chapter-5".to_string(),
        };
        let node = HierarchyNode::from_link(NodeKind::Chapter, &link);
        assert_eq!(node.number, "5");
        assert_eq!(node.label, "Definitions");
        assert!(node.children.is_empty());
        assert!(node.text.is_none());
    }

    #[test]
    fn test_section_node_starts_with_empty_text() {
        let link = ChildLink {
            label: "Section 1.01 | Purpose".to_string(),
            url: "https://example.gov/s/1.01".to_string(),
        };
        let node = HierarchyNode::from_link(NodeKind::Section, &link);
        assert_eq!(node.text.as_deref(), Some(""));

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["text"], "");
    }

    #[test]
    fn test_collect_leaves_depth_first() {
        let leaves = collect_leaves(&sample_tree());
        let keys: Vec<String> = leaves.iter().map(|l| l.key()).collect();
        assert_eq!(
            keys,
            vec![
                "chapter101_section101.01",
                "chapter101_section101.02",
                "chapter102_section102.01"
            ]
        );
        assert_eq!(leaves[1].section_index, 1);
        assert_eq!(leaves[2].section_index, 0);
        assert_eq!(leaves[2].chapter_url, "https://example.gov/chapter-102");
        let positions: Vec<usize> = leaves.iter().map(|l| l.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_top_level_sections_use_placeholder_chapter() {
        let tree = vec![node(NodeKind::Section, "3", "https://example.gov/s/3", vec![])];
        let leaves = collect_leaves(&tree);
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].key(), "chapter0_section3");
        assert_eq!(leaves[0].chapter_url, "");
    }

    #[test]
    fn test_collect_chapters_in_order() {
        let chapters = collect_chapters(&sample_tree());
        let numbers: Vec<&str> = chapters.iter().map(|c| c.number.as_str()).collect();
        assert_eq!(numbers, vec!["101", "102"]);
        assert_eq!(chapters[1].position, 1);
    }

    #[test]
    fn test_attach_records_fills_text_in_listing_order() {
        let mut tree = sample_tree();
        let leaves = collect_leaves(&tree);
        // Reverse arrival order, as parallel workers may finish
        let records: Vec<SectionRecord> = leaves
            .iter()
            .rev()
            .map(|l| record(l, &format!("text of {}", l.section_number)))
            .collect();

        attach_records(&mut tree, &records);

        let chapter = &tree[0].children[0];
        assert_eq!(chapter.children.len(), 2);
        assert_eq!(chapter.children[0].number, "101.01");
        assert_eq!(chapter.children[0].text.as_deref(), Some("text of 101.01"));
        assert_eq!(chapter.children[1].text.as_deref(), Some("text of 101.02"));
        assert_eq!(
            tree[0].children[1].children[0].text.as_deref(),
            Some("text of 102.01")
        );
    }

    #[test]
    fn test_attach_records_adds_worker_discovered_sections() {
        let mut tree = vec![node(
            NodeKind::Chapter,
            "4",
            "https://example.gov/chapter-4",
            vec![],
        )];
        let leaf = LeafDescriptor {
            chapter_number: "4".to_string(),
            chapter_url: "https://example.gov/chapter-4".to_string(),
            section_number: "1".to_string(),
            section_label: "Scope".to_string(),
            url: "https://example.gov/chapter-4/section-1".to_string(),
            section_index: 0,
            position: 0,
        };

        attach_records(&mut tree, &[record(&leaf, "Section 1. Scope.")]);

        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].kind, NodeKind::Section);
        assert_eq!(tree[0].children[0].label, "Scope");
    }

    #[test]
    fn test_tree_serializes_lowercase_kinds_without_empty_fields() {
        let tree = vec![node(NodeKind::Chapter, "9", "https://example.gov/c9", vec![])];
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json[0]["kind"], "chapter");
        assert!(json[0].get("children").is_none());
        assert!(json[0].get("text").is_none());
    }
}
