//! Tags: the metadata provenance attached to persons, and the fixed set
//! of global tags that map directly onto precomputed face isets (§3).

use std::collections::{BTreeMap, BTreeSet};

/// One of the fixed attribute tags that bypasses person-name resolution
/// entirely and maps directly onto a precomputed face [`crate::index::IsetReader`].
pub const GLOBAL_TAGS: [&str; 5] = ["all", "male", "female", "host", "nonhost"];

pub fn is_global_tag(tag: &str) -> bool {
    GLOBAL_TAGS.contains(&tag)
}

/// `{name, source}`; `source` is the metadata provenance (e.g. "wikidata").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub name: String,
    pub source: String,
}

/// Bidirectional index: person name → tags, tag name → person names.
#[derive(Debug, Clone, Default)]
pub struct AllPersonTags {
    by_person: BTreeMap<String, Vec<Tag>>,
    by_tag: BTreeMap<String, BTreeSet<String>>,
}

impl AllPersonTags {
    pub fn new(by_person: BTreeMap<String, Vec<Tag>>) -> Self {
        let mut by_tag: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (person, tags) in &by_person {
            for tag in tags {
                by_tag.entry(tag.name.clone()).or_default().insert(person.clone());
            }
        }
        Self { by_person, by_tag }
    }

    pub fn tags_for(&self, person: &str) -> &[Tag] {
        self.by_person.get(person).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every person carrying `tag_name`, or `None` if the tag is unknown.
    pub fn tag_name_to_names(&self, tag_name: &str) -> Option<&BTreeSet<String>> {
        self.by_tag.get(tag_name)
    }
}

/// Parsed comma-separated tag string, e.g. `"male,host"`.
#[derive(Debug, Clone)]
pub struct ParsedTags {
    pub tags: BTreeSet<String>,
}

pub fn parse_tags(s: &str) -> ParsedTags {
    ParsedTags {
        tags: s.split(',').map(|t| t.trim().to_string()).collect(),
    }
}

/// The subset of a parsed tag set that is global.
pub fn global_tags_in(tags: &BTreeSet<String>) -> BTreeSet<String> {
    tags.iter().filter(|t| is_global_tag(t)).cloned().collect()
}

/// Sanitize a raw tag string from person metadata into a bounded-length
/// ASCII slug: lowercased, non-word characters stripped (§4.C step 5).
pub fn sanitize_tag(tag: &str) -> String {
    tag.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

pub const MIN_PERSON_ATTRIBUTE_LEN: usize = 3;
pub const MAX_PERSON_ATTRIBUTE_LEN: usize = 50;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_punctuation_and_lowercases() {
        assert_eq!(sanitize_tag("U.S. Senator"), "ussenator");
    }

    #[test]
    fn parse_tags_splits_and_trims() {
        let parsed = parse_tags("male, host");
        assert!(parsed.tags.contains("male"));
        assert!(parsed.tags.contains("host"));
    }
}
