//! Catalog record - one playable item and its attribute vector

use serde::{Deserialize, Serialize};

use crate::catalog::attribute::{Attribute, ATTRIBUTE_COUNT};

/// One playable catalog item.
///
/// A record is a fixed-width vector of string attributes plus two derived
/// title fields used by display and sorting. The `index` is the record's
/// stable position in the owning catalog's arena, assigned once at load; it
/// is what caches persist in place of references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    index: u32,
    values: Vec<String>,
    #[serde(skip)]
    display_title: String,
    #[serde(skip)]
    sort_title: String,
}

impl Record {
    /// Create an empty record at the given arena index
    pub fn new(index: u32) -> Self {
        Self {
            index,
            values: vec![String::new(); ATTRIBUTE_COUNT],
            display_title: String::new(),
            sort_title: String::new(),
        }
    }

    /// Create a record from romlist column values.
    ///
    /// Missing trailing columns fill as empty; excess columns are dropped.
    pub fn from_row(index: u32, row: Vec<String>) -> Self {
        let mut record = Self::new(index);
        for (attr, value) in Attribute::LOADED.iter().zip(row) {
            record.values[attr.index()] = value;
        }
        record.refresh_titles();
        record
    }

    /// The record's stable arena index
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Get an attribute value
    pub fn get(&self, attr: Attribute) -> &str {
        &self.values[attr.index()]
    }

    /// Set an attribute value, returning whether the stored value changed.
    ///
    /// The derived title fields are recomputed only on Title writes.
    pub fn set(&mut self, attr: Attribute, value: &str) -> bool {
        if self.values[attr.index()] == value {
            return false;
        }
        self.values[attr.index()] = value.to_string();
        if attr == Attribute::Title {
            self.refresh_titles();
        }
        true
    }

    /// Recompute the derived display/sort titles from the Title attribute.
    ///
    /// Must be called after deserializing a cached record, since the derived
    /// fields are not persisted.
    pub fn refresh_titles(&mut self) {
        let title = self.get(Attribute::Title);
        self.display_title = strip_brackets(title);
        self.sort_title = strip_article(&self.display_title).to_lowercase();
    }

    /// Title formatted for display (bracketed qualifiers removed)
    pub fn display_title(&self) -> &str {
        &self.display_title
    }

    /// Title formatted for sorting (lowercased, leading article dropped)
    pub fn sort_title(&self) -> &str {
        &self.sort_title
    }

    pub fn name(&self) -> &str {
        self.get(Attribute::Name)
    }

    pub fn emulator(&self) -> &str {
        self.get(Attribute::Emulator)
    }

    /// Clone-group key: the declared parent, or the record's own name
    pub fn clone_parent(&self) -> &str {
        let parent = self.get(Attribute::CloneOf);
        if parent.is_empty() {
            self.name()
        } else {
            parent
        }
    }

    /// Whether the record declares no clone parent
    pub fn is_parent(&self) -> bool {
        self.get(Attribute::CloneOf).is_empty()
    }

    pub fn is_favourite(&self) -> bool {
        self.get(Attribute::Favourite) == "1"
    }

    /// Tags currently set on the record
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.get(Attribute::Tags)
            .split(';')
            .filter(|t| !t.is_empty())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags().any(|t| t == tag)
    }

    /// Add a tag, returning whether the tag string changed
    pub fn add_tag(&mut self, tag: &str) -> bool {
        if self.has_tag(tag) {
            return false;
        }
        let mut tags: Vec<&str> = self.tags().collect();
        tags.push(tag);
        let joined = tags.join(";");
        self.set(Attribute::Tags, &joined)
    }

    /// Remove a tag, returning whether the tag string changed
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        if !self.has_tag(tag) {
            return false;
        }
        let joined = self
            .tags()
            .filter(|t| *t != tag)
            .collect::<Vec<_>>()
            .join(";");
        self.set(Attribute::Tags, &joined)
    }

    /// Whether two records agree on every loaded attribute
    pub fn same_content(&self, other: &Record) -> bool {
        Attribute::LOADED
            .iter()
            .all(|attr| self.get(*attr) == other.get(*attr))
    }
}

/// Identity equality: (Name, Emulator) only
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name() && self.emulator() == other.emulator()
    }
}

impl Eq for Record {}

/// Remove bracketed qualifiers like "(World)" or "[b1]" from a title
fn strip_brackets(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut depth = 0u32;
    for c in title.chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    let trimmed = out.split_whitespace().collect::<Vec<_>>().join(" ");
    if trimmed.is_empty() {
        title.trim().to_string()
    } else {
        trimmed
    }
}

/// Drop a leading English article for sort ordering
fn strip_article(title: &str) -> &str {
    for article in ["The ", "A ", "An "] {
        if title.len() > article.len() {
            if let Some(prefix) = title.get(..article.len()) {
                if prefix.eq_ignore_ascii_case(article) {
                    return &title[article.len()..];
                }
            }
        }
    }
    title
}
