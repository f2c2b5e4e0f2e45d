//! View definitions and the builder producing filter entries

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

use crate::catalog::attribute::{year_to_int, Attribute};
use crate::catalog::catalog::Catalog;
use crate::catalog::filter::Filter;
use crate::catalog::record::Record;
use crate::catalog::rule::Rule;

/// One named view: a romlist, optional global rules applied once at load,
/// and an ordered list of sub-filters. Stored as one YAML file per view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
    pub name: String,

    /// Name of the raw romlist this view draws from
    pub romlist: String,

    /// Emulator launched for this view, when it declares one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emulator: Option<String>,

    /// Collapse clone sets to one representative per group
    #[serde(default)]
    pub clone_grouping: bool,

    /// Rules applied once over the whole catalog at load time
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_rules: Vec<Rule>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
}

impl View {
    pub fn has_global_rules(&self) -> bool {
        !self.global_rules.is_empty()
    }

    /// The catalog-wide filter built from the view's global rules
    pub fn global_filter(&self) -> Filter {
        Filter {
            name: format!("{}.global", self.name),
            rules: self.global_rules.clone(),
            ..Filter::default()
        }
    }

    /// Load all view definitions from a directory.
    ///
    /// Files that fail to parse are silently skipped.
    pub fn load_all(dir: &Path) -> Vec<View> {
        let mut views = Vec::new();

        if !dir.exists() {
            return views;
        }
        let Ok(entries) = std::fs::read_dir(dir) else {
            return views;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(false, |e| e == "yaml") {
                if let Ok(content) = std::fs::read_to_string(&path) {
                    if let Ok(view) = serde_yml::from_str::<View>(&content) {
                        views.push(view);
                    }
                }
            }
        }

        views.sort_by(|a, b| a.name.cmp(&b.name));
        views
    }

    /// Write the view definition to `<dir>/<name>.yaml`
    pub fn save(&self, dir: &Path) -> std::io::Result<()> {
        let body = serde_yml::to_string(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(dir.join(format!("{}.yaml", self.name)), body)
    }
}

/// The built result of applying one filter: an ordered sequence of record
/// indices plus, when clone grouping is on, a map from clone-parent key to
/// the ordered members of that group.
///
/// Only stable arena indices are stored, never references, so an entry
/// serializes directly into the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterEntry {
    pub order: Vec<u32>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub groups: BTreeMap<String, Vec<u32>>,

    /// Pre-limit top-level size, kept so a cache rehydration can restore
    /// the owning filter's "N of M" count
    #[serde(default)]
    pub matched: usize,
}

impl FilterEntry {
    /// Number of top-level entries
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Every index the entry references, top level and groups
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.order
            .iter()
            .copied()
            .chain(self.groups.values().flatten().copied())
    }

    /// Members of the clone group containing the record at a top-level
    /// position. Without grouping (or for an unknown parent) this is just
    /// the record itself.
    pub fn group_at<'a>(&'a self, catalog: &Catalog, position: usize) -> &'a [u32] {
        let Some(&index) = self.order.get(position) else {
            return &[];
        };
        let parent = catalog.get(index).map(|r| r.clone_parent()).unwrap_or("");
        match self.groups.get(parent) {
            Some(members) => members,
            None => std::slice::from_ref(&self.order[position]),
        }
    }
}

/// Build a filter entry from the catalog.
///
/// Pure computation over in-memory data: the only possible outcome of bad
/// input is an empty entry, which is valid. The pre-limit top-level size is
/// recorded on the filter for "N of M" display.
pub fn build(filter: &mut Filter, catalog: &Catalog, clone_grouping: bool) -> FilterEntry {
    let mut entry = FilterEntry::default();

    if clone_grouping {
        for record in catalog.iter() {
            if !filter.apply(record) {
                continue;
            }
            let group = entry
                .groups
                .entry(record.clone_parent().to_string())
                .or_default();
            if group.is_empty() {
                entry.order.push(record.index());
            }
            group.push(record.index());
        }
    } else {
        for record in catalog.iter() {
            if filter.apply(record) {
                entry.order.push(record.index());
            }
        }
    }

    if let Some(key) = filter.sort_by {
        let compare = |a: &u32, b: &u32| -> Ordering {
            match (catalog.get(*a), catalog.get(*b)) {
                (Some(ra), Some(rb)) => compare_records(ra, rb, key),
                _ => Ordering::Equal,
            }
        };
        entry.order.sort_by(compare);
        for group in entry.groups.values_mut() {
            group.sort_by(compare);
        }
        if filter.reverse {
            entry.order.reverse();
            for group in entry.groups.values_mut() {
                group.reverse();
            }
        }
    } else if filter.reverse {
        entry.order.reverse();
        for group in entry.groups.values_mut() {
            group.reverse();
        }
    }

    filter.matched = entry.order.len();
    entry.matched = entry.order.len();
    filter.apply_limit(&mut entry.order);
    entry
}

/// Compare two records on one attribute: the derived sort title for Title,
/// year parsing for Year, floating point for numeric attributes, and
/// case-insensitive text otherwise.
pub fn compare_records(a: &Record, b: &Record, key: Attribute) -> Ordering {
    match key {
        Attribute::Title => a.sort_title().cmp(b.sort_title()),
        Attribute::Year => year_to_int(a.get(key)).cmp(&year_to_int(b.get(key))),
        key if key.is_numeric() => {
            let va = a.get(key).parse::<f64>().unwrap_or(0.0);
            let vb = b.get(key).parse::<f64>().unwrap_or(0.0);
            va.partial_cmp(&vb).unwrap_or(Ordering::Equal)
        }
        _ => a.get(key).to_lowercase().cmp(&b.get(key).to_lowercase()),
    }
}
