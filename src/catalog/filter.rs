//! Filter - an ordered rule chain plus sort and limit directives

use serde::{Deserialize, Serialize};

use crate::catalog::attribute::Attribute;
use crate::catalog::record::Record;
use crate::catalog::rule::Rule;

/// One named view filter: an ordered rule chain evaluated as a
/// first-match-wins short-circuit, plus an optional sort key, a reverse
/// flag, and a signed size limit.
///
/// Rule order is semantically significant and is preserved exactly across
/// load/save round-trips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<Attribute>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub reverse: bool,

    /// 0 = unlimited; +N keeps the first N of the post-sort list; -N the last N
    #[serde(default, skip_serializing_if = "is_zero")]
    pub limit: i32,

    /// Pre-limit top-level size of the last build, for "N of M" display
    #[serde(skip)]
    pub matched: usize,
}

fn is_zero(limit: &i32) -> bool {
    *limit == 0
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Evaluate the rule chain against a record.
    ///
    /// Walks rules in order: a matching exception rule or a non-matching
    /// ordinary rule rejects immediately; exhausting the list passes.
    /// Unconfigured or degraded rules are skipped, so a filter with
    /// partially-configured rules never excludes anything.
    pub fn apply(&self, record: &Record) -> bool {
        for rule in &self.rules {
            match rule.matches(record) {
                Some(matched) if matched == rule.is_exception() => return false,
                _ => {}
            }
        }
        true
    }

    /// Whether any rule or the sort key references the attribute.
    ///
    /// Drives invalidation precision: mutating an attribute only rebuilds
    /// the filters this returns true for.
    pub fn targets(&self, attr: Attribute) -> bool {
        self.sort_by == Some(attr) || self.rules.iter().any(|r| r.target() == Some(attr))
    }

    /// Cut a sorted top-level list down to the configured limit
    pub fn apply_limit(&self, order: &mut Vec<u32>) {
        if self.limit > 0 {
            let keep = self.limit as usize;
            if keep < order.len() {
                order.truncate(keep);
            }
        } else if self.limit < 0 {
            let keep = self.limit.unsigned_abs() as usize;
            if keep < order.len() {
                order.drain(..order.len() - keep);
            }
        }
    }
}
