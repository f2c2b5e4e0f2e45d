//! Rule evaluation - one predicate over record attributes

use once_cell::sync::OnceCell;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

use crate::catalog::attribute::{year_to_int, Attribute};
use crate::catalog::record::Record;

/// Comparison operators usable in a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
}

impl CompareOp {
    pub const ALL: &'static [CompareOp] = &[
        CompareOp::Equals,
        CompareOp::NotEquals,
        CompareOp::Contains,
        CompareOp::NotContains,
        CompareOp::Greater,
        CompareOp::GreaterEqual,
        CompareOp::Less,
        CompareOp::LessEqual,
    ];

    /// Get the string representation used by the rule text syntax
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Equals => "equals",
            CompareOp::NotEquals => "not_equals",
            CompareOp::Contains => "contains",
            CompareOp::NotContains => "not_contains",
            CompareOp::Greater => "greater",
            CompareOp::GreaterEqual => "greater_or_equal",
            CompareOp::Less => "less",
            CompareOp::LessEqual => "less_or_equal",
        }
    }

    /// Whether this operator orders values rather than matching them.
    ///
    /// Ordering operators never use pattern matching.
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            CompareOp::Greater | CompareOp::GreaterEqual | CompareOp::Less | CompareOp::LessEqual
        )
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CompareOp {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompareOp::ALL
            .iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| RuleError::UnknownComparison(s.to_string()))
    }
}

/// Errors from rule parsing and pattern compilation
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("unknown comparison: '{0}'")]
    UnknownComparison(String),

    #[error("unknown rule target: '{0}'")]
    UnknownTarget(String),

    #[error("invalid pattern '{pattern}': {message}")]
    BadPattern { pattern: String, message: String },
}

/// Characters that mark a literal as a pattern rather than a plain string
const PATTERN_CHARS: &[char] = &[
    '*', '?', '+', '|', '(', ')', '[', ']', '{', '}', '^', '$', '\\',
];

/// Keyword a target or comparison uses to mean "not configured"
const NONE_TOKEN: &str = "none";

/// Rule text prefix marking an exception rule
const EXCEPTION_TOKEN: &str = "exception";

/// Resolved matcher for a rule literal, memoized on first use
#[derive(Debug, Clone)]
enum Matcher {
    /// Plain case-insensitive string / numeric comparison
    Plain,
    /// Compiled case-insensitive pattern
    Pattern(Regex),
    /// Pattern failed to compile; the rule is vacuously true
    Degraded,
}

/// One predicate: `target comparison literal`.
///
/// An exception rule, when it matches, forces the owning filter to reject
/// the record regardless of later rules.
#[derive(Debug, Clone)]
pub struct Rule {
    target: Option<Attribute>,
    op: Option<CompareOp>,
    value: String,
    is_exception: bool,
    matcher: OnceCell<Matcher>,
}

impl Rule {
    pub fn new(target: Attribute, op: CompareOp, value: impl Into<String>) -> Self {
        Self {
            target: Some(target),
            op: Some(op),
            value: value.into(),
            is_exception: false,
            matcher: OnceCell::new(),
        }
    }

    /// Mark this rule as an exception
    pub fn exception(mut self) -> Self {
        self.is_exception = true;
        self
    }

    pub fn target(&self) -> Option<Attribute> {
        self.target
    }

    pub fn op(&self) -> Option<CompareOp> {
        self.op
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_exception(&self) -> bool {
        self.is_exception
    }

    /// Whether both target and comparison are configured
    pub fn is_active(&self) -> bool {
        self.target.is_some() && self.op.is_some()
    }

    /// Compile the literal as a case-insensitive pattern
    fn compile(&self, source: &str) -> Result<Regex, RuleError> {
        RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map_err(|e| RuleError::BadPattern {
                pattern: self.value.clone(),
                message: e.to_string(),
            })
    }

    /// Resolve (once) how the literal matches.
    ///
    /// Plain comparison is materially faster, so a literal only becomes a
    /// pattern when it contains pattern metacharacters. Compilation failure
    /// degrades the rule to vacuously-true and is logged, never propagated.
    fn matcher(&self) -> &Matcher {
        self.matcher.get_or_init(|| {
            if self.op.map(|op| op.is_ordering()).unwrap_or(true)
                || !self.value.contains(PATTERN_CHARS)
            {
                return Matcher::Plain;
            }
            // Equality patterns must cover the whole value, so anchor them
            // up front; containment patterns search as written.
            let source = match self.op {
                Some(CompareOp::Equals) | Some(CompareOp::NotEquals) => {
                    format!("^(?:{})$", self.value)
                }
                _ => self.value.clone(),
            };
            match self.compile(&source) {
                Ok(re) => Matcher::Pattern(re),
                Err(err) => {
                    warn!(rule = %self, %err, "pattern failed to compile, rule degraded");
                    Matcher::Degraded
                }
            }
        })
    }

    /// Evaluate the rule against a record.
    ///
    /// An unconfigured or degraded rule is vacuously true.
    pub fn evaluate(&self, record: &Record) -> bool {
        self.matches(record).unwrap_or(true)
    }

    /// Evaluate, distinguishing vacuous truth (`None`) from a real verdict.
    ///
    /// [`Filter::apply`](crate::catalog::filter::Filter::apply) skips vacuous
    /// rules so a partially-configured filter never excludes anything.
    pub(crate) fn matches(&self, record: &Record) -> Option<bool> {
        let (target, op) = match (self.target, self.op) {
            (Some(t), Some(o)) => (t, o),
            _ => return None,
        };

        let actual = record.get(target);

        // Empty-value edge policy
        if actual.is_empty() {
            return Some(match op {
                CompareOp::Equals => self.value.is_empty(),
                CompareOp::NotEquals => !self.value.is_empty(),
                CompareOp::Contains => false,
                CompareOp::NotContains => true,
                CompareOp::Greater | CompareOp::GreaterEqual => false,
                CompareOp::Less | CompareOp::LessEqual => true,
            });
        }

        if op.is_ordering() {
            return Some(self.compare_ordered(target, op, actual));
        }

        match self.matcher() {
            Matcher::Degraded => None,
            Matcher::Pattern(re) => Some(match op {
                CompareOp::Equals | CompareOp::Contains => re.is_match(actual),
                CompareOp::NotEquals | CompareOp::NotContains => !re.is_match(actual),
                _ => unreachable!("ordering handled above"),
            }),
            Matcher::Plain => Some(match op {
                CompareOp::Equals => actual.eq_ignore_ascii_case(&self.value),
                CompareOp::NotEquals => !actual.eq_ignore_ascii_case(&self.value),
                CompareOp::Contains => contains_ignore_case(actual, &self.value),
                CompareOp::NotContains => !contains_ignore_case(actual, &self.value),
                _ => unreachable!("ordering handled above"),
            }),
        }
    }

    fn compare_ordered(&self, target: Attribute, op: CompareOp, actual: &str) -> bool {
        let ordering = if target == Attribute::Year {
            year_to_int(actual).cmp(&year_to_int(&self.value))
        } else if target.is_numeric() {
            let a = actual.parse::<f64>().unwrap_or(0.0);
            let b = self.value.parse::<f64>().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
        } else {
            actual.to_lowercase().cmp(&self.value.to_lowercase())
        };

        match op {
            CompareOp::Greater => ordering.is_gt(),
            CompareOp::GreaterEqual => ordering.is_ge(),
            CompareOp::Less => ordering.is_lt(),
            CompareOp::LessEqual => ordering.is_le(),
            _ => unreachable!("only ordering operators reach here"),
        }
    }
}

/// Rules compare equal on their configuration; the memoized matcher is
/// derived state and takes no part.
impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
            && self.op == other.op
            && self.value == other.value
            && self.is_exception == other.is_exception
    }
}

impl Eq for Rule {}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exception {
            write!(f, "{} ", EXCEPTION_TOKEN)?;
        }
        let target = self.target.map(|t| t.as_str()).unwrap_or(NONE_TOKEN);
        let op = self.op.map(|o| o.as_str()).unwrap_or(NONE_TOKEN);
        if self.value.is_empty() {
            write!(f, "{} {}", target, op)
        } else {
            write!(f, "{} {} {}", target, op, self.value)
        }
    }
}

impl FromStr for Rule {
    type Err = RuleError;

    /// Parse a rule line: `[exception] <target> <comparison> <literal...>`.
    ///
    /// The literal is the verbatim remainder of the line and may contain
    /// embedded whitespace. A missing or `none` target/comparison leaves the
    /// field unconfigured.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut rest = line.trim_start();

        let mut is_exception = false;
        if let Some(after) = strip_token(rest, EXCEPTION_TOKEN) {
            is_exception = true;
            rest = after;
        }

        let (target_token, after_target) = split_token(rest);
        let target = match target_token {
            "" => None,
            t if t.eq_ignore_ascii_case(NONE_TOKEN) => None,
            t => Some(
                t.parse::<Attribute>()
                    .map_err(|_| RuleError::UnknownTarget(t.to_string()))?,
            ),
        };

        let (op_token, literal) = split_token(after_target);
        let op = match op_token {
            "" => None,
            o if o.eq_ignore_ascii_case(NONE_TOKEN) => None,
            o => Some(o.parse::<CompareOp>()?),
        };

        Ok(Self {
            target,
            op,
            value: literal.to_string(),
            is_exception,
            matcher: OnceCell::new(),
        })
    }
}

impl Serialize for Rule {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Strip a leading keyword token followed by whitespace
fn strip_token<'a>(s: &'a str, token: &str) -> Option<&'a str> {
    let (first, rest) = split_token(s);
    if first.eq_ignore_ascii_case(token) && first.len() < s.trim_start().len() {
        Some(rest)
    } else {
        None
    }
}

/// Split off the first whitespace-delimited token, returning (token, rest)
fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(pos) => (&s[..pos], s[pos..].trim_start()),
        None => (s, ""),
    }
}

/// Case-insensitive substring search
fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(Attribute, &str)]) -> Record {
        let mut r = Record::new(0);
        for (attr, value) in pairs {
            r.set(*attr, value);
        }
        r
    }

    #[test]
    fn test_plain_equals_ignores_case() {
        let rule = Rule::new(Attribute::Category, CompareOp::Equals, "arcade");
        let r = record(&[(Attribute::Category, "Arcade")]);
        assert!(rule.evaluate(&r));
    }

    #[test]
    fn test_contains() {
        let rule = Rule::new(Attribute::Manufacturer, CompareOp::Contains, "cap");
        assert!(rule.evaluate(&record(&[(Attribute::Manufacturer, "Capcom")])));
        assert!(!rule.evaluate(&record(&[(Attribute::Manufacturer, "Konami")])));
    }

    #[test]
    fn test_pattern_literal() {
        let rule = Rule::new(Attribute::Name, CompareOp::Equals, "sf2.*");
        assert!(rule.evaluate(&record(&[(Attribute::Name, "sf2ce")])));
        assert!(!rule.evaluate(&record(&[(Attribute::Name, "xsf2ce")])));

        let contains = Rule::new(Attribute::Name, CompareOp::Contains, "sf2.*");
        assert!(contains.evaluate(&record(&[(Attribute::Name, "xsf2ce")])));
    }

    #[test]
    fn test_bad_pattern_degrades_to_true() {
        let rule = Rule::new(Attribute::Name, CompareOp::Equals, "[unclosed");
        assert!(rule.evaluate(&record(&[(Attribute::Name, "whatever")])));
        assert!(rule.matches(&record(&[(Attribute::Name, "whatever")])).is_none());
    }

    #[test]
    fn test_unconfigured_rule_is_vacuously_true() {
        let rule: Rule = "none equals x".parse().unwrap();
        assert!(!rule.is_active());
        assert!(rule.evaluate(&record(&[])));
    }

    #[test]
    fn test_year_ordering() {
        let rule = Rule::new(Attribute::Year, CompareOp::GreaterEqual, "1990");
        assert!(rule.evaluate(&record(&[(Attribute::Year, "1992")])));
        assert!(rule.evaluate(&record(&[(Attribute::Year, "199?")])));
        assert!(!rule.evaluate(&record(&[(Attribute::Year, "1985")])));
    }

    #[test]
    fn test_numeric_ordering() {
        let rule = Rule::new(Attribute::Players, CompareOp::Greater, "2");
        assert!(rule.evaluate(&record(&[(Attribute::Players, "4")])));
        assert!(!rule.evaluate(&record(&[(Attribute::Players, "2")])));
    }

    #[test]
    fn test_empty_value_policy() {
        let r = record(&[]);
        let cases = [
            (CompareOp::Equals, "x", false),
            (CompareOp::Equals, "", true),
            (CompareOp::NotEquals, "x", true),
            (CompareOp::Contains, "x", false),
            (CompareOp::NotContains, "x", true),
            (CompareOp::Greater, "x", false),
            (CompareOp::GreaterEqual, "x", false),
            (CompareOp::Less, "x", true),
            (CompareOp::LessEqual, "x", true),
        ];
        for (op, literal, expected) in cases {
            let rule = Rule::new(Attribute::Category, op, literal);
            assert_eq!(rule.evaluate(&r), expected, "{:?} {:?}", op, literal);
        }
    }

    #[test]
    fn test_rule_text_roundtrip() {
        let lines = [
            "Category equals Arcade",
            "Title contains Street Fighter II",
            "exception Year equals 1990",
            "Year greater_or_equal 1985",
        ];
        for line in lines {
            let rule: Rule = line.parse().unwrap();
            assert_eq!(rule.to_string(), line);
        }
    }

    #[test]
    fn test_literal_keeps_embedded_whitespace() {
        let rule: Rule = "Title equals Out  Run".parse().unwrap();
        assert_eq!(rule.value(), "Out  Run");
    }

    #[test]
    fn test_exception_prefix() {
        let rule: Rule = "exception Status equals preliminary".parse().unwrap();
        assert!(rule.is_exception());
        assert_eq!(rule.target(), Some(Attribute::Status));
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        assert!(matches!(
            "Bogus equals x".parse::<Rule>(),
            Err(RuleError::UnknownTarget(_))
        ));
        assert!(matches!(
            "Title sounds_like x".parse::<Rule>(),
            Err(RuleError::UnknownComparison(_))
        ));
    }

    #[test]
    fn test_serde_as_rule_text() {
        let rule = Rule::new(Attribute::Category, CompareOp::Contains, "Puzzle").exception();
        let json = serde_json::to_string(&rule).unwrap();
        assert_eq!(json, "\"exception Category contains Puzzle\"");
        let back: Rule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);
    }
}
