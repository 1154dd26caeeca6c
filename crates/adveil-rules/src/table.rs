//! Rule Table
//!
//! Data-driven table of block rules, loaded from a JSON resource.
//! Rules are declared in criticality order (ad servers before telemetry
//! before generic tracking) and regexes are compiled once at load,
//! never per request.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::io::Read;
use thiserror::Error;
use tracing::{info, warn};

/// Bundled default rule table, compiled into the binary.
const DEFAULT_RULES: &str = include_str!("../resources/rules.json");

/// Errors during rule table loading
#[derive(Debug, Error)]
pub enum RuleTableError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid rule table document: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    #[error("Empty rule table")]
    EmptyTable,
}

/// Category a rule belongs to. Declaration order in the table is
/// criticality order; the enum order matches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Ads,
    Telemetry,
    Tracking,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ads => "ads",
            Self::Telemetry => "telemetry",
            Self::Tracking => "tracking",
        }
    }
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw rule row as it appears in the JSON resource.
#[derive(Debug, Deserialize)]
struct RuleRow {
    pattern: String,
    category: RuleCategory,
    description: String,
    #[serde(default = "default_case_insensitive")]
    case_insensitive: bool,
}

fn default_case_insensitive() -> bool {
    true
}

/// A single block rule with its matcher compiled.
/// Immutable after load.
#[derive(Debug)]
pub struct BlockRule {
    /// Compiled URL matcher
    pub pattern: Regex,
    /// Category for stats bucketing
    pub category: RuleCategory,
    /// Human-readable description
    pub description: String,
}

impl BlockRule {
    /// Check if this rule matches a URL
    #[inline]
    pub fn matches(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }
}

/// An ordered table of block rules.
pub struct RuleTable {
    rules: Vec<BlockRule>,
}

impl RuleTable {
    /// Load the bundled default table.
    pub fn bundled() -> Result<Self, RuleTableError> {
        Self::from_json(DEFAULT_RULES)
    }

    /// Parse a rule table from a reader holding a JSON document.
    pub fn parse<R: Read>(mut reader: R) -> Result<Self, RuleTableError> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        Self::from_json(&raw)
    }

    /// Parse a rule table from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self, RuleTableError> {
        let rows: Vec<RuleRow> = serde_json::from_str(raw)?;
        let mut rules = Vec::with_capacity(rows.len());

        for row in rows {
            match RegexBuilder::new(&row.pattern)
                .case_insensitive(row.case_insensitive)
                .build()
            {
                Ok(pattern) => rules.push(BlockRule {
                    pattern,
                    category: row.category,
                    description: row.description,
                }),
                Err(e) => {
                    warn!("Skipping rule with invalid pattern '{}': {}", row.pattern, e);
                }
            }
        }

        if rules.is_empty() {
            return Err(RuleTableError::EmptyTable);
        }

        info!("Loaded rule table: {} rules", rules.len());
        Ok(Self { rules })
    }

    /// Find the first rule matching a URL, in declaration order.
    #[inline]
    pub fn first_match(&self, url: &str) -> Option<&BlockRule> {
        self.rules.iter().find(|rule| rule.matches(url))
    }

    /// Number of rules in the table.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_bundled_table_loads() {
        let table = RuleTable::bundled().unwrap();
        assert!(!table.is_empty());
    }

    #[test]
    fn test_parse_table() {
        let content = r#"[
            {"pattern": "^https?://ads\\.example\\.com", "category": "ads", "description": "example ad server"},
            {"pattern": "beacon\\.js", "category": "telemetry", "description": "beacon script"}
        ]"#;

        let table = RuleTable::parse(Cursor::new(content)).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_invalid_pattern_skipped() {
        let content = r#"[
            {"pattern": "([unclosed", "category": "ads", "description": "broken"},
            {"pattern": "^https?://ok\\.example\\.com", "category": "ads", "description": "fine"}
        ]"#;

        let table = RuleTable::parse(Cursor::new(content)).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_empty_table_rejected() {
        let result = RuleTable::from_json("[]");
        assert!(matches!(result, Err(RuleTableError::EmptyTable)));
    }

    #[test]
    fn test_first_match_order() {
        let content = r#"[
            {"pattern": "example\\.com", "category": "ads", "description": "first"},
            {"pattern": "example\\.com/tracker", "category": "tracking", "description": "second"}
        ]"#;

        let table = RuleTable::parse(Cursor::new(content)).unwrap();
        let rule = table.first_match("https://example.com/tracker").unwrap();
        assert_eq!(rule.category, RuleCategory::Ads);
    }

    #[test]
    fn test_case_insensitive_default() {
        let content = r#"[
            {"pattern": "^https?://edge\\.ads\\.twitch\\.tv", "category": "ads", "description": "edge ads"}
        ]"#;

        let table = RuleTable::parse(Cursor::new(content)).unwrap();
        assert!(table.first_match("HTTPS://EDGE.ADS.TWITCH.TV/foo").is_some());
    }
}
