//! Robots.txt parser implementation
//!
//! Turns robots.txt text into [`RobotsRuleGroup`]s. Parsing never fails: lines
//! that are not recognized directives are ignored.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a rule permits or forbids a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Allow,
    Disallow,
}

/// A single `Allow:` or `Disallow:` line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RobotsRule {
    pub kind: RuleKind,
    pub pattern: String,
}

impl fmt::Display for RobotsRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            RuleKind::Allow => "ALLOW",
            RuleKind::Disallow => "DISALLOW",
        };
        let pattern = if self.pattern.is_empty() {
            "/"
        } else {
            &self.pattern
        };
        write!(f, "{}: {}", label, pattern)
    }
}

/// One `User-agent:` block and the rules that follow it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RobotsRuleGroup {
    /// Lowercased agent tokens
    pub agents: Vec<String>,
    pub rules: Vec<RobotsRule>,
}

impl RobotsRuleGroup {
    fn is_empty(&self) -> bool {
        self.agents.is_empty() && self.rules.is_empty()
    }
}

/// Parses robots.txt content into rule groups
///
/// # Grouping Rules
///
/// - Consecutive `User-agent:` lines share one group
/// - A `User-agent:` line after any `Allow`/`Disallow` starts a new group
/// - A blank line after rules closes the current group
/// - `#` starts a comment; keys are case-insensitive, values keep their case
///   (agent tokens are lowercased)
///
/// # Example
///
/// ```
/// use sitegauge::robots::parse_robots;
///
/// let groups = parse_robots("User-agent: *\nDisallow: /private/\n");
/// assert_eq!(groups.len(), 1);
/// assert_eq!(groups[0].agents, vec!["*".to_string()]);
/// ```
pub fn parse_robots(text: &str) -> Vec<RobotsRuleGroup> {
    let mut groups = Vec::new();
    let mut current = RobotsRuleGroup::default();

    for line in text.lines() {
        let cleaned = strip_comment(line).trim();

        if cleaned.is_empty() {
            if !current.rules.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
            continue;
        }

        let Some((key, value)) = split_directive(cleaned) else {
            continue;
        };

        match key.as_str() {
            "user-agent" => {
                if !current.rules.is_empty() {
                    groups.push(std::mem::take(&mut current));
                }
                if !value.is_empty() {
                    current.agents.push(value.to_lowercase());
                }
            }
            "allow" => current.rules.push(RobotsRule {
                kind: RuleKind::Allow,
                pattern: value.to_string(),
            }),
            "disallow" => current.rules.push(RobotsRule {
                kind: RuleKind::Disallow,
                pattern: value.to_string(),
            }),
            _ => {}
        }
    }

    if !current.is_empty() {
        groups.push(current);
    }

    groups
}

/// Extracts the `Sitemap:` URLs listed in robots.txt
pub fn sitemap_directives(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let (key, value) = split_directive(strip_comment(line).trim())?;
            (key == "sitemap" && !value.is_empty()).then(|| value.to_string())
        })
        .collect()
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Splits `Key: value` on the first colon, lowercasing the key
fn split_directive(line: &str) -> Option<(String, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_lowercase(), value.trim()))
}
