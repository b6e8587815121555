//! Robots.txt rule evaluation
//!
//! Group selection picks the longest agent token contained in the requesting
//! user agent. Within the group every rule becomes an anchored regular
//! expression, and the matching rule with the longest original pattern wins.
//! Equal lengths resolve to `Allow`.

use crate::config::RobotsConfig;
use crate::robots::parser::{RobotsRule, RobotsRuleGroup, RuleKind};
use crate::Diagnostic;
use regex::{Regex, RegexBuilder};

/// Characters escaped before wildcard translation
const REGEX_META: &[char] = &[
    '.', '+', '?', '^', '$', '{', '}', '(', ')', '|', '[', ']', '\\',
];

/// Safety ceilings for rule matching
///
/// Both limits are invariants: a rule that exceeds either is skipped and treated
/// as non-matching, so one hostile robots.txt cannot make matching expensive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchLimits {
    /// Longest expanded expression accepted
    pub max_pattern_length: usize,
    /// Compiled program size ceiling passed to the regex engine
    pub regex_size_limit: usize,
}

impl Default for MatchLimits {
    fn default() -> Self {
        RobotsConfig::default().into()
    }
}

impl From<RobotsConfig> for MatchLimits {
    fn from(config: RobotsConfig) -> Self {
        Self {
            max_pattern_length: config.max_pattern_length,
            regex_size_limit: config.regex_size_limit,
        }
    }
}

/// Outcome of evaluating one path for one user agent
#[derive(Debug, Clone, PartialEq)]
pub struct RobotsEvaluation {
    pub allowed: bool,
    pub matched_rule: Option<RobotsRule>,
    pub matched_group: Option<RobotsRuleGroup>,
}

impl RobotsEvaluation {
    fn allow_all(group: Option<&RobotsRuleGroup>) -> Self {
        Self {
            allowed: true,
            matched_rule: None,
            matched_group: group.cloned(),
        }
    }
}

/// Parsed robots.txt groups with every rule compiled once
///
/// Rules that could not be compiled are kept as `None` and never match; the
/// reason is available from [`RobotsPolicy::diagnostics`].
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    groups: Vec<RobotsRuleGroup>,
    compiled: Vec<Vec<Option<Regex>>>,
    diagnostics: Vec<Diagnostic>,
}

impl RobotsPolicy {
    /// Compiles the rules of every group under the given limits
    pub fn new(groups: Vec<RobotsRuleGroup>, limits: MatchLimits) -> Self {
        let mut diagnostics = Vec::new();
        let compiled = groups
            .iter()
            .map(|group| {
                group
                    .rules
                    .iter()
                    .map(|rule| match compile_pattern(&rule.pattern, limits) {
                        Ok(regex) => regex,
                        Err(reason) => {
                            tracing::warn!(
                                "Skipping robots.txt pattern '{}': {}",
                                rule.pattern,
                                reason
                            );
                            diagnostics.push(Diagnostic::MalformedRobotsPattern {
                                pattern: rule.pattern.clone(),
                                reason,
                            });
                            None
                        }
                    })
                    .collect()
            })
            .collect();

        Self {
            groups,
            compiled,
            diagnostics,
        }
    }

    /// A policy with no groups, which allows everything
    pub fn allow_all() -> Self {
        Self::new(Vec::new(), MatchLimits::default())
    }

    pub fn groups(&self) -> &[RobotsRuleGroup] {
        &self.groups
    }

    /// Problems found while compiling rules
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Decides whether `user_agent` may fetch `path`
    ///
    /// `path` is the URL path plus query string, e.g. `/search?q=x`.
    pub fn evaluate(&self, user_agent: &str, path: &str) -> RobotsEvaluation {
        if self.groups.is_empty() {
            return RobotsEvaluation::allow_all(None);
        }

        let Some(index) = select_group(&self.groups, user_agent) else {
            return RobotsEvaluation::allow_all(None);
        };
        let group = &self.groups[index];

        let mut winner: Option<&RobotsRule> = None;
        for (rule, regex) in group.rules.iter().zip(&self.compiled[index]) {
            let Some(regex) = regex else {
                continue;
            };
            if !regex.is_match(path) {
                continue;
            }
            if beats(rule, winner) {
                winner = Some(rule);
            }
        }

        match winner {
            Some(rule) => RobotsEvaluation {
                allowed: rule.kind != RuleKind::Disallow,
                matched_rule: Some(rule.clone()),
                matched_group: Some(group.clone()),
            },
            None => RobotsEvaluation::allow_all(Some(group)),
        }
    }

    /// Shorthand for `evaluate(..).allowed`
    pub fn is_allowed(&self, user_agent: &str, path: &str) -> bool {
        self.evaluate(user_agent, path).allowed
    }
}

/// Evaluates `path` for `user_agent` against freshly parsed groups
///
/// Uses the default [`MatchLimits`]. Build a [`RobotsPolicy`] once when many
/// paths are checked against the same robots.txt.
pub fn evaluate(groups: &[RobotsRuleGroup], user_agent: &str, path: &str) -> RobotsEvaluation {
    RobotsPolicy::new(groups.to_vec(), MatchLimits::default()).evaluate(user_agent, path)
}

/// Picks the group whose agent token is the longest substring of `user_agent`
///
/// `*` counts as a match of length 1, so it only wins when no named agent
/// matches. Ties keep the earlier group.
fn select_group(groups: &[RobotsRuleGroup], user_agent: &str) -> Option<usize> {
    let ua = user_agent.to_lowercase();
    let mut best: Option<usize> = None;
    let mut best_len = 0usize;

    for (index, group) in groups.iter().enumerate() {
        for agent in &group.agents {
            if agent.is_empty() {
                continue;
            }
            if agent == "*" {
                if best_len < 1 {
                    best_len = 1;
                    best = Some(index);
                }
                continue;
            }
            let len = agent.chars().count();
            if ua.contains(agent.as_str()) && len > best_len {
                best_len = len;
                best = Some(index);
            }
        }
    }

    best
}

/// Longest original pattern wins; on equal length `Allow` wins
fn beats(candidate: &RobotsRule, current: Option<&RobotsRule>) -> bool {
    let Some(current) = current else {
        return true;
    };
    let candidate_len = candidate.pattern.chars().count();
    let current_len = current.pattern.chars().count();
    candidate_len > current_len
        || (candidate_len == current_len && candidate.kind == RuleKind::Allow)
}

/// Expands a robots pattern into an anchored expression
///
/// Returns `Ok(None)` for an empty pattern, which never matches.
fn compile_pattern(pattern: &str, limits: MatchLimits) -> Result<Option<Regex>, String> {
    if pattern.is_empty() {
        return Ok(None);
    }

    let expanded = expand_pattern(pattern);
    if expanded.chars().count() > limits.max_pattern_length {
        return Err(format!(
            "expanded pattern exceeds {} characters",
            limits.max_pattern_length
        ));
    }

    RegexBuilder::new(&format!("^{}", expanded))
        .size_limit(limits.regex_size_limit)
        .build()
        .map(Some)
        .map_err(|e| e.to_string())
}

/// Escapes metacharacters, turns `*` into `.*` and a trailing `$` into an anchor
fn expand_pattern(pattern: &str) -> String {
    let mut expanded = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        if c == '*' {
            expanded.push_str(".*");
        } else {
            if REGEX_META.contains(&c) {
                expanded.push('\\');
            }
            expanded.push(c);
        }
    }

    if expanded.ends_with("\\$") {
        expanded.truncate(expanded.len() - 2);
        expanded.push('$');
    }

    expanded
}
