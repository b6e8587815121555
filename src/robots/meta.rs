//! Meta-directive parsing and AI crawler visibility
//!
//! A page can opt out of AI use through `noai` / `noimageai` in its `robots`,
//! `googlebot` or `bingbot` meta tags. Visibility for an AI agent combines that
//! opt-out with the robots.txt verdict for the agent's token.

use crate::robots::matcher::RobotsPolicy;
use crate::robots::parser::RobotsRule;
use serde::Serialize;

/// Raw content of the meta tags that carry crawler directives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetaDirectives {
    pub robots: String,
    pub googlebot: String,
    pub bingbot: String,
}

/// Flags found in a directive string
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetaFlags {
    pub noindex: bool,
    pub nofollow: bool,
    pub noai: bool,
    pub noimageai: bool,
    pub nosnippet: bool,
    pub max_snippet_zero: bool,
}

impl MetaFlags {
    /// Combines flags so that a directive present in either side is kept
    pub fn merge(self, other: MetaFlags) -> MetaFlags {
        MetaFlags {
            noindex: self.noindex || other.noindex,
            nofollow: self.nofollow || other.nofollow,
            noai: self.noai || other.noai,
            noimageai: self.noimageai || other.noimageai,
            nosnippet: self.nosnippet || other.nosnippet,
            max_snippet_zero: self.max_snippet_zero || other.max_snippet_zero,
        }
    }
}

/// Why an agent was blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockReason {
    #[serde(rename = "robots.txt")]
    RobotsTxt,
    #[serde(rename = "meta noai")]
    MetaNoAi,
}

impl BlockReason {
    pub fn label(self) -> &'static str {
        match self {
            BlockReason::RobotsTxt => "robots.txt",
            BlockReason::MetaNoAi => "meta noai",
        }
    }
}

/// A named AI crawler and the token it presents to robots.txt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiAgent {
    pub name: String,
    pub token: String,
}

impl AiAgent {
    pub fn new(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
        }
    }
}

/// The AI crawlers reported on when none are configured
pub fn default_ai_agents() -> Vec<AiAgent> {
    vec![
        AiAgent::new("ChatGPT (GPTBot)", "GPTBot"),
        AiAgent::new("ChatGPT (ChatGPT-User)", "ChatGPT-User"),
        AiAgent::new("Perplexity (PerplexityBot)", "PerplexityBot"),
        AiAgent::new("Perplexity (Perplexity-User)", "Perplexity-User"),
        AiAgent::new("Gemini (Google-Extended)", "Google-Extended"),
    ]
}

/// Visibility of one page to one AI agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiAgentVerdict {
    pub agent_name: String,
    pub user_agent_token: String,
    pub allowed: bool,
    /// `allowed` and the page does not carry `noimageai`
    pub images_allowed: bool,
    pub matched_rule: Option<RobotsRule>,
    pub blocked_by_robots: bool,
    pub blocked_by_meta: bool,
    pub reasons: Vec<BlockReason>,
}

/// Splits a directive string on `,` / `;` into lowercased tokens
pub fn parse_directive_list(content: &str) -> Vec<String> {
    content
        .split([',', ';'])
        .map(|part| part.trim().to_lowercase())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Reads the known flags out of one directive string
pub fn parse_meta_flags(content: &str) -> MetaFlags {
    let directives = parse_directive_list(content);
    let has = |name: &str| directives.iter().any(|d| d == name);

    MetaFlags {
        noindex: has("noindex"),
        nofollow: has("nofollow"),
        noai: has("noai"),
        noimageai: has("noimageai"),
        nosnippet: has("nosnippet"),
        max_snippet_zero: directives
            .iter()
            .any(|d| d.starts_with("max-snippet") && d.contains(":0")),
    }
}

/// Merges the flags of the `robots`, `googlebot` and `bingbot` tags
pub fn merged_meta_flags(meta: &MetaDirectives) -> MetaFlags {
    parse_meta_flags(&meta.robots)
        .merge(parse_meta_flags(&meta.googlebot))
        .merge(parse_meta_flags(&meta.bingbot))
}

/// Computes per-agent visibility for the page at `path`
///
/// `noai` on any of the three meta sources blocks every agent regardless of
/// robots.txt. The final `allowed` value is
/// `!blocked_by_robots && !blocked_by_meta`.
pub fn ai_visibility(
    policy: &RobotsPolicy,
    meta: &MetaDirectives,
    agents: &[AiAgent],
    path: &str,
) -> Vec<AiAgentVerdict> {
    let flags = merged_meta_flags(meta);

    agents
        .iter()
        .map(|agent| {
            let evaluation = policy.evaluate(&agent.token, path);
            let blocked_by_robots = !evaluation.allowed;
            let blocked_by_meta = flags.noai;
            let allowed = !blocked_by_robots && !blocked_by_meta;

            let mut reasons = Vec::new();
            if blocked_by_robots {
                reasons.push(BlockReason::RobotsTxt);
            }
            if blocked_by_meta {
                reasons.push(BlockReason::MetaNoAi);
            }

            AiAgentVerdict {
                agent_name: agent.name.clone(),
                user_agent_token: agent.token.clone(),
                allowed,
                images_allowed: allowed && !flags.noimageai,
                matched_rule: evaluation.matched_rule,
                blocked_by_robots,
                blocked_by_meta,
                reasons,
            }
        })
        .collect()
}
