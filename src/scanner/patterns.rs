//! The closed table of dependency patterns.
//!
//! Patterns over-match on purpose: the scanner collects candidates for a
//! human (or a later tool) to review and makes no validity judgment. Every
//! pattern is case-insensitive; system-command patterns are also multi-line
//! so `^import` anchors at each line.
//!
//! Patterns run in table order. When two patterns of the same category
//! match at the same position, only the first is reported.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// What a raw match appears to refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchCategory {
    /// Slash commands and skill invocations
    SkillReference,
    /// Agent mentions and subagent launches
    AgentReference,
    /// External executables, shebangs and imports
    SystemCommand,
    /// Tool mentions and hook names
    ToolReference,
    /// Other plugins
    PluginReference,
}

impl MatchCategory {
    /// Every category, in table order.
    pub const ALL: [Self; 5] = [
        Self::SkillReference,
        Self::AgentReference,
        Self::SystemCommand,
        Self::ToolReference,
        Self::PluginReference,
    ];

    /// Name used in JSON output and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SkillReference => "skillReference",
            Self::AgentReference => "agentReference",
            Self::SystemCommand => "systemCommand",
            Self::ToolReference => "toolReference",
            Self::PluginReference => "pluginReference",
        }
    }
}

impl fmt::Display for MatchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|category| category.as_str() == s).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|c| c.as_str()).collect();
            format!("unknown category '{s}' (expected one of: {})", known.join(", "))
        })
    }
}

const SKILL_PATTERNS: &[&str] = &[
    r"/[\w-]+:[\w-]+",
    // Bare slash command; group 1 excludes the terminator
    r"(/[\w-]+)(?:\s|$|\)|\])",
    r#"Skill\s*\(\s*skill\s*=\s*["'][\w-]+(?::[\w-]+)?["']"#,
    r"Skill\s+tool\s+(?:to\s+)?(?:invoke|call|use)",
    r"invoke\s+(?:the\s+)?skill",
    r"use\s+(?:the\s+)?skill",
    r"(?:the\s+)?[\w-]+(?::[\w-]+)?\s+skill(?:\s+to)?",
    r"`[\w-]+:[\w-]+`\s*skill",
    r#"skill\s*[`'"][\w-]+(?::[\w-]+)?[`'"]"#,
];

const AGENT_PATTERNS: &[&str] = &[
    r"@[\w-]+(?:[\s,]|$)",
    r"sub-?agent",
    r"subagent[_\s]type",
    r"Task\s+tool",
    r"TaskCreate|TaskUpdate|TaskGet|TaskList",
    r"launch\s+(?:an?\s+)?agent",
    r"spawn\s+(?:an?\s+)?agent",
    r"(?:create|start|invoke)\s+(?:an?\s+)?(?:sub)?agent",
    r"agents?/[\w-]+\.md",
    r"AGENT\.md",
];

const SYSTEM_PATTERNS: &[&str] = &[
    r"`(?:git|npm|pnpm|yarn|pip|cargo|docker|kubectl|gh|curl|wget|make|cmake)(?:\s+[\w-]+)*`",
    r"Bash\s+tool",
    r"(?:run|execute)\s+(?:the\s+)?(?:command|script)",
    r"which\s+[\w-]+",
    r"[\w-]+\s+--version",
    r"command\s+-v\s+[\w-]+",
    r"#!/(?:usr/)?(?:local/)?bin/(?:env\s+)?(?:bash|sh|python3?|node|ruby|perl)",
    r"^import\s+[\w.]+",
    r"^from\s+[\w.]+\s+import",
    r#"require\s*\(\s*['"][\w@/.-]+['"]\s*\)"#,
    r#"import\s+.*\s+from\s+['"][\w@/.-]+['"]"#,
    r"(?:pip|npm|pnpm|yarn|cargo)\s+(?:install|add)\s+[\w@/.-]+",
];

const TOOL_PATTERNS: &[&str] = &[
    r"use\s+(?:the\s+)?\w+\s+tool",
    r"\w+\s+tool(?:\s+to)?",
    r"call\s+(?:the\s+)?\w+\s+tool",
    r"invoke\s+(?:the\s+)?\w+\s+tool",
    r"PreToolUse|PostToolUse",
    r"tool\s*hook",
    r#"<invoke\s+name=['"]\w+['"]"#,
    r"<parameter",
    r"mcp__[\w-]+__\w+",
];

const PLUGIN_PATTERNS: &[&str] = &[
    r"[\w-]+\s+plugin",
    r"plugin\s+[\w-]+",
    r"requires\s+(?:the\s+)?[\w-]+",
    r"depends\s+on\s+[\w-]+",
    r"dependency\s+(?:on\s+)?[\w-]+",
    r"install\s+[\w-]+(?:@[\w-]+)?",
    r"plugin\s+install\s+[\w-]+",
    r"prerequisites?\s*:?\s*[\w-]+",
    r"needs\s+(?:the\s+)?[\w-]+\s+plugin",
    r#""dependencies"\s*:\s*\{"#,
    r#""optionalDependencies"\s*:\s*\{"#,
    r#""systemDependencies"\s*:\s*\{"#,
    r"`[\w-]+@[\w-]+`",
    r"[\w-]+@[\w-]+(?:\s+plugin)?",
];

/// A compiled pattern.
#[derive(Debug)]
pub struct Pattern {
    /// Category reported for its matches
    pub category: MatchCategory,
    /// Compiled expression; when it has a capture group, group 1 is the match
    pub regex: Regex,
}

impl Pattern {
    /// Byte span of every match in `content`.
    pub fn spans<'a>(&'a self, content: &'a str) -> impl Iterator<Item = (usize, usize)> + 'a {
        self.regex.captures_iter(content).filter_map(|captures| {
            let matched = captures.get(1).or_else(|| captures.get(0))?;
            Some((matched.start(), matched.end()))
        })
    }
}

static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();

/// The compiled pattern table.
pub fn patterns() -> &'static [Pattern] {
    PATTERNS.get_or_init(|| {
        let table: [(MatchCategory, &str, &[&str]); 5] = [
            (MatchCategory::SkillReference, "(?i)", SKILL_PATTERNS),
            (MatchCategory::AgentReference, "(?i)", AGENT_PATTERNS),
            (MatchCategory::SystemCommand, "(?im)", SYSTEM_PATTERNS),
            (MatchCategory::ToolReference, "(?i)", TOOL_PATTERNS),
            (MatchCategory::PluginReference, "(?i)", PLUGIN_PATTERNS),
        ];

        table
            .into_iter()
            .flat_map(|(category, flags, sources)| {
                sources.iter().filter_map(move |source| {
                    match Regex::new(&format!("{flags}{source}")) {
                        Ok(regex) => Some(Pattern {
                            category,
                            regex,
                        }),
                        Err(e) => {
                            tracing::error!(target: "scanner", "invalid pattern {source}: {e}");
                            None
                        }
                    }
                })
            })
            .collect()
    })
}
