//! Version constraint parsing and evaluation.
//!
//! A constraint is a semver-range expression evaluated against a single
//! installed version. There is no version selection: the question is only
//! ever "does this version satisfy this constraint?".
//!
//! # Grammar
//!
//! ```text
//! constraint  := alternative ( "||" alternative )*
//! alternative := comparator ( (" " | ",") comparator )*
//! comparator  := op? version | "*"
//! op          := ">=" | "<=" | ">" | "<" | "=" | "^" | "~"
//! ```
//!
//! - A bare version means `=`
//! - `*` and the empty constraint match any version
//! - Versions are parsed leniently (see [`crate::version::parse_version`]),
//!   so `^v1.2` is `^1.2.0`
//! - An operator separated from its version by whitespace (`>= 1.0.0`) is
//!   joined back to it
//!
//! # Operator Semantics
//!
//! | Constraint | Matches |
//! |------------|---------|
//! | `^1.2.3`   | `>=1.2.3`, same major |
//! | `^0.2.3`   | `>=0.2.3`, same major (so `0.4.0` matches) |
//! | `~1.2.3`   | `>=1.2.3`, same major and minor |
//! | `>=`, `>`, `<=`, `<`, `=` | semver precedence comparison |
//!
//! Comparisons use semver precedence, so `1.0.0-beta < 1.0.0`.
//!
//! Alternatives are evaluated left to right and short-circuit on the first
//! match; comparators within an alternative must all match.

use crate::core::PlugdepsError;
use crate::version::parse_version;
use semver::Version;
use std::fmt;

/// Comparison operator of a single comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=` or a bare version
    Exact,
    /// `>`
    Greater,
    /// `>=`
    GreaterEq,
    /// `<`
    Less,
    /// `<=`
    LessEq,
    /// `^` - same major, at or above the bound
    Caret,
    /// `~` - compatible within the same minor version
    Tilde,
}

impl Operator {
    /// Operator spellings, longest first so `>=` wins over `>`.
    const SPELLINGS: [(&'static str, Self); 7] = [
        (">=", Self::GreaterEq),
        ("<=", Self::LessEq),
        (">", Self::Greater),
        ("<", Self::Less),
        ("=", Self::Exact),
        ("^", Self::Caret),
        ("~", Self::Tilde),
    ];

    /// Split a leading operator off `input`. No operator means [`Operator::Exact`].
    fn split(input: &str) -> (Self, &str) {
        for (spelling, op) in Self::SPELLINGS {
            if let Some(rest) = input.strip_prefix(spelling) {
                return (op, rest);
            }
        }
        (Self::Exact, input)
    }

    fn is_operator_token(token: &str) -> bool {
        Self::SPELLINGS.iter().any(|(spelling, _)| *spelling == token)
    }
}

/// A single `op version` comparison, or the `*` wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparator {
    /// Matches every version
    Any,
    /// Compare against a bound
    Bound {
        /// The comparison to apply
        op: Operator,
        /// The version on the right-hand side
        version: Version,
    },
}

impl Comparator {
    fn parse(token: &str, constraint: &str) -> Result<Self, PlugdepsError> {
        if token == "*" {
            return Ok(Self::Any);
        }

        let (op, rest) = Operator::split(token);
        let version = parse_version(rest).map_err(|e| PlugdepsError::VersionParseError {
            input: constraint.to_string(),
            reason: match e {
                PlugdepsError::VersionParseError { reason, .. } => {
                    format!("'{rest}': {reason}")
                }
                other => other.to_string(),
            },
        })?;

        Ok(Self::Bound {
            op,
            version,
        })
    }

    /// Check a version against this comparator.
    #[must_use]
    pub fn matches(&self, candidate: &Version) -> bool {
        let Self::Bound {
            op,
            version,
        } = self
        else {
            return true;
        };

        match op {
            Operator::Exact => cmp_precedence(candidate, version).is_eq(),
            Operator::Greater => cmp_precedence(candidate, version).is_gt(),
            Operator::GreaterEq => cmp_precedence(candidate, version).is_ge(),
            Operator::Less => cmp_precedence(candidate, version).is_lt(),
            Operator::LessEq => cmp_precedence(candidate, version).is_le(),
            // Same major, at or above the bound; 0.x is not special-cased
            Operator::Caret => {
                candidate.major == version.major && cmp_precedence(candidate, version).is_ge()
            }
            Operator::Tilde => {
                cmp_precedence(candidate, version).is_ge()
                    && candidate.major == version.major
                    && candidate.minor == version.minor
            }
        }
    }
}

/// Semver precedence: build metadata never affects ordering.
fn cmp_precedence(a: &Version, b: &Version) -> std::cmp::Ordering {
    (a.major, a.minor, a.patch).cmp(&(b.major, b.minor, b.patch)).then_with(|| a.pre.cmp(&b.pre))
}

/// A parsed version constraint.
///
/// Keeps the original text for display and reporting; [`fmt::Display`]
/// returns it unchanged.
///
/// # Examples
///
/// ```rust,no_run
/// use plugdeps_cli::version::VersionConstraint;
/// use semver::Version;
///
/// let constraint = VersionConstraint::parse(">=1.0.0 <2.0.0 || ^3.1")?;
/// assert!(constraint.matches(&Version::new(1, 4, 0)));
/// assert!(constraint.matches(&Version::new(3, 2, 0)));
/// assert!(!constraint.matches(&Version::new(2, 5, 0)));
/// # Ok::<(), plugdeps_cli::core::PlugdepsError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    raw: String,
    alternatives: Vec<Vec<Comparator>>,
}

impl VersionConstraint {
    /// Parse a constraint string.
    ///
    /// # Errors
    ///
    /// Returns [`PlugdepsError::VersionParseError`] naming the offending
    /// comparator when any part of the expression is malformed, including an
    /// empty alternative (`^1.0.0 ||`) or a dangling operator (`>=`).
    pub fn parse(constraint: &str) -> Result<Self, PlugdepsError> {
        let trimmed = constraint.trim();

        if trimmed.is_empty() {
            return Ok(Self {
                raw: constraint.to_string(),
                alternatives: vec![vec![Comparator::Any]],
            });
        }

        let mut alternatives = Vec::new();
        for alternative in trimmed.split("||") {
            let comparators = parse_alternative(alternative, constraint)?;
            if comparators.is_empty() {
                return Err(PlugdepsError::VersionParseError {
                    input: constraint.to_string(),
                    reason: "empty alternative in '||' expression".to_string(),
                });
            }
            alternatives.push(comparators);
        }

        Ok(Self {
            raw: constraint.to_string(),
            alternatives,
        })
    }

    /// Check whether `version` satisfies this constraint.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|comparators| comparators.iter().all(|comparator| comparator.matches(version)))
    }

    /// The constraint text as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for VersionConstraint {
    type Err = PlugdepsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_alternative(alternative: &str, constraint: &str) -> Result<Vec<Comparator>, PlugdepsError> {
    let mut comparators = Vec::new();
    let mut pending_op: Option<&str> = None;

    for token in alternative.split(|c: char| c.is_whitespace() || c == ',').filter(|t| !t.is_empty()) {
        if let Some(op) = pending_op.take() {
            comparators.push(Comparator::parse(&format!("{op}{token}"), constraint)?);
        } else if Operator::is_operator_token(token) {
            pending_op = Some(token);
        } else {
            comparators.push(Comparator::parse(token, constraint)?);
        }
    }

    if let Some(op) = pending_op {
        return Err(PlugdepsError::VersionParseError {
            input: constraint.to_string(),
            reason: format!("operator '{op}' is missing a version"),
        });
    }

    Ok(comparators)
}

/// Evaluate `version` against `constraint`.
///
/// Both strings are parsed leniently. This is the one-shot entry point used
/// by the resolver; callers evaluating the same constraint many times should
/// parse it once with [`VersionConstraint::parse`].
///
/// # Errors
///
/// Returns [`PlugdepsError::VersionParseError`] when either input is not
/// syntactically valid.
pub fn evaluate(version: &str, constraint: &str) -> Result<bool, PlugdepsError> {
    let constraint = VersionConstraint::parse(constraint)?;
    let version = parse_version(version)?;
    let matched = constraint.matches(&version);
    tracing::trace!(target: "version", "{version} against '{constraint}': {matched}");
    Ok(matched)
}
