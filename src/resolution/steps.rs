//! Human-readable resolution steps for a check report.

use crate::manifest::Section;
use crate::resolution::{ResolutionAction, map_to_action};
use crate::resolver::CheckReport;
use std::fmt;

/// Which section a step comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Required plugin
    Required,
    /// Optional plugin
    Optional,
    /// Required system command
    RequiredSystem,
    /// Optional system command
    OptionalSystem,
}

impl StepKind {
    const fn from_section(section: Section) -> Self {
        match section {
            Section::Dependencies => Self::Required,
            Section::OptionalDependencies => Self::Optional,
            Section::SystemDependencies => Self::RequiredSystem,
            Section::OptionalSystemDependencies => Self::OptionalSystem,
        }
    }

    /// Whether an unresolved step of this kind fails the run.
    #[must_use]
    pub const fn is_required(self) -> bool {
        matches!(self, Self::Required | Self::RequiredSystem)
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Required => "Required",
            Self::Optional => "Optional",
            Self::RequiredSystem => "Required System",
            Self::OptionalSystem => "Optional System",
        })
    }
}

/// One numbered entry of the resolution list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionStep {
    /// Section the dependency was declared in
    pub kind: StepKind,
    /// Plugin or command name
    pub name: String,
    /// Plugin that declared the dependency
    pub dependent: String,
    /// What to do
    pub action: ResolutionAction,
    /// Instruction line
    pub instruction: String,
    /// Explanation shown under the instruction
    pub detail: Option<String>,
}

/// Build a step for every result that needs an action, in report order.
#[must_use]
pub fn steps_for_report(report: &CheckReport) -> Vec<ResolutionStep> {
    report
        .results()
        .filter_map(|(section, result)| {
            let action = result.action.clone().unwrap_or_else(|| map_to_action(result));
            if !action.is_needed() {
                return None;
            }

            let instruction = match &action {
                ResolutionAction::UpdateSystemDependency {
                    command,
                    ..
                } => format!("Update {command} to satisfy version {}", result.required_version),
                other => other.to_string(),
            };
            let detail =
                (!result.help.is_empty() && result.help != instruction).then(|| result.help.clone());

            Some(ResolutionStep {
                kind: StepKind::from_section(section),
                name: result.subject.name().to_string(),
                dependent: result.dependent.to_string(),
                action,
                instruction,
                detail,
            })
        })
        .collect()
}

/// Render steps as the numbered Markdown list printed by `plugdeps steps`.
#[must_use]
pub fn format_steps(steps: &[ResolutionStep]) -> String {
    if steps.is_empty() {
        return "All dependencies satisfied.".to_string();
    }

    let plural = if steps.len() == 1 { "" } else { "s" };
    let mut lines = vec![format!("## Resolution Steps ({} issue{plural})", steps.len()), String::new()];

    for (i, step) in steps.iter().enumerate() {
        lines.push(format!("{}. [{}] {} (required by {})", i + 1, step.kind, step.name, step.dependent));
        lines.push(format!("   {}", step.instruction));
        if let Some(detail) = &step.detail {
            lines.push(format!("   {detail}"));
        }
        lines.push(String::new());
    }

    lines.join("\n").trim_end().to_string()
}
