//! Merges a project catalog into the global catalog.
//!
//! The global catalog is never touched: merging always starts from a deep
//! clone, so a caller holding on to the loaded global rules observes no
//! change. Entries the merger cannot use are skipped one at a time and
//! reported as [`MergeDiagnostic`]s.

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

use crate::store::{AgentDescriptor, ProjectRules, RuleSet, SkillRules};

/// Category custom agents are merged into
pub const UTILITY_CATEGORY: &str = "utility";

/// Purpose used for custom agents without a description
const DEFAULT_CUSTOM_AGENT_PURPOSE: &str = "Custom project agent";

/// Something the merger skipped or found suspicious
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeDiagnostic {
    /// A project section that is not a JSON object
    MalformedSection { section: &'static str },

    /// A single entry of the wrong shape
    MalformedEntry {
        section: &'static str,
        key: String,
        reason: String,
    },

    /// A `project_context` skill with no catalog entry. Still counted as
    /// project-owned.
    UnknownContextSkill { context: String, skill: String },

    /// Project triggers for a category the global catalog does not define
    UnknownCategory { category: String },

    /// A `skill_mappings` keyword pointing at an unknown skill
    UnknownMappedSkill { keyword: String, skill: String },

    /// A custom agent dropped because there is no `utility` category
    MissingUtilityCategory { agent: String },
}

impl fmt::Display for MergeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedSection { section } => {
                write!(f, "project {} is not an object, skipped", section)
            }
            Self::MalformedEntry {
                section,
                key,
                reason,
            } => write!(f, "project {}.{} skipped: {}", section, key, reason),
            Self::UnknownContextSkill { context, skill } => write!(
                f,
                "project_context.{} names skill '{}' which is not in the catalog",
                context, skill
            ),
            Self::UnknownCategory { category } => write!(
                f,
                "project triggers for unknown category '{}' dropped",
                category
            ),
            Self::UnknownMappedSkill { keyword, skill } => write!(
                f,
                "skill_mappings.{} references unknown skill '{}'",
                keyword, skill
            ),
            Self::MissingUtilityCategory { agent } => write!(
                f,
                "custom agent '{}' dropped: no '{}' category",
                agent, UTILITY_CATEGORY
            ),
        }
    }
}

/// Merged catalog plus provenance
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub rules: RuleSet,
    /// Agents contributed or re-triggered by the project
    pub project_agents: BTreeSet<String>,
    /// Skills contributed, extended or named by the project
    pub project_skills: BTreeSet<String>,
    pub diagnostics: Vec<MergeDiagnostic>,
}

/// Merge with custom agent discovery enabled
pub fn merge(global: &RuleSet, project: Option<&ProjectRules>) -> MergeOutcome {
    merge_with_options(global, project, true)
}

/// Merge `project` into a clone of `global`.
///
/// When `custom_discovery` is false the `custom_agents` section is ignored.
pub fn merge_with_options(
    global: &RuleSet,
    project: Option<&ProjectRules>,
    custom_discovery: bool,
) -> MergeOutcome {
    let mut outcome = MergeOutcome {
        rules: global.clone(),
        ..Default::default()
    };

    let Some(project) = project else {
        return outcome;
    };

    let context_skills = merge_project_context(&mut outcome, project.project_context.as_ref());
    merge_triggers(&mut outcome, project.triggers.as_ref());
    merge_skills(&mut outcome, project.skills.as_ref());
    merge_skill_mappings(&mut outcome, project.skill_mappings.as_ref());
    if custom_discovery {
        merge_custom_agents(&mut outcome, project.custom_agents.as_ref());
    }

    // Flag context names the final catalog still does not define
    for (context, skill) in context_skills {
        if !outcome.rules.skills.contains_key(&skill) {
            outcome
                .diagnostics
                .push(MergeDiagnostic::UnknownContextSkill { context, skill });
        }
    }

    outcome
}

// ============================================================================
// Sections
// ============================================================================

fn merge_project_context(
    outcome: &mut MergeOutcome,
    section: Option<&Value>,
) -> Vec<(String, String)> {
    let mut named = Vec::new();
    let Some(entries) = section_entries(outcome, "project_context", section) else {
        return named;
    };

    for (context, value) in entries {
        // Non-list values are allowed and carry no provenance
        let Some(items) = value.as_array() else {
            continue;
        };
        for item in items {
            match item.as_str() {
                Some(skill) => {
                    outcome.project_skills.insert(skill.to_string());
                    named.push((context.clone(), skill.to_string()));
                }
                None => outcome.diagnostics.push(MergeDiagnostic::MalformedEntry {
                    section: "project_context",
                    key: context.clone(),
                    reason: format!("non-string skill name {}", item),
                }),
            }
        }
    }

    named
}

fn merge_triggers(outcome: &mut MergeOutcome, section: Option<&Value>) {
    let Some(entries) = section_entries(outcome, "triggers", section) else {
        return;
    };

    for (category_name, value) in entries {
        let Some(triggers) = string_list(value) else {
            outcome.diagnostics.push(MergeDiagnostic::MalformedEntry {
                section: "triggers",
                key: category_name.clone(),
                reason: "expected a list of strings".to_string(),
            });
            continue;
        };

        let Some(category) = outcome.rules.agent_categories.get_mut(category_name) else {
            outcome.diagnostics.push(MergeDiagnostic::UnknownCategory {
                category: category_name.clone(),
            });
            continue;
        };

        category.triggers.extend(triggers);
        for agent in &category.agents {
            if !agent.name.is_empty() {
                outcome.project_agents.insert(agent.name.clone());
            }
        }
    }
}

fn merge_skills(outcome: &mut MergeOutcome, section: Option<&Value>) {
    let Some(entries) = section_entries(outcome, "skills", section) else {
        return;
    };

    for (skill_name, value) in entries {
        if !value.is_object() {
            outcome.diagnostics.push(MergeDiagnostic::MalformedEntry {
                section: "skills",
                key: skill_name.clone(),
                reason: "skill is not an object".to_string(),
            });
            continue;
        }
        let skill: SkillRules = match serde_json::from_value(value.clone()) {
            Ok(skill) => skill,
            Err(e) => {
                outcome.diagnostics.push(MergeDiagnostic::MalformedEntry {
                    section: "skills",
                    key: skill_name.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match outcome.rules.skills.get_mut(skill_name) {
            Some(existing) => existing.triggers.extend(skill.triggers),
            None => {
                outcome.rules.skills.insert(skill_name.clone(), skill);
            }
        }
        outcome.project_skills.insert(skill_name.clone());
    }
}

fn merge_skill_mappings(outcome: &mut MergeOutcome, section: Option<&Value>) {
    let Some(entries) = section_entries(outcome, "skill_mappings", section) else {
        return;
    };

    for (keyword, value) in entries {
        let Some(skill_names) = string_list(value) else {
            outcome.diagnostics.push(MergeDiagnostic::MalformedEntry {
                section: "skill_mappings",
                key: keyword.clone(),
                reason: "expected a list of skill names".to_string(),
            });
            continue;
        };

        for skill_name in skill_names {
            match outcome.rules.skills.get_mut(&skill_name) {
                Some(skill) => {
                    if !skill.triggers.iter().any(|t| t == keyword) {
                        skill.triggers.push(keyword.clone());
                    }
                    outcome.project_skills.insert(skill_name);
                }
                None => outcome.diagnostics.push(MergeDiagnostic::UnknownMappedSkill {
                    keyword: keyword.clone(),
                    skill: skill_name,
                }),
            }
        }
    }
}

fn merge_custom_agents(outcome: &mut MergeOutcome, section: Option<&Value>) {
    let Some(entries) = section_entries(outcome, "custom_agents", section) else {
        return;
    };

    for (agent_name, value) in entries {
        let Some(descriptor) = value.as_object() else {
            outcome.diagnostics.push(MergeDiagnostic::MalformedEntry {
                section: "custom_agents",
                key: agent_name.clone(),
                reason: "descriptor is not an object".to_string(),
            });
            continue;
        };

        let Some(utility) = outcome.rules.agent_categories.get_mut(UTILITY_CATEGORY) else {
            outcome
                .diagnostics
                .push(MergeDiagnostic::MissingUtilityCategory {
                    agent: agent_name.clone(),
                });
            continue;
        };

        let purpose = descriptor
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_CUSTOM_AGENT_PURPOSE)
            .to_string();
        let tools = descriptor
            .get("tools")
            .and_then(string_list)
            .unwrap_or_default();

        utility.agents.push(AgentDescriptor {
            name: agent_name.clone(),
            purpose,
            tools,
        });
        if let Some(triggers) = descriptor.get("triggers").and_then(string_list) {
            utility.triggers.extend(triggers);
        }
        outcome.project_agents.insert(agent_name.clone());
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// The section as an object, or a diagnostic if it has another shape
fn section_entries<'a>(
    outcome: &mut MergeOutcome,
    section: &'static str,
    value: Option<&'a Value>,
) -> Option<&'a Map<String, Value>> {
    let value = value?;
    if value.is_null() {
        return None;
    }
    match value.as_object() {
        Some(entries) => Some(entries),
        None => {
            outcome
                .diagnostics
                .push(MergeDiagnostic::MalformedSection { section });
            None
        }
    }
}

/// `Some` only for an array made entirely of strings
fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
