//! Hint rendering.
//!
//! Each scenario renders from a template: the `project_<scenario>` variant
//! when the match involves project-owned entries and the catalog configures
//! one, else the plain `<scenario>` template, else a built-in default.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::matcher::MatchResult;
use crate::scenario::Scenario;
use crate::store::RuleSet;

// ============================================================================
// Constants
// ============================================================================

/// Agents and skills listed in a hint
const MAX_LISTED: usize = 3;

const AGENT_LIST: &str = "{agent_list}";
const SKILL_LIST: &str = "{skill_list}";

const PROJECT_AGENT_MARKER: &str = " [PROJECT-SPECIFIC]";
const PROJECT_SKILL_MARKER: &str = " [PROJECT]";

// ============================================================================
// Built-in templates
// ============================================================================

pub const DEFAULT_SHORT_NO_MATCH: &str = "Short prompt - review conversation context. \
If continuing established work (e.g., \"proceed\", \"go ahead\"), maintain the current approach \
including any active subagent delegation. For new implementation tasks, delegate to a specialized subagent.";

pub const DEFAULT_LONG_NO_MATCH: &str = "No specific agent/skill match found. \
If this involves implementation (code, commands, file changes), consider delegating to an \
appropriate subagent - review available agents via Task(subagent_type=...). \
Respond directly for informational requests.";

pub const DEFAULT_AGENTS_ONLY: &str = "Delegate implementation to one of these subagents:\n\
{agent_list}\n\n\
You are an orchestrator. Implementation (code, commands, file changes) belongs in subagents.\n\n\
Respond directly only for: clarifying questions, factual lookups, or pure conversation.";

pub const DEFAULT_PROJECT_AGENTS_ONLY: &str = "Project-configured match. \
Delegate implementation to one of these subagents:\n\
{agent_list}\n\n\
You are an orchestrator. Implementation (code, commands, file changes) belongs in subagents.\n\n\
Respond directly only if this is clearly a mismatch, or for clarifying questions and factual lookups.";

pub const DEFAULT_SKILLS_ONLY: &str = "Use these skill(s) for this request: {skill_list}\n\n\
Invoke with: Skill(skill=\"[skill-name]\")\n\n\
If delegating to a subagent, instruct them to invoke the skill and report back.";

pub const DEFAULT_PROJECT_SKILLS_ONLY: &str = "Project-configured skill(s): {skill_list}\n\n\
Invoke with: Skill(skill=\"[skill-name]\")\n\n\
If delegating to a subagent, instruct them to invoke the skill and report back.\n\n\
Skip only if this is clearly a mismatch.";

pub const DEFAULT_AGENTS_AND_SKILLS: &str = "Delegate to one of these subagents:\n\
{agent_list}\n\n\
Pass these skills to the subagent: {skill_list}\n\n\
Append to your Task prompt: \"Use the Skill tool to invoke [skill-name]. Report which skill(s) you used.\"\n\n\
Skip delegation ONLY if this is a purely informational request with no implementation.";

pub const DEFAULT_PROJECT_AGENTS_AND_SKILLS: &str = "Project-configured match. \
Delegate to one of these subagents:\n\
{agent_list}\n\n\
Pass these skills to the subagent: {skill_list}\n\n\
Append to your Task prompt: \"Use the Skill tool to invoke [skill-name]. Report which skill(s) you used.\"\n\n\
Skip delegation only if this is clearly a mismatch or purely informational.";

lazy_static! {
    // Any `{name}` left in a rendered hint
    static ref RE_PLACEHOLDER: Regex = Regex::new(r"\{[A-Za-z_][A-Za-z0-9_]*\}").unwrap();
}

/// Built-in template for a scenario
pub fn default_template(scenario: Scenario, project_match: bool) -> &'static str {
    match (scenario, project_match) {
        (Scenario::ShortNoMatch, _) => DEFAULT_SHORT_NO_MATCH,
        (Scenario::LongNoMatch, _) => DEFAULT_LONG_NO_MATCH,
        (Scenario::AgentsOnly, false) => DEFAULT_AGENTS_ONLY,
        (Scenario::AgentsOnly, true) => DEFAULT_PROJECT_AGENTS_ONLY,
        (Scenario::SkillsOnly, false) => DEFAULT_SKILLS_ONLY,
        (Scenario::SkillsOnly, true) => DEFAULT_PROJECT_SKILLS_ONLY,
        (Scenario::AgentsAndSkills, false) => DEFAULT_AGENTS_AND_SKILLS,
        (Scenario::AgentsAndSkills, true) => DEFAULT_PROJECT_AGENTS_AND_SKILLS,
    }
}

/// Pick the template for a scenario: project variant, plain, built-in.
pub fn select_template(scenario: Scenario, project_match: bool, rules: &RuleSet) -> &str {
    let project_template = if project_match {
        rules.template(&scenario.project_key())
    } else {
        None
    };

    project_template
        .or_else(|| rules.template(scenario.as_str()))
        .unwrap_or_else(|| default_template(scenario, project_match))
}

/// One `  - name: purpose` line per listed agent
pub fn format_agent_list(result: &MatchResult) -> String {
    result
        .matched_agents
        .iter()
        .take(MAX_LISTED)
        .map(|agent| {
            let marker = if result.is_project_agent(&agent.name) {
                PROJECT_AGENT_MARKER
            } else {
                ""
            };
            format!("  - {}: {}{}", agent.name, agent.purpose, marker)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Comma-separated skill names
pub fn format_skill_list(result: &MatchResult) -> String {
    result
        .matched_skills
        .iter()
        .take(MAX_LISTED)
        .map(|skill| {
            if result.is_project_skill(skill) {
                format!("{}{}", skill, PROJECT_SKILL_MARKER)
            } else {
                skill.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render the hint for a scenario.
///
/// Only the lists relevant to the scenario are substituted. A template
/// without a placeholder is returned as-is and never fails.
pub fn render_hint(scenario: Scenario, result: &MatchResult, rules: &RuleSet) -> String {
    let template = select_template(scenario, result.has_project_match, rules);

    let hint = match scenario {
        Scenario::ShortNoMatch | Scenario::LongNoMatch => template.to_string(),
        Scenario::AgentsOnly => template.replace(AGENT_LIST, &format_agent_list(result)),
        Scenario::SkillsOnly => template.replace(SKILL_LIST, &format_skill_list(result)),
        Scenario::AgentsAndSkills => template
            .replace(AGENT_LIST, &format_agent_list(result))
            .replace(SKILL_LIST, &format_skill_list(result)),
    };

    let unfilled = unfilled_placeholders(&hint);
    if !unfilled.is_empty() {
        debug!("Template for {} left placeholders unfilled: {:?}", scenario, unfilled);
    }

    hint
}

/// Placeholders still present in rendered text
pub fn unfilled_placeholders(text: &str) -> Vec<&str> {
    RE_PLACEHOLDER.find_iter(text).map(|m| m.as_str()).collect()
}

// ============================================================================
// Tests
// ============================================================================
