//! The routing pipeline: merge, match, classify, render.

use colored::Colorize;
use tracing::{debug, warn};

use crate::config::RouterConfig;
use crate::matcher::{MatchResult, Matcher};
use crate::merge::{merge_with_options, MergeDiagnostic};
use crate::render::render_hint;
use crate::scenario::Scenario;
use crate::store::{ProjectRules, RuleSet};

/// Outcome of routing one prompt
#[derive(Debug, Clone)]
pub struct Routing {
    pub scenario: Scenario,
    pub hint: String,
    pub result: MatchResult,
    pub merge_diagnostics: Vec<MergeDiagnostic>,
}

/// Route a prompt against the global catalog and optional project rules.
///
/// An empty prompt skips matching and always renders `short_no_match`.
/// The global catalog is only read; merging works on a clone.
pub fn route(
    prompt: &str,
    global: &RuleSet,
    project: Option<&ProjectRules>,
    config: &RouterConfig,
) -> Routing {
    if prompt.is_empty() {
        debug!("Empty prompt, using short_no_match template");
        let result = MatchResult::default();
        let scenario = Scenario::ShortNoMatch;
        return Routing {
            scenario,
            hint: render_hint(scenario, &result, global),
            result,
            merge_diagnostics: Vec::new(),
        };
    }

    let merged = merge_with_options(global, project, config.custom_discovery);
    for diagnostic in &merged.diagnostics {
        warn!("Project rules: {}", diagnostic);
    }
    debug!(
        "Loaded rules: {} categories, {} skills, {} project agents, {} project skills",
        merged.rules.agent_categories.len(),
        merged.rules.skills.len(),
        merged.project_agents.len(),
        merged.project_skills.len()
    );

    let matcher = Matcher::new(&merged.rules);
    for diagnostic in matcher.diagnostics() {
        warn!("{}", diagnostic);
    }

    let result = matcher.analyze(prompt, &merged.project_agents, &merged.project_skills);
    debug!(
        "Matches: agents={:?}, skills={:?}, project_matches={}",
        result.agent_names(),
        result.matched_skills,
        result.has_project_match
    );

    let scenario = Scenario::from_match(&result, config.short_threshold);
    let hint = render_hint(scenario, &result, &merged.rules);
    debug!(
        "Scenario: {}, project_matches: {}, hint length: {} chars",
        scenario.as_str().cyan(),
        result.has_project_match,
        hint.len()
    );

    Routing {
        scenario,
        hint,
        result,
        merge_diagnostics: merged.diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::DEFAULT_SHORT_NO_MATCH;
    use serde_json::json;

    fn create_test_rules() -> RuleSet {
        RuleSet::from_value(&json!({
            "agent_categories": {
                "backend": {
                    "triggers": ["api", "endpoint"],
                    "agents": [{ "name": "api-builder", "purpose": "Builds APIs" }]
                },
                "utility": {
                    "triggers": ["script"],
                    "agents": [{ "name": "general-helper", "purpose": "Misc tasks" }]
                }
            },
            "skills": {
                "pytest-runner": {
                    "triggers": ["test"],
                    "patterns": ["\\btests?\\b"],
                    "purpose": "Runs pytest"
                }
            },
            "injection_templates": {}
        }))
    }

    #[test]
    fn test_empty_prompt_is_short() {
        let rules = create_test_rules();
        let routing = route("", &rules, None, &RouterConfig::default());

        assert_eq!(routing.scenario, Scenario::ShortNoMatch);
        assert_eq!(routing.hint, DEFAULT_SHORT_NO_MATCH);
    }

    #[test]
    fn test_empty_prompt_ignores_threshold() {
        let rules = create_test_rules();
        let config = RouterConfig {
            short_threshold: 0,
            ..Default::default()
        };
        let routing = route("", &rules, None, &config);
        assert_eq!(routing.scenario, Scenario::ShortNoMatch);
    }

    #[test]
    fn test_skills_only_routing() {
        let rules = create_test_rules();
        let routing = route("run the unit tests", &rules, None, &RouterConfig::default());

        assert_eq!(routing.result.matched_skills, vec!["pytest-runner"]);
        assert_eq!(routing.scenario, Scenario::SkillsOnly);
        assert!(routing.hint.contains("pytest-runner"));
        assert!(routing.hint.contains("Invoke with: Skill(skill="));
    }

    #[test]
    fn test_off_shape_agent_fields_still_route() {
        let rules = RuleSet::from_value(&json!({
            "agent_categories": {
                "backend": {
                    "triggers": ["api"],
                    "agents": [{ "name": "api-builder", "tools": "Read, Write" }]
                }
            },
            "skills": {},
            "injection_templates": {}
        }));
        assert_eq!(rules.agent_categories.len(), 1);

        let routing = route("add an api for orders now", &rules, None, &RouterConfig::default());
        assert_eq!(routing.scenario, Scenario::AgentsOnly);
        assert_eq!(routing.result.agent_names(), vec!["api-builder"]);
    }

    #[test]
    fn test_long_prompt_without_match() {
        let rules = create_test_rules();
        let routing = route(
            "please explain how the weather works in spring",
            &rules,
            None,
            &RouterConfig::default(),
        );
        assert_eq!(routing.scenario, Scenario::LongNoMatch);
    }

    #[test]
    fn test_custom_agent_routes_with_project_template() {
        let rules = create_test_rules();
        let project = ProjectRules::from_value(json!({
            "custom_agents": {
                "deployer": { "description": "Ships releases", "triggers": ["deploy"] }
            }
        }))
        .unwrap();

        let routing = route(
            "deploy the service",
            &rules,
            Some(&project),
            &RouterConfig::default(),
        );
        assert_eq!(routing.scenario, Scenario::AgentsOnly);
        assert!(routing.result.has_project_match);
        assert!(routing
            .hint
            .starts_with("Project-configured match. Delegate implementation"));
        assert!(routing.hint.contains(
            "  - general-helper: Misc tasks\n  - deployer: Ships releases [PROJECT-SPECIFIC]"
        ));
    }

    #[test]
    fn test_custom_discovery_toggle() {
        let rules = create_test_rules();
        let project = ProjectRules::from_value(json!({
            "custom_agents": { "deployer": { "triggers": ["deploy"] } }
        }))
        .unwrap();
        let config = RouterConfig {
            custom_discovery: false,
            ..Default::default()
        };

        let routing = route("deploy", &rules, Some(&project), &config);
        assert_eq!(routing.scenario, Scenario::ShortNoMatch);
    }

    #[test]
    fn test_global_rules_unchanged_after_routing() {
        let rules = create_test_rules();
        let snapshot = rules.clone();
        let project = ProjectRules::from_value(json!({
            "triggers": { "backend": ["graphql"] },
            "skill_mappings": { "fixture": ["pytest-runner"] }
        }))
        .unwrap();

        let routing = route("graphql fixture", &rules, Some(&project), &RouterConfig::default());
        assert_eq!(routing.scenario, Scenario::AgentsAndSkills);
        assert_eq!(rules, snapshot);
    }
}
