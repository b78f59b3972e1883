//! Keyword and pattern matching of a prompt against the merged catalog.
//!
//! Triggers are literal keywords matched as whole words; patterns are regular
//! expressions and weigh double. Every regex is compiled once when the
//! [`Matcher`] is built and reused for all scoring of the invocation.

use regex::{Regex, RegexBuilder};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::debug;

use crate::store::{AgentDescriptor, RuleSet};

// ============================================================================
// Constants
// ============================================================================

/// Agents taken from each matched category
const AGENTS_PER_CATEGORY: usize = 2;

/// Agents kept after de-duplication
const MAX_MATCHED_AGENTS: usize = 4;

/// Skills kept, best first
const MAX_MATCHED_SKILLS: usize = 3;

/// Scoring weights for the two match types
struct MatchWeights {
    /// Whole-word trigger match
    trigger: u32,
    /// Regex pattern match
    pattern: u32,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            trigger: 1,
            pattern: 2,
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// A skill pattern that could not be compiled and scores nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternDiagnostic {
    pub skill: String,
    pub pattern: String,
    pub error: String,
}

impl fmt::Display for PatternDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid pattern '{}' in skill {}: {}",
            self.pattern, self.skill, self.error
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMatch<'a> {
    pub name: &'a str,
    pub score: u32,
    pub agents: &'a [AgentDescriptor],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillMatch<'a> {
    pub name: &'a str,
    pub score: u32,
    pub purpose: &'a str,
}

/// Everything the classifier and renderer need to know about one prompt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// Every category that scored, best first
    pub matched_categories: Vec<String>,
    /// Deduplicated by name, first seen wins, at most 4
    pub matched_agents: Vec<AgentDescriptor>,
    /// Top 3 skills, best first
    pub matched_skills: Vec<String>,
    /// All category scores plus the retained skill scores
    pub match_score: u32,
    pub word_count: usize,
    /// Retained agents that are project-owned
    pub project_matched_agents: Vec<String>,
    /// Retained skills that are project-owned
    pub project_matched_skills: Vec<String>,
    pub has_project_match: bool,
    pub pattern_diagnostics: Vec<PatternDiagnostic>,
}

impl MatchResult {
    pub fn has_agents(&self) -> bool {
        !self.matched_agents.is_empty()
    }

    pub fn has_skills(&self) -> bool {
        !self.matched_skills.is_empty()
    }

    pub fn is_project_agent(&self, name: &str) -> bool {
        self.project_matched_agents.iter().any(|a| a == name)
    }

    pub fn is_project_skill(&self, name: &str) -> bool {
        self.project_matched_skills.iter().any(|s| s == name)
    }

    pub fn agent_names(&self) -> Vec<&str> {
        self.matched_agents.iter().map(|a| a.name.as_str()).collect()
    }
}

// ============================================================================
// Matcher
// ============================================================================

struct CompiledCategory<'a> {
    name: &'a str,
    triggers: Vec<Regex>,
    agents: &'a [AgentDescriptor],
}

struct CompiledSkill<'a> {
    name: &'a str,
    triggers: Vec<Regex>,
    patterns: Vec<Regex>,
    purpose: &'a str,
}

/// A catalog with all of its regexes compiled
pub struct Matcher<'a> {
    categories: Vec<CompiledCategory<'a>>,
    skills: Vec<CompiledSkill<'a>>,
    weights: MatchWeights,
    diagnostics: Vec<PatternDiagnostic>,
}

impl<'a> Matcher<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        let mut diagnostics = Vec::new();

        let categories = rules
            .agent_categories
            .iter()
            .map(|(name, category)| CompiledCategory {
                name,
                triggers: compile_triggers(&category.triggers),
                agents: &category.agents,
            })
            .collect();

        let skills = rules
            .skills
            .iter()
            .map(|(name, skill)| {
                let mut patterns = Vec::with_capacity(skill.patterns.len());
                for pattern in &skill.patterns {
                    match RegexBuilder::new(pattern).case_insensitive(true).build() {
                        Ok(re) => patterns.push(re),
                        Err(e) => {
                            let diagnostic = PatternDiagnostic {
                                skill: name.to_string(),
                                pattern: pattern.clone(),
                                error: e.to_string(),
                            };
                            debug!("{}", diagnostic);
                            diagnostics.push(diagnostic);
                        }
                    }
                }
                CompiledSkill {
                    name,
                    triggers: compile_triggers(&skill.triggers),
                    patterns,
                    purpose: &skill.purpose,
                }
            })
            .collect();

        Self {
            categories,
            skills,
            weights: MatchWeights::default(),
            diagnostics,
        }
    }

    /// Patterns skipped while compiling
    pub fn diagnostics(&self) -> &[PatternDiagnostic] {
        &self.diagnostics
    }

    /// Score every category. Returns matches (best first, ties in declaration
    /// order) and the project-owned agents of the matched categories.
    pub fn match_categories(
        &self,
        text: &str,
        project_agents: &BTreeSet<String>,
    ) -> (Vec<CategoryMatch<'a>>, Vec<String>) {
        let text = normalize_text(text);
        let mut results = Vec::new();
        let mut matched_project_agents = Vec::new();

        for category in &self.categories {
            let score = self.weights.trigger * count_hits(&category.triggers, &text);
            if score == 0 {
                continue;
            }

            for agent in category.agents {
                if project_agents.contains(&agent.name) {
                    matched_project_agents.push(agent.name.clone());
                }
            }
            results.push(CategoryMatch {
                name: category.name,
                score,
                agents: category.agents,
            });
        }

        // sort_by is stable: equal scores keep declaration order
        results.sort_by(|a, b| b.score.cmp(&a.score));
        (results, matched_project_agents)
    }

    /// Score every skill. Same ordering rules as [`Self::match_categories`].
    pub fn match_skills(
        &self,
        text: &str,
        project_skills: &BTreeSet<String>,
    ) -> (Vec<SkillMatch<'a>>, Vec<String>) {
        let text = normalize_text(text);
        let mut results = Vec::new();
        let mut matched_project_skills = Vec::new();

        for skill in &self.skills {
            let score = self.weights.trigger * count_hits(&skill.triggers, &text)
                + self.weights.pattern * count_hits(&skill.patterns, &text);
            if score == 0 {
                continue;
            }

            if project_skills.contains(skill.name) {
                matched_project_skills.push(skill.name.to_string());
            }
            results.push(SkillMatch {
                name: skill.name,
                score,
                purpose: skill.purpose,
            });
        }

        results.sort_by(|a, b| b.score.cmp(&a.score));
        (results, matched_project_skills)
    }

    /// Run both matchers and condense the outcome into a [`MatchResult`]
    pub fn analyze(
        &self,
        text: &str,
        project_agents: &BTreeSet<String>,
        project_skills: &BTreeSet<String>,
    ) -> MatchResult {
        let mut result = MatchResult {
            word_count: count_words(text),
            pattern_diagnostics: self.diagnostics.clone(),
            ..Default::default()
        };

        let (category_matches, _) = self.match_categories(text, project_agents);
        let mut candidates: Vec<&AgentDescriptor> = Vec::new();
        for category in &category_matches {
            result.matched_categories.push(category.name.to_string());
            candidates.extend(category.agents.iter().take(AGENTS_PER_CATEGORY));
            result.match_score += category.score;
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for agent in candidates {
            if agent.name.is_empty() || !seen.insert(agent.name.as_str()) {
                continue;
            }
            result.matched_agents.push(agent.clone());
            if result.matched_agents.len() == MAX_MATCHED_AGENTS {
                break;
            }
        }

        let (skill_matches, _) = self.match_skills(text, project_skills);
        for skill in skill_matches.iter().take(MAX_MATCHED_SKILLS) {
            result.matched_skills.push(skill.name.to_string());
            result.match_score += skill.score;
        }

        result.project_matched_agents = result
            .matched_agents
            .iter()
            .filter(|agent| project_agents.contains(&agent.name))
            .map(|agent| agent.name.clone())
            .collect();
        result.project_matched_skills = result
            .matched_skills
            .iter()
            .filter(|skill| project_skills.contains(*skill))
            .cloned()
            .collect();
        result.has_project_match =
            !result.project_matched_agents.is_empty() || !result.project_matched_skills.is_empty();

        result
    }
}

/// Compile once and analyze a single prompt
pub fn analyze(
    text: &str,
    rules: &RuleSet,
    project_agents: &BTreeSet<String>,
    project_skills: &BTreeSet<String>,
) -> MatchResult {
    Matcher::new(rules).analyze(text, project_agents, project_skills)
}

/// Whitespace-delimited token count of the raw prompt
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Whole-word matchers for the distinct, non-empty triggers of a list
fn compile_triggers(triggers: &[String]) -> Vec<Regex> {
    let mut seen = HashSet::new();
    triggers
        .iter()
        .map(|t| t.to_lowercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .filter_map(|t| Regex::new(&format!(r"\b{}\b", regex::escape(&t))).ok())
        .collect()
}

fn count_hits(regexes: &[Regex], text: &str) -> u32 {
    regexes.iter().filter(|re| re.is_match(text)).count() as u32
}

// ============================================================================
// Tests
// ============================================================================
