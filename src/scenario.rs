//! Routing scenarios.

use std::fmt;

use crate::matcher::MatchResult;

/// Default word count below which an unmatched prompt counts as short
pub const DEFAULT_SHORT_THRESHOLD: usize = 5;

/// Routing outcome, controls which hint template is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Nothing matched and the prompt is short ("yes", "go ahead")
    ShortNoMatch,
    AgentsOnly,
    AgentsAndSkills,
    SkillsOnly,
    /// Nothing matched in a longer prompt
    LongNoMatch,
}

impl Scenario {
    pub const ALL: [Scenario; 5] = [
        Scenario::ShortNoMatch,
        Scenario::AgentsOnly,
        Scenario::AgentsAndSkills,
        Scenario::SkillsOnly,
        Scenario::LongNoMatch,
    ];

    /// Key used in `injection_templates`
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::ShortNoMatch => "short_no_match",
            Scenario::AgentsOnly => "agents_only",
            Scenario::AgentsAndSkills => "agents_and_skills",
            Scenario::SkillsOnly => "skills_only",
            Scenario::LongNoMatch => "long_no_match",
        }
    }

    /// Key of the project-aware template variant
    pub fn project_key(&self) -> String {
        format!("project_{}", self.as_str())
    }

    /// Precedence: agents and skills, agents, skills, short, long.
    pub fn classify(has_agents: bool, has_skills: bool, is_short: bool) -> Self {
        match (has_agents, has_skills) {
            (true, true) => Scenario::AgentsAndSkills,
            (true, false) => Scenario::AgentsOnly,
            (false, true) => Scenario::SkillsOnly,
            (false, false) if is_short => Scenario::ShortNoMatch,
            (false, false) => Scenario::LongNoMatch,
        }
    }

    pub fn from_match(result: &MatchResult, short_threshold: usize) -> Self {
        Self::classify(
            result.has_agents(),
            result.has_skills(),
            result.word_count < short_threshold,
        )
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AgentDescriptor;

    fn result_with(agents: usize, skills: usize, word_count: usize) -> MatchResult {
        MatchResult {
            matched_agents: (0..agents)
                .map(|i| AgentDescriptor {
                    name: format!("agent-{}", i),
                    ..Default::default()
                })
                .collect(),
            matched_skills: (0..skills).map(|i| format!("skill-{}", i)).collect(),
            word_count,
            ..Default::default()
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(Scenario::classify(true, true, true), Scenario::AgentsAndSkills);
        assert_eq!(Scenario::classify(true, false, false), Scenario::AgentsOnly);
        assert_eq!(Scenario::classify(false, true, true), Scenario::SkillsOnly);
        assert_eq!(Scenario::classify(false, false, true), Scenario::ShortNoMatch);
        assert_eq!(Scenario::classify(false, false, false), Scenario::LongNoMatch);
    }

    #[test]
    fn test_agents_outrank_short_prompt() {
        let result = result_with(1, 0, 3);
        assert_eq!(
            Scenario::from_match(&result, DEFAULT_SHORT_THRESHOLD),
            Scenario::AgentsOnly
        );
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert_eq!(
            Scenario::from_match(&result_with(0, 0, 4), 5),
            Scenario::ShortNoMatch
        );
        assert_eq!(
            Scenario::from_match(&result_with(0, 0, 5), 5),
            Scenario::LongNoMatch
        );
        assert_eq!(
            Scenario::from_match(&result_with(0, 0, 5), 10),
            Scenario::ShortNoMatch
        );
    }

    #[test]
    fn test_template_keys() {
        let keys: Vec<&str> = Scenario::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "short_no_match",
                "agents_only",
                "agents_and_skills",
                "skills_only",
                "long_no_match"
            ]
        );
        assert_eq!(Scenario::SkillsOnly.project_key(), "project_skills_only");
    }
}
