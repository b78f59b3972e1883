//! Rule catalog types and loading.
//!
//! A global catalog defines the base agent and skill catalog. An optional
//! project catalog (`{cwd}/.claude/router-rules.json`) extends it and is
//! merged in by [`crate::merge`]. Both are loaded fresh for every prompt.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, RouterError};

// ============================================================================
// Constants
// ============================================================================

/// Global catalog file name
pub const GLOBAL_RULES_FILENAME: &str = "router-rules.json";

/// Global catalog vendored into a project
pub const VENDORED_GLOBAL_RULES_PATH: &str = ".claude/lib/router-rules.json";

/// Project catalog, relative to the working directory
pub const PROJECT_RULES_PATH: &str = ".claude/router-rules.json";

/// Top-level keys every global catalog must carry
pub const REQUIRED_KEYS: [&str; 3] = ["agent_categories", "skills", "injection_templates"];

// ============================================================================
// Ordered map
// ============================================================================

/// Name-keyed collection that keeps declaration order.
///
/// Catalogs are small (tens of entries), so lookups are linear scans.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for OrderedMap<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> OrderedMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Insert or replace. A replaced entry keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, value: T) -> Option<T> {
        let name = name.into();
        match self.get_mut(&name) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<T> FromIterator<(String, T)> for OrderedMap<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

// ============================================================================
// Catalog Types
// ============================================================================

// Catalog fields are read leniently: a value of the wrong type becomes the
// field's default instead of discarding the whole entry.

/// A subagent that can be delegated to
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AgentDescriptor {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,

    /// One-line description shown in the hint
    #[serde(default, deserialize_with = "lenient_string")]
    pub purpose: String,

    /// Tool capabilities (informational only)
    #[serde(default, deserialize_with = "lenient_strings")]
    pub tools: Vec<String>,
}

/// A group of triggers mapped to candidate agents
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CategoryRules {
    #[serde(default, deserialize_with = "lenient_strings")]
    pub triggers: Vec<String>,

    #[serde(default, deserialize_with = "lenient_agents")]
    pub agents: Vec<AgentDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SkillRules {
    /// Literal keywords, matched as whole words
    #[serde(default, deserialize_with = "lenient_strings")]
    pub triggers: Vec<String>,

    /// Regular expressions, worth double a trigger
    #[serde(default, deserialize_with = "lenient_strings")]
    pub patterns: Vec<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub purpose: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TemplateConfig {
    #[serde(default, deserialize_with = "lenient_template")]
    pub template: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_template<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// String elements of an array; other elements are dropped
fn lenient_strings<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Object elements of an array; anything else is dropped on its own
fn lenient_agents<'de, D>(deserializer: D) -> std::result::Result<Vec<AgentDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| AgentDescriptor::deserialize(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// The rule catalog the matcher and renderer work from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    pub agent_categories: OrderedMap<CategoryRules>,
    pub skills: OrderedMap<SkillRules>,
    pub injection_templates: OrderedMap<TemplateConfig>,
}

impl RuleSet {
    /// Build a typed catalog from a parsed JSON document.
    ///
    /// Entries that are not objects are skipped; the structural validator
    /// is responsible for reporting them.
    pub fn from_value(doc: &Value) -> Self {
        Self {
            agent_categories: typed_section(doc, "agent_categories"),
            skills: typed_section(doc, "skills"),
            injection_templates: typed_section(doc, "injection_templates"),
        }
    }

    /// Template string configured for a scenario key, if any
    pub fn template(&self, key: &str) -> Option<&str> {
        self.injection_templates
            .get(key)
            .and_then(|t| t.template.as_deref())
    }
}

fn typed_section<T>(doc: &Value, section: &str) -> OrderedMap<T>
where
    T: for<'de> Deserialize<'de>,
{
    let Some(entries) = doc.get(section).and_then(Value::as_object) else {
        return OrderedMap::new();
    };

    entries
        .iter()
        .filter(|(_, raw)| raw.is_object())
        .filter_map(|(name, raw)| match T::deserialize(raw) {
            Ok(entry) => Some((name.clone(), entry)),
            Err(e) => {
                debug!("Skipping {}.{}: {}", section, name, e);
                None
            }
        })
        .collect()
}

/// Project-level overrides, merged into the global catalog.
///
/// Sections stay raw so the merger can skip malformed sections and entries
/// one at a time.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProjectRules {
    /// context name -> list of skill names considered project-owned
    #[serde(default)]
    pub project_context: Option<Value>,

    /// category name -> extra triggers
    #[serde(default)]
    pub triggers: Option<Value>,

    /// skill name -> SkillRules (new skills or trigger extensions)
    #[serde(default)]
    pub skills: Option<Value>,

    /// keyword -> list of skill names
    #[serde(default)]
    pub skill_mappings: Option<Value>,

    /// agent name -> { description, tools, triggers }
    #[serde(default)]
    pub custom_agents: Option<Value>,
}

impl ProjectRules {
    pub fn from_value(doc: Value) -> Option<Self> {
        if !doc.is_object() {
            warn!("Ignoring project rules: top level is not a JSON object");
            return None;
        }
        match serde_json::from_value(doc) {
            Ok(rules) => Some(rules),
            Err(e) => {
                warn!("Ignoring project rules: {}", e);
                None
            }
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// A global catalog as read from disk
#[derive(Debug, Clone)]
pub struct GlobalRules {
    pub path: PathBuf,
    /// The document as parsed, for structural validation
    pub raw: Value,
    pub rules: RuleSet,
}

/// Read and parse a catalog file
pub fn load_rules_file(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| RouterError::RulesRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| RouterError::RulesParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Default location relative to the running binary: `<exe dir>/../lib/`
pub fn default_rules_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?;
    Some(dir.join("..").join("lib").join(GLOBAL_RULES_FILENAME))
}

/// User-level fallback: `~/.claude/lib/router-rules.json`
pub fn user_rules_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".claude").join("lib").join(GLOBAL_RULES_FILENAME))
}

/// Global catalog locations, highest precedence first
pub fn global_rules_candidates(cwd: &str, override_path: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = override_path {
        candidates.push(path.to_path_buf());
    }
    if !cwd.is_empty() {
        candidates.push(Path::new(cwd).join(VENDORED_GLOBAL_RULES_PATH));
    }
    candidates.extend(default_rules_path());
    candidates.extend(user_rules_path());

    candidates
}

/// First candidate that exists as a file
pub fn find_global_rules_path(cwd: &str, override_path: Option<&Path>) -> Result<PathBuf> {
    let candidates = global_rules_candidates(cwd, override_path);
    for path in &candidates {
        if path.is_file() {
            return Ok(path.clone());
        }
        debug!("No global rules at {:?}", path);
    }
    Err(RouterError::RulesNotFound {
        searched: candidates.len(),
    })
}

/// Locate and parse the global catalog.
///
/// Shape is not checked here; see [`crate::validate::has_required_shape`].
pub fn load_global_rules(cwd: &str, override_path: Option<&Path>) -> Result<GlobalRules> {
    let path = find_global_rules_path(cwd, override_path)?;
    let raw = load_rules_file(&path)?;
    let rules = RuleSet::from_value(&raw);
    Ok(GlobalRules { path, raw, rules })
}

/// Load `{cwd}/.claude/router-rules.json` if present.
///
/// A missing or unreadable project catalog is not an error.
pub fn load_project_rules(cwd: &str) -> Option<ProjectRules> {
    if cwd.is_empty() {
        return None;
    }

    let path = Path::new(cwd).join(PROJECT_RULES_PATH);
    if !path.is_file() {
        return None;
    }

    match load_rules_file(&path) {
        Ok(doc) => {
            debug!("Found project rules at {:?}", path);
            ProjectRules::from_value(doc)
        }
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ordered_map_keeps_declaration_order() {
        let doc = json!({
            "agent_categories": {
                "zeta": { "triggers": ["z"], "agents": [] },
                "alpha": { "triggers": ["a"], "agents": [] },
                "mid": { "triggers": ["m"], "agents": [] }
            },
            "skills": {},
            "injection_templates": {}
        });

        let rules = RuleSet::from_value(&doc);
        let names: Vec<&str> = rules.agent_categories.keys().collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut map: OrderedMap<u32> = OrderedMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        assert_eq!(map.insert("a", 3), Some(1));

        let entries: Vec<(&str, &u32)> = map.iter().collect();
        assert_eq!(entries, vec![("a", &3), ("b", &2)]);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let doc = json!({
            "agent_categories": {
                "broken": "not an object",
                "backend": {
                    "triggers": ["api"],
                    "agents": [{ "name": "api-builder", "purpose": "Builds APIs" }]
                }
            },
            "skills": {
                "pytest-runner": { "triggers": ["pytest"], "purpose": "Runs tests" }
            },
            "injection_templates": {
                "agents_only": { "template": "Use {agent_list}" }
            }
        });

        let rules = RuleSet::from_value(&doc);
        assert_eq!(rules.agent_categories.len(), 1);
        assert!(rules.agent_categories.contains_key("backend"));
        assert!(rules.skills.get("pytest-runner").unwrap().patterns.is_empty());
        assert_eq!(rules.template("agents_only"), Some("Use {agent_list}"));
        assert_eq!(rules.template("skills_only"), None);
    }

    #[test]
    fn test_off_shape_fields_keep_the_entry() {
        let doc = json!({
            "agent_categories": {
                "backend": {
                    "triggers": ["api", 42, "endpoint"],
                    "agents": [
                        { "name": "api-builder", "tools": "Read, Write" },
                        { "name": null, "purpose": "Nameless" },
                        "not an agent",
                        { "name": "db-expert", "purpose": ["Database", "work"] }
                    ]
                }
            },
            "skills": {
                "pytest-runner": { "triggers": "pytest", "patterns": null, "purpose": null }
            },
            "injection_templates": {
                "agents_only": { "template": 7 }
            }
        });

        let rules = RuleSet::from_value(&doc);
        let backend = rules.agent_categories.get("backend").unwrap();
        assert_eq!(backend.triggers, vec!["api", "endpoint"]);

        let names: Vec<&str> = backend.agents.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["api-builder", "", "db-expert"]);
        assert!(backend.agents[0].tools.is_empty());
        assert_eq!(backend.agents[1].purpose, "Nameless");
        assert!(backend.agents[2].purpose.is_empty());

        let skill = rules.skills.get("pytest-runner").unwrap();
        assert!(skill.triggers.is_empty());
        assert!(skill.patterns.is_empty());
        assert!(skill.purpose.is_empty());

        assert!(rules.injection_templates.contains_key("agents_only"));
        assert_eq!(rules.template("agents_only"), None);
    }

    #[test]
    fn test_override_path_has_highest_precedence() {
        let override_path = PathBuf::from("/tmp/custom-rules.json");
        let candidates = global_rules_candidates("/work/project", Some(&override_path));

        assert_eq!(candidates[0], override_path);
        assert_eq!(
            candidates[1],
            Path::new("/work/project").join(VENDORED_GLOBAL_RULES_PATH)
        );
    }

    #[test]
    fn test_vendored_candidate_needs_cwd() {
        let candidates = global_rules_candidates("", None);
        let expected: Vec<PathBuf> = default_rules_path()
            .into_iter()
            .chain(user_rules_path())
            .collect();

        assert_eq!(candidates, expected);
        assert!(!candidates.contains(&PathBuf::from(VENDORED_GLOBAL_RULES_PATH)));
    }

    #[test]
    fn test_load_rules_file_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(GLOBAL_RULES_FILENAME);
        fs::write(&path, "{ not json").unwrap();

        match load_rules_file(&path) {
            Err(RouterError::RulesParse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_project_rules_ignore_unknown_fields() {
        let project = ProjectRules::from_value(json!({
            "version": "1.0",
            "skill_mappings": { "fixture": ["pytest-runner"] }
        }))
        .unwrap();

        assert!(project.skill_mappings.is_some());
        assert!(project.custom_agents.is_none());
    }

    #[test]
    fn test_project_rules_must_be_an_object() {
        assert!(ProjectRules::from_value(json!(["not", "rules"])).is_none());
    }

    #[test]
    fn test_missing_project_rules() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_project_rules(dir.path().to_str().unwrap()).is_none());
        assert!(load_project_rules("").is_none());
    }
}
