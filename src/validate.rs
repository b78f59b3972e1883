//! Structural validation of a global catalog.
//!
//! Works on the raw JSON document. Only a missing top-level key is fatal
//! (checked by [`has_required_shape`]); everything [`validate_structure`]
//! reports is logged as a warning and routing continues.

use serde_json::Value;

use crate::store::REQUIRED_KEYS;

/// True iff all required top-level keys are present
pub fn has_required_shape(rules: &Value) -> bool {
    REQUIRED_KEYS.iter().all(|key| rules.get(key).is_some())
}

/// Deep shape check. Returns `(valid, errors)` and never fails.
pub fn validate_structure(rules: &Value) -> (bool, Vec<String>) {
    let mut errors: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|key| rules.get(**key).is_none())
        .map(|key| format!("Missing required key: {}", key))
        .collect();

    if !errors.is_empty() {
        return (false, errors);
    }

    match rules["agent_categories"].as_object() {
        None => errors.push("agent_categories must be an object".to_string()),
        Some(categories) => {
            for (name, category) in categories {
                let Some(category) = category.as_object() else {
                    errors.push(format!("agent_categories.{} must be an object", name));
                    continue;
                };
                for field in ["triggers", "agents"] {
                    check_array(&mut errors, "agent_categories", name, category.get(field), field);
                }
            }
        }
    }

    match rules["skills"].as_object() {
        None => errors.push("skills must be an object".to_string()),
        Some(skills) => {
            for (name, skill) in skills {
                let Some(skill) = skill.as_object() else {
                    errors.push(format!("skills.{} must be an object", name));
                    continue;
                };
                let triggers = skill.get("triggers");
                check_array(&mut errors, "skills", name, triggers, "triggers");
                // patterns are optional, but must be an array when present
                if let Some(patterns) = skill.get("patterns") {
                    if !patterns.is_array() {
                        errors.push(format!("skills.{}.patterns must be an array", name));
                    }
                }
            }
        }
    }

    if !rules["injection_templates"].is_object() {
        errors.push("injection_templates must be an object".to_string());
    }

    (errors.is_empty(), errors)
}

fn check_array(
    errors: &mut Vec<String>,
    section: &str,
    name: &str,
    value: Option<&Value>,
    field: &str,
) {
    match value {
        None => errors.push(format!("{}.{} missing '{}'", section, name, field)),
        Some(v) if !v.is_array() => {
            errors.push(format!("{}.{}.{} must be an array", section, name, field))
        }
        Some(_) => {}
    }
}
