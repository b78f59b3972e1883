//! UserPromptSubmit hook envelope.
//!
//! # Input (via stdin)
//! JSON with fields: prompt, cwd. Other fields are ignored. A missing or
//! non-string field reads as empty; unparseable input is an empty prompt.
//!
//! # Output (via stdout)
//! `{"hookSpecificOutput": {"hookEventName": "UserPromptSubmit", "additionalContext": "..."}}`
//! where `additionalContext` is omitted when no usable global rules exist.

use serde::Serialize;
use serde_json::Value;
use std::io::{self, Read, Write};
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::RouterConfig;
use crate::error::{Result, RouterError};
use crate::matcher::count_words;
use crate::router::route;
use crate::store::{load_global_rules, load_project_rules};
use crate::validate::{has_required_shape, validate_structure};

/// Event name echoed back to the hook runner
pub const HOOK_EVENT_NAME: &str = "UserPromptSubmit";

// ============================================================================
// Input / Output Types
// ============================================================================

/// Input payload from the UserPromptSubmit hook
#[derive(Debug, Default, PartialEq)]
pub struct HookInput {
    /// The user's prompt text
    pub prompt: String,

    /// Current working directory (project root)
    pub cwd: String,
}

impl HookInput {
    /// Read each field on its own; a missing or non-string field is empty
    pub fn from_value(value: &Value) -> Self {
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            prompt: field("prompt"),
            cwd: field("cwd"),
        }
    }
}

/// Output payload for the hook
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    pub hook_specific_output: HookSpecificOutput,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: String,

    /// Routing hint injected into the conversation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

impl HookOutput {
    /// Response without a hint
    pub fn empty() -> Self {
        Self {
            hook_specific_output: HookSpecificOutput {
                hook_event_name: HOOK_EVENT_NAME.to_string(),
                additional_context: None,
            },
        }
    }

    pub fn with_context(hint: String) -> Self {
        Self {
            hook_specific_output: HookSpecificOutput {
                hook_event_name: HOOK_EVENT_NAME.to_string(),
                additional_context: Some(hint),
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(RouterError::OutputSerialize)
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Parse the hook payload. Blank input is an empty prompt.
pub fn parse_input(raw: &str) -> Result<HookInput> {
    if raw.trim().is_empty() {
        return Ok(HookInput::default());
    }
    let value: Value = serde_json::from_str(raw)?;
    Ok(HookInput::from_value(&value))
}

/// Read stdin; malformed JSON degrades to an empty prompt
pub fn read_input() -> Result<HookInput> {
    let mut raw = String::new();
    io::stdin()
        .read_to_string(&mut raw)
        .map_err(RouterError::StdinRead)?;

    debug!("Received input: {} bytes", raw.len());

    Ok(parse_input(&raw).unwrap_or_else(|e| {
        debug!("{}, treating as empty prompt", e);
        HookInput::default()
    }))
}

/// Load rules and route one prompt.
///
/// Fails only when no usable global catalog exists.
pub fn process(input: &HookInput, config: &RouterConfig) -> Result<HookOutput> {
    let global = load_global_rules(&input.cwd, config.rules_path.as_deref())?;
    if !has_required_shape(&global.raw) {
        return Err(RouterError::MissingRequiredKeys(global.path));
    }
    debug!("Loaded global rules from {:?}", global.path);

    if config.strict_validation {
        let (valid, errors) = validate_structure(&global.raw);
        if !valid {
            for err in &errors {
                warn!("Rules validation warning: {}", err);
            }
        }
    }

    let project = if input.prompt.is_empty() {
        None
    } else {
        load_project_rules(&input.cwd)
    };

    let routing = route(&input.prompt, &global.rules, project.as_ref(), config);
    Ok(HookOutput::with_context(routing.hint))
}

/// Full hook run: stdin to stdout
pub fn run(config: &RouterConfig) -> Result<()> {
    let start = Instant::now();

    let input = read_input()?;
    debug!(
        "Received prompt ({} chars, {} words), cwd: {}",
        input.prompt.chars().count(),
        count_words(&input.prompt),
        input.cwd
    );

    let output = process(&input, config).unwrap_or_else(|e| {
        warn!("{}, returning no context", e);
        HookOutput::empty()
    });
    write_output(&output)?;

    debug!(
        "Router completed in {:.1}ms",
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}

/// Write one JSON line to stdout
pub fn write_output(output: &HookOutput) -> Result<()> {
    let json = output.to_json()?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json).map_err(RouterError::OutputWrite)?;
    stdout.flush().map_err(RouterError::OutputWrite)
}

/// Last-resort empty response. Write failures are ignored so a closed
/// stdout cannot turn a handled error into a crash.
pub fn write_empty_output<W: Write>(out: &mut W) {
    let json = HookOutput::empty().to_json().unwrap_or_default();
    let _ = writeln!(out, "{}", json);
    let _ = out.flush();
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        let input = parse_input(
            r#"{"prompt": "add an endpoint", "cwd": "/work", "sessionId": "abc", "permissionMode": "ask"}"#,
        )
        .unwrap();
        assert_eq!(input.prompt, "add an endpoint");
        assert_eq!(input.cwd, "/work");
    }

    #[test]
    fn test_parse_blank_input() {
        let input = parse_input("  \n").unwrap();
        assert!(input.prompt.is_empty());
        assert!(input.cwd.is_empty());
    }

    #[test]
    fn test_bad_field_keeps_the_other() {
        let input = parse_input(r#"{"prompt": "add an api endpoint", "cwd": null}"#).unwrap();
        assert_eq!(input.prompt, "add an api endpoint");
        assert!(input.cwd.is_empty());

        let input = parse_input(r#"{"prompt": 42, "cwd": "/work"}"#).unwrap();
        assert!(input.prompt.is_empty());
        assert_eq!(input.cwd, "/work");
    }

    #[test]
    fn test_non_object_input_is_empty() {
        assert_eq!(parse_input("[1, 2, 3]").unwrap(), HookInput::default());
    }

    #[test]
    fn test_parse_invalid_input() {
        assert!(matches!(
            parse_input("{ not json"),
            Err(RouterError::InputParse(_))
        ));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn test_fallback_output_survives_closed_stdout() {
        write_empty_output(&mut ClosedPipe);

        let mut buf = Vec::new();
        write_empty_output(&mut buf);
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "{\"hookSpecificOutput\":{\"hookEventName\":\"UserPromptSubmit\"}}\n"
        );
    }

    #[test]
    fn test_empty_output_omits_context() {
        let json = HookOutput::empty().to_json().unwrap();
        assert_eq!(json, r#"{"hookSpecificOutput":{"hookEventName":"UserPromptSubmit"}}"#);
    }

    #[test]
    fn test_output_with_context() {
        let json = HookOutput::with_context("Use pytest-runner".to_string())
            .to_json()
            .unwrap();
        assert_eq!(
            json,
            r#"{"hookSpecificOutput":{"hookEventName":"UserPromptSubmit","additionalContext":"Use pytest-runner"}}"#
        );
    }
}
