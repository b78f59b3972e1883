//! Agent Router - keyword routing hints for subagent orchestration
//!
//! Matches a user prompt against a mergeable rule catalog and tells the
//! orchestrating agent which specialized subagent(s) and/or skill(s) to
//! delegate to:
//! - Global catalog: agent categories, skills, injection templates
//! - Project catalog: extra triggers, skills, skill mappings, custom agents
//! - Whole-word trigger matching plus double-weight regex patterns
//! - Five routing scenarios, each rendered from a configurable template
//!
//! # Pipeline
//! store -> merge -> validate -> matcher -> scenario -> render
//!
//! # Performance
//! - Regexes are compiled once per invocation
//! - O(n*k) matching where n=categories+skills, k=triggers per entry

pub mod config;
pub mod error;
pub mod hook;
pub mod logging;
pub mod matcher;
pub mod merge;
pub mod render;
pub mod router;
pub mod scenario;
pub mod store;
pub mod validate;

pub use config::RouterConfig;
pub use error::RouterError;
pub use matcher::{analyze, MatchResult, Matcher};
pub use merge::{merge, MergeDiagnostic, MergeOutcome};
pub use router::{route, Routing};
pub use scenario::Scenario;
pub use store::{ProjectRules, RuleSet};
