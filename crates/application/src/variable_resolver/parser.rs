//! Token parser for `{!name}` and `{$name}` syntax
//!
//! Each syntax has its own matcher; scanning for one never reports tokens
//! of the other.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static IMMEDIATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{!(\w+)\}").expect("valid regex"));

#[allow(clippy::expect_used)]
static DEFERRED_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\$(\w+)\}").expect("valid regex"));

/// The two token syntaxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableSyntax {
    /// `{!name}`: expanded before the pre-request script runs.
    Immediate,
    /// `{$name}`: expanded after the pre-request script runs.
    Deferred,
}

impl VariableSyntax {
    /// The compiled matcher. Capture group 1 is the token name.
    #[must_use]
    pub fn pattern(self) -> &'static Regex {
        match self {
            Self::Immediate => &IMMEDIATE_PATTERN,
            Self::Deferred => &DEFERRED_PATTERN,
        }
    }

    /// Formats a token of this syntax.
    #[must_use]
    pub fn token(self, name: &str) -> String {
        match self {
            Self::Immediate => format!("{{!{name}}}"),
            Self::Deferred => format!("{{${name}}}"),
        }
    }
}

/// A token found in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableReference {
    /// The token name as written.
    pub name: String,

    /// Byte range of the whole token in the original string.
    pub span: Range<usize>,
}

/// Extracts every token of `syntax` with its position.
///
/// # Examples
///
/// ```
/// use relay_application::variable_resolver::{VariableSyntax, parse_variables};
///
/// let refs = parse_variables(VariableSyntax::Immediate, "id={!guid}&user={$user}");
/// assert_eq!(refs.len(), 1);
/// assert_eq!(refs[0].name, "guid");
/// assert_eq!(refs[0].span, 3..10);
/// ```
#[must_use]
pub fn parse_variables(syntax: VariableSyntax, input: &str) -> Vec<VariableReference> {
    syntax
        .pattern()
        .captures_iter(input)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some(VariableReference {
                name: name.as_str().to_string(),
                span: whole.range(),
            })
        })
        .collect()
}

/// Extracts token names of `syntax` in order of appearance.
#[must_use]
pub fn extract_variable_names(syntax: VariableSyntax, input: &str) -> Vec<String> {
    parse_variables(syntax, input)
        .into_iter()
        .map(|r| r.name)
        .collect()
}

/// Returns true if `input` contains at least one token of `syntax`.
#[must_use]
pub fn has_variables(syntax: VariableSyntax, input: &str) -> bool {
    syntax.pattern().is_match(input)
}
