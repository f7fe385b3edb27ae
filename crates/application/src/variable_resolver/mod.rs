//! Variable resolution module
//!
//! Two token syntaxes are expanded at different pipeline stages:
//! - `{!name}` immediate tokens, resolved before the pre-request script
//! - `{$name}` deferred tokens, resolved after the pre-request script
//!
//! # Usage
//!
//! ```
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! use chrono::{DateTime, Utc};
//! use relay_application::ports::Clock;
//! use relay_application::variable_resolver::{StandardVariables, VariableResolver, VariableSyntax};
//! use relay_domain::ScriptContext;
//!
//! struct Now;
//! impl Clock for Now {
//!     fn now(&self) -> DateTime<Utc> {
//!         Utc::now()
//!     }
//! }
//!
//! let mut environment = BTreeMap::new();
//! environment.insert("host".to_string(), "localhost".to_string());
//! let mut context = ScriptContext::new(environment);
//!
//! let resolver = VariableResolver::new(Arc::new(StandardVariables::from_os_rng(Arc::new(Now))));
//! let url = resolver.resolve(VariableSyntax::Deferred, "http://{$host}/api", &mut context);
//! assert_eq!(url, "http://localhost/api");
//! ```

pub mod builtins;
pub mod engine;
pub mod parser;

pub use builtins::{StandardVariableInfo, StandardVariables};
pub use engine::{VariableResolver, unresolved_placeholder};
pub use parser::{VariableReference, VariableSyntax, extract_variable_names, has_variables, parse_variables};
