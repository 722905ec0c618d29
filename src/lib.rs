//! # Introduction
//!
//! Front end for DTSL, a small declarative language that describes digital
//! twins (stateful models of physical devices), the swarms that group them,
//! and the event/action/rule logic that drives them.  The crate turns source
//! text into a typed AST plus a list of positioned diagnostics; nothing is
//! executed.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Validator
//! ```
//!
//! 1. [`parser::lexer`] turns source text into tokens, recovering from bad
//!    characters one at a time.
//! 2. [`parser`] builds a [`Program`] by recursive descent, resynchronising
//!    at `;` and declaration keywords after a syntax error.
//! 3. [`validator`] checks required fields on the finished tree.
//! 4. [`pipeline`] composes the stages and fails fast between them.
//!
//! ## Quick start
//!
//! ```
//! let (program, errors) = dtsl::parse("twin Pump { property speed: number = 0; }");
//! assert!(errors.is_empty());
//! assert_eq!(program.declarations[0].name(), "Pump");
//! ```

pub mod errors;
pub mod parser;
pub mod pipeline;
pub mod validator;

pub use errors::{ErrorKind, ParseError};
pub use parser::ast::Program;
pub use pipeline::{parse, parse_file, Pipeline, PipelineConfig};
pub use validator::{validate, validate_json};
