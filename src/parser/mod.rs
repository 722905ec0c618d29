//! DTSL source code parser
//!
//! This module transforms DTSL source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parse`]: Parsing (tokens → AST) with per-declaration error recovery
//! - [`ast`]: AST node definitions
//!
//! # Language
//!
//! Top-level declarations:
//! - `twin`: an entity type with properties, sensors, actuators and states
//! - `swarm`: a collection of twin instances plus governing rules
//! - `event` / `action`: named signals and parameterised procedures
//! - `rule`: a `when` condition and a `then` block of statements
//! - `import`: a reference to another module (not resolved here)
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for binary
//! operators. A failed declaration is recorded and skipped; parsing resumes
//! at the next `;` or declaration keyword.

pub mod ast;
mod declarations;
mod expressions;
pub mod lexer;
pub mod parse;
mod statements;

pub use parse::Parser;
