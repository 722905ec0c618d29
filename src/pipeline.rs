//! Lexer → parser → validator pipeline
//!
//! [`Pipeline`] composes the three stages and always returns a program
//! together with its diagnostics. The stages fail fast in order:
//!
//! 1. Any lexical error stops the pipeline: an empty program and the lexer's
//!    errors are returned.
//! 2. Any syntax error skips validation: the partial program and the parser's
//!    errors are returned.
//! 3. Otherwise the validator runs and its findings are returned.
//!
//! An empty error list is the only success signal.

use crate::errors::{ErrorKind, ParseError, DEFAULT_CONTEXT_RADIUS};
use crate::parser::ast::Program;
use crate::parser::lexer::Lexer;
use crate::parser::parse::{Parser, DEFAULT_MAX_NESTING_DEPTH};
use crate::validator::Validator;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunables for a [`Pipeline`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Deepest allowed nesting of blocks, groupings, literals, unary operators
    /// and binary operator chains. Trees accepted above the default may be too
    /// deep for [`Program::from_json`] to read back.
    pub max_nesting_depth: usize,
    /// Characters shown either side of an error in its context window
    pub context_radius: usize,
    /// Run the semantic pass after a clean parse
    pub validate: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            context_radius: DEFAULT_CONTEXT_RADIUS,
            validate: true,
        }
    }
}

impl PipelineConfig {
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_context_radius(mut self, radius: usize) -> Self {
        self.context_radius = radius;
        self
    }

    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }
}

/// Front end for DTSL sources.
///
/// Holds only configuration; every call builds a fresh lexer, parser and
/// validator, so one pipeline can be shared freely between threads.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Lex, parse and validate `source`.
    pub fn parse(&self, source: &str) -> (Program, Vec<ParseError>) {
        let (tokens, lex_errors) = Lexer::new(source)
            .with_context_radius(self.config.context_radius)
            .tokenize();
        debug!("lexed {} tokens, {} lexical errors", tokens.len(), lex_errors.len());

        if !lex_errors.is_empty() {
            debug!("skipping parse and validation after lexical errors");
            return (Program::new(), lex_errors);
        }

        let (program, parse_errors) = Parser::new(tokens, source)
            .with_max_depth(self.config.max_nesting_depth)
            .with_context_radius(self.config.context_radius)
            .parse_program();
        debug!(
            "parsed {} declarations, {} syntax errors",
            program.declarations.len(),
            parse_errors.len()
        );

        if !parse_errors.is_empty() || !self.config.validate {
            return (program, parse_errors);
        }

        let semantic_errors = Validator::new().validate(&program);
        (program, semantic_errors)
    }

    /// Read `path` and run [`Pipeline::parse`] on its contents.
    ///
    /// A read failure is reported as a single [`ErrorKind::Io`] error with an
    /// empty program.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> (Program, Vec<ParseError>) {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(source) => {
                debug!("parsing {}", path.display());
                self.parse(&source)
            }
            Err(err) => {
                warn!("failed to read {}: {}", path.display(), err);
                let error = ParseError::new(
                    ErrorKind::Io,
                    format!("Failed to read file '{}': {}", path.display(), err),
                    0,
                    0,
                    path.display().to_string(),
                );
                (Program::new(), vec![error])
            }
        }
    }
}

/// Parse `source` with the default configuration.
pub fn parse(source: &str) -> (Program, Vec<ParseError>) {
    Pipeline::default().parse(source)
}

/// Parse the file at `path` with the default configuration.
pub fn parse_file(path: impl AsRef<Path>) -> (Program, Vec<ParseError>) {
    Pipeline::default().parse_file(path)
}
