//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure:
//! token helpers, the nesting guard, and the declaration loop with its error
//! recovery.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `declarations`: twin, swarm, event, action, rule and import declarations
//! - `statements`: statements inside action bodies and rule `then` blocks
//! - `expressions`: expressions with precedence climbing
//!
//! # Error Recovery
//!
//! Every grammar function returns `Result<_, ParseError>` and bails out with
//! `?` on the first missing token. The declaration loop records the error and
//! calls [`Parser::synchronize`], which skips ahead to a `;` or a declaration
//! keyword. A declaration is therefore either complete or absent from the
//! program, never half-filled.

use crate::errors::{ErrorKind, ParseError, SourceText, DEFAULT_CONTEXT_RADIUS};
use crate::parser::ast::*;
use crate::parser::lexer::{Token, TokenKind};
use log::{trace, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Default limit on nested blocks, groupings, literals, unary chains and
/// binary operator chains.
///
/// A nesting level adds at most three levels to the JSON form of the tree, so
/// every program accepted under this limit reads back through
/// [`Program::from_json`] within serde_json's recursion limit of 128.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 32;

/// Keywords at which synchronisation stops.
const DECLARATION_KEYWORDS: &[&str] = &["twin", "swarm", "event", "action", "rule", "import"];

/// Recursive descent parser for DTSL
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    source: SourceText,
    errors: Vec<ParseError>,
    depth: usize,
    max_depth: usize,
    context_radius: usize,
    /// Token index at which `parse_declaration` panics
    #[cfg(test)]
    pub(crate) panic_at: Option<usize>,
}

impl Parser {
    /// Create a parser over `tokens`. `source` is only used to build context
    /// windows for error messages.
    pub fn new(mut tokens: Vec<Token>, source: &str) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let (line, column) = tokens.last().map(|t| (t.line, t.column)).unwrap_or((1, 1));
            tokens.push(Token::new(TokenKind::Eof, "", line, column));
        }
        Self {
            tokens,
            position: 0,
            source: SourceText::new(source),
            errors: Vec::new(),
            depth: 0,
            max_depth: DEFAULT_MAX_NESTING_DEPTH,
            context_radius: DEFAULT_CONTEXT_RADIUS,
            #[cfg(test)]
            panic_at: None,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_context_radius(mut self, radius: usize) -> Self {
        self.context_radius = radius;
        self
    }

    /// Parse the entire program (top-level declarations).
    ///
    /// Never fails: each broken declaration contributes an error and is
    /// skipped, and the remaining declarations are still parsed.
    pub fn parse_program(mut self) -> (Program, Vec<ParseError>) {
        let mut program = Program::new();

        while !self.is_at_end() {
            self.depth = 0;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.parse_declaration()));

            match outcome {
                Ok(Ok(declaration)) => program.declarations.push(declaration),
                Ok(Err(err)) => {
                    self.errors.push(err);
                    self.synchronize();
                }
                Err(payload) => {
                    let message = format!("Internal parser error: {}", panic_message(payload.as_ref()));
                    warn!("{} at {}:{}", message, self.peek().line, self.peek().column);
                    let err = self.error_here(ErrorKind::Internal, message);
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }

        (program, self.errors)
    }

    /// Skip tokens until a safe declaration boundary: just past a `;`, or at
    /// a declaration keyword. Always consumes at least one token.
    pub(crate) fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().is(TokenKind::Punctuation, ";") {
                trace!("resynchronised after ';' at {}", self.previous().location().line);
                return;
            }
            let current = self.peek();
            if current.kind == TokenKind::Keyword
                && DECLARATION_KEYWORDS.contains(&current.value.as_str())
            {
                trace!("resynchronised at '{}' on line {}", current.value, current.line);
                return;
            }
            self.advance();
        }
    }

    /// Run `parse` one nesting level deeper, failing once the configured
    /// depth limit is reached.
    pub(crate) fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.deepen()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Take one level of the nesting budget. The caller gives it back.
    pub(crate) fn deepen(&mut self) -> Result<(), ParseError> {
        if self.depth >= self.max_depth {
            return Err(self.error_here(
                ErrorKind::NestingTooDeep,
                format!("Maximum nesting depth of {} exceeded", self.max_depth),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn restore_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    // ===== Helper methods =====

    pub(crate) fn error_here(&self, kind: ErrorKind, message: impl Into<String>) -> ParseError {
        self.error_at(kind, message, self.current_location())
    }

    pub(crate) fn error_at(
        &self,
        kind: ErrorKind,
        message: impl Into<String>,
        location: SourceLocation,
    ) -> ParseError {
        let context = self.source.context_at(location, self.context_radius);
        ParseError::at(kind, message, location, context)
    }

    pub(crate) fn syntax_error(&self, message: impl Into<String>) -> ParseError {
        self.error_here(ErrorKind::Syntax, message)
    }

    pub(crate) fn check(&self, kind: TokenKind, value: &str) -> bool {
        self.peek().is(kind, value)
    }

    pub(crate) fn check_kind(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub(crate) fn check_punct(&self, value: &str) -> bool {
        self.check(TokenKind::Punctuation, value)
    }

    pub(crate) fn match_token(&mut self, kind: TokenKind, value: &str) -> bool {
        if self.check(kind, value) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn match_punct(&mut self, value: &str) -> bool {
        self.match_token(TokenKind::Punctuation, value)
    }

    pub(crate) fn match_keyword(&mut self, value: &str) -> bool {
        self.match_token(TokenKind::Keyword, value)
    }

    pub(crate) fn match_operator(&mut self, value: &str) -> bool {
        self.match_token(TokenKind::Operator, value)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location()
    }

    pub(crate) fn expect_token(
        &mut self,
        kind: TokenKind,
        value: &str,
        message: &str,
    ) -> Result<(), ParseError> {
        if self.check(kind, value) {
            self.advance();
            Ok(())
        } else {
            Err(self.syntax_error(format!("{}, found {}", message, self.peek())))
        }
    }

    pub(crate) fn expect_punct(&mut self, value: &str, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            TokenKind::Punctuation,
            value,
            &format!("Expected '{value}' {ctx}"),
        )
    }

    pub(crate) fn expect_keyword(&mut self, value: &str, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            TokenKind::Keyword,
            value,
            &format!("Expected '{value}' {ctx}"),
        )
    }

    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_punct(";", ctx)
    }

    pub(crate) fn expect_identifier(&mut self, ctx: &str) -> Result<String, ParseError> {
        if self.check_kind(TokenKind::Identifier) {
            Ok(self.advance().value.clone())
        } else {
            Err(self.syntax_error(format!(
                "Expected identifier {}, found {}",
                ctx,
                self.peek()
            )))
        }
    }

    pub(crate) fn expect_string(&mut self, ctx: &str) -> Result<String, ParseError> {
        if self.check_kind(TokenKind::String) {
            Ok(strip_quotes(&self.advance().value).to_string())
        } else {
            Err(self.syntax_error(format!("Expected string {}, found {}", ctx, self.peek())))
        }
    }
}

/// Remove exactly one pair of surrounding quotes from a string token.
pub(crate) fn strip_quotes(text: &str) -> &str {
    let mut chars = text.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open), Some(close)) if open == close && (open == '"' || open == '\'') => {
            &text[1..text.len() - 1]
        }
        _ => text,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::Lexer;

    fn parse(source: &str) -> (Program, Vec<ParseError>) {
        let (tokens, lex_errors) = Lexer::new(source).tokenize();
        assert!(lex_errors.is_empty(), "unexpected lex errors: {:?}", lex_errors);
        Parser::new(tokens, source).parse_program()
    }

    #[test]
    fn test_empty_program() {
        let (program, errors) = parse("");
        assert!(program.declarations.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_parse_simple_twin() {
        let (program, errors) = parse("twin Pump { property rpm: int; }");
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(program.declarations.len(), 1);
        match &program.declarations[0] {
            Declaration::Twin(twin) => {
                assert_eq!(twin.name, "Pump");
                assert_eq!(twin.properties.len(), 1);
                assert_eq!(twin.location, SourceLocation::new(1, 1));
            }
            _ => panic!("Expected twin declaration"),
        }
    }

    #[test]
    fn test_recovery_after_missing_brace() {
        let (program, errors) = parse("twin Broken ; twin Good { property x: int; }");

        assert_eq!(program.declarations.len(), 1);
        assert_eq!(program.declarations[0].name(), "Good");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Syntax);
        assert_eq!((errors[0].line, errors[0].column), (1, 13));
        assert!(errors[0].message.starts_with("Expected '{' after twin name"));
    }

    #[test]
    fn test_recovery_stops_at_declaration_keyword() {
        let (program, errors) = parse("rule R { when x > } event Ready;");

        assert_eq!(errors.len(), 1);
        assert_eq!(program.declarations.len(), 1);
        assert!(matches!(program.declarations[0], Declaration::Event(_)));
    }

    #[test]
    fn test_stray_tokens_are_reported_and_skipped() {
        let (program, errors) = parse("} ) event A; 42 event B;");

        assert_eq!(program.declarations.len(), 2);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.starts_with("Expected declaration"));
    }

    #[test]
    fn test_error_context_points_at_token() {
        let (_, errors) = parse("import lib from 42;");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].context, "import lib from 42;\n                ^");
    }

    #[test]
    fn test_nesting_limit() {
        let source = format!("rule Deep {{ when {}x{}; then {{ }} }}", "(".repeat(20), ")".repeat(20));
        let (tokens, _) = Lexer::new(&source).tokenize();
        let (program, errors) = Parser::new(tokens, &source).with_max_depth(10).parse_program();

        assert!(program.declarations.is_empty());
        assert!(errors.iter().any(|e| e.kind == ErrorKind::NestingTooDeep));
    }

    #[test]
    fn test_nesting_within_limit() {
        let source = format!("rule Deep {{ when {}x{}; then {{ }} }}", "(".repeat(20), ")".repeat(20));
        let (tokens, _) = Lexer::new(&source).tokenize();
        let (program, errors) = Parser::new(tokens, &source).with_max_depth(64).parse_program();

        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(program.declarations.len(), 1);
    }

    #[test]
    fn test_panic_becomes_internal_error() {
        let source = "event A; event Boom; event C;";
        let (tokens, _) = Lexer::new(source).tokenize();
        let mut parser = Parser::new(tokens, source);
        // Token 3 is the `event` keyword that starts `Boom`
        parser.panic_at = Some(3);
        let (program, errors) = parser.parse_program();

        let names: Vec<&str> = program.declarations.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Internal);
        assert_eq!(errors[0].message, "Internal parser error: forced failure");
        assert_eq!((errors[0].line, errors[0].column), (1, 10));
    }

    #[test]
    fn test_missing_eof_is_appended() {
        let tokens = vec![Token::new(TokenKind::Keyword, "event", 1, 1)];
        let (program, errors) = Parser::new(tokens, "event").parse_program();
        assert!(program.declarations.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_strip_quotes_once() {
        assert_eq!(strip_quotes("\"abc\""), "abc");
        assert_eq!(strip_quotes("'abc'"), "abc");
        assert_eq!(strip_quotes("\"\"inner\"\""), "\"inner\"");
        assert_eq!(strip_quotes("\""), "\"");
    }
}
