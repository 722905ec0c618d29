//! Statement parsing implementation
//!
//! This module handles parsing of the statements that make up action bodies
//! and rule `then` blocks:
//!
//! - Control flow: `if` / `else if` / `else`, `for (x in items)`
//! - Built-ins: `log(...)`, `alert(...)`, `notify(...)`
//! - Assignments: `name = expr;`
//! - Bare calls: `name(args);`
//!
//! # Grammar
//!
//! ```text
//! statement ::= if_stmt | for_stmt | log_stmt | alert_stmt | notify_stmt
//!             | assignment | call_stmt
//! if_stmt   ::= "if" "(" expr ")" block ("else" (if_stmt | block))?
//! for_stmt  ::= "for" "(" name "in" expr ")" block
//! log_stmt  ::= "log" "(" expr ("," expr)? ")" ";"
//! alert_stmt::= "alert" "(" expr ("," expr)? ")" ";"
//! notify_stmt ::= "notify" "(" expr "," expr ("," expr)? ")" ";"
//! assignment::= name "=" expr ";"
//! call_stmt ::= name "(" args ")" ";"
//! block     ::= "{" statement* "}"
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::errors::ParseError;
use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::Parser;

impl Parser {
    /// Parse a braced block of statements, one nesting level deeper
    pub(crate) fn parse_block(&mut self, ctx: &str) -> Result<Vec<Statement>, ParseError> {
        self.expect_punct("{", &format!("before {ctx}"))?;
        let statements = self.nested(|p| p.parse_block_statements())?;
        self.expect_punct("}", &format!("after {ctx}"))?;
        Ok(statements)
    }

    /// Parse block statements (inside braces, excluding the braces themselves)
    fn parse_block_statements(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();

        while !self.check_punct("}") && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        Ok(statements)
    }

    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let loc = self.current_location();

        if self.match_keyword("if") {
            return self.parse_if_statement(loc);
        }

        if self.match_keyword("for") {
            return self.parse_for_statement(loc);
        }

        if self.match_keyword("log") {
            let (message, level) = self.parse_message_call("log")?;
            return Ok(Statement::Log {
                message,
                level,
                location: loc,
            });
        }

        if self.match_keyword("alert") {
            let (message, severity) = self.parse_message_call("alert")?;
            return Ok(Statement::Alert {
                message,
                severity,
                location: loc,
            });
        }

        if self.match_keyword("notify") {
            return self.parse_notify_statement(loc);
        }

        if self.check_kind(TokenKind::Identifier) {
            // One token of lookahead separates `name(...)` from `name = ...`
            let is_call = self
                .peek_ahead(1)
                .map(|t| t.is(TokenKind::Punctuation, "("))
                .unwrap_or(false);
            let name = self.expect_identifier("at start of statement")?;

            if is_call {
                self.expect_punct("(", "after function name")?;
                let arguments = self.parse_argument_list()?;
                self.expect_punct(")", "after function arguments")?;
                self.expect_semicolon("after function call")?;
                return Ok(Statement::FunctionCall {
                    name,
                    arguments,
                    location: loc,
                });
            }

            self.expect_token(
                TokenKind::Operator,
                "=",
                "Expected '=' or '(' after identifier in statement",
            )?;
            let value = self.parse_expression()?;
            self.expect_semicolon("after assignment")?;
            return Ok(Statement::Assignment {
                target: name,
                value,
                location: loc,
            });
        }

        Err(self.syntax_error(format!("Expected statement, found {}", self.peek())))
    }

    /// Parse if statement; the `if` keyword is already consumed
    fn parse_if_statement(&mut self, loc: SourceLocation) -> Result<Statement, ParseError> {
        self.expect_punct("(", "after 'if'")?;
        let condition = self.parse_expression()?;
        self.expect_punct(")", "after if condition")?;

        let then_branch = self.parse_block("if body")?;

        let else_branch = if self.match_keyword("else") {
            let else_loc = self.current_location();
            if self.match_keyword("if") {
                let chained = self.nested(|p| p.parse_if_statement(else_loc))?;
                Some(vec![chained])
            } else {
                Some(self.parse_block("else body")?)
            }
        } else {
            None
        };

        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
            location: loc,
        })
    }

    /// Parse for statement: for (var in iterable) { body }
    fn parse_for_statement(&mut self, loc: SourceLocation) -> Result<Statement, ParseError> {
        self.expect_punct("(", "after 'for'")?;
        let variable = self.expect_identifier("as loop variable")?;
        self.expect_keyword("in", "after loop variable")?;
        let iterable = self.parse_expression()?;
        self.expect_punct(")", "after for clause")?;

        let body = self.parse_block("for body")?;

        Ok(Statement::For {
            variable,
            iterable,
            body,
            location: loc,
        })
    }

    /// Parse `(message[, extra]);` shared by `log` and `alert`
    fn parse_message_call(&mut self, name: &str) -> Result<(Expression, Option<Expression>), ParseError> {
        self.expect_punct("(", &format!("after '{name}'"))?;
        let message = self.parse_expression()?;
        let extra = if self.match_punct(",") {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect_punct(")", &format!("after {name} arguments"))?;
        self.expect_semicolon(&format!("after {name} statement"))?;
        Ok((message, extra))
    }

    /// Parse notify(target, message[, data]);
    fn parse_notify_statement(&mut self, loc: SourceLocation) -> Result<Statement, ParseError> {
        self.expect_punct("(", "after 'notify'")?;
        let target = self.parse_expression()?;
        self.expect_punct(",", "after notify target")?;
        let message = self.parse_expression()?;
        let data = if self.match_punct(",") {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect_punct(")", "after notify arguments")?;
        self.expect_semicolon("after notify statement")?;

        Ok(Statement::Notify {
            target,
            message,
            data,
            location: loc,
        })
    }
}
