//! Expression parsing implementation
//!
//! This module handles parsing of DTSL expressions using one loop per
//! precedence level, so every binary operator is left-associative.
//!
//! # Precedence (lowest to highest)
//!
//! | Level          | Operators            |
//! |----------------|----------------------|
//! | logical or     | `\|\|`               |
//! | logical and    | `&&`                 |
//! | equality       | `==` `!=`            |
//! | comparison     | `<` `>` `<=` `>=`    |
//! | additive       | `+` `-`              |
//! | multiplicative | `*` `/`              |
//! | unary          | `!` `-`              |
//! | primary        | literals, grouping, arrays, objects, names, calls, `a.b` |
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::errors::ParseError;
use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{strip_quotes, Parser};

impl Parser {
    /// Parse expression (top-level entry point)
    pub(crate) fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_logical_or()
    }

    /// Parse one left-associative precedence level: `next (op next)*`
    fn parse_binary_level(
        &mut self,
        operators: &[(&str, BinaryOperator)],
        next: fn(&mut Self) -> Result<Expression, ParseError>,
    ) -> Result<Expression, ParseError> {
        let depth = self.depth();
        let result = self.parse_binary_chain(operators, next);
        self.restore_depth(depth);
        result
    }

    /// Each applied operator puts the tree built so far one level deeper, so
    /// it takes one level of the nesting budget until the level is done.
    fn parse_binary_chain(
        &mut self,
        operators: &[(&str, BinaryOperator)],
        next: fn(&mut Self) -> Result<Expression, ParseError>,
    ) -> Result<Expression, ParseError> {
        let mut left = next(self)?;

        'outer: loop {
            for &(symbol, operator) in operators {
                if self.match_operator(symbol) {
                    self.deepen()?;
                    let right = next(self)?;
                    left = Expression::Binary {
                        operator,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            break;
        }

        Ok(left)
    }

    /// Parse logical OR (||)
    fn parse_logical_or(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_level(&[("||", BinaryOperator::Or)], Self::parse_logical_and)
    }

    /// Parse logical AND (&&)
    fn parse_logical_and(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_level(&[("&&", BinaryOperator::And)], Self::parse_equality)
    }

    /// Parse equality (== !=)
    fn parse_equality(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_level(
            &[("==", BinaryOperator::Eq), ("!=", BinaryOperator::Ne)],
            Self::parse_comparison,
        )
    }

    /// Parse comparison (< > <= >=)
    fn parse_comparison(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_level(
            &[
                ("<", BinaryOperator::Lt),
                (">", BinaryOperator::Gt),
                ("<=", BinaryOperator::Le),
                (">=", BinaryOperator::Ge),
            ],
            Self::parse_additive,
        )
    }

    /// Parse additive (+ -)
    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_level(
            &[("+", BinaryOperator::Add), ("-", BinaryOperator::Sub)],
            Self::parse_multiplicative,
        )
    }

    /// Parse multiplicative (* /)
    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_level(
            &[("*", BinaryOperator::Mul), ("/", BinaryOperator::Div)],
            Self::parse_unary,
        )
    }

    /// Parse unary (! -)
    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let operator = if self.match_operator("!") {
            UnaryOperator::Not
        } else if self.match_operator("-") {
            UnaryOperator::Neg
        } else {
            return self.parse_primary();
        };

        let operand = self.nested(|p| p.parse_unary())?;
        Ok(Expression::Unary {
            operator,
            operand: Box::new(operand),
        })
    }

    /// Parse argument list: expr, expr, ... (parentheses handled by caller)
    pub(crate) fn parse_argument_list(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut args = Vec::new();

        if self.check_punct(")") {
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);

            if !self.match_punct(",") {
                break;
            }
        }

        Ok(args)
    }

    /// Parse primary (literals, names, calls, property access, grouping,
    /// array and object literals)
    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let token = self.peek().clone();

        match token.kind {
            TokenKind::Boolean => {
                self.advance();
                let value = token.value.eq_ignore_ascii_case("true");
                return Ok(Expression::literal(LiteralValue::Boolean(value)));
            }
            TokenKind::Number => {
                let value = self.number_literal(&token.value)?;
                self.advance();
                return Ok(Expression::literal(value));
            }
            TokenKind::String => {
                self.advance();
                let value = strip_quotes(&token.value).to_string();
                return Ok(Expression::literal(LiteralValue::String(value)));
            }
            TokenKind::Keyword if token.value == "null" => {
                self.advance();
                return Ok(Expression::literal(LiteralValue::Null));
            }
            TokenKind::Identifier => {
                self.advance();
                return self.parse_name(token.value);
            }
            _ => {}
        }

        if self.match_punct("(") {
            let expression = self.nested(|p| p.parse_expression())?;
            self.expect_punct(")", "after expression")?;
            return Ok(Expression::Grouping {
                expression: Box::new(expression),
            });
        }

        if self.match_punct("[") {
            let elements = self.nested(|p| p.parse_array_elements())?;
            self.expect_punct("]", "after array elements")?;
            return Ok(Expression::ArrayLiteral { elements });
        }

        if self.match_punct("{") {
            let entries = self.nested(|p| p.parse_object_entries())?;
            self.expect_punct("}", "after object entries")?;
            return Ok(Expression::ObjectLiteral { entries });
        }

        Err(self.syntax_error(format!("Unexpected token in expression: {}", token)))
    }

    /// A literal containing `.` is a float, anything else an integer
    fn number_literal(&self, text: &str) -> Result<LiteralValue, ParseError> {
        if text.contains('.') {
            text.parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(LiteralValue::Float)
                .ok_or_else(|| self.syntax_error(format!("Invalid float literal: {}", text)))
        } else {
            text.parse::<i64>()
                .map(LiteralValue::Integer)
                .map_err(|_| self.syntax_error(format!("Invalid integer literal: {}", text)))
        }
    }

    /// Parse what follows an identifier: a call, a single property access,
    /// or nothing (plain variable reference)
    fn parse_name(&mut self, name: String) -> Result<Expression, ParseError> {
        if self.match_punct("(") {
            let arguments = self.nested(|p| p.parse_argument_list())?;
            self.expect_punct(")", "after function arguments")?;
            return Ok(Expression::Call {
                callee: name,
                arguments,
            });
        }

        if self.match_punct(".") {
            let property = self.expect_identifier("after '.'")?;
            if self.check_punct(".") {
                return Err(self.syntax_error(format!(
                    "Chained property access is not supported: '{}.{}.'",
                    name, property
                )));
            }
            return Ok(Expression::PropertyAccess {
                object: name,
                property,
            });
        }

        Ok(Expression::VariableReference { name })
    }

    fn parse_array_elements(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut elements = Vec::new();

        if self.check_punct("]") {
            return Ok(elements);
        }

        loop {
            elements.push(self.parse_expression()?);
            if !self.match_punct(",") {
                break;
            }
        }

        Ok(elements)
    }

    /// Parse object entries: "key": expr, ... (keys must be strings)
    fn parse_object_entries(&mut self) -> Result<Vec<ObjectEntry>, ParseError> {
        let mut entries = Vec::new();

        if self.check_punct("}") {
            return Ok(entries);
        }

        loop {
            let key = self.expect_string("as object key")?;
            self.expect_punct(":", "after object key")?;
            let value = self.parse_expression()?;
            entries.push(ObjectEntry { key, value });

            if !self.match_punct(",") {
                break;
            }
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ErrorKind, ParseError};
    use crate::parser::ast::*;
    use crate::parser::lexer::Lexer;
    use crate::parser::parse::{Parser, DEFAULT_MAX_NESTING_DEPTH};

    /// Parse `source` as a property default value
    fn parse_expr(source: &str) -> Result<Expression, Vec<ParseError>> {
        let wrapped = format!("twin T {{ property p: any = {}; }}", source);
        let (tokens, lex_errors) = Lexer::new(&wrapped).tokenize();
        assert!(lex_errors.is_empty(), "{:?}", lex_errors);
        let (program, errors) = Parser::new(tokens, &wrapped).parse_program();
        if !errors.is_empty() {
            return Err(errors);
        }
        match program.declarations.into_iter().next() {
            Some(Declaration::Twin(mut twin)) => Ok(twin
                .properties
                .remove(0)
                .default_value
                .expect("default value")),
            other => panic!("Expected twin, got {:?}", other),
        }
    }

    fn int(n: i64) -> Expression {
        Expression::literal(LiteralValue::Integer(n))
    }

    fn bin(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
        Expression::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse_expr("3.14").unwrap(), Expression::literal(LiteralValue::Float(3.14)));
        assert_eq!(parse_expr("42").unwrap(), int(42));
        assert_eq!(
            parse_expr("\"abc\"").unwrap(),
            Expression::literal(LiteralValue::String("abc".to_string()))
        );
        assert_eq!(
            parse_expr("'single'").unwrap(),
            Expression::literal(LiteralValue::String("single".to_string()))
        );
        assert_eq!(parse_expr("TRUE").unwrap(), Expression::literal(LiteralValue::Boolean(true)));
        assert_eq!(parse_expr("null").unwrap(), Expression::literal(LiteralValue::Null));
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 == 7 || false
        let expr = parse_expr("1 + 2 * 3 == 7 || false").unwrap();
        let expected = bin(
            BinaryOperator::Or,
            bin(
                BinaryOperator::Eq,
                bin(BinaryOperator::Add, int(1), bin(BinaryOperator::Mul, int(2), int(3))),
                int(7),
            ),
            Expression::literal(LiteralValue::Boolean(false)),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_left_associativity() {
        let expr = parse_expr("10 - 4 - 3").unwrap();
        assert_eq!(
            expr,
            bin(BinaryOperator::Sub, bin(BinaryOperator::Sub, int(10), int(4)), int(3))
        );

        let expr = parse_expr("a && b && c").unwrap();
        match expr {
            Expression::Binary { left, right, .. } => {
                assert!(matches!(*left, Expression::Binary { .. }));
                assert_eq!(*right, Expression::variable("c"));
            }
            other => panic!("Expected binary expression, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_binds_tighter_than_binary() {
        let expr = parse_expr("-x * 2").unwrap();
        match expr {
            Expression::Binary {
                operator: BinaryOperator::Mul,
                left,
                ..
            } => assert!(matches!(
                *left,
                Expression::Unary {
                    operator: UnaryOperator::Neg,
                    ..
                }
            )),
            other => panic!("Expected multiplication, got {:?}", other),
        }

        assert!(matches!(
            parse_expr("!!ready").unwrap(),
            Expression::Unary {
                operator: UnaryOperator::Not,
                ..
            }
        ));
    }

    #[test]
    fn test_grouping_overrides_precedence() {
        let expr = parse_expr("(1 + 2) * 3").unwrap();
        match expr {
            Expression::Binary {
                operator: BinaryOperator::Mul,
                left,
                ..
            } => assert!(matches!(*left, Expression::Grouping { .. })),
            other => panic!("Expected multiplication, got {:?}", other),
        }
    }

    #[test]
    fn test_calls_and_property_access() {
        assert_eq!(
            parse_expr("max(a, 2)").unwrap(),
            Expression::Call {
                callee: "max".to_string(),
                arguments: vec![Expression::variable("a"), int(2)],
            }
        );
        assert_eq!(
            parse_expr("pump.rpm").unwrap(),
            Expression::PropertyAccess {
                object: "pump".to_string(),
                property: "rpm".to_string(),
            }
        );
    }

    #[test]
    fn test_chained_property_access_rejected() {
        let errors = parse_expr("a.b.c").unwrap_err();
        assert!(errors[0].message.starts_with("Chained property access is not supported"));
    }

    #[test]
    fn test_array_and_object_literals() {
        let expr = parse_expr(r#"[1, "two", { "k": [] }]"#).unwrap();
        match expr {
            Expression::ArrayLiteral { elements } => {
                assert_eq!(elements.len(), 3);
                match &elements[2] {
                    Expression::ObjectLiteral { entries } => {
                        assert_eq!(entries[0].key, "k");
                        assert_eq!(entries[0].value, Expression::ArrayLiteral { elements: vec![] });
                    }
                    other => panic!("Expected object literal, got {:?}", other),
                }
            }
            other => panic!("Expected array literal, got {:?}", other),
        }
    }

    #[test]
    fn test_object_keys_must_be_strings() {
        let errors = parse_expr("{ key: 1 }").unwrap_err();
        assert!(errors[0].message.starts_with("Expected string as object key"));
    }

    #[test]
    fn test_integer_overflow_is_syntax_error() {
        let errors = parse_expr("99999999999999999999").unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::Syntax);
        assert!(errors[0].message.starts_with("Invalid integer literal"));
    }

    #[test]
    fn test_float_overflow_is_syntax_error() {
        let errors = parse_expr(&format!("1{}.0", "0".repeat(400))).unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::Syntax);
        assert!(errors[0].message.starts_with("Invalid float literal"));
    }

    #[test]
    fn test_long_operator_chain_hits_nesting_limit() {
        let source = format!("twin T {{ property p: any = {}1; }}", "1+".repeat(10_000));
        let (tokens, _) = Lexer::new(&source).tokenize();
        let (program, errors) = Parser::new(tokens, &source).parse_program();
        assert!(program.declarations.is_empty());
        assert_eq!(errors[0].kind, ErrorKind::NestingTooDeep);
        // Reported at the operand after the first operator over budget
        assert_eq!(errors[0].column, 30 + 2 * DEFAULT_MAX_NESTING_DEPTH);
    }

    #[test]
    fn test_operator_chain_within_limit() {
        // 32 applications fill the default budget exactly
        let expr = parse_expr(&format!("{}1", "1+".repeat(DEFAULT_MAX_NESTING_DEPTH))).unwrap();
        let mut depth = 0;
        let mut node = &expr;
        while let Expression::Binary { left, .. } = node {
            depth += 1;
            node = left;
        }
        assert_eq!(depth, DEFAULT_MAX_NESTING_DEPTH);

        let errors = parse_expr(&format!("{}1", "1+".repeat(DEFAULT_MAX_NESTING_DEPTH + 1))).unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::NestingTooDeep);
    }

    #[test]
    fn test_mixed_levels_give_back_budget() {
        // Budget used by `*` is returned when the multiplicative level ends
        let source = vec!["2*2*2"; 20].join(" + ");
        assert!(parse_expr(&source).is_ok());
    }

    #[test]
    fn test_deep_unary_chain_hits_nesting_limit() {
        let source = format!("twin T {{ property p: any = {}x; }}", "!".repeat(600));
        let (tokens, _) = Lexer::new(&source).tokenize();
        let (program, errors) = Parser::new(tokens, &source).parse_program();
        assert!(program.declarations.is_empty());
        assert_eq!(errors[0].kind, ErrorKind::NestingTooDeep);
    }
}
