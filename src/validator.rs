//! Structural validation of a parsed program
//!
//! The validator is an independent second pass over the AST. It checks that
//! every node carries the fields it needs (names, types, rule conditions and
//! actions, transition targets) and records a [`ParseError`] of kind
//! [`ErrorKind::Semantic`] for each gap. It never stops early: the whole tree
//! is always walked and an empty list means the tree is valid.
//!
//! Trees produced by the parser normally pass; the checks matter for trees
//! assembled by hand or read back from JSON with [`validate_json`].

use crate::errors::{ErrorKind, ParseError};
use crate::parser::ast::*;
use log::debug;

/// Collects semantic errors while walking a program
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ParseError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk the whole program and return every finding.
    pub fn validate(mut self, program: &Program) -> Vec<ParseError> {
        for declaration in &program.declarations {
            self.check_declaration(declaration);
        }
        debug!(
            "validated {} declarations, {} semantic errors",
            program.declarations.len(),
            self.errors.len()
        );
        self.errors
    }

    fn report(&mut self, message: String, location: SourceLocation, context: String) {
        self.errors
            .push(ParseError::at(ErrorKind::Semantic, message, location, context));
    }

    /// Report `what` as missing when `value` is blank.
    fn require(&mut self, value: &str, what: &str, location: SourceLocation, context: &str) {
        if value.trim().is_empty() {
            self.report(format!("{} missing {}", context, what), location, context.to_string());
        }
    }

    fn check_declaration(&mut self, declaration: &Declaration) {
        let ctx = describe(declaration.type_name(), declaration.name());
        let loc = declaration.location();
        self.require(declaration.name(), "name", loc, &ctx);

        match declaration {
            Declaration::Twin(twin) => self.check_twin(twin, &ctx),
            Declaration::Swarm(swarm) => {
                for twin in &swarm.twins {
                    let item = describe("twin_reference", &twin.twin_type);
                    self.require(&twin.twin_type, "twin type", twin.location, &item);
                    if let Some(instance) = &twin.instance_name {
                        self.require(instance, "instance name", twin.location, &item);
                    }
                }
                for rule in &swarm.rules {
                    self.require(&rule.name, "name", rule.location, "rule_reference");
                }
            }
            Declaration::Event(event) => self.check_parameters(&event.parameters),
            Declaration::Action(action) => {
                self.check_parameters(&action.parameters);
                self.check_statements(&action.body);
            }
            Declaration::Rule(rule) => {
                match &rule.condition {
                    Some(condition) => self.check_expression(condition, rule.location, &ctx),
                    None => self.report(
                        format!("{} missing condition", ctx),
                        rule.location,
                        ctx.clone(),
                    ),
                }
                if rule.actions.is_empty() {
                    self.report(format!("{} missing actions", ctx), rule.location, ctx.clone());
                }
                self.check_statements(&rule.actions);
            }
            Declaration::Import(import) => {
                if let Some(path) = &import.path {
                    self.require(path, "path", import.location, &ctx);
                }
            }
        }
    }

    fn check_twin(&mut self, twin: &TwinDeclaration, ctx: &str) {
        if let Some(parent) = &twin.parent {
            self.require(parent, "parent name", twin.location, ctx);
        }

        for property in &twin.properties {
            let item = describe("property_declaration", &property.name);
            self.require(&property.name, "name", property.location, &item);
            self.require(&property.property_type, "type", property.location, &item);
            if let Some(default) = &property.default_value {
                self.check_expression(default, property.location, &item);
            }
        }

        for sensor in &twin.sensors {
            let item = describe("sensor_declaration", &sensor.name);
            self.require(&sensor.name, "name", sensor.location, &item);
            self.require(&sensor.sensor_type, "type", sensor.location, &item);
            self.check_config(&sensor.config, sensor.location, &item);
        }

        for actuator in &twin.actuators {
            let item = describe("actuator_declaration", &actuator.name);
            self.require(&actuator.name, "name", actuator.location, &item);
            self.require(&actuator.actuator_type, "type", actuator.location, &item);
            self.check_config(&actuator.config, actuator.location, &item);
        }

        for state in &twin.states {
            self.check_state(state);
        }
    }

    fn check_config(&mut self, config: &[ConfigEntry], location: SourceLocation, ctx: &str) {
        for entry in config {
            self.require(&entry.key, "configuration key", location, ctx);
            self.check_expression(&entry.value, location, ctx);
        }
    }

    fn check_state(&mut self, state: &StateDeclaration) {
        let ctx = describe("state_declaration", &state.name);
        self.require(&state.name, "name", state.location, &ctx);

        for action in state.entry_actions.iter().chain(&state.exit_actions) {
            let item = describe("action_reference", &action.name);
            self.require(&action.name, "name", action.location, &item);
            for argument in &action.arguments {
                self.check_expression(argument, action.location, &item);
            }
        }

        for transition in &state.transitions {
            let item = format!("transition in {}", ctx);
            self.require(&transition.target, "target", transition.location, &item);
            if let Some(condition) = &transition.condition {
                self.check_expression(condition, transition.location, &item);
            }
        }
    }

    fn check_parameters(&mut self, parameters: &[Parameter]) {
        for parameter in parameters {
            let item = describe("parameter", &parameter.name);
            self.require(&parameter.name, "name", parameter.location, &item);
            self.require(&parameter.parameter_type, "parameter_type", parameter.location, &item);
        }
    }

    fn check_statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.check_statement(statement);
        }
    }

    fn check_statement(&mut self, statement: &Statement) {
        let loc = statement.location();
        let ctx = statement.type_name();

        match statement {
            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.check_expression(condition, loc, ctx);
                self.check_statements(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_statements(else_branch);
                }
            }
            Statement::For {
                variable,
                iterable,
                body,
                ..
            } => {
                self.require(variable, "loop variable", loc, ctx);
                self.check_expression(iterable, loc, ctx);
                self.check_statements(body);
            }
            Statement::Log { message, level, .. } => {
                self.check_expression(message, loc, ctx);
                if let Some(level) = level {
                    self.check_expression(level, loc, ctx);
                }
            }
            Statement::Alert {
                message, severity, ..
            } => {
                self.check_expression(message, loc, ctx);
                if let Some(severity) = severity {
                    self.check_expression(severity, loc, ctx);
                }
            }
            Statement::Notify {
                target,
                message,
                data,
                ..
            } => {
                self.check_expression(target, loc, ctx);
                self.check_expression(message, loc, ctx);
                if let Some(data) = data {
                    self.check_expression(data, loc, ctx);
                }
            }
            Statement::Assignment { target, value, .. } => {
                self.require(target, "target", loc, ctx);
                self.check_expression(value, loc, ctx);
            }
            Statement::FunctionCall {
                name, arguments, ..
            } => {
                self.require(name, "name", loc, ctx);
                for argument in arguments {
                    self.check_expression(argument, loc, ctx);
                }
            }
        }
    }

    /// Expressions carry no position of their own; findings are reported at
    /// the enclosing statement or declaration.
    fn check_expression(&mut self, expression: &Expression, loc: SourceLocation, ctx: &str) {
        match expression {
            Expression::Binary { left, right, .. } => {
                self.check_expression(left, loc, ctx);
                self.check_expression(right, loc, ctx);
            }
            Expression::Unary { operand, .. } => self.check_expression(operand, loc, ctx),
            Expression::Literal { .. } => {}
            Expression::Grouping { expression } => self.check_expression(expression, loc, ctx),
            Expression::ArrayLiteral { elements } => {
                for element in elements {
                    self.check_expression(element, loc, ctx);
                }
            }
            Expression::ObjectLiteral { entries } => {
                for entry in entries {
                    self.require(&entry.key, "object key", loc, ctx);
                    self.check_expression(&entry.value, loc, ctx);
                }
            }
            Expression::VariableReference { name } => {
                self.require(name, "variable name", loc, ctx);
            }
            Expression::Call { callee, arguments } => {
                self.require(callee, "callee name", loc, ctx);
                for argument in arguments {
                    self.check_expression(argument, loc, ctx);
                }
            }
            Expression::PropertyAccess { object, property } => {
                self.require(object, "object name", loc, ctx);
                self.require(property, "property name", loc, ctx);
            }
        }
    }
}

fn describe(kind: &str, name: &str) -> String {
    if name.trim().is_empty() {
        kind.to_string()
    } else {
        format!("{} '{}'", kind, name)
    }
}

/// Validate a program.
pub fn validate(program: &Program) -> Vec<ParseError> {
    Validator::new().validate(program)
}

/// Validate a program supplied as JSON.
///
/// A document that does not describe a program, including one whose `"type"`
/// names an unknown node kind, yields a single semantic error.
pub fn validate_json(json: &str) -> Vec<ParseError> {
    match Program::from_json(json) {
        Ok(program) => validate(&program),
        Err(err) => {
            let message = if err.to_string().contains("unknown variant") {
                format!("Unknown node type: {}", err)
            } else {
                format!("Invalid program: {}", err)
            };
            vec![ParseError::new(
                ErrorKind::Semantic,
                message,
                err.line(),
                err.column(),
                String::new(),
            )]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::Lexer;
    use crate::parser::parse::Parser;

    fn parsed(source: &str) -> Program {
        let (tokens, _) = Lexer::new(source).tokenize();
        let (program, errors) = Parser::new(tokens, source).parse_program();
        assert!(errors.is_empty(), "{:?}", errors);
        program
    }

    fn rule(name: &str, condition: Option<Expression>, actions: Vec<Statement>) -> Program {
        Program {
            declarations: vec![Declaration::Rule(RuleDeclaration {
                name: name.to_string(),
                condition,
                actions,
                location: SourceLocation::new(4, 2),
            })],
        }
    }

    fn log_stmt() -> Statement {
        Statement::Log {
            message: Expression::literal(LiteralValue::String("hi".to_string())),
            level: None,
            location: SourceLocation::new(5, 3),
        }
    }

    #[test]
    fn test_valid_program_has_no_errors() {
        let program = parsed(
            r#"
            twin Sensor { property temp: float = 0.0; sensor s1: thermo; }
            rule R1 { when x > 5; then { alert("high", "warn"); } }
            "#,
        );
        assert!(validate(&program).is_empty());
    }

    #[test]
    fn test_rule_missing_condition() {
        let program = rule("R1", None, vec![log_stmt()]);
        let errors = validate(&program);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Semantic);
        assert_eq!(errors[0].message, "rule_declaration 'R1' missing condition");
        assert_eq!(errors[0].location(), SourceLocation::new(4, 2));
    }

    #[test]
    fn test_rule_missing_actions() {
        let program = rule("R1", Some(Expression::variable("x")), vec![]);
        let errors = validate(&program);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.ends_with("missing actions"));
    }

    #[test]
    fn test_walk_continues_past_findings() {
        let mut program = rule("", None, vec![]);
        program.declarations.push(Declaration::Event(EventDeclaration {
            name: "Tick".to_string(),
            parameters: vec![Parameter {
                name: "n".to_string(),
                parameter_type: " ".to_string(),
                location: SourceLocation::new(9, 12),
            }],
            location: SourceLocation::new(9, 1),
        }));

        let errors = validate(&program);
        let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "rule_declaration missing name",
                "rule_declaration missing condition",
                "rule_declaration missing actions",
                "parameter 'n' missing parameter_type",
            ]
        );
    }

    #[test]
    fn test_nested_statements_are_walked() {
        let nested = Statement::If {
            condition: Expression::variable("ok"),
            then_branch: vec![Statement::For {
                variable: String::new(),
                iterable: Expression::variable("items"),
                body: vec![Statement::Assignment {
                    target: String::new(),
                    value: Expression::literal(LiteralValue::Integer(1)),
                    location: SourceLocation::new(7, 9),
                }],
                location: SourceLocation::new(6, 5),
            }],
            else_branch: None,
            location: SourceLocation::new(5, 1),
        };
        let errors = validate(&rule("R", Some(Expression::variable("x")), vec![nested]));

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "for_statement missing loop variable");
        assert_eq!(errors[1].message, "assignment missing target");
        assert_eq!(errors[1].location(), SourceLocation::new(7, 9));
    }

    #[test]
    fn test_transition_missing_target() {
        let mut program = parsed("twin T { state idle { transition busy; } }");
        if let Declaration::Twin(twin) = &mut program.declarations[0] {
            twin.states[0].transitions[0].target.clear();
        }

        let errors = validate(&program);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "transition in state_declaration 'idle' missing target");
    }

    #[test]
    fn test_validate_json_unknown_type() {
        let errors = validate_json(r#"{"type":"program","declarations":[{"type":"gizmo","name":"X"}]}"#);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.starts_with("Unknown node type"));
    }

    #[test]
    fn test_validate_json_round_trip() {
        let program = parsed("rule R1 { when x > 5; then { alert(\"high\"); } }");
        let json = program.to_json().unwrap();
        assert!(validate_json(&json).is_empty());
    }
}
