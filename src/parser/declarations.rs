//! Declaration parsing implementation
//!
//! This module handles parsing of top-level declarations and the items nested
//! inside twins, states and swarms.
//!
//! # Grammar
//!
//! ```text
//! declaration ::= twin | swarm | event | action | rule | import
//! twin        ::= "twin" name ("extends" name)? "{" twin_item* "}"
//! twin_item   ::= property | sensor | actuator | state
//! property    ::= "property" name ":" type ("=" expr)? ";"
//! sensor      ::= "sensor" name ":" type (config_block | ";")
//! actuator    ::= "actuator" name ":" type (config_block | ";")
//! config_block::= "{" (name ":" expr ("," name ":" expr)* ","?)? "}"
//! state       ::= "state" name "{" ( "entry" action_ref ";"
//!                                  | "exit" action_ref ";"
//!                                  | "transition" name ("when" expr)? ";" )* "}"
//! action_ref  ::= name ("(" args ")")?
//! swarm       ::= "swarm" name "{" ( "twin" twin_ref ";" | "rule" name ";" )* "}"
//! twin_ref    ::= name ("as" name)? ("[" integer "]")?
//! event       ::= "event" name ("(" params? ")")? ";"
//! action      ::= "action" name ("(" params? ")")? "{" statement* "}"
//! params      ::= name ":" type ("," name ":" type)*
//! rule        ::= "rule" name "{" "when" expr ";" "then" "{" statement* "}" "}"
//! import      ::= "import" name ("from" string)? ";"
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::errors::ParseError;
use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::Parser;

impl Parser {
    /// Parse a top-level declaration, dispatching on its keyword
    pub(crate) fn parse_declaration(&mut self) -> Result<Declaration, ParseError> {
        let loc = self.current_location();

        #[cfg(test)]
        if self.panic_at == Some(self.position) {
            panic!("forced failure");
        }

        if self.match_keyword("twin") {
            return Ok(Declaration::Twin(self.parse_twin_declaration(loc)?));
        }
        if self.match_keyword("swarm") {
            return Ok(Declaration::Swarm(self.parse_swarm_declaration(loc)?));
        }
        if self.match_keyword("event") {
            return Ok(Declaration::Event(self.parse_event_declaration(loc)?));
        }
        if self.match_keyword("action") {
            return Ok(Declaration::Action(self.parse_action_declaration(loc)?));
        }
        if self.match_keyword("rule") {
            return Ok(Declaration::Rule(self.parse_rule_declaration(loc)?));
        }
        if self.match_keyword("import") {
            return Ok(Declaration::Import(self.parse_import_declaration(loc)?));
        }

        Err(self.syntax_error(format!(
            "Expected declaration (twin, swarm, event, action, rule or import), found {}",
            self.peek()
        )))
    }

    /// Parse twin: name (extends parent)? { items }
    fn parse_twin_declaration(&mut self, loc: SourceLocation) -> Result<TwinDeclaration, ParseError> {
        let name = self.expect_identifier("after 'twin'")?;

        let parent = if self.match_keyword("extends") {
            Some(self.expect_identifier("after 'extends'")?)
        } else {
            None
        };

        self.expect_punct("{", "after twin name")?;

        let mut twin = TwinDeclaration {
            name,
            parent,
            properties: Vec::new(),
            sensors: Vec::new(),
            actuators: Vec::new(),
            states: Vec::new(),
            location: loc,
        };

        while !self.check_punct("}") && !self.is_at_end() {
            let item_loc = self.current_location();
            if self.match_keyword("property") {
                twin.properties.push(self.parse_property(item_loc)?);
            } else if self.match_keyword("sensor") {
                let (name, sensor_type, config) = self.parse_device("sensor")?;
                twin.sensors.push(SensorDeclaration {
                    name,
                    sensor_type,
                    config,
                    location: item_loc,
                });
            } else if self.match_keyword("actuator") {
                let (name, actuator_type, config) = self.parse_device("actuator")?;
                twin.actuators.push(ActuatorDeclaration {
                    name,
                    actuator_type,
                    config,
                    location: item_loc,
                });
            } else if self.match_keyword("state") {
                twin.states.push(self.parse_state(item_loc)?);
            } else {
                return Err(self.syntax_error(format!(
                    "Expected property, sensor, actuator or state in twin body, found {}",
                    self.peek()
                )));
            }
        }

        self.expect_punct("}", "after twin body")?;

        Ok(twin)
    }

    /// Parse property: name : type (= default)? ;
    fn parse_property(&mut self, loc: SourceLocation) -> Result<PropertyDeclaration, ParseError> {
        let name = self.expect_identifier("after 'property'")?;
        self.expect_punct(":", "after property name")?;
        let property_type = self.expect_identifier("as property type")?;

        let default_value = if self.match_operator("=") {
            Some(self.parse_expression()?)
        } else {
            None
        };

        self.expect_semicolon("after property declaration")?;

        Ok(PropertyDeclaration {
            name,
            property_type,
            default_value,
            location: loc,
        })
    }

    /// Parse the shared tail of sensors and actuators: name : type, then
    /// either a configuration block or `;`
    fn parse_device(&mut self, kind: &str) -> Result<(String, String, Vec<ConfigEntry>), ParseError> {
        let name = self.expect_identifier(&format!("after '{kind}'"))?;
        self.expect_punct(":", &format!("after {kind} name"))?;
        let device_type = self.expect_identifier(&format!("as {kind} type"))?;

        if self.match_punct("{") {
            let config = self.parse_config_entries()?;
            self.expect_punct("}", &format!("after {kind} configuration"))?;
            return Ok((name, device_type, config));
        }

        if self.match_punct(";") {
            return Ok((name, device_type, Vec::new()));
        }

        Err(self.syntax_error(format!(
            "Expected '{{' or ';' after {} type, found {}",
            kind,
            self.peek()
        )))
    }

    /// Parse configuration entries: key: expr, key: expr
    fn parse_config_entries(&mut self) -> Result<Vec<ConfigEntry>, ParseError> {
        let mut entries = Vec::new();

        while !self.check_punct("}") {
            let key = self.expect_identifier("as configuration key")?;
            self.expect_punct(":", "after configuration key")?;
            let value = self.parse_expression()?;
            entries.push(ConfigEntry { key, value });

            if !self.match_punct(",") {
                break;
            }
        }

        Ok(entries)
    }

    /// Parse state: name { entry/exit/transition clauses }
    fn parse_state(&mut self, loc: SourceLocation) -> Result<StateDeclaration, ParseError> {
        let name = self.expect_identifier("after 'state'")?;
        self.expect_punct("{", "after state name")?;

        let mut state = StateDeclaration {
            name,
            entry_actions: Vec::new(),
            exit_actions: Vec::new(),
            transitions: Vec::new(),
            location: loc,
        };

        while !self.check_punct("}") && !self.is_at_end() {
            let clause_loc = self.current_location();
            if self.match_keyword("entry") {
                state.entry_actions.push(self.parse_action_reference(clause_loc)?);
                self.expect_semicolon("after entry action")?;
            } else if self.match_keyword("exit") {
                state.exit_actions.push(self.parse_action_reference(clause_loc)?);
                self.expect_semicolon("after exit action")?;
            } else if self.match_keyword("transition") {
                let target = self.expect_identifier("as transition target")?;
                let condition = if self.match_keyword("when") {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                self.expect_semicolon("after transition")?;
                state.transitions.push(Transition {
                    target,
                    condition,
                    location: clause_loc,
                });
            } else {
                return Err(self.syntax_error(format!(
                    "Expected entry, exit or transition in state body, found {}",
                    self.peek()
                )));
            }
        }

        self.expect_punct("}", "after state body")?;

        Ok(state)
    }

    /// Parse action reference: name (args)?
    fn parse_action_reference(&mut self, loc: SourceLocation) -> Result<ActionReference, ParseError> {
        let name = self.expect_identifier("as action reference")?;

        let arguments = if self.match_punct("(") {
            let args = self.parse_argument_list()?;
            self.expect_punct(")", "after action arguments")?;
            args
        } else {
            Vec::new()
        };

        Ok(ActionReference {
            name,
            arguments,
            location: loc,
        })
    }

    /// Parse swarm: name { twin refs and rule refs }
    fn parse_swarm_declaration(&mut self, loc: SourceLocation) -> Result<SwarmDeclaration, ParseError> {
        let name = self.expect_identifier("after 'swarm'")?;
        self.expect_punct("{", "after swarm name")?;

        let mut twins = Vec::new();
        let mut rules = Vec::new();

        while !self.check_punct("}") && !self.is_at_end() {
            let member_loc = self.current_location();
            if self.match_keyword("twin") {
                twins.push(self.parse_twin_reference(member_loc)?);
            } else if self.match_keyword("rule") {
                let name = self.expect_identifier("after 'rule'")?;
                self.expect_semicolon("after rule reference")?;
                rules.push(RuleReference {
                    name,
                    location: member_loc,
                });
            } else {
                return Err(self.syntax_error(format!(
                    "Expected twin or rule in swarm body, found {}",
                    self.peek()
                )));
            }
        }

        self.expect_punct("}", "after swarm body")?;

        Ok(SwarmDeclaration {
            name,
            twins,
            rules,
            location: loc,
        })
    }

    /// Parse twin reference: Type (as instance)? ([count])? ;
    fn parse_twin_reference(&mut self, loc: SourceLocation) -> Result<TwinReference, ParseError> {
        let twin_type = self.expect_identifier("after 'twin'")?;

        let instance_name = if self.match_keyword("as") {
            Some(self.expect_identifier("after 'as'")?)
        } else {
            None
        };

        let count = if self.match_punct("[") {
            let count = self.expect_count()?;
            self.expect_punct("]", "after instance count")?;
            Some(count)
        } else {
            None
        };

        self.expect_semicolon("after twin reference")?;

        Ok(TwinReference {
            twin_type,
            instance_name,
            count,
            location: loc,
        })
    }

    fn expect_count(&mut self) -> Result<i64, ParseError> {
        let token = self.peek().clone();
        if token.kind != TokenKind::Number || token.value.contains('.') {
            return Err(self.syntax_error(format!(
                "Expected integer instance count, found {}",
                token
            )));
        }
        let count = token.value.parse::<i64>().map_err(|_| {
            self.syntax_error(format!("Invalid instance count: {}", token.value))
        })?;
        self.advance();
        Ok(count)
    }

    /// Parse event: name (params)? ;
    fn parse_event_declaration(&mut self, loc: SourceLocation) -> Result<EventDeclaration, ParseError> {
        let name = self.expect_identifier("after 'event'")?;
        let parameters = self.parse_optional_parameters("event")?;
        self.expect_semicolon("after event declaration")?;

        Ok(EventDeclaration {
            name,
            parameters,
            location: loc,
        })
    }

    /// Parse action: name (params)? { body }
    fn parse_action_declaration(&mut self, loc: SourceLocation) -> Result<ActionDeclaration, ParseError> {
        let name = self.expect_identifier("after 'action'")?;
        let parameters = self.parse_optional_parameters("action")?;
        let body = self.parse_block("action body")?;

        Ok(ActionDeclaration {
            name,
            parameters,
            body,
            location: loc,
        })
    }

    fn parse_optional_parameters(&mut self, owner: &str) -> Result<Vec<Parameter>, ParseError> {
        if !self.match_punct("(") {
            return Ok(Vec::new());
        }
        let parameters = self.parse_parameter_list()?;
        self.expect_punct(")", &format!("after {owner} parameters"))?;
        Ok(parameters)
    }

    /// Parse parameter list: name: type, name: type, ...
    fn parse_parameter_list(&mut self) -> Result<Vec<Parameter>, ParseError> {
        let mut params = Vec::new();

        if self.check_punct(")") {
            return Ok(params);
        }

        loop {
            let loc = self.current_location();
            let name = self.expect_identifier("as parameter name")?;
            self.expect_punct(":", "after parameter name")?;
            let parameter_type = self.expect_identifier("as parameter type")?;
            params.push(Parameter {
                name,
                parameter_type,
                location: loc,
            });

            if !self.match_punct(",") {
                break;
            }
        }

        Ok(params)
    }

    /// Parse rule: name { when cond; then { statements } }
    fn parse_rule_declaration(&mut self, loc: SourceLocation) -> Result<RuleDeclaration, ParseError> {
        let name = self.expect_identifier("after 'rule'")?;
        self.expect_punct("{", "after rule name")?;

        self.expect_keyword("when", "at start of rule body")?;
        let condition = self.parse_expression()?;
        self.expect_semicolon("after rule condition")?;

        self.expect_keyword("then", "after rule condition")?;
        let actions = self.parse_block("rule actions")?;

        self.expect_punct("}", "after rule body")?;

        Ok(RuleDeclaration {
            name,
            condition: Some(condition),
            actions,
            location: loc,
        })
    }

    /// Parse import: name (from "path")? ;
    fn parse_import_declaration(&mut self, loc: SourceLocation) -> Result<ImportDeclaration, ParseError> {
        let name = self.expect_identifier("after 'import'")?;

        let path = if self.match_keyword("from") {
            Some(self.expect_string("after 'from'")?)
        } else {
            None
        };

        self.expect_semicolon("after import")?;

        Ok(ImportDeclaration {
            name,
            path,
            location: loc,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::ParseError;
    use crate::parser::ast::*;
    use crate::parser::lexer::Lexer;
    use crate::parser::parse::Parser;

    fn parse_ok(source: &str) -> Vec<Declaration> {
        let (tokens, lex_errors) = Lexer::new(source).tokenize();
        assert!(lex_errors.is_empty(), "{:?}", lex_errors);
        let (program, errors) = Parser::new(tokens, source).parse_program();
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        program.declarations
    }

    fn parse_err(source: &str) -> Vec<ParseError> {
        let (tokens, _) = Lexer::new(source).tokenize();
        let (_, errors) = Parser::new(tokens, source).parse_program();
        assert!(!errors.is_empty(), "expected errors for {:?}", source);
        errors
    }

    #[test]
    fn test_twin_with_all_items() {
        let decls = parse_ok(
            r#"
            twin Boiler extends Device {
                property pressure: float = 1.5;
                sensor gauge: manometer { unit: "bar", range: [0, 10] }
                actuator valve: solenoid;
                state idle {
                    entry reset;
                    transition heating when pressure < 1.0;
                    exit notify_start(1, "x");
                    transition idle;
                }
            }
            "#,
        );

        match &decls[0] {
            Declaration::Twin(twin) => {
                assert_eq!(twin.name, "Boiler");
                assert_eq!(twin.parent.as_deref(), Some("Device"));
                assert_eq!(twin.properties[0].property_type, "float");
                assert_eq!(twin.sensors[0].config.len(), 2);
                assert_eq!(twin.sensors[0].config[0].key, "unit");
                assert!(twin.actuators[0].config.is_empty());

                let state = &twin.states[0];
                assert_eq!(state.name, "idle");
                assert_eq!(state.entry_actions[0].name, "reset");
                assert_eq!(state.exit_actions[0].arguments.len(), 2);
                assert_eq!(state.transitions.len(), 2);
                assert_eq!(state.transitions[0].target, "heating");
                assert!(state.transitions[0].condition.is_some());
                assert!(state.transitions[1].condition.is_none());
            }
            _ => panic!("Expected twin declaration"),
        }
    }

    #[test]
    fn test_config_block_allows_trailing_comma_and_empty() {
        let decls = parse_ok("twin T { sensor a: x { rate: 5, } sensor b: y { } }");
        match &decls[0] {
            Declaration::Twin(twin) => {
                assert_eq!(twin.sensors[0].config.len(), 1);
                assert!(twin.sensors[1].config.is_empty());
            }
            _ => panic!("Expected twin declaration"),
        }
    }

    #[test]
    fn test_sensor_requires_block_or_semicolon() {
        let errors = parse_err("twin T { sensor a: x }");
        assert!(errors[0].message.starts_with("Expected '{' or ';' after sensor type"));
    }

    #[test]
    fn test_swarm_references() {
        let decls = parse_ok(
            "swarm Farm { twin Sensor as probe [12]; twin Pump; rule Overheat; }",
        );

        match &decls[0] {
            Declaration::Swarm(swarm) => {
                assert_eq!(swarm.twins.len(), 2);
                assert_eq!(swarm.twins[0].twin_type, "Sensor");
                assert_eq!(swarm.twins[0].instance_name.as_deref(), Some("probe"));
                assert_eq!(swarm.twins[0].count, Some(12));
                assert_eq!(swarm.twins[1].count, None);
                assert_eq!(swarm.rules[0].name, "Overheat");
            }
            _ => panic!("Expected swarm declaration"),
        }
    }

    #[test]
    fn test_swarm_count_must_be_integer() {
        let errors = parse_err("swarm S { twin A [1.5]; }");
        assert!(errors[0].message.starts_with("Expected integer instance count"));
    }

    #[test]
    fn test_event_and_action_parameters() {
        let decls = parse_ok(
            r#"
            event Ready;
            event Overheat(temp: float, zone: string);
            action Cool(level: int) { log("cooling"); }
            action Noop() { }
            "#,
        );

        assert_eq!(decls.len(), 4);
        match (&decls[1], &decls[2]) {
            (Declaration::Event(event), Declaration::Action(action)) => {
                assert_eq!(event.parameters.len(), 2);
                assert_eq!(event.parameters[1].name, "zone");
                assert_eq!(event.parameters[1].parameter_type, "string");
                assert_eq!(action.parameters[0].parameter_type, "int");
                assert_eq!(action.body.len(), 1);
            }
            _ => panic!("Expected event and action"),
        }
    }

    #[test]
    fn test_rule_requires_when_and_then() {
        let errors = parse_err("rule R { then { } }");
        assert!(errors[0].message.starts_with("Expected 'when' at start of rule body"));

        let errors = parse_err("rule R { when x; { } }");
        assert!(errors[0].message.starts_with("Expected 'then' after rule condition"));
    }

    #[test]
    fn test_import_with_and_without_path() {
        let decls = parse_ok(r#"import climate from "lib/climate.dtsl"; import base;"#);
        match (&decls[0], &decls[1]) {
            (Declaration::Import(a), Declaration::Import(b)) => {
                assert_eq!(a.path.as_deref(), Some("lib/climate.dtsl"));
                assert_eq!(b.path, None);
            }
            _ => panic!("Expected imports"),
        }
    }

    #[test]
    fn test_failed_declaration_is_not_kept() {
        let (tokens, _) = Lexer::new("twin T { property a: int; property b }").tokenize();
        let (program, errors) = Parser::new(tokens, "").parse_program();
        assert!(program.declarations.is_empty());
        assert_eq!(errors.len(), 1);
    }
}
