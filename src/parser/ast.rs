// AST (Abstract Syntax Tree) definitions for DTSL programs
//
// Nodes are split into three closed categories: declarations, statements and
// expressions. Every node serialises with a `"type"` discriminator so the tree
// can be handed to downstream tooling as plain JSON.

use serde::{Deserialize, Serialize};

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Binary operators, serialised as their source symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    #[serde(rename = "||")]
    Or,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Or => "||",
            BinaryOperator::And => "&&",
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Gt => ">",
            BinaryOperator::Le => "<=",
            BinaryOperator::Ge => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    #[serde(rename = "!")]
    Not, // !x
    #[serde(rename = "-")]
    Neg, // -x
}

/// Literal payloads. Serialised as the bare JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// `"key": value` entry of an object literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub key: String,
    pub value: Expression,
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expression {
    #[serde(rename = "binary_expression")]
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    #[serde(rename = "unary_expression")]
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    #[serde(rename = "literal")]
    Literal { value: LiteralValue },
    #[serde(rename = "grouping")]
    Grouping { expression: Box<Expression> },
    #[serde(rename = "array_literal")]
    ArrayLiteral { elements: Vec<Expression> },
    #[serde(rename = "object_literal")]
    ObjectLiteral { entries: Vec<ObjectEntry> },
    #[serde(rename = "variable_reference")]
    VariableReference { name: String },
    #[serde(rename = "call_expression")]
    Call {
        callee: String,
        arguments: Vec<Expression>,
    },
    #[serde(rename = "property_access")]
    PropertyAccess { object: String, property: String },
}

impl Expression {
    pub fn literal(value: LiteralValue) -> Self {
        Expression::Literal { value }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::VariableReference { name: name.into() }
    }

    /// The node's `"type"` discriminator
    pub fn type_name(&self) -> &'static str {
        match self {
            Expression::Binary { .. } => "binary_expression",
            Expression::Unary { .. } => "unary_expression",
            Expression::Literal { .. } => "literal",
            Expression::Grouping { .. } => "grouping",
            Expression::ArrayLiteral { .. } => "array_literal",
            Expression::ObjectLiteral { .. } => "object_literal",
            Expression::VariableReference { .. } => "variable_reference",
            Expression::Call { .. } => "call_expression",
            Expression::PropertyAccess { .. } => "property_access",
        }
    }
}

/// Statements inside action bodies and rule `then` blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Statement {
    #[serde(rename = "if_statement")]
    If {
        condition: Expression,
        then_branch: Vec<Statement>,
        // `else if` is stored as a single nested if statement
        else_branch: Option<Vec<Statement>>,
        #[serde(default)]
        location: SourceLocation,
    },
    #[serde(rename = "for_statement")]
    For {
        variable: String,
        iterable: Expression,
        body: Vec<Statement>,
        #[serde(default)]
        location: SourceLocation,
    },
    #[serde(rename = "log_statement")]
    Log {
        message: Expression,
        level: Option<Expression>,
        #[serde(default)]
        location: SourceLocation,
    },
    #[serde(rename = "alert_statement")]
    Alert {
        message: Expression,
        severity: Option<Expression>,
        #[serde(default)]
        location: SourceLocation,
    },
    #[serde(rename = "notify_statement")]
    Notify {
        target: Expression,
        message: Expression,
        data: Option<Expression>,
        #[serde(default)]
        location: SourceLocation,
    },
    #[serde(rename = "assignment")]
    Assignment {
        target: String,
        value: Expression,
        #[serde(default)]
        location: SourceLocation,
    },
    #[serde(rename = "function_call")]
    FunctionCall {
        name: String,
        arguments: Vec<Expression>,
        #[serde(default)]
        location: SourceLocation,
    },
}

impl Statement {
    /// Get the source location of this statement
    pub fn location(&self) -> SourceLocation {
        match self {
            Statement::If { location, .. }
            | Statement::For { location, .. }
            | Statement::Log { location, .. }
            | Statement::Alert { location, .. }
            | Statement::Notify { location, .. }
            | Statement::Assignment { location, .. }
            | Statement::FunctionCall { location, .. } => *location,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Statement::If { .. } => "if_statement",
            Statement::For { .. } => "for_statement",
            Statement::Log { .. } => "log_statement",
            Statement::Alert { .. } => "alert_statement",
            Statement::Notify { .. } => "notify_statement",
            Statement::Assignment { .. } => "assignment",
            Statement::FunctionCall { .. } => "function_call",
        }
    }
}

/// `property name: type (= default)?;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "property_declaration")]
pub struct PropertyDeclaration {
    pub name: String,
    pub property_type: String,
    pub default_value: Option<Expression>,
    #[serde(default)]
    pub location: SourceLocation,
}

/// `key: value` entry of a sensor or actuator configuration block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "sensor_declaration")]
pub struct SensorDeclaration {
    pub name: String,
    pub sensor_type: String,
    pub config: Vec<ConfigEntry>,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "actuator_declaration")]
pub struct ActuatorDeclaration {
    pub name: String,
    pub actuator_type: String,
    pub config: Vec<ConfigEntry>,
    #[serde(default)]
    pub location: SourceLocation,
}

/// Reference to an action from a state's `entry` or `exit` clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "action_reference")]
pub struct ActionReference {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<Expression>,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "transition")]
pub struct Transition {
    pub target: String,
    pub condition: Option<Expression>,
    #[serde(default)]
    pub location: SourceLocation,
}

/// A state of a twin's state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "state_declaration")]
pub struct StateDeclaration {
    pub name: String,
    pub entry_actions: Vec<ActionReference>,
    pub exit_actions: Vec<ActionReference>,
    pub transitions: Vec<Transition>,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwinDeclaration {
    pub name: String,
    pub parent: Option<String>,
    pub properties: Vec<PropertyDeclaration>,
    pub sensors: Vec<SensorDeclaration>,
    pub actuators: Vec<ActuatorDeclaration>,
    pub states: Vec<StateDeclaration>,
    #[serde(default)]
    pub location: SourceLocation,
}

/// `twin Type (as instance)? ([count])?;` inside a swarm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "twin_reference")]
pub struct TwinReference {
    pub twin_type: String,
    pub instance_name: Option<String>,
    pub count: Option<i64>,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "rule_reference")]
pub struct RuleReference {
    pub name: String,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmDeclaration {
    pub name: String,
    pub twins: Vec<TwinReference>,
    pub rules: Vec<RuleReference>,
    #[serde(default)]
    pub location: SourceLocation,
}

/// Event or action parameter: `name: type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "parameter")]
pub struct Parameter {
    pub name: String,
    pub parameter_type: String,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDeclaration {
    pub name: String,
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDeclaration {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub body: Vec<Statement>,
    #[serde(default)]
    pub location: SourceLocation,
}

/// `rule name { when cond; then { ... } }`
///
/// `condition` is only ever `None` for trees built outside the parser; the
/// validator reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDeclaration {
    pub name: String,
    pub condition: Option<Expression>,
    pub actions: Vec<Statement>,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDeclaration {
    pub name: String,
    pub path: Option<String>,
    #[serde(default)]
    pub location: SourceLocation,
}

/// Top-level declarations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Declaration {
    #[serde(rename = "twin_declaration")]
    Twin(TwinDeclaration),
    #[serde(rename = "swarm_declaration")]
    Swarm(SwarmDeclaration),
    #[serde(rename = "event_declaration")]
    Event(EventDeclaration),
    #[serde(rename = "action_declaration")]
    Action(ActionDeclaration),
    #[serde(rename = "rule_declaration")]
    Rule(RuleDeclaration),
    #[serde(rename = "import_declaration")]
    Import(ImportDeclaration),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Twin(d) => &d.name,
            Declaration::Swarm(d) => &d.name,
            Declaration::Event(d) => &d.name,
            Declaration::Action(d) => &d.name,
            Declaration::Rule(d) => &d.name,
            Declaration::Import(d) => &d.name,
        }
    }

    /// Get the source location of this declaration
    pub fn location(&self) -> SourceLocation {
        match self {
            Declaration::Twin(d) => d.location,
            Declaration::Swarm(d) => d.location,
            Declaration::Event(d) => d.location,
            Declaration::Action(d) => d.location,
            Declaration::Rule(d) => d.location,
            Declaration::Import(d) => d.location,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Declaration::Twin(_) => "twin_declaration",
            Declaration::Swarm(_) => "swarm_declaration",
            Declaration::Event(_) => "event_declaration",
            Declaration::Action(_) => "action_declaration",
            Declaration::Rule(_) => "rule_declaration",
            Declaration::Import(_) => "import_declaration",
        }
    }
}

/// Top-level program structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "program")]
pub struct Program {
    pub declarations: Vec<Declaration>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
