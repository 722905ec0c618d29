//! Lexer (tokenizer) for DTSL source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//!
//! At each position the lexer walks a fixed, ordered table of patterns and
//! takes the first one that matches. Order encodes precedence: floats are
//! tried before integers, multi-character operators before their prefixes.
//! Whitespace and comments are matched like any other pattern but never
//! emitted.
//!
//! An unrecognised character is recorded as a lexical error and skipped, so a
//! single pass reports every bad character in the file.

use super::ast::SourceLocation;
use crate::errors::{context_window, ErrorKind, ParseError, DEFAULT_CONTEXT_RADIUS};
use rustc_hash::FxHashSet;
use std::fmt;

/// Reserved words of the language. `true`/`false` are handled separately.
pub const KEYWORDS: &[&str] = &[
    "twin",
    "extends",
    "property",
    "sensor",
    "actuator",
    "state",
    "entry",
    "exit",
    "transition",
    "when",
    "swarm",
    "as",
    "rule",
    "then",
    "event",
    "action",
    "import",
    "from",
    "if",
    "else",
    "for",
    "in",
    "log",
    "alert",
    "notify",
    "null",
];

const OPERATORS: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "<", ">", "+", "-", "*", "/", "=", "!",
];

const PUNCTUATION: &[char] = &['{', '}', '(', ')', '[', ']', ',', ';', ':', '.'];

/// Token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Boolean,
    Keyword,
    Operator,
    Punctuation,
    Comment,
    Whitespace,
    Eof,
    Unknown,
}

/// A classified slice of source text.
///
/// `value` is the exact matched text; string tokens keep their quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            line,
            column,
        }
    }

    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    pub fn is(&self, kind: TokenKind, value: &str) -> bool {
        self.kind == kind && self.value == value
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of file"),
            TokenKind::String => write!(f, "string {}", self.value),
            TokenKind::Number => write!(f, "number {}", self.value),
            TokenKind::Identifier => write!(f, "identifier '{}'", self.value),
            TokenKind::Keyword => write!(f, "keyword '{}'", self.value),
            _ => write!(f, "'{}'", self.value),
        }
    }
}

/// Returns the length of the match at the start of `input`, if any.
type Matcher = fn(&[char]) -> Option<usize>;

/// The ordered pattern table. First match wins.
const PATTERNS: &[(TokenKind, Matcher)] = &[
    (TokenKind::Whitespace, match_whitespace),
    (TokenKind::Comment, match_line_comment),
    (TokenKind::Comment, match_block_comment),
    (TokenKind::Identifier, match_identifier),
    (TokenKind::Number, match_float),
    (TokenKind::Number, match_integer),
    (TokenKind::String, match_double_quoted),
    (TokenKind::String, match_single_quoted),
    (TokenKind::Operator, match_operator),
    (TokenKind::Punctuation, match_punctuation),
];

fn match_whitespace(input: &[char]) -> Option<usize> {
    let len = input.iter().take_while(|c| c.is_whitespace()).count();
    (len > 0).then_some(len)
}

fn match_line_comment(input: &[char]) -> Option<usize> {
    if !input.starts_with(&['/', '/']) {
        return None;
    }
    Some(input.iter().take_while(|&&c| c != '\n').count())
}

fn match_block_comment(input: &[char]) -> Option<usize> {
    if !input.starts_with(&['/', '*']) {
        return None;
    }
    input[2..]
        .windows(2)
        .position(|w| w == ['*', '/'])
        .map(|end| end + 4)
}

fn match_identifier(input: &[char]) -> Option<usize> {
    match input.first() {
        Some(c) if c.is_ascii_alphabetic() || *c == '_' => {}
        _ => return None,
    }
    Some(
        input
            .iter()
            .take_while(|c| c.is_ascii_alphanumeric() || **c == '_')
            .count(),
    )
}

fn count_digits(input: &[char]) -> usize {
    input.iter().take_while(|c| c.is_ascii_digit()).count()
}

fn match_float(input: &[char]) -> Option<usize> {
    let whole = count_digits(input);
    if whole == 0 || input.get(whole) != Some(&'.') {
        return None;
    }
    let fraction = count_digits(&input[whole + 1..]);
    (fraction > 0).then_some(whole + 1 + fraction)
}

fn match_integer(input: &[char]) -> Option<usize> {
    let len = count_digits(input);
    (len > 0).then_some(len)
}

fn match_quoted(input: &[char], quote: char) -> Option<usize> {
    if input.first() != Some(&quote) {
        return None;
    }
    let mut i = 1;
    while i < input.len() {
        match input[i] {
            '\\' => i += 2,
            c if c == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn match_double_quoted(input: &[char]) -> Option<usize> {
    match_quoted(input, '"')
}

fn match_single_quoted(input: &[char]) -> Option<usize> {
    match_quoted(input, '\'')
}

fn match_operator(input: &[char]) -> Option<usize> {
    OPERATORS.iter().find_map(|op| {
        let len = op.chars().count();
        (input.len() >= len && input[..len].iter().copied().eq(op.chars())).then_some(len)
    })
}

fn match_punctuation(input: &[char]) -> Option<usize> {
    input
        .first()
        .filter(|c| PUNCTUATION.contains(*c))
        .map(|_| 1)
}

/// Lexer for DTSL source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    keywords: FxHashSet<&'static str>,
    context_radius: usize,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            keywords: KEYWORDS.iter().copied().collect(),
            context_radius: DEFAULT_CONTEXT_RADIUS,
        }
    }

    pub fn with_context_radius(mut self, radius: usize) -> Self {
        self.context_radius = radius;
        self
    }

    /// Tokenize the entire input.
    ///
    /// Always returns a token list terminated by exactly one `Eof` token,
    /// together with every lexical error encountered.
    pub fn tokenize(&mut self) -> (Vec<Token>, Vec<ParseError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        while !self.is_at_end() {
            let rest = &self.input[self.position..];
            let matched = PATTERNS
                .iter()
                .find_map(|(kind, matcher)| matcher(rest).map(|len| (*kind, len)));

            match matched {
                Some((kind, len)) => {
                    let (line, column) = (self.line, self.column);
                    let text: String = rest[..len].iter().collect();
                    self.advance_by(len);

                    if matches!(kind, TokenKind::Whitespace | TokenKind::Comment) {
                        continue;
                    }
                    tokens.push(Token::new(self.classify(kind, &text), text, line, column));
                }
                None => {
                    let ch = rest[0];
                    errors.push(ParseError::new(
                        ErrorKind::Lex,
                        format!("Unexpected character: '{}'", ch),
                        self.line,
                        self.column,
                        context_window(&self.input, self.position, self.context_radius),
                    ));
                    self.advance_by(1);
                }
            }
        }

        tokens.push(Token::new(TokenKind::Eof, "", self.line, self.column));
        (tokens, errors)
    }

    /// Re-tag identifiers that are reserved words or boolean literals.
    fn classify(&self, kind: TokenKind, text: &str) -> TokenKind {
        if kind != TokenKind::Identifier {
            return kind;
        }
        let mut kind = kind;
        if self.keywords.contains(text) {
            kind = TokenKind::Keyword;
        }
        if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false") {
            kind = TokenKind::Boolean;
        }
        kind
    }

    /// Advance over `count` characters, tracking line and column.
    fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            if self.position >= self.input.len() {
                return;
            }
            if self.input[self.position] == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.position += 1;
        }
    }

    /// Check if at end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }
}
