//! Tokenizer for query expressions.
//!
//! Produces a flat token stream terminated by [`TokenType::Eof`]. Positions
//! are zero-based code-point offsets into the original expression so that
//! syntax errors can point at the offending span.

use crate::error::SyntaxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Star,
    Dot,
    /// `[?`
    Filter,
    /// `[]`
    Flatten,
    Lparen,
    Rparen,
    Lbracket,
    Rbracket,
    Lbrace,
    Rbrace,
    /// `||`
    Or,
    /// `|`
    Pipe,
    Number,
    UnquotedIdentifier,
    QuotedIdentifier,
    Comma,
    Colon,
    Plus,
    Minus,
    /// `*` in infix position, or the U+00D7 multiplication sign.
    Multiply,
    /// `/`, or the U+00F7 division sign.
    Divide,
    /// `%`
    Modulo,
    /// `//`, integer (floor) division.
    Div,
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Ne,
    /// A JSON value between back-ticks; the token carries the raw text.
    JsonLiteral,
    /// A raw string between single quotes; the token carries the decoded text.
    StringLiteral,
    /// `@`
    Current,
    /// `$`
    Root,
    /// `&`
    Expref,
    /// `&&`
    And,
    /// `!`
    Not,
    /// `$name`; the token carries the name without the `$`.
    Varref,
    /// `=`
    Assign,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    /// The lexeme. Decoded for quoted identifiers and string literals, raw
    /// contents for JSON literals.
    pub value: String,
    /// Zero-based code-point offset.
    pub position: usize,
    /// Code-point count of the lexeme.
    pub length: usize,
}

impl Token {
    fn new(token_type: TokenType, value: impl Into<String>, position: usize, length: usize) -> Self {
        Self {
            token_type,
            value: value.into(),
            position,
            length,
        }
    }
}

/// Tokenizes a full expression.
pub fn tokenize(expression: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer::new(expression).run()
}

struct Lexer<'a> {
    expression: &'a str,
    chars: Vec<char>,
    position: usize,
}

impl<'a> Lexer<'a> {
    fn new(expression: &'a str) -> Self {
        Self {
            expression,
            chars: expression.chars().collect(),
            position: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn error(&self, message: impl Into<String>, position: usize) -> SyntaxError {
        SyntaxError::new(message, self.expression, position, 1)
    }

    fn run(mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.current() {
            let start = self.position;
            match ch {
                ' ' | '\t' | '\r' | '\n' => self.advance(),
                '.' => tokens.push(self.simple(TokenType::Dot, ".")),
                '*' => tokens.push(self.simple(TokenType::Star, "*")),
                '(' => tokens.push(self.simple(TokenType::Lparen, "(")),
                ')' => tokens.push(self.simple(TokenType::Rparen, ")")),
                ']' => tokens.push(self.simple(TokenType::Rbracket, "]")),
                '{' => tokens.push(self.simple(TokenType::Lbrace, "{")),
                '}' => tokens.push(self.simple(TokenType::Rbrace, "}")),
                ',' => tokens.push(self.simple(TokenType::Comma, ",")),
                ':' => tokens.push(self.simple(TokenType::Colon, ":")),
                '@' => tokens.push(self.simple(TokenType::Current, "@")),
                '+' => tokens.push(self.simple(TokenType::Plus, "+")),
                '%' => tokens.push(self.simple(TokenType::Modulo, "%")),
                '\u{2212}' => tokens.push(self.simple(TokenType::Minus, "\u{2212}")),
                '\u{00d7}' => tokens.push(self.simple(TokenType::Multiply, "\u{00d7}")),
                '\u{00f7}' => tokens.push(self.simple(TokenType::Divide, "\u{00f7}")),
                '[' => match self.peek(1) {
                    Some('?') => tokens.push(self.pair(TokenType::Filter, "[?")),
                    Some(']') => tokens.push(self.pair(TokenType::Flatten, "[]")),
                    _ => tokens.push(self.simple(TokenType::Lbracket, "[")),
                },
                '|' => match self.peek(1) {
                    Some('|') => tokens.push(self.pair(TokenType::Or, "||")),
                    _ => tokens.push(self.simple(TokenType::Pipe, "|")),
                },
                '&' => match self.peek(1) {
                    Some('&') => tokens.push(self.pair(TokenType::And, "&&")),
                    _ => tokens.push(self.simple(TokenType::Expref, "&")),
                },
                '/' => match self.peek(1) {
                    Some('/') => tokens.push(self.pair(TokenType::Div, "//")),
                    _ => tokens.push(self.simple(TokenType::Divide, "/")),
                },
                '<' => match self.peek(1) {
                    Some('=') => tokens.push(self.pair(TokenType::Lte, "<=")),
                    _ => tokens.push(self.simple(TokenType::Lt, "<")),
                },
                '>' => match self.peek(1) {
                    Some('=') => tokens.push(self.pair(TokenType::Gte, ">=")),
                    _ => tokens.push(self.simple(TokenType::Gt, ">")),
                },
                '=' => match self.peek(1) {
                    Some('=') => tokens.push(self.pair(TokenType::Eq, "==")),
                    _ => tokens.push(self.simple(TokenType::Assign, "=")),
                },
                '!' => match self.peek(1) {
                    Some('=') => tokens.push(self.pair(TokenType::Ne, "!=")),
                    _ => tokens.push(self.simple(TokenType::Not, "!")),
                },
                '-' => {
                    if self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
                        tokens.push(self.number());
                    } else {
                        tokens.push(self.simple(TokenType::Minus, "-"));
                    }
                }
                '$' => {
                    if self.peek(1).is_some_and(is_identifier_start) {
                        self.advance();
                        let name = self.identifier();
                        let length = name.chars().count() + 1;
                        tokens.push(Token::new(TokenType::Varref, name, start, length));
                    } else {
                        tokens.push(self.simple(TokenType::Root, "$"));
                    }
                }
                '"' => tokens.push(self.quoted_identifier()?),
                '\'' => tokens.push(self.raw_string()?),
                '`' => tokens.push(self.json_literal()?),
                c if c.is_ascii_digit() => tokens.push(self.number()),
                c if is_identifier_start(c) => {
                    let name = self.identifier();
                    let length = name.chars().count();
                    tokens.push(Token::new(TokenType::UnquotedIdentifier, name, start, length));
                }
                c => return Err(self.error(format!("Unknown char: {c:?}"), start)),
            }
        }
        tokens.push(Token::new(TokenType::Eof, "", self.chars.len(), 0));
        Ok(tokens)
    }

    fn simple(&mut self, token_type: TokenType, lexeme: &str) -> Token {
        let token = Token::new(token_type, lexeme, self.position, 1);
        self.advance();
        token
    }

    fn pair(&mut self, token_type: TokenType, lexeme: &str) -> Token {
        let token = Token::new(token_type, lexeme, self.position, 2);
        self.advance();
        self.advance();
        token
    }

    fn identifier(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.current() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        name
    }

    fn number(&mut self) -> Token {
        let start = self.position;
        let mut lexeme = String::new();
        if self.current() == Some('-') {
            lexeme.push('-');
            self.advance();
        }
        while let Some(c) = self.current() {
            if c.is_ascii_digit() {
                lexeme.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let length = lexeme.len();
        Token::new(TokenType::Number, lexeme, start, length)
    }

    /// `"..."` with the full set of JSON string escapes. The raw span is
    /// collected and handed to the JSON decoder, which also takes care of
    /// `\uXXXX` surrogate pairs.
    fn quoted_identifier(&mut self) -> Result<Token, SyntaxError> {
        let start = self.position;
        self.advance();
        let mut raw = String::new();
        loop {
            match self.current() {
                None => return Err(self.error("Missing closing double quote", start)),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    raw.push('\\');
                    self.advance();
                    if let Some(c) = self.current() {
                        raw.push(c);
                        self.advance();
                    }
                }
                Some(c) => {
                    raw.push(c);
                    self.advance();
                }
            }
        }
        let decoded: String = serde_json::from_str(&format!("\"{raw}\""))
            .map_err(|_| self.error(format!("Invalid quoted identifier: \"{raw}\""), start))?;
        let length = decoded.chars().count();
        Ok(Token::new(TokenType::QuotedIdentifier, decoded, start, length))
    }

    /// `'...'`: only `\'` and `\\` are escapes, any other backslash is
    /// taken literally.
    fn raw_string(&mut self) -> Result<Token, SyntaxError> {
        let start = self.position;
        self.advance();
        let mut value = String::new();
        loop {
            match self.current() {
                None => return Err(self.error("Missing closing single quote", start)),
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some('\\') => match self.peek(1) {
                    Some('\'') => {
                        value.push('\'');
                        self.advance();
                        self.advance();
                    }
                    Some('\\') => {
                        value.push('\\');
                        self.advance();
                        self.advance();
                    }
                    _ => {
                        value.push('\\');
                        self.advance();
                    }
                },
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
        let length = value.chars().count();
        Ok(Token::new(TokenType::StringLiteral, value, start + 1, length))
    }

    /// `` `...` ``: the contents are raw JSON text; only ``\` `` is an
    /// escape. Validity of the JSON is checked by the parser, which can
    /// report the literal's position.
    fn json_literal(&mut self) -> Result<Token, SyntaxError> {
        let start = self.position;
        self.advance();
        let mut value = String::new();
        loop {
            match self.current() {
                None => return Err(self.error("Missing closing back-tick", start)),
                Some('`') => {
                    self.advance();
                    break;
                }
                Some('\\') if self.peek(1) == Some('`') => {
                    value.push('`');
                    self.advance();
                    self.advance();
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
        let length = value.chars().count();
        Ok(Token::new(TokenType::JsonLiteral, value, start + 1, length))
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}
