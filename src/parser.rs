//! Pratt (top-down operator-precedence) parser.
//!
//! Every token has a binding power; prefix positions are handled by
//! [`Parser::nud`], infix positions by [`Parser::led`]. The main loop in
//! [`Parser::parse_expression`] keeps folding the left-hand side while the
//! upcoming token binds tighter than the caller's right binding power.

use log::trace;
use serde_json::Value;

use crate::ast::Node;
use crate::error::SyntaxError;
use crate::lexer::{tokenize, Token, TokenType};
use crate::value::SliceParams;

/// Left binding power of a token in infix position. Tokens that never bind
/// as infix operators have power zero and end the fold loop.
fn binding_power(token_type: TokenType) -> usize {
    use TokenType::*;
    match token_type {
        Pipe => 1,
        Or => 2,
        And => 3,
        Eq | Ne | Lt | Lte | Gt | Gte => 5,
        Plus | Minus => 6,
        Multiply | Divide | Modulo | Div => 7,
        Flatten => 9,
        Star => 20,
        Filter => 21,
        Dot => 40,
        Not => 45,
        Lbrace => 50,
        Lbracket => 55,
        Lparen => 60,
        _ => 0,
    }
}

/// Right binding power of the prefix operators.
const UNARY_BINDING_POWER: usize = 45;

/// Binding power threshold above which a token can start a projection RHS.
const PROJECTION_STOP: usize = 10;

/// Parses a full expression down to its tree form.
pub fn parse(expression: &str) -> Result<Node, SyntaxError> {
    let tokens = tokenize(expression)?;
    trace!("lexed {} tokens from {expression:?}", tokens.len());
    Parser {
        expression,
        tokens,
        position: 0,
    }
    .parse_program()
}

struct Parser<'a> {
    expression: &'a str,
    tokens: Vec<Token>,
    position: usize,
}

impl Parser<'_> {
    fn parse_program(mut self) -> Result<Node, SyntaxError> {
        let parsed = self.parse_expression(0)?;
        if self.current() != TokenType::Eof {
            let token = self.current_token().clone();
            return Err(self.error(
                format!(
                    "Unexpected token at the end of the expression: {:?}",
                    token.token_type
                ),
                &token,
            ));
        }
        Ok(parsed)
    }

    fn parse_expression(&mut self, right_binding_power: usize) -> Result<Node, SyntaxError> {
        let token = self.advance();
        let mut left = self.nud(token)?;
        while right_binding_power < binding_power(self.current()) {
            let token = self.advance();
            left = self.led(token, left)?;
        }
        Ok(left)
    }

    // --- Token plumbing ---

    fn current(&self) -> TokenType {
        self.current_token().token_type
    }

    fn current_token(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn lookahead(&self, offset: usize) -> TokenType {
        let index = (self.position + offset).min(self.tokens.len() - 1);
        self.tokens[index].token_type
    }

    fn advance(&mut self) -> Token {
        let token = self.current_token().clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    fn expect(&mut self, token_type: TokenType) -> Result<Token, SyntaxError> {
        let token = self.current_token().clone();
        if token.token_type == token_type {
            Ok(self.advance())
        } else {
            Err(self.error(
                format!("Expected {token_type:?}, received: {:?}", token.token_type),
                &token,
            ))
        }
    }

    fn error(&self, message: impl Into<String>, token: &Token) -> SyntaxError {
        SyntaxError::new(message, self.expression, token.position, token.length)
    }

    // --- Prefix handlers ---

    fn nud(&mut self, token: Token) -> Result<Node, SyntaxError> {
        use TokenType::*;
        match token.token_type {
            JsonLiteral => {
                let value: Value = serde_json::from_str(&token.value)
                    .map_err(|e| self.error(format!("Invalid JSON literal: {e}"), &token))?;
                Ok(Node::Literal(value))
            }
            StringLiteral => Ok(Node::Literal(Value::String(token.value))),
            Number => Ok(Node::Literal(Value::from(self.integer(&token)?))),
            UnquotedIdentifier => {
                if token.value == "let" && self.current() == Varref {
                    self.parse_let_expression()
                } else {
                    Ok(Node::Field(token.value))
                }
            }
            QuotedIdentifier => {
                if self.current() == Lparen {
                    Err(self.error(
                        "Quoted identifiers cannot be used as function names",
                        &token,
                    ))
                } else {
                    Ok(Node::Field(token.value))
                }
            }
            Current => Ok(Node::CurrentNode),
            Root => Ok(Node::RootNode),
            Varref => Ok(Node::Variable(token.value)),
            Star => {
                let right = self.parse_projection_rhs(binding_power(Star))?;
                Ok(Node::ValueProjection {
                    left: Box::new(Node::Identity),
                    right: Box::new(right),
                })
            }
            Filter => self.parse_filter(Node::Identity),
            Flatten => {
                let right = self.parse_projection_rhs(binding_power(Flatten))?;
                Ok(Node::Projection {
                    left: Box::new(Node::Flatten(Box::new(Node::Identity))),
                    right: Box::new(right),
                })
            }
            Lbrace => self.parse_multi_select_hash(),
            Lbracket => {
                if matches!(self.current(), Number | Colon) {
                    let right = self.parse_index_expression()?;
                    self.project_if_slice(Node::Identity, right)
                } else if self.current() == Star && self.lookahead(1) == Rbracket {
                    self.advance();
                    self.advance();
                    let right = self.parse_projection_rhs(binding_power(Star))?;
                    Ok(Node::Projection {
                        left: Box::new(Node::Identity),
                        right: Box::new(right),
                    })
                } else {
                    self.parse_multi_select_list()
                }
            }
            Expref => {
                let expr = self.parse_expression(0)?;
                Ok(Node::ExpRef(Box::new(expr)))
            }
            Not => {
                let expr = self.parse_expression(UNARY_BINDING_POWER)?;
                Ok(Node::NotExpression(Box::new(expr)))
            }
            Plus | Minus => {
                let operand = self.parse_expression(UNARY_BINDING_POWER)?;
                Ok(Node::ArithmeticUnaryExpression {
                    op: token.token_type,
                    operand: Box::new(operand),
                })
            }
            Lparen => {
                let expr = self.parse_expression(0)?;
                self.expect(Rparen)?;
                Ok(expr)
            }
            Eof => Err(self.error("Incomplete expression", &token)),
            _ => Err(self.error(
                format!("Invalid token: {:?}", token.token_type),
                &token,
            )),
        }
    }

    // --- Infix handlers ---

    fn led(&mut self, token: Token, left: Node) -> Result<Node, SyntaxError> {
        use TokenType::*;
        match token.token_type {
            Dot => {
                if self.current() == Star {
                    self.advance();
                    let right = self.parse_projection_rhs(binding_power(Dot))?;
                    Ok(Node::ValueProjection {
                        left: Box::new(left),
                        right: Box::new(right),
                    })
                } else {
                    let right = self.parse_dot_rhs(binding_power(Dot))?;
                    Ok(Node::Subexpression {
                        left: Box::new(left),
                        right: Box::new(right),
                    })
                }
            }
            Pipe => {
                let right = self.parse_expression(binding_power(Pipe))?;
                Ok(Node::Pipe {
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            Or => {
                let right = self.parse_expression(binding_power(Or))?;
                Ok(Node::OrExpression {
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            And => {
                let right = self.parse_expression(binding_power(And))?;
                Ok(Node::AndExpression {
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            Eq | Ne | Lt | Lte | Gt | Gte => {
                let right = self.parse_expression(binding_power(token.token_type))?;
                Ok(Node::Comparator {
                    op: token.token_type,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            Plus | Minus | Divide | Modulo | Div => {
                let right = self.parse_expression(binding_power(token.token_type))?;
                Ok(Node::ArithmeticExpression {
                    op: token.token_type,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            // `*` after a complete expression is multiplication; its right
            // operand binds at the multiplicative power.
            Star | Multiply => {
                let right = self.parse_expression(binding_power(Multiply))?;
                Ok(Node::ArithmeticExpression {
                    op: Multiply,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            Flatten => {
                let right = self.parse_projection_rhs(binding_power(Flatten))?;
                Ok(Node::Projection {
                    left: Box::new(Node::Flatten(Box::new(left))),
                    right: Box::new(right),
                })
            }
            Filter => self.parse_filter(left),
            Lbracket => {
                if matches!(self.current(), Number | Colon) {
                    let right = self.parse_index_expression()?;
                    self.project_if_slice(left, right)
                } else {
                    self.expect(Star)?;
                    self.expect(Rbracket)?;
                    let right = self.parse_projection_rhs(binding_power(Star))?;
                    Ok(Node::Projection {
                        left: Box::new(left),
                        right: Box::new(right),
                    })
                }
            }
            Lparen => {
                let name = match left {
                    Node::Field(name) => name,
                    _ => {
                        return Err(self.error(
                            "A function name must be a bare identifier",
                            &token,
                        ));
                    }
                };
                let mut args = Vec::new();
                while self.current() != Rparen {
                    let arg = self.parse_expression(0)?;
                    if self.current() == Comma {
                        self.advance();
                    }
                    args.push(arg);
                }
                self.expect(Rparen)?;
                Ok(Node::FunctionExpression { name, args })
            }
            _ => Err(self.error(
                format!("Invalid token: {:?}", token.token_type),
                &token,
            )),
        }
    }

    // --- Grammar fragments ---

    /// The expression to apply element-wise on the right of a projection.
    /// Tokens that bind loosely (comparators, pipes, ...) end the
    /// projection and leave an identity on the right.
    fn parse_projection_rhs(&mut self, rbp: usize) -> Result<Node, SyntaxError> {
        use TokenType::*;
        if binding_power(self.current()) < PROJECTION_STOP {
            return Ok(Node::Identity);
        }
        match self.current() {
            Lbracket | Filter => self.parse_expression(rbp),
            Dot => {
                self.advance();
                self.parse_dot_rhs(rbp)
            }
            _ => {
                let token = self.current_token().clone();
                Err(self.error("Expected '.', '[', or '[?'", &token))
            }
        }
    }

    fn parse_dot_rhs(&mut self, rbp: usize) -> Result<Node, SyntaxError> {
        use TokenType::*;
        match self.current() {
            UnquotedIdentifier | QuotedIdentifier | Star => self.parse_expression(rbp),
            Lbracket => {
                self.advance();
                self.parse_multi_select_list()
            }
            Lbrace => {
                self.advance();
                self.parse_multi_select_hash()
            }
            _ => {
                let token = self.current_token().clone();
                Err(self.error("Expected identifier, '[', or '{'", &token))
            }
        }
    }

    /// `[?condition]` with an optional projected RHS after the bracket.
    fn parse_filter(&mut self, left: Node) -> Result<Node, SyntaxError> {
        let condition = self.parse_expression(0)?;
        self.expect(TokenType::Rbracket)?;
        let right = if self.current() == TokenType::Flatten {
            Node::Identity
        } else {
            self.parse_projection_rhs(binding_power(TokenType::Filter))?
        };
        Ok(Node::FilterProjection {
            left: Box::new(left),
            right: Box::new(right),
            condition: Box::new(condition),
        })
    }

    /// The contents of a `[` that starts with a number or colon: either a
    /// plain index or a slice.
    fn parse_index_expression(&mut self) -> Result<Node, SyntaxError> {
        if self.current() == TokenType::Colon || self.lookahead(1) == TokenType::Colon {
            self.parse_slice_expression()
        } else {
            let token = self.expect(TokenType::Number)?;
            let index = self.integer(&token)?;
            self.expect(TokenType::Rbracket)?;
            Ok(Node::Index(index))
        }
    }

    fn parse_slice_expression(&mut self) -> Result<Node, SyntaxError> {
        let mut parts: [Option<i64>; 3] = [None, None, None];
        let mut index = 0;
        while self.current() != TokenType::Rbracket {
            match self.current() {
                TokenType::Colon => {
                    index += 1;
                    if index == 3 {
                        let token = self.current_token().clone();
                        return Err(self.error("Too many colons in slice expression", &token));
                    }
                    self.advance();
                }
                TokenType::Number => {
                    let token = self.advance();
                    parts[index] = Some(self.integer(&token)?);
                }
                _ => {
                    let token = self.current_token().clone();
                    return Err(self.error("Expected ':' or a number in slice expression", &token));
                }
            }
        }
        self.expect(TokenType::Rbracket)?;
        Ok(Node::Slice(SliceParams {
            start: parts[0],
            stop: parts[1],
            step: parts[2],
        }))
    }

    /// An index into an array is a plain sub-expression; a slice projects
    /// over its result.
    fn project_if_slice(&mut self, left: Node, right: Node) -> Result<Node, SyntaxError> {
        let is_slice = matches!(right, Node::Slice(_));
        let index_expr = Node::IndexExpression {
            left: Box::new(left),
            right: Box::new(right),
        };
        if is_slice {
            let rhs = self.parse_projection_rhs(binding_power(TokenType::Star))?;
            Ok(Node::Projection {
                left: Box::new(index_expr),
                right: Box::new(rhs),
            })
        } else {
            Ok(index_expr)
        }
    }

    fn parse_multi_select_list(&mut self) -> Result<Node, SyntaxError> {
        let mut expressions = Vec::new();
        loop {
            expressions.push(self.parse_expression(0)?);
            if self.current() == TokenType::Rbracket {
                break;
            }
            self.expect(TokenType::Comma)?;
        }
        self.expect(TokenType::Rbracket)?;
        Ok(Node::MultiSelectList(expressions))
    }

    fn parse_multi_select_hash(&mut self) -> Result<Node, SyntaxError> {
        use TokenType::*;
        let mut children = Vec::new();
        loop {
            let key_token = self.current_token().clone();
            if !matches!(key_token.token_type, UnquotedIdentifier | QuotedIdentifier) {
                return Err(self.error("Expected an identifier key", &key_token));
            }
            self.advance();
            self.expect(Colon)?;
            let value = self.parse_expression(0)?;
            children.push(Node::KeyValPair {
                key: key_token.value,
                value: Box::new(value),
            });
            match self.current() {
                Comma => {
                    self.advance();
                }
                Rbrace => {
                    self.advance();
                    break;
                }
                _ => {
                    let token = self.current_token().clone();
                    return Err(self.error("Expected ',' or '}'", &token));
                }
            }
        }
        Ok(Node::MultiSelectHash(children))
    }

    /// `let $a = expr, $b = expr in body`. Recognized from an unquoted
    /// `let` identifier followed by a variable reference; `let` and `in`
    /// stay ordinary identifiers everywhere else.
    fn parse_let_expression(&mut self) -> Result<Node, SyntaxError> {
        let mut bindings = Vec::new();
        loop {
            let var_token = self.expect(TokenType::Varref)?;
            self.expect(TokenType::Assign)?;
            let expr = self.parse_expression(0)?;
            bindings.push(Node::Binding {
                variable: Box::new(Node::Variable(var_token.value)),
                expr: Box::new(expr),
            });
            if self.current() == TokenType::Comma {
                self.advance();
            } else {
                break;
            }
        }
        let in_token = self.current_token().clone();
        if in_token.token_type != TokenType::UnquotedIdentifier || in_token.value != "in" {
            return Err(self.error("Expected 'in' after let bindings", &in_token));
        }
        self.advance();
        let body = self.parse_expression(0)?;
        Ok(Node::LetExpression {
            bindings: Box::new(Node::Bindings(bindings)),
            body: Box::new(body),
        })
    }

    fn integer(&self, token: &Token) -> Result<i64, SyntaxError> {
        token
            .value
            .parse::<i64>()
            .map_err(|_| self.error(format!("Invalid number: {}", token.value), token))
    }
}
