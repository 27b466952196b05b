// ============================================================================
// spark-bind - Expression Parser
// Recursive descent over the token stream, lowest precedence first
// ============================================================================
//
//   chain          := assignment (';' assignment)*
//   assignment     := conditional (('=' | '+=' | '-=' | '*=' | '/=') assignment)?
//   conditional    := logical_or ('?' conditional ':' conditional)?
//   logical_or     := logical_and ('||' logical_and)*
//   logical_and    := nullish ('&&' nullish)*
//   nullish        := equality ('??' equality)*
//   equality       := relational (('==' | '!=' | '===' | '!==') relational)*
//   relational     := additive (('<' | '>' | '<=' | '>=') additive)*
//   additive       := multiplicative (('+' | '-') multiplicative)*
//   multiplicative := prefix (('*' | '/' | '%') prefix)*
//   prefix         := ('!' | '-' | '+' | 'typeof' | '++' | '--') prefix | postfix
//   postfix        := call_chain ('++' | '--')?
//   call_chain     := primary ('.' ident | '[' chain ']' | '(' args ')')*
// ============================================================================

use serde_json::Value;

use super::ast::{AssignOp, BinaryOp, Expr, LogicalOp, UnaryOp};
use super::lexer::{tokenize, Token, TokenKind};
use crate::error::EvaluationError;

/// Parse an expression into its AST.
pub fn parse(source: &str) -> Result<Expr, EvaluationError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        index: 0,
    };

    if parser.tokens.is_empty() {
        return Err(parser.error("empty expression"));
    }

    let expr = parser.parse_chain()?;
    if let Some(token) = parser.current() {
        let message = format!("unexpected token {:?}", token.kind);
        return Err(parser.error(message));
    }
    Ok(expr)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    index: usize,
}

impl Parser<'_> {
    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    fn error(&self, message: impl Into<String>) -> EvaluationError {
        EvaluationError::Syntax {
            expression: self.source.to_string(),
            offset: self.current().map_or(self.source.len(), |t| t.index),
            message: message.into(),
        }
    }

    fn at_operator(&self, op: &str) -> bool {
        self.current().is_some_and(|t| t.is_operator(op))
    }

    fn consume_operator(&mut self, op: &str) -> bool {
        if self.at_operator(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_operator(&mut self, op: &str) -> Result<(), EvaluationError> {
        if self.consume_operator(op) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{op}`")))
        }
    }

    /// The operator at the cursor if it is one of `ops`.
    fn match_operator(&self, ops: &[&'static str]) -> Option<&'static str> {
        match self.current()?.kind {
            TokenKind::Operator(op) if ops.contains(&op) => Some(op),
            _ => None,
        }
    }

    // =========================================================================
    // STATEMENTS AND ASSIGNMENT
    // =========================================================================

    fn parse_chain(&mut self) -> Result<Expr, EvaluationError> {
        let mut expressions = vec![self.parse_assignment()?];

        while self.consume_operator(";") {
            if self.current().is_none() || self.at_operator(";") {
                continue;
            }
            expressions.push(self.parse_assignment()?);
        }

        if expressions.len() == 1 {
            Ok(expressions.remove(0))
        } else {
            Ok(Expr::Chain(expressions))
        }
    }

    fn parse_assignment(&mut self) -> Result<Expr, EvaluationError> {
        let left = self.parse_conditional()?;

        let Some(op) = self.match_operator(&["=", "+=", "-=", "*=", "/="]) else {
            return Ok(left);
        };
        if !left.is_assignable() {
            return Err(EvaluationError::NotAssignable(left.to_string()));
        }
        self.advance();

        let op = match op {
            "=" => AssignOp::Assign,
            "+=" => AssignOp::Add,
            "-=" => AssignOp::Sub,
            "*=" => AssignOp::Mul,
            _ => AssignOp::Div,
        };
        let value = self.parse_assignment()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(left),
            value: Box::new(value),
        })
    }

    fn parse_conditional(&mut self) -> Result<Expr, EvaluationError> {
        let test = self.parse_logical_or()?;

        if !self.consume_operator("?") {
            return Ok(test);
        }
        let consequent = self.parse_assignment()?;
        self.expect_operator(":")?;
        let alternate = self.parse_assignment()?;

        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    // =========================================================================
    // BINARY OPERATORS
    // =========================================================================

    fn parse_logical(
        &mut self,
        op_text: &'static str,
        op: LogicalOp,
        next: fn(&mut Self) -> Result<Expr, EvaluationError>,
    ) -> Result<Expr, EvaluationError> {
        let mut left = next(self)?;
        while self.consume_operator(op_text) {
            let right = next(self)?;
            left = Expr::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_logical_or(&mut self) -> Result<Expr, EvaluationError> {
        self.parse_logical("||", LogicalOp::Or, Self::parse_logical_and)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, EvaluationError> {
        self.parse_logical("&&", LogicalOp::And, Self::parse_nullish)
    }

    fn parse_nullish(&mut self) -> Result<Expr, EvaluationError> {
        self.parse_logical("??", LogicalOp::Nullish, Self::parse_equality)
    }

    fn parse_binary(
        &mut self,
        ops: &[(&'static str, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, EvaluationError>,
    ) -> Result<Expr, EvaluationError> {
        let texts: Vec<&'static str> = ops.iter().map(|(text, _)| *text).collect();
        let mut left = next(self)?;

        while let Some(text) = self.match_operator(&texts) {
            self.advance();
            let op = ops
                .iter()
                .find(|(t, _)| *t == text)
                .map(|(_, op)| *op)
                .ok_or_else(|| self.error("unknown operator"))?;
            let right = next(self)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, EvaluationError> {
        self.parse_binary(
            &[
                ("==", BinaryOp::Eq),
                ("!=", BinaryOp::NotEq),
                ("===", BinaryOp::StrictEq),
                ("!==", BinaryOp::StrictNotEq),
            ],
            Self::parse_relational,
        )
    }

    fn parse_relational(&mut self) -> Result<Expr, EvaluationError> {
        self.parse_binary(
            &[
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
                ("<=", BinaryOp::Le),
                (">=", BinaryOp::Ge),
            ],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, EvaluationError> {
        self.parse_binary(
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EvaluationError> {
        self.parse_binary(
            &[
                ("*", BinaryOp::Mul),
                ("/", BinaryOp::Div),
                ("%", BinaryOp::Rem),
            ],
            Self::parse_prefix,
        )
    }

    // =========================================================================
    // UNARY AND POSTFIX
    // =========================================================================

    fn parse_prefix(&mut self) -> Result<Expr, EvaluationError> {
        let unary = match self.current().map(|t| &t.kind) {
            Some(TokenKind::Operator("!")) => Some(UnaryOp::Not),
            Some(TokenKind::Operator("-")) => Some(UnaryOp::Minus),
            Some(TokenKind::Operator("+")) => Some(UnaryOp::Plus),
            Some(TokenKind::Identifier(name)) if name == "typeof" => Some(UnaryOp::TypeOf),
            _ => None,
        };
        if let Some(op) = unary {
            self.advance();
            let operand = self.parse_prefix()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }

        if let Some(op) = self.match_operator(&["++", "--"]) {
            self.advance();
            let target = self.parse_prefix()?;
            if !target.is_assignable() {
                return Err(EvaluationError::NotAssignable(target.to_string()));
            }
            return Ok(Expr::Update {
                increment: op == "++",
                prefix: true,
                target: Box::new(target),
            });
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, EvaluationError> {
        let expr = self.parse_call_chain()?;

        match self.match_operator(&["++", "--"]) {
            Some(op) if expr.is_assignable() => {
                self.advance();
                Ok(Expr::Update {
                    increment: op == "++",
                    prefix: false,
                    target: Box::new(expr),
                })
            }
            Some(_) => Err(EvaluationError::NotAssignable(expr.to_string())),
            None => Ok(expr),
        }
    }

    fn parse_call_chain(&mut self) -> Result<Expr, EvaluationError> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.consume_operator(".") {
                let property = match self.current().map(|t| &t.kind) {
                    Some(TokenKind::Identifier(name)) => name.clone(),
                    _ => return Err(self.error("expected property name after `.`")),
                };
                self.advance();
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.consume_operator("[") {
                let index = self.parse_assignment()?;
                self.expect_operator("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.consume_operator("(") {
                let args = self.parse_list(")")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to `close`, which is consumed.
    /// A trailing comma is allowed.
    fn parse_list(&mut self, close: &str) -> Result<Vec<Expr>, EvaluationError> {
        let mut items = Vec::new();
        while !self.consume_operator(close) {
            items.push(self.parse_assignment()?);
            if !self.consume_operator(",") {
                self.expect_operator(close)?;
                break;
            }
        }
        Ok(items)
    }

    // =========================================================================
    // PRIMARY
    // =========================================================================

    fn parse_primary(&mut self) -> Result<Expr, EvaluationError> {
        let Some(token) = self.current().cloned() else {
            return Err(self.error("unexpected end of expression"));
        };

        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Literal(super::value::number(n)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::Literal(Value::String(s)))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(match name.as_str() {
                    "true" => Expr::Literal(Value::Bool(true)),
                    "false" => Expr::Literal(Value::Bool(false)),
                    "null" | "undefined" => Expr::Literal(Value::Null),
                    _ => Expr::Identifier(name),
                })
            }
            TokenKind::Operator("(") => {
                self.advance();
                let expr = self.parse_assignment()?;
                self.expect_operator(")")?;
                Ok(expr)
            }
            TokenKind::Operator("[") => {
                self.advance();
                Ok(Expr::Array(self.parse_list("]")?))
            }
            TokenKind::Operator("{") => {
                self.advance();
                self.parse_object()
            }
            TokenKind::Operator(op) => Err(self.error(format!("unexpected `{op}`"))),
        }
    }

    fn parse_object(&mut self) -> Result<Expr, EvaluationError> {
        let mut entries = Vec::new();

        while !self.consume_operator("}") {
            let token = self
                .current()
                .cloned()
                .ok_or_else(|| self.error("unterminated object literal"))?;
            let key = match token.kind {
                TokenKind::Identifier(name) | TokenKind::String(name) => name,
                TokenKind::Number(n) => super::value::format_number(n),
                TokenKind::Operator(_) => return Err(self.error("expected property key")),
            };
            self.advance();

            let value = if self.consume_operator(":") {
                self.parse_assignment()?
            } else {
                // Shorthand `{ name }`
                Expr::Identifier(key.clone())
            };
            entries.push((key, value));

            if !self.consume_operator(",") {
                self.expect_operator("}")?;
                break;
            }
        }

        Ok(Expr::Object(entries))
    }
}

// =============================================================================
// TESTS
// =============================================================================
