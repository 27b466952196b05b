// ============================================================================
// spark-bind - Expression Lexer
// ============================================================================

use crate::error::EvaluationError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    String(String),
    Identifier(String),
    /// Operators and punctuation
    Operator(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Byte offset of the token in the source
    pub index: usize,
    pub kind: TokenKind,
}

impl Token {
    pub fn is_operator(&self, op: &str) -> bool {
        matches!(self.kind, TokenKind::Operator(o) if o == op)
    }
}

/// Longest first, so `===` wins over `==` and `=`.
const OPERATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "??", "++", "--", "+=", "-=", "*=", "/=",
    "+", "-", "*", "/", "%", "<", ">", "!", "=", "?", ":", ".", ",", ";", "(", ")", "[", "]", "{",
    "}",
];

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Split an expression into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, EvaluationError> {
    Lexer { source, pos: 0 }.run()
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
}

impl Lexer<'_> {
    fn error(&self, offset: usize, message: impl Into<String>) -> EvaluationError {
        EvaluationError::Syntax {
            expression: self.source.to_string(),
            offset,
            message: message.into(),
        }
    }

    fn rest(&self) -> &str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn run(mut self) -> Result<Vec<Token>, EvaluationError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            let index = self.pos;

            if c.is_whitespace() {
                self.pos += c.len_utf8();
                continue;
            }

            let kind = if c.is_ascii_digit()
                || (c == '.' && self.rest()[1..].starts_with(|d: char| d.is_ascii_digit()))
            {
                self.scan_number()?
            } else if c == '\'' || c == '"' {
                self.scan_string(c)?
            } else if is_identifier_start(c) {
                let len = self
                    .rest()
                    .find(|ch: char| !is_identifier_part(ch))
                    .unwrap_or(self.rest().len());
                let ident = self.rest()[..len].to_string();
                self.pos += len;
                TokenKind::Identifier(ident)
            } else if let Some(op) = OPERATORS.iter().find(|op| self.rest().starts_with(**op)) {
                self.pos += op.len();
                TokenKind::Operator(*op)
            } else {
                return Err(self.error(index, format!("unexpected character `{c}`")));
            };

            tokens.push(Token { index, kind });
        }

        Ok(tokens)
    }

    fn scan_number(&mut self) -> Result<TokenKind, EvaluationError> {
        let start = self.pos;
        let bytes = self.source.as_bytes();
        let digits = |pos: &mut usize| {
            while bytes.get(*pos).is_some_and(u8::is_ascii_digit) {
                *pos += 1;
            }
        };

        let mut pos = self.pos;
        digits(&mut pos);
        if bytes.get(pos) == Some(&b'.') {
            pos += 1;
            digits(&mut pos);
        }
        if matches!(bytes.get(pos), Some(b'e' | b'E')) {
            let mut exp = pos + 1;
            if matches!(bytes.get(exp), Some(b'+' | b'-')) {
                exp += 1;
            }
            if bytes.get(exp).is_some_and(u8::is_ascii_digit) {
                pos = exp;
                digits(&mut pos);
            }
        }

        self.pos = pos;
        let text = &self.source[start..pos];
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| self.error(start, format!("invalid number `{text}`")))
    }

    fn scan_string(&mut self, quote: char) -> Result<TokenKind, EvaluationError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();

        loop {
            let Some(c) = self.peek() else {
                return Err(self.error(start, "unterminated string"));
            };
            self.pos += c.len_utf8();

            if c == quote {
                return Ok(TokenKind::String(out));
            }
            if c != '\\' {
                out.push(c);
                continue;
            }

            let Some(escaped) = self.peek() else {
                return Err(self.error(start, "unterminated string"));
            };
            self.pos += escaped.len_utf8();
            match escaped {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '0' => out.push('\0'),
                'u' => {
                    let hex = self.rest().get(..4).unwrap_or("");
                    let code = u32::from_str_radix(hex, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| self.error(self.pos, "invalid unicode escape"))?;
                    self.pos += 4;
                    out.push(code);
                }
                other => out.push(other),
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
