//! Tokenizer for the provisioning DSL.
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use crate::error::ParseError;

/// Lexical token kinds.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
    Ident(String),
    /// Unescaped string literal contents.
    Str(String),
    /// Numeric literal, kept as written.
    Number(String),
    At,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Equals,
    Comma,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(s) => write!(f, "identifier '{s}'"),
            Self::Str(s) => write!(f, "string \"{s}\""),
            Self::Number(n) => write!(f, "number {n}"),
            Self::At => f.write_str("'@'"),
            Self::LBrace => f.write_str("'{'"),
            Self::RBrace => f.write_str("'}'"),
            Self::LBracket => f.write_str("'['"),
            Self::RBracket => f.write_str("']'"),
            Self::Colon => f.write_str("':'"),
            Self::Equals => f.write_str("'='"),
            Self::Comma => f.write_str("','"),
            Self::Eof => f.write_str("end of input"),
        }
    }
}

/// A token with its 1-based source position.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

impl Spanned {
    /// Build a syntax error located at this token.
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' {
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Spanned, ParseError> {
        self.skip_trivia();
        let (line, column) = (self.line, self.column);
        let Some(&c) = self.chars.peek() else {
            return Ok(Spanned {
                token: Token::Eof,
                line,
                column,
            });
        };

        let token = match c {
            '@' | '{' | '}' | '[' | ']' | ':' | '=' | ',' => {
                self.bump();
                match c {
                    '@' => Token::At,
                    '{' => Token::LBrace,
                    '}' => Token::RBrace,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    ':' => Token::Colon,
                    '=' => Token::Equals,
                    _ => Token::Comma,
                }
            }
            '"' => Token::Str(self.string(line, column)?),
            c if c == '-' || c == '+' || c.is_ascii_digit() => {
                Token::Number(self.number(line, column)?)
            }
            c if c.is_alphabetic() || c == '_' => Token::Ident(self.identifier()),
            other => {
                return Err(self.error(line, column, format!("unexpected character '{other}'")));
            }
        };

        Ok(Spanned {
            token,
            line,
            column,
        })
    }

    fn identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                ident.push(c);
                self.bump();
            } else {
                break;
            }
        }
        ident
    }

    fn digits(&mut self, out: &mut String) -> usize {
        let mut count = 0;
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                out.push(c);
                self.bump();
                count += 1;
            } else {
                break;
            }
        }
        count
    }

    fn number(&mut self, line: usize, column: usize) -> Result<String, ParseError> {
        let mut raw = String::new();
        if let Some(&sign) = self.chars.peek()
            && (sign == '-' || sign == '+')
        {
            if sign == '-' {
                raw.push(sign);
            }
            self.bump();
        }
        if self.digits(&mut raw) == 0 {
            return Err(self.error(line, column, "expected digits in numeric literal"));
        }
        if self.chars.peek() == Some(&'.') {
            raw.push('.');
            self.bump();
            if self.digits(&mut raw) == 0 {
                return Err(self.error(line, column, "expected digits after decimal point"));
            }
        }
        if let Some(&e) = self.chars.peek()
            && (e == 'e' || e == 'E')
        {
            raw.push(e);
            self.bump();
            if let Some(&sign) = self.chars.peek()
                && (sign == '-' || sign == '+')
            {
                raw.push(sign);
                self.bump();
            }
            if self.digits(&mut raw) == 0 {
                return Err(self.error(line, column, "expected digits in exponent"));
            }
        }
        Ok(raw)
    }

    fn string(&mut self, line: usize, column: usize) -> Result<String, ParseError> {
        self.bump(); // opening quote
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error(line, column, "unterminated string literal")),
                Some('"') => return Ok(out),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('/') => '/',
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some('u') => self.unicode_escape(line, column)?,
                        Some(other) => {
                            return Err(self.error(
                                self.line,
                                self.column.saturating_sub(1),
                                format!("invalid escape sequence '\\{other}'"),
                            ));
                        }
                        None => {
                            return Err(self.error(line, column, "unterminated string literal"));
                        }
                    };
                    out.push(escaped);
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn hex4(&mut self, line: usize, column: usize) -> Result<u32, ParseError> {
        let mut code = 0;
        for _ in 0..4 {
            match self.bump().and_then(|c| c.to_digit(16)) {
                Some(digit) => code = code * 16 + digit,
                None => return Err(self.error(line, column, "invalid \\u escape")),
            }
        }
        Ok(code)
    }

    /// Decode `XXXX` after `\u`, joining a UTF-16 surrogate pair written as
    /// two consecutive escapes.
    fn unicode_escape(&mut self, line: usize, column: usize) -> Result<char, ParseError> {
        let high = self.hex4(line, column)?;
        let code = if (0xD800..0xDC00).contains(&high) {
            if self.bump() != Some('\\') || self.bump() != Some('u') {
                return Err(self.error(line, column, format!("unpaired surrogate \\u{high:04x}")));
            }
            let low = self.hex4(line, column)?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(self.error(line, column, format!("unpaired surrogate \\u{high:04x}")));
            }
            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
        } else {
            high
        };
        char::from_u32(code)
            .ok_or_else(|| self.error(line, column, format!("invalid code point \\u{code:04x}")))
    }
}

/// Split `src` into tokens, always terminated by [`Token::Eof`].
pub(super) fn tokenize(src: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut lexer = Lexer::new(src);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token()?;
        let done = tok.token == Token::Eof;
        tokens.push(tok);
        if done {
            return Ok(tokens);
        }
    }
}
