//! Recursive-descent parser producing a [`NodeTree`].
//!
//! The grammar is LL(1): every decision is made from the current token and,
//! for statements, the token following the identifier.
//!
//! ```text
//! statement  ::= annotation? ident ( ':' type_expr '=' value
//!                                  | '=' value
//!                                  | ident '{' statement* '}' )
//! type_expr  ::= ident ( '[' (string | ident) ']' )?
//! annotation ::= '@' '{' pairs '}'
//! value      ::= string | number | object | array
//! ```
use serde_json::{Map, Number, Value};

use super::lexer::{Spanned, Token, tokenize};
use super::{Node, NodeContent, NodeTree};
use crate::error::ParseError;

/// Parse DSL source text into an ordered node tree.
///
/// # Examples
///
/// ```
/// use provision_cli::dsl::parse;
///
/// let tree = parse(r#"
///     bucket: Resource["aws_s3_bucket"] = { region = "eu-west-1" }
///     jobs Sequential {
///         first: Resource["noop"] = {}
///     }
/// "#).unwrap();
///
/// assert_eq!(tree["bucket"].kind, "resource");
/// assert_eq!(tree["bucket"].node_type, "aws_s3_bucket");
/// assert_eq!(tree["jobs"].node_type, "sequential");
/// assert!(tree["jobs"].body().unwrap().contains_key("first"));
/// ```
///
/// # Errors
///
/// Returns [`ParseError::Syntax`] with the position of the first offending
/// token.
pub fn parse(src: &str) -> Result<NodeTree, ParseError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let tree = parser.statements(false)?;
    parser.expect(&Token::Eof)?;
    Ok(tree)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Spanned {
        // The token stream always ends with Eof and `advance` never moves past it.
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .unwrap_or(&EOF)
    }

    fn peek_second(&self) -> &Token {
        self.tokens
            .get(self.pos + 1)
            .map_or(&Token::Eof, |s| &s.token)
    }

    fn advance(&mut self) -> Spanned {
        let tok = self.peek().clone();
        if tok.token != Token::Eof {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<Spanned, ParseError> {
        let tok = self.peek();
        if &tok.token == expected {
            Ok(self.advance())
        } else {
            Err(tok.error(format!("expected {expected} but found {}", tok.token)))
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if &self.peek().token == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn identifier(&mut self) -> Result<(String, Spanned), ParseError> {
        let tok = self.advance();
        match &tok.token {
            Token::Ident(name) => Ok((name.clone(), tok)),
            other => Err(tok.error(format!("expected identifier but found {other}"))),
        }
    }

    /// Statements until end of input (top level) or a closing brace (group body).
    fn statements(&mut self, in_group: bool) -> Result<NodeTree, ParseError> {
        let mut tree = NodeTree::new();
        loop {
            match self.peek().token {
                Token::Eof => return Ok(tree),
                Token::RBrace if in_group => return Ok(tree),
                _ => {}
            }
            let (name, node, at) = self.statement()?;
            if tree.contains_key(&name) {
                return Err(at.error(format!("duplicate identifier '{name}' in this scope")));
            }
            tree.insert(name, node);
        }
    }

    fn statement(&mut self) -> Result<(String, Node, Spanned), ParseError> {
        let attr = if self.peek().token == Token::At {
            self.advance();
            self.expect(&Token::LBrace)?;
            self.pairs()?
        } else {
            Map::new()
        };

        let (name, at) = self.identifier()?;
        let tok = self.peek().clone();
        let opens_body = *self.peek_second() == Token::LBrace;
        let node = match (&tok.token, opens_body) {
            (Token::Equals, _) => {
                self.advance();
                Node::leaf("variable", "default", self.value()?)
            }
            (Token::Colon, _) => {
                self.advance();
                let (kind, node_type) = self.type_expr()?;
                self.expect(&Token::Equals)?;
                Node::leaf(&kind, &node_type, self.value()?)
            }
            (Token::Ident(group_type), true) => {
                let group_type = group_type.to_lowercase();
                self.advance();
                self.advance();
                let body = self.statements(true)?;
                self.expect(&Token::RBrace)?;
                Node {
                    kind: super::GROUP_KIND.to_string(),
                    node_type: group_type,
                    attr: Map::new(),
                    content: NodeContent::Body(body),
                }
            }
            (other, _) => {
                return Err(tok.error(format!(
                    "expected '=', ':' or a group keyword after '{name}' but found {other}"
                )));
            }
        };
        Ok((name, node.with_attr(attr), at))
    }

    fn type_expr(&mut self) -> Result<(String, String), ParseError> {
        let (kind, _) = self.identifier()?;
        let node_type = if self.eat(&Token::LBracket) {
            let tok = self.advance();
            let node_type = match &tok.token {
                Token::Str(s) | Token::Ident(s) => s.clone(),
                other => {
                    return Err(tok.error(format!("expected resource type but found {other}")));
                }
            };
            self.expect(&Token::RBracket)?;
            node_type
        } else {
            "default".to_string()
        };
        Ok((kind.to_lowercase(), node_type.to_lowercase()))
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        let tok = self.advance();
        match &tok.token {
            Token::Str(s) => Ok(Value::String(s.clone())),
            Token::Number(raw) => number(raw).ok_or_else(|| {
                tok.error(format!("numeric literal {raw} is out of range"))
            }),
            Token::LBrace => Ok(Value::Object(self.pairs()?)),
            Token::LBracket => self.array(),
            other => Err(tok.error(format!("expected a value but found {other}"))),
        }
    }

    /// Key/value pairs up to and including the closing brace.
    fn pairs(&mut self) -> Result<Map<String, Value>, ParseError> {
        let mut map = Map::new();
        while !self.eat(&Token::RBrace) {
            let tok = self.advance();
            let key = match tok.token {
                Token::Ident(ref k) | Token::Str(ref k) => k.clone(),
                ref other => {
                    return Err(tok.error(format!("expected a key or '}}' but found {other}")));
                }
            };
            let sep = self.advance();
            if !matches!(sep.token, Token::Equals | Token::Colon) {
                return Err(sep.error(format!("expected '=' or ':' but found {}", sep.token)));
            }
            let value = self.value()?;
            if map.insert(key.clone(), value).is_some() {
                return Err(tok.error(format!("duplicate key '{key}'")));
            }
            self.eat(&Token::Comma);
        }
        Ok(map)
    }

    /// Array elements up to and including the closing bracket.
    fn array(&mut self) -> Result<Value, ParseError> {
        let mut items = Vec::new();
        while !self.eat(&Token::RBracket) {
            if self.peek().token == Token::Eof {
                return Err(self.peek().error("unterminated array literal"));
            }
            items.push(self.value()?);
            self.eat(&Token::Comma);
        }
        Ok(Value::Array(items))
    }
}

static EOF: Spanned = Spanned {
    token: Token::Eof,
    line: 0,
    column: 0,
};

/// Integer unless the literal has a fraction or exponent marker.  Integers
/// too wide for `i64` fall back to `u64`, then to `f64`.
fn number(raw: &str) -> Option<Value> {
    let float = || raw.parse::<f64>().ok().and_then(Number::from_f64);
    let parsed = if raw.contains(['.', 'e', 'E']) {
        float()
    } else {
        raw.parse::<i64>()
            .map(Number::from)
            .or_else(|_| raw.parse::<u64>().map(Number::from))
            .ok()
            .or_else(float)
    };
    parsed.map(Value::Number)
}
