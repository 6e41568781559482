//! Signature parser — tokenizer, declaration type and recursive descent parser
//!
//! Reads the text form that [`Signature::describe`](crate::Signature::describe)
//! produces back into a [`Declaration`]:
//!
//! ```text
//! signature := [spec {"," spec}] "=>" spec
//! spec      := type | refinement | None | literal
//!            | "[" specs "]" | "{" pairs "}"
//!            | Args[spec] | Maybe[spec] | Not[spec] | ArrayOf[spec]
//!            | Or[specs] | And[specs] | Enum[values] | Eq[value]
//!            | HashOf[spec => spec] | KeywordArgs[pairs]
//!            | Func[specs => spec]
//! value     := literal | "[" values "]" | "{" key ":" value, ... "}"
//! ```
//!
//! Predicates and custom contracts render by name only and are rejected here
//! as unknown contracts. Input nested deeper than [`MAX_DEPTH`] is rejected.

pub mod ast;
pub mod tokenizer;

use std::collections::BTreeMap;

pub use ast::Declaration;
use tokenizer::{Span, SpannedToken, Token, Tokenizer};

use crate::spec::{ContractSpec, Refinement};
use crate::value::{ScalarType, Value};
use crate::Result;

/// Parse signature text into a declaration
///
/// # Errors
/// Returns `Error::Parse` with line:column for the first syntax violation.
pub fn parse(input: &str) -> Result<Declaration> {
    let mut parser = Parser::new(input)?;
    let declaration = parser.signature()?;
    parser.expect(Token::Eof)?;
    Ok(declaration)
}

/// Parse a single contract, e.g. `Maybe[Integer]`
pub fn parse_spec(input: &str) -> Result<ContractSpec> {
    let mut parser = Parser::new(input)?;
    let spec = parser.spec()?;
    parser.expect(Token::Eof)?;
    Ok(spec)
}

/// Deepest nesting of contracts and values the parser accepts
pub const MAX_DEPTH: usize = 128;

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(input: &str) -> Result<Self> {
        let tokens = Tokenizer::new(input).tokenize()?;
        Ok(Parser {
            tokens,
            pos: 0,
            depth: 0,
        })
    }

    // ── Token helpers ──────────────────────────────────────

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or(Span {
                line: 1,
                column: 1,
                offset: 0,
            })
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek() == expected
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(self.span().error(format!(
                "expected {}, found {}",
                expected.describe(),
                self.peek().describe()
            )))
        }
    }

    // ── Grammar ────────────────────────────────────────────

    fn signature(&mut self) -> Result<Declaration> {
        let args = self.list_until(&Token::Arrow, Self::spec)?;
        self.expect(Token::Arrow)?;
        let returns = self.spec()?;
        Ok(Declaration::new(args, returns))
    }

    /// Comma-separated items up to (not including) `end`
    fn list_until<T>(
        &mut self,
        end: &Token,
        mut item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        if self.check(end) {
            return Ok(items);
        }
        loop {
            items.push(item(self)?);
            if !self.eat(&Token::Comma) {
                return Ok(items);
            }
        }
    }

    /// Run `parse` one nesting level deeper
    fn nest<T>(&mut self, parse: impl FnOnce(&mut Self, Span) -> Result<T>) -> Result<T> {
        let span = self.span();
        if self.depth >= MAX_DEPTH {
            return Err(span.error("contract nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self, span);
        self.depth -= 1;
        result
    }

    fn spec(&mut self) -> Result<ContractSpec> {
        self.nest(Self::contract)
    }

    fn contract(&mut self, span: Span) -> Result<ContractSpec> {
        match self.advance() {
            Token::LBracket => {
                let items = self.list_until(&Token::RBracket, Self::spec)?;
                self.expect(Token::RBracket)?;
                Ok(ContractSpec::Tuple(items))
            }
            Token::LBrace => {
                let pairs = self.entries(&Token::RBrace, Self::spec)?;
                self.expect(Token::RBrace)?;
                Ok(ContractSpec::Mapping(pairs))
            }
            Token::Identifier(name) => self.named(&name, span),
            token => {
                let found = token.describe();
                literal(token)
                    .map(ContractSpec::Exactly)
                    .ok_or_else(|| span.error(format!("expected a contract, found {}", found)))
            }
        }
    }

    fn named(&mut self, name: &str, span: Span) -> Result<ContractSpec> {
        if let Some(t) = ScalarType::from_name(name) {
            return Ok(ContractSpec::Type(t));
        }
        let simple = match name {
            "Pos" => Some(ContractSpec::Refined(Refinement::Pos)),
            "Neg" => Some(ContractSpec::Refined(Refinement::Neg)),
            "Nat" => Some(ContractSpec::Refined(Refinement::Nat)),
            "None" => Some(ContractSpec::Never),
            _ => None,
        };
        if let Some(spec) = simple {
            return Ok(spec);
        }

        let known = matches!(
            name,
            "Args" | "Maybe" | "Not" | "ArrayOf" | "Or" | "And" | "Enum" | "Eq"
                | "HashOf" | "KeywordArgs" | "Func"
        );
        if !known {
            return Err(span.error(format!("unknown contract '{}'", name)));
        }

        self.expect(Token::LBracket)?;
        let spec = match name {
            "Args" => ContractSpec::Variadic(Box::new(self.spec()?)),
            "Maybe" => ContractSpec::Maybe(Box::new(self.spec()?)),
            "Not" => ContractSpec::Not(Box::new(self.spec()?)),
            "ArrayOf" => ContractSpec::ListOf(Box::new(self.spec()?)),
            "Or" => ContractSpec::AnyOf(self.list_until(&Token::RBracket, Self::spec)?),
            "And" => ContractSpec::AllOf(self.list_until(&Token::RBracket, Self::spec)?),
            "Enum" => ContractSpec::OneOf(self.list_until(&Token::RBracket, Self::value)?),
            "Eq" => ContractSpec::Exactly(self.value()?),
            "HashOf" => {
                let key = self.spec()?;
                self.expect(Token::Arrow)?;
                let value = self.spec()?;
                ContractSpec::MapOf(Box::new(key), Box::new(value))
            }
            "KeywordArgs" => ContractSpec::Keywords(self.entries(&Token::RBracket, Self::spec)?),
            _ => {
                let Declaration { args, returns } = self.signature()?;
                ContractSpec::function(args, returns)
            }
        };
        self.expect(Token::RBracket)?;
        Ok(spec)
    }

    fn value(&mut self) -> Result<Value> {
        self.nest(Self::constant)
    }

    fn constant(&mut self, span: Span) -> Result<Value> {
        match self.advance() {
            Token::LBracket => {
                let items = self.list_until(&Token::RBracket, Self::value)?;
                self.expect(Token::RBracket)?;
                Ok(Value::Array(items))
            }
            Token::LBrace => {
                let entries = self.entries(&Token::RBrace, Self::value)?;
                self.expect(Token::RBrace)?;
                Ok(Value::Object(entries))
            }
            token => {
                let found = token.describe();
                literal(token)
                    .ok_or_else(|| span.error(format!("expected a literal, found {}", found)))
            }
        }
    }

    /// `key: item` pairs up to (not including) `end`
    fn entries<T>(
        &mut self,
        end: &Token,
        mut item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<BTreeMap<String, T>> {
        let mut entries = BTreeMap::new();
        let parsed = self.list_until(end, |p| {
            let span = p.span();
            let key = match p.advance() {
                Token::Identifier(name) => name,
                Token::StringLiteral(s) => s,
                Token::BooleanLiteral(b) => b.to_string(),
                Token::Nil => "nil".to_string(),
                other => {
                    return Err(span.error(format!("expected a key, found {}", other.describe())))
                }
            };
            p.expect(Token::Colon)?;
            Ok((span, key, item(p)?))
        })?;
        for (span, key, entry) in parsed {
            if entries.insert(key.clone(), entry).is_some() {
                return Err(span.error(format!("duplicate key '{}'", key)));
            }
        }
        Ok(entries)
    }
}

fn literal(token: Token) -> Option<Value> {
    match token {
        Token::StringLiteral(s) => Some(Value::String(s)),
        Token::IntegerLiteral(i) => Some(Value::Integer(i)),
        Token::FloatLiteral(x) => Some(Value::Float(x)),
        Token::BooleanLiteral(b) => Some(Value::Boolean(b)),
        Token::Nil => Some(Value::Null),
        _ => None,
    }
}
