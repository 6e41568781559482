//! Signature tokenizer — converts signature text into a token stream
//!
//! Handles: identifiers, string literals, integer/float literals (with an
//! optional leading `-` and exponent), `true`/`false`/`nil`, and the symbols
//! `[ ] { } , :` and `=>`.
//!
//! Guarantees:
//! - Deterministic: same input always produces same token stream
//! - Every error carries line:column

use crate::{Error, Result};

/// Token types for signature text
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    StringLiteral(String),
    IntegerLiteral(i64),
    FloatLiteral(f64),
    BooleanLiteral(bool),
    Nil,

    // Symbols
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]
    Colon,    // :
    Comma,    // ,
    Arrow,    // =>

    // Other
    Identifier(String),
    Eof,
}

impl Token {
    /// How the token reads in parse errors
    pub fn describe(&self) -> String {
        match self {
            Token::StringLiteral(s) => format!("string \"{}\"", s),
            Token::IntegerLiteral(i) => format!("integer {}", i),
            Token::FloatLiteral(x) => format!("float {:?}", x),
            Token::BooleanLiteral(b) => b.to_string(),
            Token::Nil => "nil".into(),
            Token::LBrace => "'{'".into(),
            Token::RBrace => "'}'".into(),
            Token::LBracket => "'['".into(),
            Token::RBracket => "']'".into(),
            Token::Colon => "':'".into(),
            Token::Comma => "','".into(),
            Token::Arrow => "'=>'".into(),
            Token::Identifier(name) => format!("'{}'", name),
            Token::Eof => "end of input".into(),
        }
    }
}

/// Position in source text for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl Span {
    /// A parse error located at this span
    pub fn error(self, message: impl Into<String>) -> Error {
        Error::Parse {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }
}

/// Token with source position
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Tokenizer for signature text
pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Tokenizer {
    /// Create a new tokenizer for the given input text
    pub fn new(text: &str) -> Self {
        Tokenizer {
            input: text.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input into a stream of spanned tokens
    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();

            let span = self.current_span();
            let Some(ch) = self.peek() else {
                tokens.push(SpannedToken {
                    token: Token::Eof,
                    span,
                });
                break;
            };

            let token = self.next_token(ch, span)?;
            tokens.push(SpannedToken { token, span });
        }

        Ok(tokens)
    }

    // ── Character helpers ──────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.position).copied();
        if let Some(c) = ch {
            self.position += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        ch
    }

    fn current_span(&self) -> Span {
        Span {
            line: self.line,
            column: self.column,
            offset: self.position,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|ch| ch.is_whitespace()) {
            self.advance();
        }
    }

    fn symbol(&mut self, token: Token) -> Result<Token> {
        self.advance();
        Ok(token)
    }

    // ── Main dispatch ──────────────────────────────────────

    fn next_token(&mut self, ch: char, span: Span) -> Result<Token> {
        match ch {
            '{' => self.symbol(Token::LBrace),
            '}' => self.symbol(Token::RBrace),
            '[' => self.symbol(Token::LBracket),
            ']' => self.symbol(Token::RBracket),
            ':' => self.symbol(Token::Colon),
            ',' => self.symbol(Token::Comma),
            '=' if self.peek_ahead(1) == Some('>') => {
                self.advance();
                self.symbol(Token::Arrow)
            }
            '"' => self.read_string(span),
            '-' if self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number(span)
            }
            c if c.is_ascii_digit() => self.read_number(span),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.read_identifier()),
            _ => Err(span.error(format!("unexpected character '{}'", ch))),
        }
    }

    // ── String literals ────────────────────────────────────

    fn read_string(&mut self, span: Span) -> Result<Token> {
        self.advance(); // opening "
        let mut value = String::new();

        loop {
            match self.advance() {
                None => return Err(span.error("unterminated string")),
                Some('"') => break,
                Some('\\') => {
                    let escape = self.current_span();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('\\') => value.push('\\'),
                        Some('"') => value.push('"'),
                        Some(c) => {
                            return Err(escape.error(format!("invalid escape sequence '\\{}'", c)))
                        }
                        None => return Err(escape.error("unterminated escape sequence")),
                    }
                }
                Some(c) => value.push(c),
            }
        }

        Ok(Token::StringLiteral(value))
    }

    // ── Numbers ────────────────────────────────────────────

    fn read_number(&mut self, span: Span) -> Result<Token> {
        let start = self.position;
        let mut is_float = false;

        if self.peek() == Some('-') {
            self.advance();
        }
        self.read_digits();

        if self.peek() == Some('.') && self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            self.read_digits();
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let signed = matches!(self.peek_ahead(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_ahead(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.advance();
                if signed {
                    self.advance();
                }
                self.read_digits();
            }
        }

        let text: String = self.input[start..self.position].iter().collect();
        if is_float {
            text.parse()
                .map(Token::FloatLiteral)
                .map_err(|_| span.error(format!("invalid float '{}'", text)))
        } else {
            text.parse()
                .map(Token::IntegerLiteral)
                .map_err(|_| span.error(format!("invalid integer '{}'", text)))
        }
    }

    fn read_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    // ── Identifiers ────────────────────────────────────────

    fn read_identifier(&mut self) -> Token {
        let start = self.position;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }

        let text: String = self.input[start..self.position].iter().collect();
        match text.as_str() {
            "true" => Token::BooleanLiteral(true),
            "false" => Token::BooleanLiteral(false),
            "nil" => Token::Nil,
            _ => Token::Identifier(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<Token> {
        Tokenizer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|st| st.token)
            .collect()
    }

    fn tokenize_err(input: &str) -> String {
        Tokenizer::new(input).tokenize().unwrap_err().to_string()
    }

    fn ident(name: &str) -> Token {
        Token::Identifier(name.to_string())
    }

    // ── Symbols ────────────────────────────────────────

    #[test]
    fn test_tokenize_signature() {
        let tokens = tokenize("Integer, Args[String] => Integer");
        assert_eq!(
            tokens,
            vec![
                ident("Integer"),
                Token::Comma,
                ident("Args"),
                Token::LBracket,
                ident("String"),
                Token::RBracket,
                Token::Arrow,
                ident("Integer"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_mapping_symbols() {
        let tokens = tokenize("{name: String}");
        assert_eq!(
            tokens,
            vec![
                Token::LBrace,
                ident("name"),
                Token::Colon,
                ident("String"),
                Token::RBrace,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lone_equals_rejected() {
        assert!(tokenize_err("Integer = Integer").contains("unexpected character '='"));
    }

    // ── Literals ───────────────────────────────────────

    #[test]
    fn test_tokenize_numbers() {
        let tokens = tokenize("42 -7 1.5 -0.25 1e20 2.5E-3");
        assert_eq!(
            tokens,
            vec![
                Token::IntegerLiteral(42),
                Token::IntegerLiteral(-7),
                Token::FloatLiteral(1.5),
                Token::FloatLiteral(-0.25),
                Token::FloatLiteral(1e20),
                Token::FloatLiteral(2.5e-3),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_integer_overflow_rejected() {
        assert!(tokenize_err("99999999999999999999").contains("invalid integer"));
    }

    #[test]
    fn test_tokenize_keyword_literals() {
        let tokens = tokenize("true false nil None");
        assert_eq!(
            tokens,
            vec![
                Token::BooleanLiteral(true),
                Token::BooleanLiteral(false),
                Token::Nil,
                ident("None"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_string_escape_sequences() {
        let tokens = tokenize(r#""line\none\ttab\\slash\"quote""#);
        assert_eq!(
            tokens,
            vec![
                Token::StringLiteral("line\none\ttab\\slash\"quote".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize_err(r#"Integer => "abc"#);
        assert!(err.contains("1:12"), "got: {}", err);
        assert!(err.contains("unterminated string"));
    }

    #[test]
    fn test_invalid_escape() {
        assert!(tokenize_err(r#""\q""#).contains("invalid escape sequence"));
    }

    // ── Spans ──────────────────────────────────────────

    #[test]
    fn test_spans_track_lines() {
        let tokens = Tokenizer::new("Integer,\n  String").tokenize().unwrap();
        assert_eq!(tokens[0].span.line, 1);
        assert_eq!(tokens[0].span.column, 1);
        assert_eq!(tokens[2].span.line, 2);
        assert_eq!(tokens[2].span.column, 3);
    }

    #[test]
    fn test_determinism_100_iterations() {
        let input = "Or[Integer, \"a\"], {k: Maybe[Float]} => Func[Nat => Bool]";
        let first = tokenize(input);
        for _ in 0..100 {
            assert_eq!(tokenize(input), first);
        }
    }
}
