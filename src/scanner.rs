use crate::token::{Token, TokenType};
use phf::phf_map;
use std::error::Error;
use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq)]
pub struct ScanError {
    pub line: i32,
    pub message: String,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] error: {}", self.line, self.message.as_str())
    }
}

impl Error for ScanError {}

// Note: current becomes self.iter.peek()?.0
struct Scanner<'a> {
    source: &'a str,
    iter: Peekable<CharIndices<'a>>,
    start: usize,
    line: i32,
}

/// Tokenizes the whole buffer. Lexical errors are collected rather than
/// returned early, so the token list is always complete and ends with `EOF`.
pub fn scan_tokens(source: &str) -> (Vec<Token<'_>>, Vec<ScanError>) {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut scanner = Scanner {
        source,
        iter: source.char_indices().peekable(),
        start: 0,
        line: 1,
    };
    let mut tokens: Vec<Token> = Vec::new();
    let mut errors: Vec<ScanError> = Vec::new();

    while let Some(&(idx, _)) = scanner.iter.peek() {
        scanner.start = idx;
        match scanner.scan_token() {
            Ok(Some(token)) => {
                trace!(kind = %token.tokentype, lexeme = token.lexeme, line = token.line, "token");
                tokens.push(token);
            }
            Ok(None) => {}
            Err(e) => {
                debug!(line = e.line, message = e.message.as_str(), "scan error");
                errors.push(e);
            }
        }
    }
    tokens.push(Token {
        tokentype: TokenType::EOF,
        lexeme: "",
        line: scanner.line,
    });
    debug!(tokens = tokens.len(), errors = errors.len(), "scanned source");
    (tokens, errors)
}

impl<'a> Scanner<'a> {
    fn scan_token(&mut self) -> Result<Option<Token<'a>>, ScanError> {
        let c = match self.iter.next() {
            Some((_, c)) => c,
            None => return Ok(None),
        };
        match c {
            '(' => Ok(Some(self.token(TokenType::LeftParen))),
            ')' => Ok(Some(self.token(TokenType::RightParen))),
            '{' => Ok(Some(self.token(TokenType::LeftBrace))),
            '}' => Ok(Some(self.token(TokenType::RightBrace))),
            ',' => Ok(Some(self.token(TokenType::Comma))),
            '.' => Ok(Some(self.token(TokenType::Dot))),
            '-' => Ok(Some(self.token(TokenType::Minus))),
            '+' => Ok(Some(self.token(TokenType::Plus))),
            ';' => Ok(Some(self.token(TokenType::Semicolon))),
            '*' => Ok(Some(self.token(TokenType::Star))),
            '!' => Ok(Some(self.one_or_two('=', TokenType::BangEqual, TokenType::Bang))),
            '=' => Ok(Some(self.one_or_two('=', TokenType::EqualEqual, TokenType::Equal))),
            '<' => Ok(Some(self.one_or_two('=', TokenType::LessEqual, TokenType::Less))),
            '>' => Ok(Some(self.one_or_two('=', TokenType::GreaterEqual, TokenType::Greater))),
            '/' => {
                if self.next_if('/') {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.iter.next();
                    }
                    Ok(None)
                } else {
                    Ok(Some(self.token(TokenType::Slash)))
                }
            }
            ' ' | '\r' | '\t' => Ok(None),
            '\n' => {
                self.line += 1;
                Ok(None)
            }
            '"' | '\'' => Ok(Some(self.string(c)?)),
            '0'..='9' => Ok(Some(self.number())),
            c if is_alpha(c) => Ok(Some(self.identifier())),
            _ => Err(self.error("Unexpected character.")),
        }
    }
    fn current(&mut self) -> usize {
        match self.iter.peek() {
            None => self.source.len(),
            Some((idx, _)) => *idx,
        }
    }
    fn token(&mut self, token_type: TokenType<'a>) -> Token<'a> {
        let source = self.source;
        let current = self.current();
        Token {
            tokentype: token_type,
            lexeme: &source[self.start..current],
            line: self.line,
        }
    }
    fn one_or_two(
        &mut self,
        second: char,
        matched: TokenType<'a>,
        single: TokenType<'a>,
    ) -> Token<'a> {
        if self.next_if(second) {
            self.token(matched)
        } else {
            self.token(single)
        }
    }
    fn error(&self, message: &str) -> ScanError {
        ScanError {
            line: self.line,
            message: message.to_string(),
        }
    }
    fn peek(&mut self) -> Option<char> {
        self.iter.peek().map(|&(_, c)| c)
    }
    fn peek_next(&self) -> Option<char> {
        let mut lookahead = self.iter.clone();
        lookahead.next();
        lookahead.next().map(|(_, c)| c)
    }
    fn next_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.iter.next();
            return true;
        }
        false
    }
    fn string(&mut self, quote: char) -> Result<Token<'a>, ScanError> {
        loop {
            match self.iter.next() {
                None => return Err(self.error("Unterminated string.")),
                Some((_, c)) if c == quote => break,
                Some((_, '\n')) => self.line += 1,
                Some(_) => {}
            }
        }
        let source = self.source;
        let current = self.current();
        // Both quote characters are a single byte wide.
        Ok(self.token(TokenType::String(&source[self.start + 1..current - 1])))
    }
    fn digits(&mut self) {
        while let Some('0'..='9') = self.peek() {
            self.iter.next();
        }
    }
    fn number(&mut self) -> Token<'a> {
        self.digits();

        // A trailing '.' with no digit after it is left for the next token.
        if self.peek() == Some('.') && matches!(self.peek_next(), Some('0'..='9')) {
            self.iter.next();
            self.digits();
        }

        let source = self.source;
        let current = self.current();
        // Digits with an optional fraction always parse. Values too large for
        // an f64 come back as infinity rather than an error.
        let value = source[self.start..current]
            .parse::<f64>()
            .unwrap_or(f64::INFINITY);
        self.token(TokenType::Number(value))
    }
    fn identifier(&mut self) -> Token<'a> {
        while let Some(c) = self.peek() {
            if !is_alpha(c) && !c.is_ascii_digit() {
                break;
            }
            self.iter.next();
        }
        let source = self.source;
        let current = self.current();
        let text = &source[self.start..current];
        match KEYWORDS.get(text) {
            None => self.token(TokenType::Identifier(text)),
            Some(x) => self.token(x.clone()),
        }
    }
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

static KEYWORDS: phf::Map<&'static str, TokenType<'static>> = phf_map! {
    "and" => TokenType::And,
    "class" => TokenType::Class,
    "else" => TokenType::Else,
    "false" => TokenType::False,
    "for" => TokenType::For,
    "fun" => TokenType::Fun,
    "if" => TokenType::If,
    "nil" => TokenType::Nil,
    "or" => TokenType::Or,
    "print" => TokenType::Print,
    "return" => TokenType::Return,
    "super" => TokenType::Super,
    "this" => TokenType::This,
    "true" => TokenType::True,
    "var" => TokenType::Var,
    "while" => TokenType::While,
};
