//! Message tokenizer
//!
//! Turns a raw log message into a [`Sequence`] of typed tokens. Plain text
//! messages are split on whitespace and a small set of structural
//! punctuation; JSON messages are flattened into `key = value` runs.
//!
//! A [`Scanner`] keeps scratch buffers between calls, so each thread owns
//! its own instance.

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde_json::Value;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use thiserror::Error;

use crate::config::InputFormat;

/// Characters that always form a token of their own in text messages
const DELIMITERS: &[char] = &['[', ']', '(', ')', '{', '}', '=', ',', ';', '"'];

/// Token standing for an empty quoted string or an empty JSON key/value
const EMPTY_STRING: &str = "\"\"";

/// Type assigned to a token by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Literal,
    Integer,
    Float,
    Hex,
    Ipv4,
    Ipv6,
    Mac,
    Time,
    Date,
    Timestamp,
    Url,
}

impl TokenKind {
    pub const ALL: [TokenKind; 11] = [
        TokenKind::Literal,
        TokenKind::Integer,
        TokenKind::Float,
        TokenKind::Hex,
        TokenKind::Ipv4,
        TokenKind::Ipv6,
        TokenKind::Mac,
        TokenKind::Time,
        TokenKind::Date,
        TokenKind::Timestamp,
        TokenKind::Url,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Literal => "literal",
            TokenKind::Integer => "integer",
            TokenKind::Float => "float",
            TokenKind::Hex => "hex",
            TokenKind::Ipv4 => "ipv4",
            TokenKind::Ipv6 => "ipv6",
            TokenKind::Mac => "mac",
            TokenKind::Time => "time",
            TokenKind::Date => "date",
            TokenKind::Timestamp => "timestamp",
            TokenKind::Url => "url",
        }
    }

    /// Placeholder used for this kind in pattern text, e.g. `%integer%`
    pub fn placeholder(self) -> &'static str {
        match self {
            TokenKind::Literal => "%literal%",
            TokenKind::Integer => "%integer%",
            TokenKind::Float => "%float%",
            TokenKind::Hex => "%hex%",
            TokenKind::Ipv4 => "%ipv4%",
            TokenKind::Ipv6 => "%ipv6%",
            TokenKind::Mac => "%mac%",
            TokenKind::Time => "%time%",
            TokenKind::Date => "%date%",
            TokenKind::Timestamp => "%timestamp%",
            TokenKind::Url => "%url%",
        }
    }

    pub fn from_placeholder(text: &str) -> Option<Self> {
        TokenKind::ALL
            .into_iter()
            .find(|kind| kind.placeholder() == text)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self::new(TokenKind::Literal, value)
    }

    /// Literal tokens render as their value, typed tokens as their placeholder
    pub fn pattern_text(&self) -> &str {
        match self.kind {
            TokenKind::Literal => &self.value,
            kind => kind.placeholder(),
        }
    }
}

/// Tokenized form of one message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sequence {
    tokens: Vec<Token>,
}

impl Sequence {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Pattern text of every token joined with single spaces
    pub fn signature(&self) -> String {
        let mut signature = String::new();
        for (idx, token) in self.tokens.iter().enumerate() {
            if idx > 0 {
                signature.push(' ');
            }
            signature.push_str(token.pattern_text());
        }
        signature
    }

    /// One token per line: position, kind and value
    pub fn print_tokens(&self) -> String {
        let mut output = String::new();
        for (idx, token) in self.tokens.iter().enumerate() {
            output.push_str(&format!(
                "# {:>3}: {:<10} {}\n",
                idx,
                token.kind.name(),
                token.value
            ));
        }
        output.trim_end().to_string()
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("message contains no tokens")]
    Empty,
    #[error("invalid JSON message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("JSON message must be an object, found {0}")]
    NotAnObject(&'static str),
}

#[derive(Debug)]
pub struct Scanner {
    format: InputFormat,
    word: String,
    capacity_hint: usize,
}

impl Scanner {
    pub fn new(format: InputFormat) -> Self {
        Self {
            format,
            word: String::new(),
            capacity_hint: 16,
        }
    }

    pub fn scan(&mut self, message: &str) -> Result<Sequence, ScanError> {
        let mut tokens = Vec::with_capacity(self.capacity_hint);
        match self.format {
            InputFormat::Text => self.scan_text(message, &mut tokens),
            InputFormat::Json => self.scan_json(message, &mut tokens)?,
        }

        if tokens.is_empty() {
            return Err(ScanError::Empty);
        }

        self.capacity_hint = self.capacity_hint.max(tokens.len());
        Ok(Sequence::new(tokens))
    }

    fn scan_text(&mut self, text: &str, tokens: &mut Vec<Token>) {
        for word in text.split_whitespace() {
            if word.contains("://") && classify(word) == TokenKind::Url {
                tokens.push(Token::new(TokenKind::Url, word));
                continue;
            }
            if word == EMPTY_STRING {
                tokens.push(Token::literal(EMPTY_STRING));
                continue;
            }

            for ch in word.chars() {
                if DELIMITERS.contains(&ch) {
                    flush_word(&mut self.word, tokens);
                    tokens.push(Token::literal(ch.to_string()));
                } else {
                    self.word.push(ch);
                }
            }
            flush_word(&mut self.word, tokens);
        }
    }

    fn scan_json(&mut self, message: &str, tokens: &mut Vec<Token>) -> Result<(), ScanError> {
        match serde_json::from_str::<Value>(message)? {
            Value::Object(map) => {
                for (key, value) in &map {
                    self.flatten_json(key, value, tokens);
                }
                Ok(())
            }
            other => Err(ScanError::NotAnObject(json_type_name(&other))),
        }
    }

    fn flatten_json(&mut self, key: &str, value: &Value, tokens: &mut Vec<Token>) {
        match value {
            Value::Object(map) => {
                for (child, nested) in map {
                    self.flatten_json(&format!("{}.{}", key, child), nested, tokens);
                }
            }
            Value::Array(items) => {
                for (idx, nested) in items.iter().enumerate() {
                    self.flatten_json(&format!("{}.{}", key, idx), nested, tokens);
                }
            }
            Value::String(text) => {
                self.push_key(key, tokens);
                self.scan_text_or_empty(text, tokens);
            }
            Value::Number(number) => {
                self.push_key(key, tokens);
                let kind = if number.is_f64() {
                    TokenKind::Float
                } else {
                    TokenKind::Integer
                };
                tokens.push(Token::new(kind, number.to_string()));
            }
            Value::Bool(flag) => {
                self.push_key(key, tokens);
                tokens.push(Token::literal(flag.to_string()));
            }
            Value::Null => {
                self.push_key(key, tokens);
                tokens.push(Token::literal("null"));
            }
        }
    }

    /// Keys go through the text rules so a rendered pattern scans back to
    /// the same tokens
    fn push_key(&mut self, key: &str, tokens: &mut Vec<Token>) {
        self.scan_text_or_empty(key, tokens);
        tokens.push(Token::literal("="));
    }

    fn scan_text_or_empty(&mut self, text: &str, tokens: &mut Vec<Token>) {
        let before = tokens.len();
        self.scan_text(text, tokens);
        if tokens.len() == before {
            tokens.push(Token::literal(EMPTY_STRING));
        }
    }
}

fn flush_word(word: &mut String, tokens: &mut Vec<Token>) {
    if word.is_empty() {
        return;
    }

    let kind = classify(word);
    if kind == TokenKind::Literal && word.len() > 1 {
        // Trailing ':' or '.' is punctuation unless it is part of a run like "..."
        if let Some(last) = word.chars().last().filter(|c| *c == ':' || *c == '.') {
            let head = &word[..word.len() - 1];
            if !head.ends_with(last) {
                tokens.push(Token::new(classify(head), head));
                tokens.push(Token::literal(last.to_string()));
                word.clear();
                return;
            }
        }
    }

    tokens.push(Token::new(kind, word.as_str()));
    word.clear();
}

/// Assign a token kind to a single word
pub fn classify(word: &str) -> TokenKind {
    if word.is_empty() {
        return TokenKind::Literal;
    }

    if is_integer(word) {
        TokenKind::Integer
    } else if is_float(word) {
        TokenKind::Float
    } else if is_hex(word) {
        TokenKind::Hex
    } else if word.parse::<Ipv4Addr>().is_ok() {
        TokenKind::Ipv4
    } else if is_mac(word) {
        TokenKind::Mac
    } else if is_time(word) {
        TokenKind::Time
    } else if word.contains(':') && word.parse::<Ipv6Addr>().is_ok() {
        TokenKind::Ipv6
    } else if is_date(word) {
        TokenKind::Date
    } else if is_timestamp(word) {
        TokenKind::Timestamp
    } else if is_url(word) {
        TokenKind::Url
    } else {
        TokenKind::Literal
    }
}

fn strip_sign(word: &str) -> &str {
    word.strip_prefix(['-', '+']).unwrap_or(word)
}

fn is_integer(word: &str) -> bool {
    let digits = strip_sign(word);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_float(word: &str) -> bool {
    match strip_sign(word).split_once('.') {
        Some((whole, fraction)) => {
            !whole.is_empty()
                && !fraction.is_empty()
                && whole.bytes().all(|b| b.is_ascii_digit())
                && fraction.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

fn is_hex(word: &str) -> bool {
    match word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

fn is_mac(word: &str) -> bool {
    let parts: Vec<&str> = word.split(':').collect();
    parts.len() == 6
        && parts
            .iter()
            .all(|part| part.len() == 2 && part.bytes().all(|b| b.is_ascii_hexdigit()))
}

fn is_time(word: &str) -> bool {
    if !(8..=18).contains(&word.len()) || !word.as_bytes()[0].is_ascii_digit() {
        return false;
    }
    let format = if word.contains('.') {
        "%H:%M:%S%.f"
    } else {
        "%H:%M:%S"
    };
    NaiveTime::parse_from_str(word, format).is_ok()
}

fn is_date(word: &str) -> bool {
    word.len() == 10
        && word.as_bytes()[4] == b'-'
        && NaiveDate::parse_from_str(word, "%Y-%m-%d").is_ok()
}

fn is_timestamp(word: &str) -> bool {
    word.len() >= 20
        && word.as_bytes()[0].is_ascii_digit()
        && DateTime::parse_from_rfc3339(word).is_ok()
}

fn is_url(word: &str) -> bool {
    word.contains("://") && url::Url::parse(word).is_ok()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
