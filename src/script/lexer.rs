//! Tokenizer for oracle snippets
//!
//! Newlines end statements only at bracket depth zero, so calls and literals
//! may span several lines.

use serde_json::Number;
use std::fmt;

use super::ScriptError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    Num(Number),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Assign,
    PlusAssign,
    Plus,
    Minus,
    /// Newline or `;` at depth zero
    Separator,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "'{}'", name),
            Self::Str(_) => write!(f, "string literal"),
            Self::Num(n) => write!(f, "number {}", n),
            Self::LParen => write!(f, "'('"),
            Self::RParen => write!(f, "')'"),
            Self::LBracket => write!(f, "'['"),
            Self::RBracket => write!(f, "']'"),
            Self::LBrace => write!(f, "'{{'"),
            Self::RBrace => write!(f, "'}}'"),
            Self::Comma => write!(f, "','"),
            Self::Colon => write!(f, "':'"),
            Self::Dot => write!(f, "'.'"),
            Self::Assign => write!(f, "'='"),
            Self::PlusAssign => write!(f, "'+='"),
            Self::Plus => write!(f, "'+'"),
            Self::Minus => write!(f, "'-'"),
            Self::Separator => write!(f, "end of statement"),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    depth: usize,
    tokens: Vec<Token>,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, ScriptError> {
    Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        depth: 0,
        tokens: Vec::new(),
    }
    .run()
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, line: usize) {
        self.tokens.push(Token { kind, line });
    }

    fn error(&self, line: usize, message: impl Into<String>) -> ScriptError {
        ScriptError::Parse {
            line,
            message: message.into(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ScriptError> {
        while let Some(c) = self.peek() {
            let line = self.line;
            match c {
                '\n' => {
                    self.bump();
                    if self.depth == 0 {
                        self.push(TokenKind::Separator, line);
                    }
                }
                ';' => {
                    self.bump();
                    if self.depth > 0 {
                        return Err(self.error(line, "unexpected ';' inside brackets"));
                    }
                    self.push(TokenKind::Separator, line);
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                '#' => self.skip_line(),
                '/' if self.peek_at(1) == Some('/') => self.skip_line(),
                '/' if self.peek_at(1) == Some('*') => self.skip_block_comment(line)?,
                '"' | '\'' | '`' => {
                    let s = self.string(c)?;
                    self.push(TokenKind::Str(s), line);
                }
                c if c.is_ascii_digit()
                    || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) =>
                {
                    let n = self.number(line)?;
                    self.push(TokenKind::Num(n), line);
                }
                c if c.is_alphabetic() || c == '_' || c == '$' => {
                    let mut ident = String::new();
                    while let Some(c) = self.peek() {
                        if c.is_alphanumeric() || c == '_' || c == '$' {
                            ident.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    self.push(TokenKind::Ident(ident), line);
                }
                _ => {
                    self.bump();
                    let kind = match c {
                        '(' | '[' | '{' => {
                            self.depth += 1;
                            match c {
                                '(' => TokenKind::LParen,
                                '[' => TokenKind::LBracket,
                                _ => TokenKind::LBrace,
                            }
                        }
                        ')' | ']' | '}' => {
                            self.depth = self.depth.saturating_sub(1);
                            match c {
                                ')' => TokenKind::RParen,
                                ']' => TokenKind::RBracket,
                                _ => TokenKind::RBrace,
                            }
                        }
                        ',' => TokenKind::Comma,
                        ':' => TokenKind::Colon,
                        '.' => TokenKind::Dot,
                        '+' if self.peek() == Some('=') => {
                            self.bump();
                            TokenKind::PlusAssign
                        }
                        '+' => TokenKind::Plus,
                        '-' => TokenKind::Minus,
                        '=' if self.peek() == Some('=') => {
                            return Err(self.error(line, "comparison operators are not supported"));
                        }
                        '=' => TokenKind::Assign,
                        other => {
                            return Err(self.error(line, format!("unexpected character '{}'", other)));
                        }
                    };
                    self.push(kind, line);
                }
            }
        }

        let line = self.line;
        self.push(TokenKind::Eof, line);
        Ok(self.tokens)
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self, line: usize) -> Result<(), ScriptError> {
        self.bump();
        self.bump();
        loop {
            match self.bump() {
                Some('*') if self.peek() == Some('/') => {
                    self.bump();
                    return Ok(());
                }
                Some(_) => {}
                None => return Err(self.error(line, "unterminated comment")),
            }
        }
    }

    /// Single, double, backtick or triple-quoted string. Only backticks and
    /// triple quotes may span lines.
    fn string(&mut self, quote: char) -> Result<String, ScriptError> {
        let line = self.line;
        let triple =
            quote != '`' && self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        let multiline = triple || quote == '`';
        for _ in 0..if triple { 3 } else { 1 } {
            self.bump();
        }

        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(self.error(line, "unterminated string literal"));
            };
            match c {
                c if c == quote && !triple => return Ok(out),
                c if c == quote && self.peek() == Some(quote) && self.peek_at(1) == Some(quote) => {
                    self.bump();
                    self.bump();
                    return Ok(out);
                }
                '\n' if !multiline => {
                    return Err(self.error(line, "unterminated string literal"));
                }
                '\\' => self.escape(&mut out, line)?,
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String, line: usize) -> Result<(), ScriptError> {
        let Some(c) = self.bump() else {
            return Err(self.error(line, "unterminated string literal"));
        };
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' | '\'' | '"' | '`' => out.push(c),
            // line continuation
            '\n' => {}
            'u' => {
                let mut hex = String::new();
                for _ in 0..4 {
                    match self.bump() {
                        Some(h) if h.is_ascii_hexdigit() => hex.push(h),
                        _ => return Err(self.error(line, "invalid \\u escape")),
                    }
                }
                let code = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error(line, "invalid \\u escape"))?;
                out.push(code);
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn number(&mut self, line: usize) -> Result<Number, ScriptError> {
        let mut text = String::new();
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' if !is_float && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => {
                    is_float = true
                }
                'e' | 'E' => {
                    is_float = true;
                    text.push(c);
                    self.bump();
                    if let Some(sign @ ('+' | '-')) = self.peek() {
                        text.push(sign);
                        self.bump();
                    }
                    continue;
                }
                _ => break,
            }
            if c != '_' {
                text.push(c);
            }
            self.bump();
        }

        if !is_float && let Ok(n) = text.parse::<i64>() {
            return Ok(Number::from(n));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .ok_or_else(|| self.error(line, format!("invalid number literal '{}'", text)))
    }
}
