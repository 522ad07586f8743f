// src/lexer.rs
use tracing::trace;

use crate::ast::CmpOp;
use crate::errors::ParseError;

/// Whitespace handling around `{% ... %}` and `{# ... #}` tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxOptions {
    /// Drop the newline ending a line that holds nothing but block or comment tags.
    pub trim_blocks: bool,
    /// Drop the indentation in front of a block or comment tag that starts its line.
    pub lstrip_blocks: bool,
}

impl Default for SyntaxOptions {
    fn default() -> Self {
        Self {
            trim_blocks: true,
            lstrip_blocks: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    For,
    In,
    If,
    Elif,
    Else,
    EndFor,
    EndIf,
    And,
    Or,
    Not,
    True,
    False,
    None,
}

impl Keyword {
    fn from_ident(ident: &str) -> Option<Keyword> {
        Some(match ident {
            "for" => Keyword::For,
            "in" => Keyword::In,
            "if" => Keyword::If,
            "elif" => Keyword::Elif,
            "else" => Keyword::Else,
            "endfor" => Keyword::EndFor,
            "endif" => Keyword::EndIf,
            "and" => Keyword::And,
            "or" => Keyword::Or,
            "not" => Keyword::Not,
            "true" | "True" => Keyword::True,
            "false" | "False" => Keyword::False,
            "none" | "None" => Keyword::None,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::For => "for",
            Keyword::In => "in",
            Keyword::If => "if",
            Keyword::Elif => "elif",
            Keyword::Else => "else",
            Keyword::EndFor => "endfor",
            Keyword::EndIf => "endif",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Text(String),
    ExprOpen,
    ExprClose,
    BlockOpen,
    BlockClose,
    Ident(String),
    Keyword(Keyword),
    Str(String),
    Int(i64),
    Float(f64),
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Pipe,
    /// The `:,` numeric-format suffix.
    Thousands,
    Cmp(CmpOp),
}

impl TokenKind {
    /// Human-readable form for error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Text(_) => "text".to_string(),
            TokenKind::ExprOpen => "`{{`".to_string(),
            TokenKind::ExprClose => "`}}`".to_string(),
            TokenKind::BlockOpen => "`{%`".to_string(),
            TokenKind::BlockClose => "`%}`".to_string(),
            TokenKind::Ident(name) => format!("identifier `{name}`"),
            TokenKind::Keyword(kw) => format!("keyword `{}`", kw.as_str()),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Int(_) | TokenKind::Float(_) => "number literal".to_string(),
            TokenKind::Dot => "`.`".to_string(),
            TokenKind::Comma => "`,`".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
            TokenKind::LBracket => "`[`".to_string(),
            TokenKind::RBracket => "`]`".to_string(),
            TokenKind::Pipe => "`|`".to_string(),
            TokenKind::Thousands => "`:,`".to_string(),
            TokenKind::Cmp(op) => format!("`{}`", op.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

/// Scan template text into a flat token stream with default syntax options.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    tokenize_with(source, SyntaxOptions::default())
}

pub fn tokenize_with(source: &str, options: SyntaxOptions) -> Result<Vec<Token>, ParseError> {
    let tokens = Lexer::new(source, options).run()?;
    trace!(tokens = tokens.len(), "tokenized template");
    Ok(tokens)
}

struct Lexer<'a> {
    s: &'a str,
    i: usize,
    line: usize,
    column: usize,
    options: SyntaxOptions,
    /// The current line already produced output (text or `{{ }}`).
    line_dirty: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(s: &'a str, options: SyntaxOptions) -> Self {
        Self {
            s,
            i: 0,
            line: 1,
            column: 1,
            options,
            line_dirty: false,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        while !self.eof() {
            self.lex_text();
            if self.eof() {
                break;
            }
            let (line, column) = (self.line, self.column);
            if self.peek_str("{{") {
                self.advance(2);
                self.push(TokenKind::ExprOpen, line, column);
                self.lex_tag("}}", TokenKind::ExprClose, line, column)?;
                self.line_dirty = true;
            } else if self.peek_str("{%") {
                self.advance(2);
                self.push(TokenKind::BlockOpen, line, column);
                self.lex_tag("%}", TokenKind::BlockClose, line, column)?;
                self.trim_newline();
            } else {
                self.skip_comment(line, column)?;
                self.trim_newline();
            }
        }
        Ok(self.tokens)
    }

    fn lex_text(&mut self) {
        let rest = &self.s[self.i..];
        let end = find_marker(rest).unwrap_or(rest.len());
        let (line, column) = (self.line, self.column);
        let mut text = &rest[..end];
        if self.options.lstrip_blocks && end < rest.len() && !rest[end..].starts_with("{{") {
            text = lstrip_tail(text, !self.line_dirty);
        }
        self.advance(end);
        if !text.is_empty() {
            let last_line = text.rsplit('\n').next().unwrap_or(text);
            let has_content = !last_line.chars().all(char::is_whitespace);
            self.line_dirty = if text.contains('\n') {
                has_content
            } else {
                self.line_dirty || has_content
            };
            self.push(TokenKind::Text(text.to_string()), line, column);
        }
    }

    fn lex_tag(
        &mut self,
        close: &str,
        close_kind: TokenKind,
        open_line: usize,
        open_column: usize,
    ) -> Result<(), ParseError> {
        loop {
            self.skip_ws();
            if self.eof() {
                let open = if close == "}}" { "{{" } else { "{%" };
                return Err(ParseError::new(
                    format!("unterminated `{open}` marker, expected `{close}`"),
                    open_line,
                    open_column,
                ));
            }
            if self.peek_str(close) {
                let (line, column) = (self.line, self.column);
                self.advance(close.len());
                self.push(close_kind, line, column);
                return Ok(());
            }
            self.lex_token()?;
        }
    }

    fn lex_token(&mut self) -> Result<(), ParseError> {
        let (line, column) = (self.line, self.column);
        let Some(c) = self.peek_char() else {
            return Err(self.error("unexpected end of template"));
        };
        let kind = match c {
            '"' | '\'' => TokenKind::Str(self.parse_quoted_string()?),
            c if c.is_ascii_digit() => self.parse_number_literal()?,
            '-' if self.peek_nth(1).is_some_and(|n| n.is_ascii_digit()) => {
                self.parse_number_literal()?
            }
            c if c == '_' || c.is_alphabetic() => {
                let ident = self.parse_identifier();
                match Keyword::from_ident(&ident) {
                    Some(kw) => TokenKind::Keyword(kw),
                    None => TokenKind::Ident(ident),
                }
            }
            _ => self.lex_punct(c)?,
        };
        self.push(kind, line, column);
        Ok(())
    }

    fn lex_punct(&mut self, c: char) -> Result<TokenKind, ParseError> {
        let two = |lexer: &mut Self, kind: TokenKind| {
            lexer.advance(2);
            kind
        };
        let kind = match c {
            '=' if self.peek_str("==") => two(self, TokenKind::Cmp(CmpOp::Eq)),
            '!' if self.peek_str("!=") => two(self, TokenKind::Cmp(CmpOp::Ne)),
            '<' if self.peek_str("<=") => two(self, TokenKind::Cmp(CmpOp::Le)),
            '>' if self.peek_str(">=") => two(self, TokenKind::Cmp(CmpOp::Ge)),
            ':' => {
                let (line, column) = (self.line, self.column);
                self.bump();
                self.skip_ws();
                if !self.consume_char(',') {
                    return Err(ParseError::new(
                        "expected `,` after `:` (use `:,` for thousands formatting)",
                        line,
                        column,
                    ));
                }
                return Ok(TokenKind::Thousands);
            }
            _ => {
                let kind = match c {
                    '<' => TokenKind::Cmp(CmpOp::Lt),
                    '>' => TokenKind::Cmp(CmpOp::Gt),
                    '.' => TokenKind::Dot,
                    ',' => TokenKind::Comma,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    '|' => TokenKind::Pipe,
                    other => return Err(self.error(format!("unexpected character `{other}`"))),
                };
                self.bump();
                kind
            }
        };
        Ok(kind)
    }

    fn skip_comment(&mut self, open_line: usize, open_column: usize) -> Result<(), ParseError> {
        let rest = &self.s[self.i..];
        match rest.find("#}") {
            Some(end) => {
                self.advance(end + 2);
                Ok(())
            }
            None => Err(ParseError::new(
                "unterminated `{#` comment, expected `#}`",
                open_line,
                open_column,
            )),
        }
    }

    /// Consume the rest of a line that holds only block tags.
    fn trim_newline(&mut self) {
        if !self.options.trim_blocks || self.line_dirty {
            return;
        }
        let rest = &self.s[self.i..];
        let line_end = rest.find('\n').map_or(rest.len(), |pos| pos + 1);
        if rest[..line_end].chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n')) {
            self.advance(line_end);
        }
    }

    fn parse_identifier(&mut self) -> String {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c == '_' || c.is_alphanumeric() {
                self.bump();
            } else {
                break;
            }
        }
        self.s[start..self.i].to_string()
    }

    fn parse_number_literal(&mut self) -> Result<TokenKind, ParseError> {
        let (line, column) = (self.line, self.column);
        // A number right after `.` is a path index, so `a.0.name` never lexes `0.` as a float.
        let after_dot = matches!(self.tokens.last(), Some(t) if t.kind == TokenKind::Dot);
        let start = self.i;
        if self.peek_char() == Some('-') {
            self.bump();
        }
        self.skip_digits();
        let mut is_float = false;
        if !after_dot
            && self.peek_char() == Some('.')
            && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit())
        {
            is_float = true;
            self.bump();
            self.skip_digits();
        }
        let s = &self.s[start..self.i];
        if is_float {
            s.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| ParseError::new(format!("bad float `{s}`"), line, column))
        } else {
            s.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|_| ParseError::new(format!("integer `{s}` out of range"), line, column))
        }
    }

    fn skip_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
    }

    fn parse_quoted_string(&mut self) -> Result<String, ParseError> {
        let (line, column) = (self.line, self.column);
        let Some(quote) = self.peek_char() else {
            return Err(self.error("expected quoted string"));
        };
        self.bump();
        let mut out = String::new();
        while let Some(c) = self.peek_char() {
            self.bump();
            if c == quote {
                return Ok(out);
            }
            if c == '\\' {
                if let Some(nc) = self.peek_char() {
                    self.bump();
                    match nc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '\\' => out.push('\\'),
                        '"' => out.push('"'),
                        '\'' => out.push('\''),
                        _ => {
                            out.push('\\');
                            out.push(nc);
                        }
                    }
                } else {
                    break;
                }
            } else {
                out.push(c);
            }
        }
        Err(ParseError::new("unterminated string literal", line, column))
    }

    fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.s[self.i..].chars().nth(n)
    }

    fn peek_str(&self, lit: &str) -> bool {
        self.s[self.i..].starts_with(lit)
    }

    fn skip_ws(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek_char() {
            self.advance(c.len_utf8());
        }
    }

    /// Move forward `len` bytes, keeping line and column in step.
    fn advance(&mut self, len: usize) {
        for c in self.s[self.i..self.i + len].chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.i += len;
    }

    fn push(&mut self, kind: TokenKind, line: usize, column: usize) {
        self.tokens.push(Token { kind, line, column });
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.line, self.column)
    }

    fn eof(&self) -> bool {
        self.i >= self.s.len()
    }
}

/// Byte offset of the next `{{`, `{%` or `{#` marker.
fn find_marker(text: &str) -> Option<usize> {
    text.match_indices('{')
        .map(|(pos, _)| pos)
        .find(|&pos| matches!(text.as_bytes().get(pos + 1), Some(b'{' | b'%' | b'#')))
}

/// Strip the indentation in front of a block tag when nothing else precedes it on its line.
///
/// `starts_line` tells whether `text` itself begins on a line with no output yet.
fn lstrip_tail(text: &str, starts_line: bool) -> &str {
    let line_start = match text.rfind('\n') {
        Some(pos) => pos + 1,
        None if starts_line => 0,
        None => return text,
    };
    if text[line_start..].chars().all(|c| c == ' ' || c == '\t') {
        &text[..line_start]
    } else {
        text
    }
}
