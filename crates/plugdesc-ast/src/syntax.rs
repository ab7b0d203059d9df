//! Tokenizer and parser for annotation usages
//!
//! The grammar covers what may appear in a declaration's modifier list:
//! modifier keywords and annotations with constant-expression arguments.
//! Both the Java and the Kotlin spelling are accepted, selected by [`Dialect`].

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Java,
    Kotlin,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct SyntaxError {
    pub offset: usize,
    pub message: String,
}

impl SyntaxError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        SyntaxError {
            offset,
            message: message.into(),
        }
    }
}

/// One annotation usage, names exactly as written
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnnotation {
    pub name: String,
    pub args: Vec<Arg>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Expr,
}

/// Constant expression forms allowed as annotation arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Char(char),
    Bool(bool),
    Int(i64),
    Float(f64),
    Array(Vec<Expr>),
    Annotation(ParsedAnnotation),
    /// `NAME`, `Type.NAME` or `pkg.Type.NAME`
    Path(Vec<String>),
    /// `Type.class` or `Type::class`
    ClassLiteral(Vec<String>),
    /// Kotlin call syntax: `arrayOf(...)` or a nested annotation `Dependency(...)`
    Call { callee: Vec<String>, args: Vec<Arg> },
    /// String concatenation that could not be folded to a literal
    Concat(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Char(char),
    Int(i64),
    Float(f64),
    Punct(char),
    ColonColon,
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    dialect: Dialect,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str, dialect: Dialect) -> Self {
        Lexer {
            src,
            pos: 0,
            dialect,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let start = self.pos;
            let Some(c) = self.peek() else {
                return Ok(tokens);
            };
            let token = if c.is_alphabetic() || c == '_' || c == '$' {
                self.ident()
            } else if c == '`' && self.dialect == Dialect::Kotlin {
                self.quoted_ident()?
            } else if c.is_ascii_digit() {
                self.number()?
            } else if c == '"' {
                self.string()?
            } else if c == '\'' {
                self.char_literal()?
            } else if self.rest().starts_with("::") {
                self.pos += 2;
                Token::ColonColon
            } else if "@(){}[],=.+-:;*<>?!".contains(c) {
                self.bump();
                Token::Punct(c)
            } else {
                return Err(SyntaxError::new(start, format!("unexpected character '{}'", c)));
            };
            tokens.push((token, start));
        }
    }

    fn skip_trivia(&mut self) -> Result<(), SyntaxError> {
        loop {
            let rest = self.rest();
            if rest.starts_with("//") {
                let len = rest.find('\n').unwrap_or(rest.len());
                self.pos += len;
            } else if rest.starts_with("/*") {
                let start = self.pos;
                let Some(end) = rest[2..].find("*/") else {
                    return Err(SyntaxError::new(start, "unterminated comment"));
                };
                self.pos += end + 4;
            } else if self.peek().is_some_and(char::is_whitespace) {
                self.bump();
            } else {
                return Ok(());
            }
        }
    }

    fn ident(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            self.bump();
        }
        Token::Ident(self.src[start..self.pos].to_string())
    }

    fn quoted_ident(&mut self) -> Result<Token, SyntaxError> {
        let start = self.pos;
        self.bump();
        let Some(len) = self.rest().find('`') else {
            return Err(SyntaxError::new(start, "unterminated quoted identifier"));
        };
        let name = self.rest()[..len].to_string();
        self.pos += len + 1;
        Ok(Token::Ident(name))
    }

    fn number(&mut self) -> Result<Token, SyntaxError> {
        let start = self.pos;
        let rest = self.rest();
        if rest.starts_with("0x") || rest.starts_with("0X") {
            self.pos += 2;
            let digits = self.take_while(|c| c.is_ascii_hexdigit() || c == '_');
            self.skip_int_suffix();
            return i64::from_str_radix(&digits, 16)
                .map(Token::Int)
                .map_err(|e| SyntaxError::new(start, format!("invalid hex literal: {}", e)));
        }
        if rest.starts_with("0b") || rest.starts_with("0B") {
            self.pos += 2;
            let digits = self.take_while(|c| c == '0' || c == '1' || c == '_');
            self.skip_int_suffix();
            return i64::from_str_radix(&digits, 2)
                .map(Token::Int)
                .map_err(|e| SyntaxError::new(start, format!("invalid binary literal: {}", e)));
        }

        let mut text = self.take_while(|c| c.is_ascii_digit() || c == '_');
        let mut is_float = false;
        let after_dot = self.rest().get(1..).and_then(|s| s.chars().next());
        if self.peek() == Some('.') && after_dot.is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            is_float = true;
            text.push('.');
            text.push_str(&self.take_while(|c| c.is_ascii_digit() || c == '_'));
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            self.bump();
            text.push('e');
            if let Some(sign @ ('+' | '-')) = self.peek() {
                self.bump();
                text.push(sign);
            }
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }
        match self.peek() {
            Some('f' | 'F' | 'd' | 'D') => {
                self.bump();
                is_float = true;
            }
            _ => self.skip_int_suffix(),
        }

        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|e| SyntaxError::new(start, format!("invalid number: {}", e)))
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|e| SyntaxError::new(start, format!("invalid number: {}", e)))
        }
    }

    fn skip_int_suffix(&mut self) {
        while matches!(self.peek(), Some('l' | 'L' | 'u' | 'U')) {
            self.bump();
        }
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek().filter(|c| keep(*c)) {
            self.bump();
            if c != '_' {
                out.push(c);
            }
        }
        out
    }

    fn string(&mut self) -> Result<Token, SyntaxError> {
        let start = self.pos;
        if self.rest().starts_with("\"\"\"") {
            self.pos += 3;
            let Some(end) = self.rest().find("\"\"\"") else {
                return Err(SyntaxError::new(start, "unterminated text block"));
            };
            let body = &self.rest()[..end];
            self.pos += end + 3;
            return match self.dialect {
                Dialect::Kotlin => Ok(Token::Str(body.to_string())),
                Dialect::Java => unescape(&strip_text_block(body), start).map(Token::Str),
            };
        }

        self.bump();
        let body_start = self.pos;
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(SyntaxError::new(start, "unterminated string literal"))
                }
                Some('\\') => {
                    self.bump();
                }
                Some('"') => break,
                Some(_) => {}
            }
        }
        let body = &self.src[body_start..self.pos - 1];
        unescape(body, start).map(Token::Str)
    }

    fn char_literal(&mut self) -> Result<Token, SyntaxError> {
        let start = self.pos;
        self.bump();
        let body_start = self.pos;
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(SyntaxError::new(start, "unterminated char literal"))
                }
                Some('\\') => {
                    self.bump();
                }
                Some('\'') => break,
                Some(_) => {}
            }
        }
        let body = unescape(&self.src[body_start..self.pos - 1], start)?;
        let mut chars = body.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Token::Char(c)),
            _ => Err(SyntaxError::new(start, "char literal must hold one character")),
        }
    }
}

/// Strip the opening line and the common indentation of a Java text block
fn strip_text_block(body: &str) -> String {
    let body = body.split_once('\n').map_or("", |(_, rest)| rest);
    let lines: Vec<&str> = body.split('\n').collect();
    let indent = lines
        .iter()
        .enumerate()
        .filter(|(i, line)| !line.trim().is_empty() || *i == lines.len() - 1)
        .map(|(_, line)| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| line.get(indent..).unwrap_or("").trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

fn unescape(body: &str, offset: usize) -> Result<String, SyntaxError> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            return Err(SyntaxError::new(offset, "dangling escape"));
        };
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            's' => out.push(' '),
            '0'..='7' => {
                let mut code = escaped.to_digit(8).unwrap_or(0);
                while let Some(d) = chars.peek().and_then(|c| c.to_digit(8)) {
                    if code * 8 + d > 0o377 {
                        break;
                    }
                    code = code * 8 + d;
                    chars.next();
                }
                out.push(char::from_u32(code).unwrap_or('\0'));
            }
            'u' => {
                while chars.peek() == Some(&'u') {
                    chars.next();
                }
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        SyntaxError::new(offset, format!("invalid unicode escape \\u{}", hex))
                    })?;
                out.push(decoded);
            }
            '\n' => {}
            other => out.push(other),
        }
    }
    Ok(out)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    end: usize,
    dialect: Dialect,
}

impl Parser {
    fn new(src: &str, dialect: Dialect) -> Result<Self, SyntaxError> {
        let tokens = Lexer::new(src, dialect).tokenize()?;
        Ok(Parser {
            tokens,
            pos: 0,
            end: src.len(),
            dialect,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(_, o)| *o)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        token
    }

    fn at_punct(&self, c: char) -> bool {
        self.peek() == Some(&Token::Punct(c))
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.at_punct(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: char) -> Result<(), SyntaxError> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", c)))
        }
    }

    fn expect_ident(&mut self) -> Result<String, SyntaxError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error("expected an identifier")),
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.offset(), message)
    }

    /// Modifier list: annotations interleaved with keywords
    fn modifiers(&mut self) -> Result<Vec<ParsedAnnotation>, SyntaxError> {
        let mut annotations = Vec::new();
        while let Some(token) = self.peek() {
            match token {
                Token::Punct('@') => {
                    self.pos += 1;
                    if self.dialect == Dialect::Kotlin && self.at_punct('[') {
                        self.pos += 1;
                        while !self.eat_punct(']') {
                            if self.peek().is_none() {
                                return Err(self.error("unterminated annotation group"));
                            }
                            annotations.push(self.annotation_body()?);
                        }
                    } else {
                        annotations.push(self.annotation_body()?);
                    }
                }
                _ => {
                    self.pos += 1;
                }
            }
        }
        Ok(annotations)
    }

    /// Annotation after its `@`
    fn annotation_body(&mut self) -> Result<ParsedAnnotation, SyntaxError> {
        if self.dialect == Dialect::Kotlin
            && matches!(self.peek(), Some(Token::Ident(_)))
            && self.peek_at(1) == Some(&Token::Punct(':'))
        {
            // use-site target such as `@field:`
            self.pos += 2;
        }
        let name = self.dotted_name()?.join(".");
        let args = if self.at_punct('(') {
            self.pos += 1;
            self.arguments(')')?
        } else {
            Vec::new()
        };
        Ok(ParsedAnnotation { name, args })
    }

    fn dotted_name(&mut self) -> Result<Vec<String>, SyntaxError> {
        let mut segments = vec![self.expect_ident()?];
        while self.at_punct('.') && matches!(self.peek_at(1), Some(Token::Ident(_))) {
            self.pos += 1;
            segments.push(self.expect_ident()?);
        }
        Ok(segments)
    }

    /// Arguments up to and including `close`
    fn arguments(&mut self, close: char) -> Result<Vec<Arg>, SyntaxError> {
        let mut args = Vec::new();
        loop {
            if self.eat_punct(close) {
                return Ok(args);
            }
            let name = match (self.peek(), self.peek_at(1), self.peek_at(2)) {
                (Some(Token::Ident(name)), Some(Token::Punct('=')), next)
                    if next != Some(&Token::Punct('=')) =>
                {
                    Some(name.clone())
                }
                _ => None,
            };
            if name.is_some() {
                self.pos += 2;
            }
            let value = self.expr()?;
            args.push(Arg { name, value });
            if !self.eat_punct(',') {
                self.expect_punct(close)?;
                return Ok(args);
            }
        }
    }

    fn elements(&mut self, close: char) -> Result<Vec<Expr>, SyntaxError> {
        let mut items = Vec::new();
        loop {
            if self.eat_punct(close) {
                return Ok(items);
            }
            items.push(self.expr()?);
            if !self.eat_punct(',') {
                self.expect_punct(close)?;
                return Ok(items);
            }
        }
    }

    fn expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut parts = vec![self.unary()?];
        while self.eat_punct('+') {
            parts.push(self.unary()?);
        }
        if parts.len() == 1 {
            return Ok(parts.remove(0));
        }
        Ok(fold_concat(parts))
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        if self.eat_punct('-') {
            return match self.unary()? {
                Expr::Int(i) => Ok(Expr::Int(-i)),
                Expr::Float(x) => Ok(Expr::Float(-x)),
                _ => Err(self.error("unary minus needs a numeric literal")),
            };
        }
        if self.eat_punct('+') {
            return self.unary();
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let offset = self.offset();
        match self.next() {
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Char(c)) => Ok(Expr::Char(c)),
            Some(Token::Int(i)) => Ok(Expr::Int(i)),
            Some(Token::Float(x)) => Ok(Expr::Float(x)),
            Some(Token::Punct('@')) => Ok(Expr::Annotation(self.annotation_body()?)),
            Some(Token::Punct('{')) if self.dialect == Dialect::Java => {
                Ok(Expr::Array(self.elements('}')?))
            }
            Some(Token::Punct('[')) if self.dialect == Dialect::Kotlin => {
                Ok(Expr::Array(self.elements(']')?))
            }
            Some(Token::Punct('(')) => {
                let inner = self.expr()?;
                self.expect_punct(')')?;
                Ok(inner)
            }
            Some(Token::Ident(word)) if word == "true" => Ok(Expr::Bool(true)),
            Some(Token::Ident(word)) if word == "false" => Ok(Expr::Bool(false)),
            Some(Token::Ident(_)) => {
                self.pos -= 1;
                self.path_expr()
            }
            Some(other) => Err(SyntaxError::new(
                offset,
                format!("unexpected token {:?} in annotation argument", other),
            )),
            None => Err(SyntaxError::new(offset, "unexpected end of annotation")),
        }
    }

    fn path_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut path = self.dotted_name()?;
        match self.dialect {
            Dialect::Java => {
                if path.len() > 1 && path.last().is_some_and(|s| s == "class") {
                    path.pop();
                    return Ok(Expr::ClassLiteral(path));
                }
                if self.at_punct('(') {
                    return Err(self.error("method calls are not constant expressions"));
                }
                Ok(Expr::Path(path))
            }
            Dialect::Kotlin => {
                if self.peek() == Some(&Token::ColonColon) {
                    self.pos += 1;
                    let member = self.expect_ident()?;
                    if member != "class" {
                        return Err(self.error("only class references are supported after '::'"));
                    }
                    if self.at_punct('.')
                        && matches!(self.peek_at(1), Some(Token::Ident(s)) if s == "java")
                    {
                        self.pos += 2;
                    }
                    return Ok(Expr::ClassLiteral(path));
                }
                if self.at_punct('(') {
                    self.pos += 1;
                    let args = self.arguments(')')?;
                    return Ok(Expr::Call { callee: path, args });
                }
                Ok(Expr::Path(path))
            }
        }
    }
}

/// Fold the literals of a `+` chain the way Java evaluates it: leading
/// numbers are added, everything from the first string on is text. A chain
/// with any reference stays a [`Expr::Concat`].
fn fold_concat(parts: Vec<Expr>) -> Expr {
    let numeric = parts
        .iter()
        .take_while(|p| matches!(p, Expr::Int(_) | Expr::Float(_)))
        .count();
    let mut parts = parts.into_iter();
    let mut folded: Vec<Expr> = Vec::new();
    if numeric > 0 {
        folded.push(sum_numbers(parts.by_ref().take(numeric)));
    }

    for part in parts {
        let Some(text) = literal_text(&part) else {
            folded.push(part);
            continue;
        };
        if let Some(Expr::Str(prev)) = folded.last_mut() {
            prev.push_str(&text);
        } else if matches!(part, Expr::Str(_)) {
            match folded.last().and_then(literal_text) {
                Some(head) => {
                    folded.pop();
                    folded.push(Expr::Str(head + &text));
                }
                None => folded.push(Expr::Str(text)),
            }
        } else {
            folded.push(part);
        }
    }
    if folded.len() == 1 {
        return folded.remove(0);
    }
    Expr::Concat(folded)
}

fn sum_numbers(numbers: impl Iterator<Item = Expr>) -> Expr {
    let mut int_sum = 0i64;
    let mut float_sum = 0f64;
    let mut is_float = false;
    for number in numbers {
        match number {
            Expr::Int(i) => {
                int_sum = int_sum.wrapping_add(i);
                float_sum += i as f64;
            }
            Expr::Float(x) => {
                is_float = true;
                float_sum += x;
            }
            _ => {}
        }
    }
    if is_float {
        Expr::Float(float_sum)
    } else {
        Expr::Int(int_sum)
    }
}

fn literal_text(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Str(s) => Some(s.clone()),
        Expr::Char(c) => Some(c.to_string()),
        Expr::Int(i) => Some(i.to_string()),
        Expr::Float(x) => Some(x.to_string()),
        Expr::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse every annotation in a modifier list
pub fn parse_modifiers(text: &str, dialect: Dialect) -> Result<Vec<ParsedAnnotation>, SyntaxError> {
    Parser::new(text, dialect)?.modifiers()
}

/// Parse a single annotation usage, `@` included
pub fn parse_annotation(text: &str, dialect: Dialect) -> Result<ParsedAnnotation, SyntaxError> {
    let mut parser = Parser::new(text, dialect)?;
    parser.expect_punct('@')?;
    let annotation = parser.annotation_body()?;
    if parser.peek().is_some() {
        return Err(parser.error("trailing input after annotation"));
    }
    Ok(annotation)
}
