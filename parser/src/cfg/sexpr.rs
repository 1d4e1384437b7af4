use std::cmp;
use std::ops::Index;
use std::rc::Rc;
use std::str::Bytes;

type ParseError = Spanned<String>;

type ParseResult<T> = Result<T, ParseError>;

use super::error::{ErrorKind, LayoutError};

const HARDWARE_LAYOUT_OPEN: &str = "<hardware-layout>";
const HARDWARE_LAYOUT_CLOSE: &str = "</hardware-layout>";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub file_name: Rc<str>,
    pub file_content: Rc<str>,
}

impl Default for Span {
    fn default() -> Self {
        Self {
            start: 0,
            end: 0,
            file_name: Rc::from(""),
            file_content: Rc::from(""),
        }
    }
}

impl Span {
    fn new(start: usize, end: usize, file_name: Rc<str>, file_content: Rc<str>) -> Span {
        assert!(start <= end);
        Span {
            start,
            end,
            file_name,
            file_content,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// # Panics
    ///
    /// Panics if `other` has a different `file_name`
    pub fn cover(self, other: Span) -> Span {
        let start = cmp::min(self.start(), other.start());
        let end = cmp::max(self.end(), other.end());
        if self.file_name != other.file_name {
            panic!("Can't create span across different files.");
        }
        Span::new(start, end, self.file_name, self.file_content)
    }

    /// Span of `start..end`, where both offsets are relative to the start of this span.
    pub fn sub(&self, start: usize, end: usize) -> Span {
        Span::new(
            self.start + start,
            self.start + end,
            self.file_name.clone(),
            self.file_content.clone(),
        )
    }

    /// Zero-based line number of the span start.
    pub fn line(&self) -> usize {
        self.file_content[..self.start]
            .bytes()
            .filter(|&b| b == b'\n')
            .count()
    }

    pub fn file_name(&self) -> String {
        self.file_name.clone().to_string()
    }

    pub fn file_content(&self) -> String {
        self.file_content.clone().to_string()
    }
}

impl Index<Span> for str {
    type Output = str;
    fn index(&self, span: Span) -> &Self::Output {
        &self[span.start()..span.end()]
    }
}

impl Index<Span> for String {
    type Output = str;
    fn index(&self, span: Span) -> &Self::Output {
        &self[span.start()..span.end()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Spanned<T> {
    pub t: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(t: T, span: Span) -> Spanned<T> {
        Spanned { t, span }
    }
}

/// An atom or a parenthesized list of expressions. Quoted strings are atoms that keep their
/// quotes.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SExpr {
    Atom(Spanned<String>),
    List(Spanned<Vec<SExpr>>),
}

impl SExpr {
    pub fn atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(a) => Some(a.t.as_str()),
            _ => None,
        }
    }

    pub fn list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(l) => Some(&l.t),
            _ => None,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            SExpr::Atom(a) => a.span.clone(),
            SExpr::List(l) => l.span.clone(),
        }
    }
}

impl std::fmt::Display for SExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SExpr::Atom(a) => write!(f, "{}", &a.t),
            SExpr::List(l) => {
                write!(f, "(")?;
                for (i, expr) in l.t.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{expr}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl std::fmt::Debug for SExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

#[derive(Debug)]
enum Token {
    Open,
    Close,
    StringTok,
}

struct Lexer<'a> {
    s: &'a str,
    bytes: Bytes<'a>,
    file_name: Rc<str>,
    file_content: Rc<str>,
    /// Raw text of every `<hardware-layout>` section found inside block comments.
    hardware_layout: Vec<Spanned<String>>,
}

fn is_start(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'"') || b.is_ascii_whitespace()
}

impl<'a> Lexer<'a> {
    /// `file_name` is used only for indicating a file, where
    /// a fragment of `source` that caused parsing error came from.
    fn new(source: &'a str, file_name: &str) -> Self {
        Lexer {
            s: source,
            bytes: source.bytes(),
            file_name: Rc::from(file_name),
            file_content: Rc::from(source),
            hardware_layout: vec![],
        }
    }

    fn span(&self, start: usize, end: usize) -> Span {
        Span::new(
            start,
            end,
            self.file_name.clone(),
            self.file_content.clone(),
        )
    }

    fn next_while(&mut self, f: impl Fn(u8) -> bool) {
        for b in self.bytes.clone() {
            if f(b) {
                // Iterating over a clone of this iterator - this is guaranteed to be Some
                self.bytes.next().expect("iter lag");
            } else {
                break;
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.clone().next()
    }

    /// Consumes bytes until the `|#` matching the `#|` at `start`. Block comments nest.
    fn read_block_comment(&mut self, start: usize) -> ParseResult<()> {
        let body_start = self.pos();
        let mut depth = 1usize;
        while depth > 0 {
            match self.bytes.next() {
                Some(b'#') if self.peek() == Some(b'|') => {
                    self.bytes.next();
                    depth += 1;
                }
                Some(b'|') if self.peek() == Some(b'#') => {
                    self.bytes.next();
                    depth -= 1;
                }
                Some(_) => {}
                None => {
                    return Err(Spanned::new(
                        "Unterminated multiline comment. Add |# after the end of your comment."
                            .to_string(),
                        self.span(start, start + 2),
                    ))
                }
            }
        }
        let body_end = self.pos() - 2;
        self.capture_hardware_layout(body_start, body_end)
    }

    /// Stores the text between every `<hardware-layout>` and `</hardware-layout>` pair found in
    /// `body_start..body_end`. This text has its own grammar and is never lexed as expressions.
    fn capture_hardware_layout(&mut self, body_start: usize, body_end: usize) -> ParseResult<()> {
        let s = self.s;
        let mut offset = body_start;
        while let Some(found) = s[offset..body_end].find(HARDWARE_LAYOUT_OPEN) {
            let open = offset + found;
            let content_start = open + HARDWARE_LAYOUT_OPEN.len();
            let close = s[content_start..body_end]
                .find(HARDWARE_LAYOUT_CLOSE)
                .ok_or_else(|| {
                    Spanned::new(
                        format!(
                            "Unterminated {HARDWARE_LAYOUT_OPEN} section. \
                             Add {HARDWARE_LAYOUT_CLOSE} before the end of the comment."
                        ),
                        self.span(open, content_start),
                    )
                })?;
            let content_end = content_start + close;
            log::trace!("found hardware layout section at {content_start}..{content_end}");
            self.hardware_layout.push(Spanned::new(
                s[content_start..content_end].to_string(),
                self.span(content_start, content_end),
            ));
            offset = content_end + HARDWARE_LAYOUT_CLOSE.len();
        }
        Ok(())
    }

    fn pos(&self) -> usize {
        self.s.len() - self.bytes.len()
    }

    fn next_token(&mut self) -> Option<ParseResult<Spanned<Token>>> {
        use Token::*;
        loop {
            let start = self.pos();
            let token = match self.bytes.next()? {
                b'(' => Open,
                b')' => Close,
                b'"' => {
                    self.next_while(|b| b != b'"' && b != b'\n');
                    let end = self.pos();
                    match self.bytes.next() {
                        Some(b'"') => StringTok,
                        _ => {
                            return Some(Err(Spanned::new(
                                "Unterminated string".to_string(),
                                self.span(start, end),
                            )))
                        }
                    }
                }
                b';' if self.peek() == Some(b';') => {
                    // the newline, if any, is skipped as whitespace in the next iteration
                    self.next_while(|b| b != b'\n');
                    continue;
                }
                b'#' if self.peek() == Some(b'|') => {
                    // consume the '|'
                    self.bytes.next();
                    if let Err(e) = self.read_block_comment(start) {
                        return Some(Err(e));
                    }
                    continue;
                }
                // KMonad writes the parenthesis keys as `\(` and `\)`.
                b'\\' if matches!(self.peek(), Some(b'(' | b')')) => {
                    self.bytes.next();
                    self.next_string()
                }
                b if b.is_ascii_whitespace() => {
                    self.next_while(|b| b.is_ascii_whitespace());
                    continue;
                }
                _ => self.next_string(),
            };
            return Some(Ok(Spanned::new(token, self.span(start, self.pos()))));
        }
    }

    fn next_string(&mut self) -> Token {
        self.next_while(|b| !is_start(b));
        Token::StringTok
    }
}

impl Iterator for Lexer<'_> {
    type Item = ParseResult<Spanned<Token>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

pub type TopLevel = Spanned<Vec<SExpr>>;

/// Everything the expression reader extracts from one configuration file.
#[derive(Debug, Clone, Default)]
pub struct ParsedSource {
    pub exprs: Vec<TopLevel>,
    pub hardware_layout: Vec<Spanned<String>>,
}

pub fn parse(cfg: &str, file_name: &str) -> Result<ParsedSource, LayoutError> {
    parse_(cfg, file_name).map_err(transform_error)
}

pub fn parse_(cfg: &str, file_name: &str) -> ParseResult<ParsedSource> {
    let mut lexer = Lexer::new(cfg, file_name);
    let exprs = parse_with(cfg, &mut lexer)?;
    Ok(ParsedSource {
        exprs,
        hardware_layout: lexer.hardware_layout,
    })
}

fn parse_with(
    s: &str,
    tokens: &mut impl Iterator<Item = ParseResult<Spanned<Token>>>,
) -> ParseResult<Vec<TopLevel>> {
    use SExpr::*;
    use Token::*;
    let mut stack = vec![Spanned::new(vec![], Span::default())];
    for token in tokens {
        let Spanned { t, span } = token?;
        match t {
            Open => stack.push(Spanned::new(vec![], span.clone())),
            Close => {
                let Spanned {
                    t: exprs,
                    span: stack_span,
                    // There is a placeholder at the bottom of the stack to allow this unwrap;
                    // if the stack is ever empty, return an error.
                } = stack.pop().expect("placeholder unpopped");
                if stack.is_empty() {
                    return Err(Spanned::new(
                        "Unexpected closing parenthesis".to_string(),
                        span,
                    ));
                }
                let expr = List(Spanned::new(exprs, stack_span.cover(span.clone())));
                stack.last_mut().expect("not empty").t.push(expr);
            }
            StringTok => stack
                .last_mut()
                .expect("not empty")
                .t
                .push(Atom(Spanned::new(s[span.clone()].to_string(), span))),
        }
    }
    // There is a placeholder at the bottom of the stack to allow this unwrap; if the stack is ever
    // empty, return an error.
    let Spanned { t: exprs, span: sp } = stack.pop().expect("placeholder unpopped");
    if !stack.is_empty() {
        return Err(Spanned::new("Unclosed opening parenthesis".to_string(), sp));
    }
    let exprs = exprs
        .into_iter()
        .map(|expr| match expr {
            SExpr::List(es) => Ok(es),
            SExpr::Atom(s) => Err(Spanned::new(
                "Everything must be in a list".to_string(),
                s.span,
            )),
        })
        .collect::<ParseResult<_>>()?;
    Ok(exprs)
}

fn transform_error(e: ParseError) -> LayoutError {
    LayoutError::from_span(ErrorKind::Syntax, &e.span, e.t)
}
