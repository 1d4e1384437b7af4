use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use super::sexpr::{SExpr, Span, Spanned};

pub type MResult<T> = miette::Result<T>;
pub type Result<T> = std::result::Result<T, LayoutError>;

/// Fatal error categories. Any of these aborts the run without output.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed expression or directive syntax.
    #[error("Syntax error in configuration file")]
    Syntax,
    /// Structural problem independent of syntax, e.g. a missing defsrc.
    #[error("Error in configuration file")]
    Config,
    /// A hardware layout grid that does not line up with defsrc.
    #[error("Hardware layout does not match defsrc")]
    LayoutShape,
}

#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{kind}")]
#[diagnostic()]
pub struct LayoutError {
    pub kind: ErrorKind,
    #[label("Error here")]
    pub err_span: Option<SourceSpan>,
    #[help]
    pub help_msg: String,
    pub file_name: Option<String>,
    pub file_content: Option<String>,
}

impl LayoutError {
    pub fn new(kind: ErrorKind, err_msg: impl AsRef<str>) -> Self {
        Self {
            kind,
            err_span: None,
            help_msg: help(err_msg),
            file_name: None,
            file_content: None,
        }
    }

    pub fn from_span(kind: ErrorKind, span: &Span, err_msg: impl AsRef<str>) -> Self {
        Self {
            kind,
            err_span: Some(span_err_span(span)),
            help_msg: help(err_msg),
            file_name: Some(span.file_name()),
            file_content: Some(span.file_content()),
        }
    }

    pub fn from_expr(kind: ErrorKind, expr: &SExpr, err_msg: impl AsRef<str>) -> Self {
        Self::from_span(kind, &expr.span(), err_msg)
    }

    pub fn from_spanned<T>(kind: ErrorKind, spanned: &Spanned<T>, err_msg: impl AsRef<str>) -> Self {
        Self::from_span(kind, &spanned.span, err_msg)
    }

    /// The text that `err_span` points at, if the error has both a span and the file content.
    pub fn span_text(&self) -> Option<&str> {
        let span = self.err_span?;
        self.file_content
            .as_deref()?
            .get(span.offset()..span.offset() + span.len())
    }
}

pub(super) fn help(err_msg: impl AsRef<str>) -> String {
    format!(
        r"{}

The layout is read from defsrc, deflayer and defalias, and from the
<hardware-layout> section inside a #| block comment |#.",
        err_msg.as_ref(),
    )
}

pub(super) fn span_err_span(span: &Span) -> SourceSpan {
    SourceSpan::new(span.start.into(), (span.end - span.start).into())
}

/// Attach the configuration text to the error so miette can render a snippet.
pub fn error_with_source(e: LayoutError) -> miette::Error {
    let filename = e.file_name.clone();
    let source = e.file_content.clone();
    let e2: miette::Error = e.into();
    if let (Some(f), Some(s)) = (filename, source) {
        e2.with_source_code(NamedSource::new(f, s))
    } else {
        e2
    }
}

impl From<anyhow::Error> for LayoutError {
    fn from(value: anyhow::Error) -> Self {
        Self::new(ErrorKind::Config, value.to_string())
    }
}
