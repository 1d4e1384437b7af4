//! Reader for the `<hardware-layout>` section.
//!
//! The section is not configuration syntax. It is a flat list of `(keyword body)` directives
//! where the body is raw text that runs until the first `)` not escaped with `\`. In `options`
//! bodies a `)` inside a `{...}` object, or inside a string of that object, does not count:
//!
//! ```text
//! (keycap
//!   1    1    1.5
//!   1.25 _    1x2 )
//! (colors
//!   #ffffff _ _
//!   _ _ #ff8800 )
//! (options lsft {w:2.25})
//! (label @nav "Nav Layer")
//! (legend
//!   defsrc _ _
//!   _ _ _
//!   nav _ _
//!   _ _ _ )
//! (legend-colors
//!   #000000 _ _
//!   _ _ _
//!   #0055aa _ _
//!   _ _ _ )
//! (description Anything at all, kept verbatim.)
//! ```

use std::borrow::Cow;

use super::*;
use crate::layout::KeySize;

pub const KEYCAP: &str = "keycap";
pub const COLORS: &str = "colors";
pub const OPTIONS: &str = "options";
pub const LABEL: &str = "label";
pub const DESCRIPTION: &str = "description";
pub const LEGEND: &str = "legend";
pub const LEGEND_COLORS: &str = "legend-colors";

pub const LEGEND_ROWS: usize = 4;
pub const LEGEND_COLUMNS: usize = 3;

/// Cell value meaning "use the default".
const DEFAULT_CELL: &str = "_";

/// KLE properties for one key, e.g. `{"w": 1.5}`.
pub type KeyOption = serde_json::Map<String, serde_json::Value>;

/// Rows of whitespace-separated cells, addressed in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    pub rows: Vec<Vec<T>>,
    /// Span of the directive body the grid was read from.
    pub span: Span,
}

impl<T> Grid<T> {
    pub fn len(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cells(&self) -> impl Iterator<Item = &T> + '_ {
        self.rows.iter().flatten()
    }
}

#[derive(Debug, Clone, Default)]
pub struct HardwareLayout {
    pub keycap: Option<Grid<KeySize>>,
    pub colors: Option<Grid<Option<String>>>,
    pub legend: Option<Grid<Option<String>>>,
    /// Text color for each legend position, same shape as `legend`.
    pub legend_colors: Option<Grid<Option<String>>>,
    pub options: HashMap<String, KeyOption>,
    pub labels: HashMap<String, String>,
    pub description: Option<String>,
}

struct Directive<'a> {
    keyword: &'a str,
    body: &'a str,
    keyword_span: Span,
    body_span: Span,
}

impl Directive<'_> {
    /// Span of `part`, which must be a subslice of the body.
    fn span_of(&self, part: &str) -> Span {
        let start = part.as_ptr() as usize - self.body.as_ptr() as usize;
        self.body_span.sub(start, start + part.len())
    }

    fn syntax_error(&self, part: &str, err_msg: impl AsRef<str>) -> LayoutError {
        LayoutError::from_span(ErrorKind::Syntax, &self.span_of(part), err_msg)
    }
}

/// Parse every hardware layout section of a file into one `HardwareLayout`.
///
/// A file without any section is valid: every key then gets the default size and color.
pub fn parse_hardware_layout(
    sections: &[Spanned<String>],
    diagnostics: &mut Diagnostics,
) -> Result<HardwareLayout> {
    let mut hw = HardwareLayout::default();
    if sections.is_empty() {
        diagnostics.warn(Warning::MissingHardwareLayout);
        return Ok(hw);
    }
    let mut descriptions = vec![];
    let mut legend_colors_span = None;
    for section in sections {
        for directive in split_directives(section)? {
            match directive.keyword {
                KEYCAP => set_once(&mut hw.keycap, parse_keycap(&directive)?, &directive)?,
                COLORS => set_once(&mut hw.colors, parse_cells(&directive), &directive)?,
                LEGEND => set_once(&mut hw.legend, parse_legend(&directive)?, &directive)?,
                LEGEND_COLORS => {
                    legend_colors_span = Some(directive.keyword_span.clone());
                    set_once(&mut hw.legend_colors, parse_legend(&directive)?, &directive)?
                }
                OPTIONS => parse_options(&directive, &mut hw.options)?,
                LABEL => parse_labels(&directive, &mut hw.labels)?,
                DESCRIPTION => {
                    let text = unescape(directive.body.trim()).replace("\r\n", "\n");
                    if !text.is_empty() {
                        descriptions.push(text);
                    }
                }
                "" => {}
                name => diagnostics.warn(Warning::UnknownDirective {
                    name: name.to_owned(),
                    line: directive.keyword_span.line() + 1,
                }),
            }
        }
    }
    if let (Some(span), None) = (&legend_colors_span, &hw.legend) {
        return Err(LayoutError::from_span(
            ErrorKind::Config,
            span,
            "legend-colors colors the positions of a legend. Add a legend directive.",
        ));
    }
    if !descriptions.is_empty() {
        hw.description = Some(descriptions.join("\n\n"));
    }
    log::debug!(
        "hardware layout: keycap={} colors={} legend={} legend-colors={} options={} labels={}",
        hw.keycap.is_some(),
        hw.colors.is_some(),
        hw.legend.is_some(),
        hw.legend_colors.is_some(),
        hw.options.len(),
        hw.labels.len(),
    );
    Ok(hw)
}

fn split_directives(section: &Spanned<String>) -> Result<Vec<Directive<'_>>> {
    let text = section.t.as_str();
    let mut directives = vec![];
    let mut pos = 0;
    while let Some(found) = text[pos..].find('(') {
        let open = pos + found;
        let after_open = &text[open + 1..];
        let keyword_start = open + 1 + (after_open.len() - after_open.trim_start().len());
        let keyword_end = text[keyword_start..]
            .find(|c: char| c.is_whitespace() || c == '(' || c == ')')
            .map_or(text.len(), |len| keyword_start + len);
        let keyword = &text[keyword_start..keyword_end];
        let close = find_directive_end(text, keyword_end, keyword == OPTIONS).ok_or_else(|| {
            LayoutError::from_span(
                ErrorKind::Syntax,
                &section.span.sub(open, keyword_end),
                "Unclosed hardware layout directive. Add ) after its content.",
            )
        })?;
        directives.push(Directive {
            keyword,
            body: &text[keyword_end..close],
            keyword_span: section.span.sub(keyword_start, keyword_end),
            body_span: section.span.sub(keyword_end, close),
        });
        pos = close + 1;
    }
    Ok(directives)
}

/// Index of the `)` closing a directive body that starts at `from`. Braces and the strings
/// inside them are only tracked with `objects`, the other bodies are free text.
fn find_directive_end(text: &str, from: usize, objects: bool) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote = None;
    let mut escaped = false;
    for (i, b) in text.bytes().enumerate().skip(from) {
        match (quote, b) {
            _ if escaped => escaped = false,
            (_, b'\\') => escaped = true,
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') if objects && depth > 0 => quote = Some(b),
            (None, b'{') if objects => depth += 1,
            (None, b'}') if objects => depth = depth.saturating_sub(1),
            (None, b')') if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

fn set_once<T>(slot: &mut Option<T>, value: T, directive: &Directive) -> Result<()> {
    if slot.is_some() {
        return Err(LayoutError::from_span(
            ErrorKind::Config,
            &directive.keyword_span,
            format!(
                "Only one {} is allowed, found more. Delete the extras.",
                directive.keyword
            ),
        ));
    }
    *slot = Some(value);
    Ok(())
}

/// Resolves `\(`, `\)` and `\\`. Other backslashes are kept as written.
fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('\\') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('\\', Some(&next @ ('(' | ')' | '\\'))) => {
                out.push(next);
                chars.next();
            }
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Non-empty lines of the body, split on whitespace.
fn rows(body: &str) -> Vec<Vec<&str>> {
    body.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>())
        .filter(|row| !row.is_empty())
        .collect()
}

fn parse_keycap(directive: &Directive) -> Result<Grid<KeySize>> {
    let rows = rows(directive.body)
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| {
                    parse_key_size(cell).ok_or_else(|| {
                        directive.syntax_error(
                            cell,
                            format!(
                                "Invalid keycap size: {cell}\n\
                                 Use _ for one unit, a width such as 1.25, or WIDTHxHEIGHT such as 1x2."
                            ),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Grid {
        rows,
        span: directive.body_span.clone(),
    })
}

/// `_`, `W` or `WxH`, in keyboard units.
pub fn parse_key_size(cell: &str) -> Option<KeySize> {
    if cell == DEFAULT_CELL {
        return Some(KeySize::default());
    }
    let (w, h) = cell
        .split_once(|c: char| c == 'x' || c == 'X')
        .unwrap_or((cell, "1"));
    let w: f64 = w.parse().ok()?;
    let h: f64 = h.parse().ok()?;
    let valid = |v: f64| v.is_finite() && v > 0.0;
    (valid(w) && valid(h)).then_some(KeySize { w, h })
}

fn parse_cells(directive: &Directive) -> Grid<Option<String>> {
    let rows = rows(directive.body)
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| (cell != DEFAULT_CELL).then(|| cell.to_owned()))
                .collect()
        })
        .collect();
    Grid {
        rows,
        span: directive.body_span.clone(),
    }
}

/// `legend` and `legend-colors` grids, one cell per legend position.
fn parse_legend(directive: &Directive) -> Result<Grid<Option<String>>> {
    let grid = parse_cells(directive);
    if grid.rows.len() != LEGEND_ROWS || grid.rows.iter().any(|r| r.len() != LEGEND_COLUMNS) {
        let what = match directive.keyword {
            LEGEND_COLORS => "colors",
            _ => "layer names",
        };
        return Err(LayoutError::from_span(
            ErrorKind::LayoutShape,
            &grid.span,
            format!(
                "{} must have {LEGEND_ROWS} rows of {LEGEND_COLUMNS} {what}. \
                 Mark unused positions with _.",
                directive.keyword
            ),
        ));
    }
    Ok(grid)
}

/// Reads `key {object}` pairs. Objects use relaxed JSON (unquoted keys, single quotes) and may
/// span several lines.
fn parse_options(directive: &Directive, options: &mut HashMap<String, KeyOption>) -> Result<()> {
    let mut rest = directive.body.trim_start();
    while !rest.is_empty() {
        let key_len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let key = &rest[..key_len];
        let value = rest[key_len..].trim_start();
        if !value.starts_with('{') {
            return Err(directive.syntax_error(
                key,
                format!("Options for {key} must be an object such as {{w:1.5}}"),
            ));
        }
        let end = matching_brace(value).ok_or_else(|| {
            directive.syntax_error(key, format!("Unclosed {{ in the options for {key}"))
        })?;
        let object = &value[..=end];
        let parsed: KeyOption = json5::from_str(object).map_err(|e| {
            directive.syntax_error(object, format!("Invalid options for {key}: {e}"))
        })?;
        log::trace!("options for {key}: {parsed:?}");
        options.insert(key.to_owned(), parsed);
        rest = value[end + 1..].trim_start();
    }
    Ok(())
}

/// Index of the `}` closing the `{` that `s` starts with. Braces inside strings are skipped.
fn matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote = None;
    let mut escaped = false;
    for (i, b) in s.bytes().enumerate() {
        match (quote, b) {
            _ if escaped => escaped = false,
            (_, b'\\') => escaped = true,
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'{') => depth += 1,
            (None, b'}') => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Reads `name text` lines. Quotes around the text are removed.
fn parse_labels(directive: &Directive, labels: &mut HashMap<String, String>) -> Result<()> {
    for line in directive.body.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        let (name, text) = match line.split_once(char::is_whitespace) {
            Some((name, text)) => (name, text.trim()),
            None => (line, ""),
        };
        if text.is_empty() {
            return Err(directive.syntax_error(name, format!("Label for {name} is missing its text")));
        }
        let text = unescape(text.trim_atom_quotes()).into_owned();
        log::trace!("label override: {name} -> {text}");
        labels.insert(name.to_owned(), text);
    }
    Ok(())
}
