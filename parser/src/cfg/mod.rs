//! This parses a KMonad/kanata configuration into a [`Layout`] for keyboard-layout-editor.
//!
//! Two separate grammars are involved. The configuration itself is read as S-expressions, of
//! which only `defsrc`, `deflayer` and `defalias` matter here. The physical description of the
//! keyboard lives in a block comment, between `<hardware-layout>` tags, and is read by
//! [`directives`]:
//!
//! ```text
//! (defsrc
//!     esc  1    2
//!     tab  q    w
//! )
//!
//! (deflayer base
//!     _    @num _
//!     _    a    s
//! )
//!
//! #|
//! <hardware-layout>
//! (keycap
//!   1 1 1
//!   1.5 1 1)
//! (label @num "Numbers")
//! </hardware-layout>
//! |#
//! ```
//!
//! Then the layout has two rows, three keys per row, and every key carries one label for defsrc
//! and one for `base`, in that order.

macro_rules! bail {
    ($err:expr $(,)?) => {
        return Err($crate::cfg::LayoutError::from(anyhow::anyhow!($err)))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::cfg::LayoutError::from(anyhow::anyhow!($fmt, $($arg)*)))
    };
}

macro_rules! bail_expr {
    ($expr:expr, $fmt:expr $(,)?) => {
        return Err($crate::cfg::LayoutError::from_expr(
            $crate::cfg::ErrorKind::Config,
            $expr,
            format!($fmt),
        ))
    };
    ($expr:expr, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::cfg::LayoutError::from_expr(
            $crate::cfg::ErrorKind::Config,
            $expr,
            format!($fmt, $($arg)*),
        ))
    };
}

macro_rules! bail_span {
    ($expr:expr, $fmt:expr $(,)?) => {
        return Err($crate::cfg::LayoutError::from_spanned(
            $crate::cfg::ErrorKind::Config,
            $expr,
            format!($fmt),
        ))
    };
    ($expr:expr, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::cfg::LayoutError::from_spanned(
            $crate::cfg::ErrorKind::Config,
            $expr,
            format!($fmt, $($arg)*),
        ))
    };
}

macro_rules! anyhow_expr {
    ($expr:expr, $fmt:expr $(,)?) => {
        $crate::cfg::LayoutError::from_expr($crate::cfg::ErrorKind::Config, $expr, format!($fmt))
    };
    ($expr:expr, $fmt:expr, $($arg:tt)*) => {
        $crate::cfg::LayoutError::from_expr(
            $crate::cfg::ErrorKind::Config,
            $expr,
            format!($fmt, $($arg)*),
        )
    };
}

macro_rules! anyhow_span {
    ($expr:expr, $fmt:expr $(,)?) => {
        $crate::cfg::LayoutError::from_spanned(
            $crate::cfg::ErrorKind::Config,
            $expr,
            format!($fmt),
        )
    };
    ($expr:expr, $fmt:expr, $($arg:tt)*) => {
        $crate::cfg::LayoutError::from_spanned(
            $crate::cfg::ErrorKind::Config,
            $expr,
            format!($fmt, $($arg)*),
        )
    };
}

pub mod sexpr;

mod error;
pub use error::*;

mod diagnostics;
pub use diagnostics::*;

pub mod directives;
pub use directives::{parse_hardware_layout, Grid, HardwareLayout, KeyOption};

pub mod layers;
pub use layers::{resolve_layers, Layer, ResolvedKey, ResolvedLayers, Slot};

mod str_ext;
pub use str_ext::*;

use crate::layout::{self, Layout};
use anyhow::anyhow;
use std::path::Path;

type HashSet<T> = rustc_hash::FxHashSet<T>;
type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;

use sexpr::*;

#[cfg(test)]
mod tests;

/// Knobs for reading a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Token that marks a deliberately empty key, rendered without a label.
    pub blank_token: String,
    /// Prefix of tokens that refer to a defalias entry.
    pub alias_marker: char,
    /// Replace key names with keycap labels, e.g. `spc` with `Space`.
    pub translate_keys: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            blank_token: "XX".to_owned(),
            alias_marker: '@',
            translate_keys: true,
        }
    }
}

pub fn new_from_file(p: &Path, opts: &ParseOptions) -> MResult<Layout> {
    let text = std::fs::read_to_string(p)
        .map_err(|e| miette::miette!("Failed to read {}: {e}", p.display()))?;
    new_from_str(&text, &p.to_string_lossy(), opts)
}

pub fn new_from_str(text: &str, file_name: &str, opts: &ParseOptions) -> MResult<Layout> {
    parse_layout(text, file_name, opts).map_err(error_with_source)
}

/// Run the whole pipeline over one configuration: read expressions, read the hardware layout,
/// resolve layers and compose the keycaps. Warnings are returned inside the layout.
pub fn parse_layout(text: &str, file_name: &str, opts: &ParseOptions) -> Result<Layout> {
    let mut diagnostics = Diagnostics::default();
    let source = sexpr::parse(text, file_name)?;
    log::trace!(
        "parsed {} top-level expression(s) and {} hardware layout section(s)",
        source.exprs.len(),
        source.hardware_layout.len()
    );
    let hardware = parse_hardware_layout(&source.hardware_layout, &mut diagnostics)?;
    let layers = resolve_layers(&source.exprs, &hardware.labels, opts, &mut diagnostics)?;
    layout::compose(file_name, &layers, &hardware, diagnostics)
}

/// Return a closure that filters a root expression by the content of the first element. The
/// closure returns true if the first element is an atom that matches the input `a` and false
/// otherwise.
fn gen_first_atom_filter(a: &str) -> impl Fn(&&Spanned<Vec<SExpr>>) -> bool {
    let a = a.to_owned();
    move |expr| {
        if expr.t.is_empty() {
            return false;
        }
        if let SExpr::Atom(atom) = &expr.t[0] {
            atom.t == a
        } else {
            false
        }
    }
}

/// Consumes the first element and returns the rest of the iterator. Returns `Ok` if the first
/// element is an atom and equals `expected_first`.
fn check_first_expr<'a>(
    mut exprs: impl Iterator<Item = &'a SExpr>,
    expected_first: &str,
) -> Result<impl Iterator<Item = &'a SExpr>> {
    let first_atom = exprs
        .next()
        .ok_or_else(|| anyhow!("Passed empty list to {expected_first}"))?
        .atom()
        .ok_or_else(|| anyhow!("First entry is expected to be an atom for {expected_first}"))?;
    if first_atom != expected_first {
        bail!("Passed non-{expected_first} expression to {expected_first}: {first_atom}");
    }
    Ok(exprs)
}
