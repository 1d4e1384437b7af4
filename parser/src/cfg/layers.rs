//! Finds defsrc, deflayer and defalias, and turns every layer token into a keycap label.
//!
//! Layers are positional: the n-th token of a deflayer belongs to the n-th key of defsrc,
//! whatever the line breaks look like. Only defsrc line breaks matter; they give each key its
//! row and column.

use super::*;
use crate::keys::key_label;

pub const DEFSRC: &str = "defsrc";
pub const DEFLAYER: &str = "deflayer";
pub const DEFALIAS: &str = "defalias";
/// A key that falls through to the layer below. Rendered without a label.
pub const TRANSPARENT: &str = "_";

/// One physical key from defsrc.
#[derive(Debug, Clone)]
pub struct Slot {
    pub key: String,
    pub row: usize,
    pub col: usize,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    /// Empty for transparent and blank keys.
    pub label: String,
    /// Alias name without the marker, if the layer refers to an alias here.
    pub alias: Option<String>,
    /// The label override that replaced the resolved label.
    pub label_override: Option<String>,
}

impl ResolvedKey {
    fn plain(label: String) -> Self {
        Self {
            label,
            alias: None,
            label_override: None,
        }
    }

    fn overridden(label: &str, alias: Option<String>) -> Self {
        Self {
            label: label.to_owned(),
            alias,
            label_override: Some(label.to_owned()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub keys: Vec<ResolvedKey>,
}

/// defsrc geometry plus every layer, defsrc first and then deflayers in file order.
#[derive(Debug, Clone)]
pub struct ResolvedLayers {
    pub slots: Vec<Slot>,
    pub rows: usize,
    pub layers: Vec<Layer>,
}

struct Defsrc<'a> {
    exprs: &'a [SExpr],
    slots: Vec<Slot>,
    rows: usize,
}

pub fn resolve_layers(
    exprs: &[TopLevel],
    labels: &HashMap<String, String>,
    opts: &ParseOptions,
    diagnostics: &mut Diagnostics,
) -> Result<ResolvedLayers> {
    let src = parse_defsrc(exprs)?;
    let layer_exprs = parse_layer_exprs(exprs, src.slots.len())?;
    let resolver = Resolver {
        aliases: parse_aliases(exprs)?,
        labels,
        opts,
    };

    let mut layers = Vec::with_capacity(layer_exprs.len() + 1);
    layers.push(resolver.resolve_layer(DEFSRC, src.exprs, diagnostics));
    for (name, tokens) in layer_exprs {
        layers.push(resolver.resolve_layer(name, tokens, diagnostics));
    }
    log::debug!(
        "resolved {} layer(s) over {} key(s) in {} row(s)",
        layers.len(),
        src.slots.len(),
        src.rows
    );
    Ok(ResolvedLayers {
        slots: src.slots,
        rows: src.rows,
        layers,
    })
}

/// Parse the keys of the single defsrc. Keys on the same source line share a row.
fn parse_defsrc(exprs: &[TopLevel]) -> Result<Defsrc<'_>> {
    let src_expr = exprs
        .iter()
        .find(gen_first_atom_filter(DEFSRC))
        .ok_or_else(|| anyhow!("Exactly one defsrc must exist; found none"))?;
    if let Some(spanned) = exprs.iter().filter(gen_first_atom_filter(DEFSRC)).nth(1) {
        bail_span!(
            spanned,
            "Exactly one defsrc is allowed, found more. Delete the extras."
        )
    }

    let mut slots: Vec<Slot> = vec![];
    let mut seen_keys = HashSet::default();
    let mut row = 0;
    let mut col = 0;
    let mut current_line = None;
    for expr in check_first_expr(src_expr.t.iter(), DEFSRC)? {
        let key = match expr {
            SExpr::Atom(a) => &a.t,
            SExpr::List(_) => bail_expr!(expr, "No lists allowed in defsrc"),
        };
        if !seen_keys.insert(key.as_str()) {
            bail_expr!(expr, "Repeat declaration of key in defsrc: \"{}\"", key)
        }
        let line = expr.span().line();
        match current_line {
            Some(l) if l == line => col += 1,
            Some(_) => {
                row += 1;
                col = 0;
            }
            None => {}
        }
        current_line = Some(line);
        slots.push(Slot {
            key: key.clone(),
            row,
            col,
            span: expr.span(),
        });
    }

    let rows = if slots.is_empty() { 0 } else { row + 1 };
    Ok(Defsrc {
        exprs: &src_expr.t[1..],
        slots,
        rows,
    })
}

/// Returns layer names and their tokens in file order. This also checks that:
/// - All layers have the same number of items as the defsrc,
/// - There are no duplicate layer names,
/// - There is at least one layer.
fn parse_layer_exprs(exprs: &[TopLevel], expected_len: usize) -> Result<Vec<(&str, &[SExpr])>> {
    let mut names = HashSet::default();
    let mut layers = vec![];
    for expr in exprs.iter().filter(gen_first_atom_filter(DEFLAYER)) {
        let mut subexprs = check_first_expr(expr.t.iter(), DEFLAYER)?;
        let name_expr = subexprs.next().ok_or_else(|| {
            anyhow_span!(expr, "deflayer requires a layer name after `deflayer` token")
        })?;
        let name = name_expr
            .atom()
            .ok_or_else(|| anyhow_expr!(name_expr, "layer name after deflayer must be a string"))?;
        if name == DEFSRC || !names.insert(name) {
            bail_expr!(name_expr, "duplicate layer name: {}", name);
        }
        let tokens = &expr.t[2..];
        if tokens.len() != expected_len {
            bail_span!(
                expr,
                "Layer {} has {} item(s), but requires {} to match defsrc",
                name,
                tokens.len(),
                expected_len
            )
        }
        layers.push((name, tokens));
    }
    if layers.is_empty() {
        bail!("No deflayer expressions exist. At least one layer must be defined.")
    }
    Ok(layers)
}

/// Parse alias->definition mappings from every defalias. The table is complete before any layer
/// is resolved, so an alias can be used before the defalias that defines it.
fn parse_aliases(exprs: &[TopLevel]) -> Result<HashMap<String, &SExpr>> {
    let mut aliases = HashMap::default();
    for expr in exprs.iter().filter(gen_first_atom_filter(DEFALIAS)) {
        let mut subexprs = check_first_expr(expr.t.iter(), DEFALIAS)?;
        // Read k-v pairs from the configuration
        while let Some(alias_expr) = subexprs.next() {
            let alias = match alias_expr {
                SExpr::Atom(a) => &a.t,
                _ => bail_expr!(
                    alias_expr,
                    "Alias names cannot be lists. Invalid alias: {:?}",
                    alias_expr
                ),
            };
            let definition = match subexprs.next() {
                Some(v) => v,
                None => bail_expr!(alias_expr, "Found alias without an action - add an action"),
            };
            if aliases.insert(alias.clone(), definition).is_some() {
                bail_expr!(alias_expr, "Duplicate alias: {}", alias);
            }
        }
    }
    log::trace!("found {} alias(es)", aliases.len());
    Ok(aliases)
}

struct Resolver<'a> {
    aliases: HashMap<String, &'a SExpr>,
    labels: &'a HashMap<String, String>,
    opts: &'a ParseOptions,
}

impl Resolver<'_> {
    fn resolve_layer(
        &self,
        name: &str,
        tokens: &[SExpr],
        diagnostics: &mut Diagnostics,
    ) -> Layer {
        Layer {
            name: name.to_owned(),
            keys: tokens
                .iter()
                .enumerate()
                .map(|(slot, token)| self.resolve(token, name, slot, diagnostics))
                .collect(),
        }
    }

    fn resolve(
        &self,
        token: &SExpr,
        layer: &str,
        slot: usize,
        diagnostics: &mut Diagnostics,
    ) -> ResolvedKey {
        let text = match token {
            SExpr::Atom(a) => a.t.as_str(),
            // Inline actions are shown as written.
            SExpr::List(_) => return ResolvedKey::plain(token.to_string()),
        };
        if text == TRANSPARENT || text == self.opts.blank_token {
            return ResolvedKey::plain(String::new());
        }

        let alias_name = text
            .strip_prefix(self.opts.alias_marker)
            .filter(|name| !name.is_empty());
        let Some(name) = alias_name else {
            return match self.labels.get(text) {
                Some(label) => ResolvedKey::overridden(label, None),
                None => ResolvedKey::plain(self.key_text(text)),
            };
        };

        let alias = Some(name.to_owned());
        if let Some(label) = self.labels.get(text).or_else(|| self.labels.get(name)) {
            return ResolvedKey::overridden(label, alias);
        }
        let label = match self.aliases.get(name) {
            Some(SExpr::Atom(definition)) => self.key_text(&definition.t),
            Some(SExpr::List(_)) => name.to_owned(),
            None => {
                diagnostics.warn(Warning::UnresolvedAlias {
                    alias: text.to_owned(),
                    layer: layer.to_owned(),
                    slot,
                    line: token.span().line() + 1,
                });
                text.to_owned()
            }
        };
        ResolvedKey {
            label,
            alias,
            label_override: None,
        }
    }

    fn key_text(&self, key: &str) -> String {
        let key = key.trim_atom_quotes().unescape_key();
        if self.opts.translate_keys {
            key_label(key).into_owned()
        } else {
            key.to_owned()
        }
    }
}
