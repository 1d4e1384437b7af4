use serde::Serialize;

/// A non-fatal problem found while parsing. The run still produces a layout.
///
/// Line numbers are one-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// An `@alias` token with no matching defalias entry. Its literal text is used as the label.
    UnresolvedAlias {
        alias: String,
        layer: String,
        slot: usize,
        line: usize,
    },
    UnknownDirective {
        name: String,
        line: usize,
    },
    MissingHardwareLayout,
    UnknownLegendLayer {
        layer: String,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnresolvedAlias {
                alias,
                layer,
                slot,
                line,
            } => write!(
                f,
                "line {line}: alias {alias} in layer {layer} (key {slot}) is not defined; \
                 using its text as the label"
            ),
            Warning::UnknownDirective { name, line } => {
                write!(f, "line {line}: ignoring unknown hardware layout directive: {name}")
            }
            Warning::MissingHardwareLayout => write!(
                f,
                "no <hardware-layout> section found; using default key sizes and colors"
            ),
            Warning::UnknownLegendLayer { layer } => {
                write!(f, "legend refers to layer {layer}, which is not defined")
            }
        }
    }
}

/// Warnings collected over one parse, in the order they were found.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn warn(&mut self, warning: Warning) {
        log::debug!("{warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}
