//! The composed layout: one keycap per defsrc key, each carrying its size, color, options and
//! the label it has on every layer.

mod kle;

use serde::Serialize;

use crate::cfg::directives::{COLORS, KEYCAP};
use crate::cfg::{
    Diagnostics, ErrorKind, Grid, HardwareLayout, KeyOption, Layer, LayoutError, ResolvedLayers,
    Result, Warning,
};

pub use kle::{DEFAULT_KEY_COLOR, LEGEND_INDICES, LEGEND_POSITIONS};

/// Keycap size in keyboard units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KeySize {
    pub w: f64,
    pub h: f64,
}

impl Default for KeySize {
    fn default() -> Self {
        Self { w: 1.0, h: 1.0 }
    }
}

impl KeySize {
    pub fn is_unit(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposedKeycap {
    /// Position in defsrc, counted row-major.
    pub index: usize,
    pub row: usize,
    pub col: usize,
    /// The defsrc token of this key.
    pub key: String,
    pub size: KeySize,
    pub color: Option<String>,
    /// One label per layer, in the order of [`Layout::layers`].
    pub labels: Vec<String>,
    pub option: Option<KeyOption>,
    pub label_override: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    /// Name of the configuration file the layout was read from.
    pub source: String,
    pub description: Option<String>,
    /// `defsrc` followed by every deflayer, in declaration order.
    pub layers: Vec<String>,
    /// For each KLE legend position, the index of the layer shown there. `None` without a legend
    /// directive, in which case the labels are stacked in layer order.
    pub legend: Option<Vec<Option<usize>>>,
    /// Text color for each KLE legend position, from the `legend-colors` directive.
    pub legend_colors: Option<Vec<Option<String>>>,
    pub rows: usize,
    pub keys: Vec<ComposedKeycap>,
    pub warnings: Vec<Warning>,
}

impl Layout {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Raw data for keyboard-layout-editor.com.
    pub fn to_kle(&self) -> String {
        kle::render(self)
    }
}

/// Merge resolved layers with the hardware layout, in defsrc order.
///
/// The keycap and colors grids are flattened row-major and must have exactly one cell per defsrc
/// key. Their row structure does not need to match the defsrc lines.
pub fn compose(
    source: &str,
    resolved: &ResolvedLayers,
    hardware: &HardwareLayout,
    mut diagnostics: Diagnostics,
) -> Result<Layout> {
    let slot_count = resolved.slots.len();
    let sizes: Vec<KeySize> = match &hardware.keycap {
        Some(grid) => {
            check_shape(KEYCAP, grid, slot_count, "size")?;
            grid.cells().copied().collect()
        }
        None => vec![KeySize::default(); slot_count],
    };
    let colors: Vec<Option<String>> = match &hardware.colors {
        Some(grid) => {
            check_shape(COLORS, grid, slot_count, "color")?;
            grid.cells().cloned().collect()
        }
        None => vec![None; slot_count],
    };
    let legend = hardware
        .legend
        .as_ref()
        .map(|grid| legend_positions(grid, &resolved.layers, &mut diagnostics));
    let legend_colors = hardware.legend_colors.as_ref().map(legend_text_colors);

    let keys = resolved
        .slots
        .iter()
        .enumerate()
        .map(|(index, slot)| ComposedKeycap {
            index,
            row: slot.row,
            col: slot.col,
            key: slot.key.clone(),
            size: sizes[index],
            color: colors[index].clone(),
            labels: resolved
                .layers
                .iter()
                .map(|layer| layer.keys[index].label.clone())
                .collect(),
            option: hardware.options.get(&slot.key).cloned(),
            label_override: slot_override(&resolved.layers, index),
        })
        .collect::<Vec<_>>();
    log::debug!("composed {} keycap(s) in {} row(s)", keys.len(), resolved.rows);

    Ok(Layout {
        source: source.to_owned(),
        description: hardware.description.clone(),
        layers: resolved.layers.iter().map(|l| l.name.clone()).collect(),
        legend,
        legend_colors,
        rows: resolved.rows,
        keys,
        warnings: diagnostics.into_warnings(),
    })
}

fn check_shape<T>(directive: &str, grid: &Grid<T>, slot_count: usize, what: &str) -> Result<()> {
    let count = grid.len();
    if count != slot_count {
        return Err(LayoutError::from_span(
            ErrorKind::LayoutShape,
            &grid.span,
            format!(
                "{directive} has {count} {what}(s), but defsrc has {slot_count} key(s).\n\
                 Write exactly one {what} per defsrc key, using _ for the default."
            ),
        ));
    }
    Ok(())
}

/// An override keyed by an alias wins over one keyed by a plain key. Within each kind the first
/// layer wins, so the defsrc key comes before deflayer keys.
fn slot_override(layers: &[Layer], index: usize) -> Option<String> {
    let overrides = move || {
        layers
            .iter()
            .map(move |layer| &layer.keys[index])
            .filter(|key| key.label_override.is_some())
    };
    overrides()
        .find(|key| key.alias.is_some())
        .or_else(|| overrides().next())
        .and_then(|key| key.label_override.clone())
}

fn legend_positions(
    grid: &Grid<Option<String>>,
    layers: &[Layer],
    diagnostics: &mut Diagnostics,
) -> Vec<Option<usize>> {
    let mut positions = vec![None; LEGEND_POSITIONS];
    for (cell, &position) in grid.cells().zip(LEGEND_INDICES.iter().flatten()) {
        let Some(name) = cell else {
            continue;
        };
        match layers.iter().position(|layer| &layer.name == name) {
            Some(layer) => positions[position] = Some(layer),
            None => diagnostics.warn(Warning::UnknownLegendLayer {
                layer: name.clone(),
            }),
        }
    }
    positions
}

fn legend_text_colors(grid: &Grid<Option<String>>) -> Vec<Option<String>> {
    let mut colors = vec![None; LEGEND_POSITIONS];
    for (cell, &position) in grid.cells().zip(LEGEND_INDICES.iter().flatten()) {
        colors[position] = cell.clone();
    }
    colors
}
