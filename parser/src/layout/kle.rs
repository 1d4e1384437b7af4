//! Rendering to keyboard-layout-editor raw data.
//!
//! Each defsrc row becomes one array. A key is a string holding its labels separated by `\n`,
//! optionally preceded by a property object. Property objects only need to list what differs:
//! `w` and `h` apply to the next key only, while `c` and `a` stay in effect until changed.

use itertools::Itertools;
use serde_json::{json, Map, Value};

use super::{ComposedKeycap, Layout};
use crate::cfg::directives::{LEGEND_COLUMNS, LEGEND_ROWS};

pub const LEGEND_POSITIONS: usize = LEGEND_ROWS * LEGEND_COLUMNS;

/// KLE legend index for each cell of the legend grid: top row left to right, then the row below,
/// and so on. Labels stack top to bottom on the keycap.
pub const LEGEND_INDICES: [[usize; LEGEND_COLUMNS]; LEGEND_ROWS] =
    [[0, 8, 2], [6, 9, 7], [1, 10, 3], [4, 11, 5]];

/// Keycap color of keyboard-layout-editor when none is set.
pub const DEFAULT_KEY_COLOR: &str = "#cccccc";

pub(super) fn render(layout: &Layout) -> String {
    let mut current_color = DEFAULT_KEY_COLOR.to_owned();
    let mut first_key = true;
    let mut out = vec![];
    for (_, keys) in &layout.keys.iter().group_by(|key| key.row) {
        let mut items = vec![];
        for key in keys {
            let mut props = Map::new();
            if first_key {
                if layout.legend.is_some() {
                    props.insert("a".to_owned(), json!(0));
                }
                if let Some(colors) = legend_colors(layout) {
                    props.insert("t".to_owned(), json!(colors));
                }
            }
            first_key = false;
            if key.size.w != 1.0 {
                props.insert("w".to_owned(), json!(key.size.w));
            }
            if key.size.h != 1.0 {
                props.insert("h".to_owned(), json!(key.size.h));
            }
            let color = key.color.as_deref().unwrap_or(DEFAULT_KEY_COLOR);
            if color != current_color {
                props.insert("c".to_owned(), json!(color));
            }
            if let Some(option) = &key.option {
                props.extend(option.clone());
            }
            if let Some(Value::String(c)) = props.get("c") {
                current_color = c.clone();
            }
            if !props.is_empty() {
                items.push(Value::Object(props).to_string());
            }
            items.push(Value::from(legend_text(layout, key)).to_string());
        }
        out.push(format!("[{}]", items.join(",")));
    }
    if let Some(description) = &layout.description {
        let decal = json!({"y": 0.5, "w": 20, "h": 3, "d": true, "t": "#333333", "f": 4});
        let text = format!(
            "{}<br /><br />{}",
            layout.source,
            description.lines().join("<br />")
        );
        out.push(format!("[{decal},{}]", Value::from(text)));
    }
    out.join(",\n")
}

/// Legend text colors as one `t` value, or `None` when every position keeps the default.
fn legend_colors(layout: &Layout) -> Option<String> {
    let colors = layout
        .legend_colors
        .as_ref()?
        .iter()
        .map(|color| color.as_deref().unwrap_or(""))
        .join("\n");
    let colors = colors.trim_end_matches('\n');
    (!colors.is_empty()).then(|| colors.to_owned())
}

fn legend_text(layout: &Layout, key: &ComposedKeycap) -> String {
    let text = match &layout.legend {
        Some(positions) => positions
            .iter()
            .map(|layer| layer.map_or("", |i| key.labels[i].as_str()))
            .join("\n"),
        None => key.labels.join("\n"),
    };
    text.trim_end_matches('\n').to_owned()
}
