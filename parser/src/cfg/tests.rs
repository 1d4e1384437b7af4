use super::*;

mod reader;

fn init_log() {
    use simplelog::*;
    use std::sync::OnceLock;
    static LOG_INIT: OnceLock<()> = OnceLock::new();
    LOG_INIT.get_or_init(|| {
        let mut log_cfg = ConfigBuilder::new();
        if let Err(e) = log_cfg.set_time_offset_to_local() {
            eprintln!("WARNING: could not set log TZ to local: {e:?}");
        };
        log_cfg.set_time_format_rfc3339();
        CombinedLogger::init(vec![TermLogger::new(
            // Note: set to a different level to see logs in tests.
            LevelFilter::Off,
            log_cfg.build(),
            TerminalMode::Stderr,
            ColorChoice::AlwaysAnsi,
        )])
        .expect("logger can init");
    });
}

fn parse_str(source: &str) -> Result<Layout> {
    init_log();
    parse_layout(source, "test", &ParseOptions::default())
}

fn parse_raw(source: &str) -> Result<Layout> {
    init_log();
    let opts = ParseOptions {
        translate_keys: false,
        ..Default::default()
    };
    parse_layout(source, "test", &opts)
}

fn labels(layout: &Layout) -> Vec<Vec<&str>> {
    layout
        .keys
        .iter()
        .map(|k| k.labels.iter().map(String::as_str).collect())
        .collect()
}

fn unresolved_aliases(layout: &Layout) -> Vec<&str> {
    layout
        .warnings
        .iter()
        .filter_map(|w| match w {
            Warning::UnresolvedAlias { alias, .. } => Some(alias.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn blank_and_unresolved_alias_keep_raw_labels() {
    let layout = parse_raw(
        "
(defsrc a b c)
(deflayer L1 x XX @y)
",
    )
    .expect("parses");
    assert_eq!(layout.layers, vec!["defsrc", "L1"]);
    assert_eq!(layout.keys.len(), 3);
    assert_eq!(
        labels(&layout),
        vec![vec!["a", "x"], vec!["b", ""], vec!["c", "@y"]]
    );
    for key in &layout.keys {
        assert_eq!(key.size, layout::KeySize::default());
        assert_eq!(key.color, None);
    }
    assert_eq!(unresolved_aliases(&layout), vec!["@y"]);
    assert!(layout.warnings.contains(&Warning::MissingHardwareLayout));
}

#[test]
fn blank_and_unresolved_alias_with_translated_labels() {
    let layout = parse_str(
        "
(defsrc a b c)
(deflayer L1 x XX @y)
",
    )
    .expect("parses");
    assert_eq!(
        labels(&layout),
        vec![vec!["A", "X"], vec!["B", ""], vec!["C", "@y"]]
    );
    assert_eq!(
        layout.warnings[1],
        Warning::UnresolvedAlias {
            alias: "@y".to_owned(),
            layer: "L1".to_owned(),
            slot: 2,
            line: 3,
        }
    );
}

#[test]
fn keycap_count_must_match_defsrc() {
    let source = "
(defsrc a b c d)
(deflayer base a b c d)
#|
<hardware-layout>
(keycap 1 1 1)
</hardware-layout>
|#
";
    let e = parse_str(source).expect_err("3 sizes for 4 keys");
    assert_eq!(e.kind, ErrorKind::LayoutShape);
    assert_eq!(e.span_text(), Some(" 1 1 1"));
    assert!(e
        .help_msg
        .starts_with("keycap has 3 size(s), but defsrc has 4 key(s)."));
}

#[test]
fn color_count_must_match_defsrc() {
    let source = "
(defsrc a b)
(deflayer base a b)
#|
<hardware-layout>
(colors #ffffff _ #000000)
</hardware-layout>
|#
";
    let e = parse_str(source).expect_err("3 colors for 2 keys");
    assert_eq!(e.kind, ErrorKind::LayoutShape);
    assert!(e
        .help_msg
        .starts_with("colors has 3 color(s), but defsrc has 2 key(s)."));
}

#[test]
fn every_layer_has_one_label_per_key() {
    let layout = parse_str(
        "
(defsrc
  esc 1 2
  tab q w)
(deflayer base _ _ _ _ _ _)
(deflayer nums
  _ f1 f2
  _ 7  8)
",
    )
    .expect("parses");
    assert_eq!(layout.rows, 2);
    assert_eq!(layout.keys.len(), 6);
    for key in &layout.keys {
        assert_eq!(key.labels.len(), layout.layers.len());
    }
    assert_eq!(labels(&layout)[1], vec!["1", "", "F1"]);
    assert_eq!(labels(&layout)[5], vec!["W", "", "8"]);
}

#[test]
fn layer_rows_follow_defsrc_not_layer_lines() {
    let layout = parse_raw(
        "
(defsrc
  a b
  c d)
(deflayer base w x y z)
",
    )
    .expect("parses");
    let positions: Vec<_> = layout.keys.iter().map(|k| (k.row, k.col)).collect();
    assert_eq!(positions, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    assert_eq!(labels(&layout)[2], vec!["c", "y"]);
}

#[test]
fn sizes_and_colors_follow_slot_order() {
    let layout = parse_str(
        "
(defsrc
  a b c
  d e f)
(deflayer base _ _ _ _ _ _)
#|
<hardware-layout>
(keycap
  1.5 _ 2x2
  _ 1.25 _)
(colors
  #ff0000 _ _
  _ _ #00ff00)
</hardware-layout>
|#
",
    )
    .expect("parses");
    let sizes: Vec<_> = layout.keys.iter().map(|k| (k.size.w, k.size.h)).collect();
    assert_eq!(
        sizes,
        vec![
            (1.5, 1.0),
            (1.0, 1.0),
            (2.0, 2.0),
            (1.0, 1.0),
            (1.25, 1.0),
            (1.0, 1.0)
        ]
    );
    let colors: Vec<_> = layout.keys.iter().map(|k| k.color.as_deref()).collect();
    assert_eq!(
        colors,
        vec![Some("#ff0000"), None, None, None, None, Some("#00ff00")]
    );
    assert!(layout.warnings.is_empty());
}

#[test]
fn grids_are_flattened_regardless_of_their_rows() {
    let layout = parse_str(
        "
(defsrc
  a b
  c d)
(deflayer base _ _ _ _)
#|
<hardware-layout>
(keycap 2 _ _
  _)
</hardware-layout>
|#
",
    )
    .expect("parses");
    assert_eq!(layout.keys[0].size.w, 2.0);
    assert!(layout.keys[1..].iter().all(|k| k.size.is_unit()));
}

#[test]
fn parsing_twice_gives_identical_output() {
    let source = "
(defsrc a b)
(defalias n (layer-toggle nums))
(deflayer base @n b)
#|
<hardware-layout>
(keycap 1.5 _)
(options b {c:'#aa0000'})
(description Two keys.)
</hardware-layout>
|#
";
    let first = parse_str(source).expect("parses");
    let second = parse_str(source).expect("parses");
    assert_eq!(first, second);
    assert_eq!(first.to_kle(), second.to_kle());
    assert_eq!(
        first.to_json().expect("serializes"),
        second.to_json().expect("serializes")
    );
}

#[test]
fn options_are_keyed_by_defsrc_token() {
    let layout = parse_str(
        "
(defsrc a lsft)
(deflayer base b rsft)
#|
<hardware-layout>
(options
  lsft {w: 2.25, c: \"#555555\"}
  rsft {w: 3})
</hardware-layout>
|#
",
    )
    .expect("parses");
    assert_eq!(layout.keys[0].option, None);
    let option = layout.keys[1].option.as_ref().expect("lsft has options");
    assert_eq!(option["w"], 2.25);
    assert_eq!(option["c"], "#555555");
}

#[test]
fn json_document_lists_layers_keys_and_warnings() {
    let layout = parse_raw("(defsrc a)(deflayer base @x)").expect("parses");
    let json: serde_json::Value =
        serde_json::from_str(&layout.to_json().expect("serializes")).expect("valid json");
    assert_eq!(json["source"], "test");
    assert_eq!(json["layers"], serde_json::json!(["defsrc", "base"]));
    assert_eq!(json["keys"][0]["labels"], serde_json::json!(["a", "@x"]));
    assert_eq!(json["keys"][0]["size"], serde_json::json!({"w": 1.0, "h": 1.0}));
    assert_eq!(json["warnings"][0]["kind"], "missing_hardware_layout");
    assert_eq!(json["warnings"][1]["kind"], "unresolved_alias");
    assert_eq!(json["warnings"][1]["alias"], "@x");
}

#[test]
fn kle_output_for_a_small_board() {
    let layout = parse_raw(
        "
(defsrc
  a b
  c)
(deflayer base x XX
  @missing)
#|
<hardware-layout>
(keycap
  _ 1.5
  2)
(colors
  _ _
  #ff0000)
(description Small board
with two lines.)
</hardware-layout>
|#
",
    )
    .expect("parses");
    assert_eq!(
        layout.to_kle(),
        concat!(
            r#"["a\nx",{"w":1.5},"b"],"#,
            "\n",
            r##"[{"c":"#ff0000","w":2.0},"c\n@missing"],"##,
            "\n",
            r##"[{"d":true,"f":4,"h":3,"t":"#333333","w":20,"y":0.5},"##,
            r#""test<br /><br />Small board<br />with two lines."]"#,
        )
    );
}

#[test]
fn legend_places_layers_on_keycaps() {
    let layout = parse_raw(
        "
(defsrc a)
(deflayer base x)
(deflayer nav y)
#|
<hardware-layout>
(legend
  defsrc _ nav
  _ _ _
  base _ _
  _ _ nope)
</hardware-layout>
|#
",
    )
    .expect("parses");
    let legend = layout.legend.as_ref().expect("has legend");
    assert_eq!(legend[0], Some(0));
    assert_eq!(legend[2], Some(2));
    assert_eq!(legend[1], Some(1));
    assert_eq!(legend.iter().flatten().count(), 3);
    assert_eq!(
        layout.warnings,
        vec![Warning::UnknownLegendLayer {
            layer: "nope".to_owned()
        }]
    );
    assert_eq!(layout.to_kle(), r#"[{"a":0},"a\nx\ny"]"#);
}

#[test]
fn errors_render_with_source() {
    init_log();
    let e = new_from_str("(defsrc a", "bad.kbd", &ParseOptions::default())
        .expect_err("unclosed");
    let report = format!("{e:?}");
    assert!(report.contains("Unclosed opening parenthesis"));
}
