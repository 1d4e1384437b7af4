use super::*;

fn syntax_error(source: &str) -> LayoutError {
    init_log();
    let e = sexpr::parse(source, "test").expect_err("syntax error");
    assert_eq!(e.kind, ErrorKind::Syntax);
    e
}

#[test]
fn span_absolute_ranges() {
    let s = "(hello world my oyster)\n(row two)";
    let tlevel = sexpr::parse(s, "test").unwrap().exprs;
    assert_eq!(
        &s[tlevel[0].span.start()..tlevel[0].span.end()],
        "(hello world my oyster)"
    );
    assert_eq!(&s[tlevel[1].span.clone()], "(row two)");
    assert_eq!(tlevel[1].span.line(), 1);
}

#[test]
fn span_works_with_unicode_characters() {
    let source = "(defsrc a) ;; 😊\n(deflayer base @😊)\n";
    let tlevel = sexpr::parse(source, "test").unwrap().exprs;
    let alias = &tlevel[1].t[2];
    assert_eq!(alias.atom(), Some("@😊"));
    assert_eq!(&source[alias.span()], "@😊");
    assert_eq!(alias.span().line(), 1);
}

#[test]
fn nested_lists_keep_their_text() {
    let tlevel = sexpr::parse("(a (b (c d)) \"e f\")", "test").unwrap().exprs;
    assert_eq!(tlevel.len(), 1);
    assert_eq!(tlevel[0].t.len(), 3);
    assert_eq!(tlevel[0].t[1].to_string(), "(b (c d))");
    assert_eq!(tlevel[0].t[2].atom(), Some("\"e f\""));
}

#[test]
fn single_semicolon_is_an_atom() {
    let tlevel = sexpr::parse("(defsrc ; a) ;; comment (not a list\n", "test")
        .unwrap()
        .exprs;
    assert_eq!(tlevel.len(), 1);
    let atoms: Vec<_> = tlevel[0].t.iter().filter_map(SExpr::atom).collect();
    assert_eq!(atoms, vec!["defsrc", ";", "a"]);
}

#[test]
fn block_comments_nest() {
    let source = "#| outer #| inner (x |# still outer ) |#\n(defsrc a)";
    let parsed = sexpr::parse(source, "test").unwrap();
    assert_eq!(parsed.exprs.len(), 1);
    assert_eq!(parsed.exprs[0].t[0].atom(), Some("defsrc"));
    assert!(parsed.hardware_layout.is_empty());
}

#[test]
fn hardware_layout_is_captured_raw() {
    let source = "(defsrc a)\n#|\nnotes (unbalanced\n<hardware-layout>\n(keycap 1)\n</hardware-layout>\n|#\n";
    let parsed = sexpr::parse(source, "test").unwrap();
    assert_eq!(parsed.exprs.len(), 1);
    assert_eq!(parsed.hardware_layout.len(), 1);
    let section = &parsed.hardware_layout[0];
    assert_eq!(section.t, "\n(keycap 1)\n");
    assert_eq!(&source[section.span.clone()], section.t);
}

#[test]
fn every_hardware_layout_section_is_captured() {
    let source = "#| <hardware-layout>(keycap 1)</hardware-layout> |#\n\
                  (defsrc a)\n\
                  #| <hardware-layout>(colors _)</hardware-layout> |#";
    let parsed = sexpr::parse(source, "test").unwrap();
    let sections: Vec<_> = parsed
        .hardware_layout
        .iter()
        .map(|s| s.t.as_str())
        .collect();
    assert_eq!(sections, vec!["(keycap 1)", "(colors _)"]);
}

#[test]
fn hardware_layout_outside_comments_is_not_captured() {
    let parsed = sexpr::parse("(defsrc <hardware-layout>)", "test").unwrap();
    assert!(parsed.hardware_layout.is_empty());
    assert_eq!(parsed.exprs[0].t[1].atom(), Some("<hardware-layout>"));
}

#[test]
fn unclosed_parenthesis() {
    let e = syntax_error("(defsrc a\n(deflayer base b)");
    assert!(e.help_msg.starts_with("Unclosed opening parenthesis"));
    assert_eq!(e.span_text(), Some("("));
}

#[test]
fn unexpected_closing_parenthesis() {
    let e = syntax_error("(defsrc a))");
    assert!(e.help_msg.starts_with("Unexpected closing parenthesis"));
    assert_eq!(e.err_span.map(|s| s.offset()), Some(10));
}

#[test]
fn top_level_atoms_are_rejected() {
    let e = syntax_error("stray (defsrc a)");
    assert!(e.help_msg.starts_with("Everything must be in a list"));
    assert_eq!(e.span_text(), Some("stray"));
}

#[test]
fn unterminated_string() {
    let e = syntax_error("(defsrc \"a b\n)");
    assert!(e.help_msg.starts_with("Unterminated string"));
    assert_eq!(e.span_text(), Some("\"a b"));
}

#[test]
fn span_of_an_unterminated_block_comment_error() {
    let e = syntax_error("(defsrc a) #| I'm an unterminated block comment...");
    assert!(e.help_msg.starts_with("Unterminated multiline comment"));
    assert_eq!(e.span_text(), Some("#|"));
}

#[test]
fn unterminated_hardware_layout_section() {
    let e = syntax_error("(defsrc a) #| <hardware-layout> (keycap 1) |#");
    assert!(e.help_msg.starts_with("Unterminated <hardware-layout> section"));
    assert_eq!(e.span_text(), Some("<hardware-layout>"));
}

#[test]
fn errors_keep_file_name_and_content() {
    let source = "(defsrc a";
    let e = sexpr::parse(source, "board.kbd").expect_err("unclosed");
    assert_eq!(e.file_name.as_deref(), Some("board.kbd"));
    assert_eq!(e.file_content.as_deref(), Some(source));
}

#[test]
fn escaped_parentheses_are_atoms() {
    let tlevel = sexpr::parse("(defsrc \\( \\) a)", "test").unwrap().exprs;
    let atoms: Vec<_> = tlevel[0].t.iter().filter_map(SExpr::atom).collect();
    assert_eq!(atoms, vec!["defsrc", "\\(", "\\)", "a"]);
}
