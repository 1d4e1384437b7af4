//! Display labels for the key names used in KMonad and kanata configurations.

use std::borrow::Cow;

/// Returns the keycap label for a key name. Names without a known label are returned unchanged,
/// except that single letters are upper-cased to match what is printed on a keycap.
pub fn key_label(name: &str) -> Cow<'_, str> {
    if let Some(label) = known_label(name) {
        return Cow::Borrowed(label);
    }
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_alphabetic() => Cow::Owned(c.to_uppercase().collect()),
        _ => Cow::Borrowed(name),
    }
}

fn known_label(name: &str) -> Option<&'static str> {
    Some(match name {
        "ret" | "return" => "Return",
        "ent" | "enter" | "kprt" => "Enter",
        "esc" => "Esc",
        "tab" => "Tab",
        "spc" | "space" => "Space",
        "bspc" | "bks" | "backspace" => "⌫",
        "ins" => "Ins",
        "del" => "Del",
        "home" => "Home",
        "end" => "End",
        "pgup" => "⤒",
        "pgdn" => "⤓",
        "caps" => "🄰 Caps",
        "min" | "kp-" => "-",
        "eql" => "=",
        "lbrc" => "[",
        "rbrc" => "]",
        "scln" => ";",
        "apos" => "'",
        "grv" => "`",
        "bksl" => "\\",
        "comm" => ",",
        "dot" | "kp." => ".",
        "slsh" | "kp/" => "/",
        "kp+" => "+",
        "kp*" => "*",
        "lalt" | "alt" => "Alt",
        "ralt" => "AltGr",
        "lsft" | "lshift" | "lshft" | "rsft" | "rshift" | "rshft" | "sft" | "shft" => "Shift",
        "lctl" | "lctrl" | "rctl" | "rctrl" | "ctl" => "Ctrl",
        "lmet" | "lmeta" | "rmet" | "rmeta" | "met" => "Meta",
        "comp" | "cmps" | "cmp" => "Cmp",
        "ssrq" | "sys" => "SysRq",
        "lft" | "left" => "←",
        "rght" | "right" => "→",
        "up" => "↑",
        "down" | "dn" => "↓",
        "volu" => "🕪",
        "vold" | "voldwn" => "🕩",
        "mute" => "🕨",
        "brup" | "bru" => "🔆",
        "brdown" | "brdwn" | "brdn" => "🔅",
        "next" | "fwd" => "⏭",
        "prev" => "⏮",
        "pp" => "⏯",
        "f1" => "F1",
        "f2" => "F2",
        "f3" => "F3",
        "f4" => "F4",
        "f5" => "F5",
        "f6" => "F6",
        "f7" => "F7",
        "f8" => "F8",
        "f9" => "F9",
        "f10" => "F10",
        "f11" => "F11",
        "f12" => "F12",
        _ => return None,
    })
}

#[test]
fn key_label_translates_known_names_and_letters() {
    assert_eq!(key_label("spc"), "Space");
    assert_eq!(key_label("lsft"), "Shift");
    assert_eq!(key_label("bksl"), "\\");
    assert_eq!(key_label("q"), "Q");
    assert_eq!(key_label("1"), "1");
    assert_eq!(key_label("S-a"), "S-a");
    assert_eq!(key_label("ñ"), "Ñ");
}
