//! A parser for KMonad/kanata configuration files that recovers the physical keyboard layout and
//! the per-layer key labels, and composes them into a layout for
//! [keyboard-layout-editor](http://www.keyboard-layout-editor.com/).

pub mod cfg;
pub mod keys;
pub mod layout;
