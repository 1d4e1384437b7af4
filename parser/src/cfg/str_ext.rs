pub trait TrimAtomQuotes {
    fn trim_atom_quotes(&self) -> &str;
}

impl TrimAtomQuotes for str {
    fn trim_atom_quotes(&self) -> &str {
        self.strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(self)
    }
}

impl TrimAtomQuotes for String {
    fn trim_atom_quotes(&self) -> &str {
        self.as_str().trim_atom_quotes()
    }
}

/// KMonad lets keys be written with a backslash escape, e.g. `\(` or `\\`.
pub trait UnescapeKey {
    fn unescape_key(&self) -> &str;
}

impl UnescapeKey for str {
    fn unescape_key(&self) -> &str {
        match self.strip_prefix('\\') {
            Some(rest) if !rest.is_empty() => rest,
            _ => self,
        }
    }
}
