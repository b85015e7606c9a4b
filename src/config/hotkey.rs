//! Canonical hotkey strings.
//!
//! Hotkeys are written by hand in the config file (`"ctrl+1"`, `"1+Ctrl"`) and
//! produced by the UI from key events (`"Ctrl+1"`). Both sides are reduced to one
//! canonical form before comparison: lower-case, modifiers first in the order
//! `ctrl`, `alt`, `shift`, `meta`, then the remaining keys sorted.

use std::fmt;

const MODIFIER_ORDER: [&str; 4] = ["ctrl", "alt", "shift", "meta"];

/// A normalized key combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hotkey(String);

impl Hotkey {
    /// Normalizes `raw`; returns `None` when it names no key at all.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts: Vec<String> = raw
            .split('+')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| canonical_part(&part.to_lowercase()))
            .collect();
        if parts.is_empty() {
            return None;
        }

        parts.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.cmp(b)));
        parts.dedup();
        Some(Hotkey(parts.join("+")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn canonical_part(part: &str) -> String {
    match part {
        "control" | "ctl" => "ctrl",
        "option" | "opt" => "alt",
        "cmd" | "command" | "win" | "windows" | "super" => "meta",
        other => other,
    }
    .to_string()
}

fn rank(part: &str) -> usize {
    MODIFIER_ORDER
        .iter()
        .position(|m| *m == part)
        .unwrap_or(MODIFIER_ORDER.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_order_and_case_insensitive() {
        let a = Hotkey::parse("ctrl+1").unwrap();
        let b = Hotkey::parse("Ctrl+1").unwrap();
        let c = Hotkey::parse("1+Ctrl").unwrap();

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "ctrl+1");
    }

    #[test]
    fn test_modifiers_sorted_canonically() {
        let hk = Hotkey::parse("Shift + F5 + Alt + Ctrl").unwrap();
        assert_eq!(hk.as_str(), "ctrl+alt+shift+f5");
    }

    #[test]
    fn test_aliases() {
        assert_eq!(
            Hotkey::parse("Control+Option+Cmd+K"),
            Hotkey::parse("ctrl+alt+meta+k")
        );
    }

    #[test]
    fn test_empty_segments_and_duplicates() {
        assert_eq!(Hotkey::parse("ctrl++1").unwrap().as_str(), "ctrl+1");
        assert_eq!(Hotkey::parse("ctrl+ctrl+1").unwrap().as_str(), "ctrl+1");
    }

    #[test]
    fn test_blank_is_none() {
        assert_eq!(Hotkey::parse(""), None);
        assert_eq!(Hotkey::parse(" + "), None);
    }

    #[test]
    fn test_different_keys_differ() {
        assert_ne!(Hotkey::parse("ctrl+1"), Hotkey::parse("ctrl+2"));
        assert_ne!(Hotkey::parse("ctrl+1"), Hotkey::parse("1"));
    }
}
