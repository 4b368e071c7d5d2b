//! Zero-width metadata markers: `\u{200B}\u{200B}\u{200B}[KIND:value]\u{200B}\u{200B}\u{200B}`.

use once_cell::sync::Lazy;
use regex::Regex;

pub const MARKER_FENCE: &str = "\u{200B}\u{200B}\u{200B}";

static ANCHOR_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\x{200B}{3}\[ANCHOR:(.*?)\]\x{200B}{3}").expect("anchor marker pattern")
});
static LANGUAGE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\x{200B}{3}\[LANGUAGE:(.*?)\]\x{200B}{3}").expect("language marker pattern")
});
static CALLOUT_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\x{200B}{3}\[CALLOUT:(.*?)\]\x{200B}{3}").expect("callout marker pattern")
});
static LINK_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\x{200B}{3}\[LINK:(.*?)\]\x{200B}{3}").expect("link marker pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Anchor,
    Language,
    Callout,
    Link,
}

impl MarkerKind {
    pub fn tag(self) -> &'static str {
        match self {
            MarkerKind::Anchor => "ANCHOR",
            MarkerKind::Language => "LANGUAGE",
            MarkerKind::Callout => "CALLOUT",
            MarkerKind::Link => "LINK",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            MarkerKind::Anchor => &ANCHOR_MARKER,
            MarkerKind::Language => &LANGUAGE_MARKER,
            MarkerKind::Callout => &CALLOUT_MARKER,
            MarkerKind::Link => &LINK_MARKER,
        }
    }
}

pub fn encode_marker(kind: MarkerKind, value: &str) -> String {
    format!("{MARKER_FENCE}[{}:{value}]{MARKER_FENCE}", kind.tag())
}

/// Removes a leading `kind` marker from `text`, returning its value. Only the
/// matched prefix is removed.
pub fn take_marker(kind: MarkerKind, text: &mut String) -> Option<String> {
    let (value, end) = {
        let caps = kind.pattern().captures(text)?;
        (caps.get(1)?.as_str().to_string(), caps.get(0)?.end())
    };
    text.replace_range(..end, "");
    Some(value)
}

/// Tests `kinds` in order against the front of `text`, each on what the
/// previous ones left. When anything matched and nothing is left, the text
/// becomes a single space so the run never turns into an empty text node.
pub fn extract_markers(text: &str, kinds: &[MarkerKind]) -> (Vec<(MarkerKind, String)>, String) {
    let mut rest = text.to_string();
    let mut found = Vec::new();
    for &kind in kinds {
        if let Some(value) = take_marker(kind, &mut rest) {
            found.push((kind, value));
        }
    }
    if !found.is_empty() && rest.is_empty() {
        rest.push(' ');
    }
    (found, rest)
}

pub fn has_marker_prefix(text: &str) -> bool {
    text.starts_with(MARKER_FENCE)
}
