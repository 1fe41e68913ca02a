// src/text.rs

//! Small string helpers used by config interpolation and log formatting.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Pad `s` on the right with `ch` up to `len` characters.
pub fn pad_end(s: &str, len: usize, ch: char) -> String {
    let count = s.chars().count();
    let mut out = s.to_string();
    out.extend(std::iter::repeat_n(ch, len.saturating_sub(count)));
    out
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([a-zA-Z0-9_]+)\}").expect("static placeholder regex is valid")
    })
}

/// Replace `${name}` placeholders with values from `values`.
///
/// Unknown placeholders are left untouched.
pub fn patch_string(input: &str, values: &BTreeMap<String, String>) -> String {
    placeholder_regex()
        .replace_all(input, |caps: &Captures<'_>| match values.get(&caps[1]) {
            Some(v) => v.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Names of all `${name}` placeholders in `input`, in order of appearance.
pub fn placeholders(input: &str) -> Vec<String> {
    placeholder_regex()
        .captures_iter(input)
        .map(|c| c[1].to_string())
        .collect()
}
