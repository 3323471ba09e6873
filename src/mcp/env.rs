//! `${VAR}` placeholder expansion for server env and header values.

use std::collections::BTreeMap;

/// Expand `${NAME}` placeholders from the process environment.
///
/// Unknown variables and unterminated placeholders are left as written, so a
/// missing secret shows up verbatim in the server's error rather than as an
/// empty string.
#[must_use]
pub fn expand_placeholders(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

#[must_use]
pub fn expand_map(map: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    map.iter()
        .map(|(k, v)| (k.clone(), expand_placeholders(v)))
        .collect()
}

fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match lookup(name).filter(|_| !name.is_empty()) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
