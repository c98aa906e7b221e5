// Source-agnostic display-name canonicalization.
//
// Known limitation: every 2-3 character token is dropped, which removes team
// abbreviations but also short real name parts ("Bo", "Ray"). Matching that
// needs to keep them should supply a different `NameMatcher`.

const SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv", "v"];

/// Canonicalize a display name into a join key.
///
/// Lowercases, keeps only `[a-z0-9]` and whitespace, drops tokens of length
/// 2-3 and generational suffixes, then joins what remains with single spaces.
/// Total: any input (including empty) yields a string, possibly empty.
pub fn normalize(raw: &str) -> String {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .filter(|token| !(2..=3).contains(&token.len()))
        .filter(|token| !SUFFIXES.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}
