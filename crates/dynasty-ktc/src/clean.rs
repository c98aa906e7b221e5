// Listing-name cleanup.
//
// The rankings page renders the player's name, team and rookie badge as
// adjacent text, so the flattened cell reads "Josh AllenBUF" or
// "Travis HunterRJAX". Free agents show "FA" or "RFA" in the team slot.

/// Strip the team (or FA/RFA) suffix and then a trailing rookie "R".
pub fn clean_listed_name(raw: &str) -> String {
    let raw = raw.trim();
    let chars: Vec<char> = raw.chars().collect();

    let keep = if raw.ends_with("RFA") {
        chars.len() - 3
    } else if chars.len() >= 3 && is_upper(&chars[chars.len() - 3..]) {
        chars.len() - 3
    } else if chars.len() >= 2 && chars[chars.len() - 2..].iter().all(char::is_ascii_uppercase) {
        chars.len() - 2
    } else {
        chars.len()
    };

    let name: String = chars[..keep].iter().collect();
    let name = name.trim_end();
    let name = name.strip_suffix('R').unwrap_or(name);
    name.trim().to_string()
}

/// At least one cased character and no lowercase ones.
fn is_upper(chars: &[char]) -> bool {
    chars.iter().any(|c| c.is_uppercase()) && !chars.iter().any(|c| c.is_lowercase())
}
