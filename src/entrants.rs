use std::collections::HashSet;

use crate::error::MatchupError;

/// Turns dictated "comma" words into literal separators so that
/// "cats comma dogs comma birds" splits the same way as "cats, dogs, birds".
/// Only the matching words change; all other text and spacing is kept.
pub fn normalize_dictated_commas(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut token = String::new();
    for c in raw.chars() {
        if c.is_whitespace() {
            push_dictated_token(&mut out, &token);
            token.clear();
            out.push(c);
        } else {
            token.push(c);
        }
    }
    push_dictated_token(&mut out, &token);
    out
}

fn push_dictated_token(out: &mut String, token: &str) {
    let bare = token.trim_matches(|c: char| c.is_ascii_punctuation());
    if !token.is_empty() && bare.eq_ignore_ascii_case("comma") {
        out.push(',');
    } else {
        out.push_str(token);
    }
}

/// Splits on commas, trims, drops empty entries and case-insensitive
/// duplicates (first spelling wins).
pub fn split_entrants(raw: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for part in raw.split(',') {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            out.push(trimmed.to_string());
        }
    }
    out
}

/// Parses raw entrant text and enforces the `[min, max]` entrant count.
pub fn parse_entrant_list(
    raw: &str,
    voice: bool,
    min: usize,
    max: usize,
) -> Result<Vec<String>, MatchupError> {
    let names = if voice {
        split_entrants(&normalize_dictated_commas(raw))
    } else {
        split_entrants(raw)
    };
    if names.len() < min || names.len() > max {
        return Err(MatchupError::EntrantCount {
            count: names.len(),
            min,
            max,
        });
    }
    Ok(names)
}
