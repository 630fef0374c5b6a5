//! Species-name canonicalization.

/// Regional adjectives and the form suffix the dex uses for them, in the
/// order they are tried.
const REGIONAL_FORMS: [(&str, &str); 4] = [
    ("alolan", "Alola"),
    ("galarian", "Galar"),
    ("hisuian", "Hisui"),
    ("paldean", "Paldea"),
];

/// Rewrites a trailing regional adjective (`"Vulpix-Alolan"`,
/// `"Meowth Galarian"`) into the dex form suffix (`"Vulpix-Alola"`). The
/// first matching pattern wins. Never fails; unrecognized input comes back
/// trimmed.
pub fn normalize_species_name(raw: &str) -> String {
    let trimmed = raw.trim();
    for (adjective, suffix) in REGIONAL_FORMS {
        if let Some(base) = strip_adjective(trimmed, adjective, '-') {
            return format!("{}-{}", base, suffix);
        }
        if let Some(base) = strip_adjective(trimmed, adjective, ' ') {
            return format!("{}-{}", base.trim_end(), suffix);
        }
    }
    trimmed.to_string()
}

fn strip_adjective<'a>(name: &'a str, adjective: &str, separator: char) -> Option<&'a str> {
    let lower = name.to_ascii_lowercase();
    if !lower.ends_with(adjective) {
        return None;
    }
    let base = &name[..name.len() - adjective.len()];
    let base = if separator == ' ' {
        let stripped = base.trim_end_matches(char::is_whitespace);
        (stripped.len() < base.len()).then_some(stripped)?
    } else {
        base.strip_suffix(separator)?
    };
    (!base.is_empty()).then_some(base)
}

/// Lookup id: lowercase ASCII letters and digits only.
pub fn to_id(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Applies the adjective → suffix rewrite on an id (`"vulpixalolan"` →
/// `"vulpixalola"`).
pub fn fix_id_suffix(id: &str) -> Option<String> {
    REGIONAL_FORMS.iter().find_map(|(adjective, suffix)| {
        id.strip_suffix(adjective)
            .filter(|base| !base.is_empty())
            .map(|base| format!("{}{}", base, suffix.to_ascii_lowercase()))
    })
}

/// Base species name: the part before the first `-`, then before the first
/// whitespace.
pub fn base_species_name(name: &str) -> &str {
    let before_dash = name.split('-').next().unwrap_or(name);
    before_dash.split_whitespace().next().unwrap_or(before_dash).trim()
}
