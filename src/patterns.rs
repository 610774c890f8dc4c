use serde::{Deserialize, Serialize};

/// A single guessed address awaiting validation, tagged with the person it
/// was generated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub source_name: String,
    pub address: String,
}

/// Local-part templates for guessed addresses. The serde names are the
/// pattern keys used in settings files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternKey {
    #[serde(rename = "first")]
    First,
    #[serde(rename = "last")]
    Last,
    #[serde(rename = "firstlast")]
    FirstLast,
    #[serde(rename = "lastfirst")]
    LastFirst,
    #[serde(rename = "first.last")]
    FirstDotLast,
    #[serde(rename = "last.first")]
    LastDotFirst,
    #[serde(rename = "first_last")]
    FirstUnderscoreLast,
    #[serde(rename = "last_first")]
    LastUnderscoreFirst,
    #[serde(rename = "first-last")]
    FirstDashLast,
    #[serde(rename = "last-first")]
    LastDashFirst,
    #[serde(rename = "flast")]
    InitialLast,
    #[serde(rename = "f.last")]
    InitialDotLast,
    #[serde(rename = "first.l")]
    FirstDotInitial,
    #[serde(rename = "fl")]
    Initials,
}

/// Every pattern the generator knows about.
pub const ALL_PATTERNS: [PatternKey; 14] = [
    PatternKey::First,
    PatternKey::Last,
    PatternKey::FirstLast,
    PatternKey::LastFirst,
    PatternKey::FirstDotLast,
    PatternKey::LastDotFirst,
    PatternKey::FirstUnderscoreLast,
    PatternKey::LastUnderscoreFirst,
    PatternKey::FirstDashLast,
    PatternKey::LastDashFirst,
    PatternKey::InitialLast,
    PatternKey::InitialDotLast,
    PatternKey::FirstDotInitial,
    PatternKey::Initials,
];

/// Pattern set enabled when the user has never saved settings.
pub fn default_patterns() -> Vec<PatternKey> {
    vec![
        PatternKey::First,
        PatternKey::Last,
        PatternKey::FirstLast,
        PatternKey::FirstDotLast,
        PatternKey::FirstUnderscoreLast,
        PatternKey::FirstDashLast,
        PatternKey::InitialLast,
        PatternKey::InitialDotLast,
        PatternKey::FirstDotInitial,
        PatternKey::Initials,
    ]
}

/// Lowercase a name and strip everything that is not ASCII alphanumeric.
fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Split a full name into (first, last). The first whitespace-separated token
/// is the first name, the remainder is the last name.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or("").to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

/// Generate candidate addresses for one person at one domain, restricted to
/// the enabled pattern keys. Returns an empty list when the first name or the
/// domain normalizes to nothing. Deterministic; no network or storage access.
pub fn generate(first: &str, last: &str, domain: &str, enabled: &[PatternKey]) -> Vec<String> {
    let f = normalize_name(first);
    let l = normalize_name(last);
    let domain = domain.trim().to_lowercase();
    if f.is_empty() || domain.is_empty() {
        return Vec::new();
    }

    let fi: String = f.chars().take(1).collect();
    let li: String = l.chars().take(1).collect();

    let mut out: Vec<String> = Vec::new();
    let mut push = |local: String| {
        let address = format!("{local}@{domain}");
        if !out.contains(&address) {
            out.push(address);
        }
    };

    for key in &ALL_PATTERNS {
        if !enabled.contains(key) {
            continue;
        }
        // Every pattern except `first` needs a last name.
        if l.is_empty() && *key != PatternKey::First {
            continue;
        }
        match key {
            PatternKey::First => push(f.clone()),
            PatternKey::Last => push(l.clone()),
            PatternKey::FirstLast => push(format!("{f}{l}")),
            PatternKey::LastFirst => push(format!("{l}{f}")),
            PatternKey::FirstDotLast => push(format!("{f}.{l}")),
            PatternKey::LastDotFirst => push(format!("{l}.{f}")),
            PatternKey::FirstUnderscoreLast => push(format!("{f}_{l}")),
            PatternKey::LastUnderscoreFirst => push(format!("{l}_{f}")),
            PatternKey::FirstDashLast => push(format!("{f}-{l}")),
            PatternKey::LastDashFirst => push(format!("{l}-{f}")),
            PatternKey::InitialLast => push(format!("{fi}{l}")),
            PatternKey::InitialDotLast => push(format!("{fi}.{l}")),
            PatternKey::FirstDotInitial => push(format!("{f}.{li}")),
            PatternKey::Initials => push(format!("{fi}{li}")),
        }
    }

    out
}

/// Generate tagged candidates for a list of full names.
pub fn candidates_for_names(
    names: &[String],
    domain: &str,
    enabled: &[PatternKey],
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for full_name in names {
        let (first, last) = split_full_name(full_name);
        for address in generate(&first, &last, domain, enabled) {
            candidates.push(Candidate {
                source_name: full_name.clone(),
                address,
            });
        }
    }
    candidates
}
