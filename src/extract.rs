use regex::Regex;

/// Pull every email address out of free-form text. Line breaks, commas and
/// semicolons all count as separators; duplicates are dropped, first
/// occurrence wins.
pub fn extract_emails(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let pattern = Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}")
        .expect("email regex is valid");

    let mut emails: Vec<String> = Vec::new();
    for m in pattern.find_iter(text) {
        let email = m.as_str().trim().to_string();
        if !emails.contains(&email) {
            emails.push(email);
        }
    }
    emails
}

/// Extract a bare domain, lowercased, from input that may be a URL, an email
/// address, an `@domain` handle, or already a plain domain.
pub fn extract_domain(input: &str) -> String {
    let mut input = input.trim().trim_start_matches('@').to_string();

    if input.contains('@') && strip_prefix_ignore_case(&input, "http").is_none() {
        if let Some((_, domain_part)) = input.split_once('@') {
            input = domain_part.to_string();
        }
    }

    // Strip scheme and leading www., matching case-insensitively.
    for prefix in ["https://", "http://"] {
        if let Some(rest) = strip_prefix_ignore_case(&input, prefix) {
            input = rest.to_string();
            break;
        }
    }
    if let Some(rest) = strip_prefix_ignore_case(&input, "www.") {
        input = rest.to_string();
    }

    // Drop path, query and fragment.
    for sep in ['/', '?', '#'] {
        if let Some((head, _)) = input.split_once(sep) {
            input = head.to_string();
        }
    }

    input.to_lowercase()
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// The domain part of an email address, lowercased, or None for input
/// without a usable domain.
pub fn email_domain(email: &str) -> Option<String> {
    let at_pos = email.rfind('@')?;
    if at_pos == 0 {
        return None;
    }
    let domain = email[at_pos + 1..].trim();
    if domain.contains('.') && !domain.is_empty() {
        Some(domain.to_lowercase())
    } else {
        None
    }
}
