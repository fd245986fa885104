/// Base used when a title has no characters that survive `slugify`.
pub const FALLBACK_SLUG: &str = "track";

/// URL-safe form of a title.
///
/// Lowercases and trims, drops everything outside `[a-z0-9]`, whitespace and
/// `-`, then turns each run of whitespace/hyphens into a single `-`. The result
/// never starts or ends with `-`, so applying it twice changes nothing.
pub fn slugify(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut separator = false;

    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if separator && !slug.is_empty() {
                slug.push('-');
            }
            separator = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            separator = true;
        }
        // anything else is dropped without splitting the word
    }

    slug
}

/// First free slug among `base`, `base-2`, `base-3`, ...
pub fn next_available_slug<S: AsRef<str>>(base: &str, taken: &[S]) -> String {
    let is_taken = |candidate: &str| taken.iter().any(|t| t.as_ref() == candidate);

    if !is_taken(base) {
        return base.to_string();
    }
    (2u32..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
