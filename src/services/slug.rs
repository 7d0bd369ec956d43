//! URL slug generation

use once_cell::sync::Lazy;
use regex::Regex;

static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\p{L}\p{N}]+").expect("slug pattern is valid")
});

/// Generate a URL-friendly slug from a title.
///
/// Lowercases, collapses every run of characters that are neither letters
/// nor digits into one hyphen and trims hyphens from both ends. Non-ASCII
/// letters are kept.
pub fn generate_slug(title: &str) -> String {
    NON_SLUG_CHARS
        .replace_all(&title.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// Use the requested slug when it is non-blank, else derive one from `title`
pub fn resolve_slug(requested: Option<&str>, title: &str) -> String {
    match requested.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => generate_slug(slug),
        None => generate_slug(title),
    }
}
