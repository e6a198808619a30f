// Validation and normalization helpers for request fields

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer};

lazy_static! {
    static ref NON_SLUG_CHARS: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

/// Trim a required field, rejecting it when nothing is left
pub fn trim_and_validate_field(field: &str, name: &str) -> Result<String, String> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        Err(format!("{} is required", name))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Trim an optional field; blank values become `None`
pub fn trim_optional_field(field: Option<&String>) -> Option<String> {
    field.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Serde hook that trims a string as it is read, so length rules apply to
/// what will actually be stored
pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

/// `trimmed` for optional fields; pair it with `#[serde(default)]`
pub fn trimmed_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|o| o.map(|s| s.trim().to_string()))
}

/// Tell an explicit `null` (`Some(None)`) apart from an absent field (`None`);
/// pair it with `#[serde(default)]`
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Lowercase, collapse runs of non-alphanumerics into `-`, strip edge dashes
pub fn slugify(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    NON_SLUG_CHARS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Explicit slug if given, otherwise derived from the fallback text
pub fn resolve_slug(explicit: Option<&String>, fallback: &str) -> Result<String, String> {
    let source = trim_optional_field(explicit).unwrap_or_else(|| fallback.to_string());
    let slug = slugify(&source);
    if slug.is_empty() {
        Err("Slug must contain at least one letter or digit".to_string())
    } else {
        Ok(slug)
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside LIKE/ILIKE
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Substring pattern for a case-insensitive search
pub fn like_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("University of Toronto"), "university-of-toronto");
        assert_eq!(slugify("  MBA -- Finance & Risk!  "), "mba-finance-risk");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_resolve_slug() {
        assert_eq!(resolve_slug(None, "About Us").unwrap(), "about-us");
        assert_eq!(
            resolve_slug(Some(&"Custom Slug".to_string()), "ignored").unwrap(),
            "custom-slug"
        );
        assert_eq!(resolve_slug(Some(&"   ".to_string()), "Home").unwrap(), "home");
        assert!(resolve_slug(None, "!!!").is_err());
    }

    #[test]
    fn test_trim_helpers() {
        assert_eq!(trim_and_validate_field("  Jane ", "name").unwrap(), "Jane");
        assert_eq!(trim_and_validate_field("   ", "name").unwrap_err(), "name is required");
        assert_eq!(trim_optional_field(Some(&"  ".to_string())), None);
        assert_eq!(trim_optional_field(Some(&" x ".to_string())), Some("x".to_string()));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("CAMS"), "%CAMS%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(escape_like("a_b@x.com"), "a\\_b@x.com");
    }
}
