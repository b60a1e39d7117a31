//! Slug helpers shared by posts and tags

/// Generate a URL-friendly slug from a title or tag name
///
/// Lowercases ASCII letters, turns whitespace, underscores and ASCII
/// punctuation into single hyphens, and drops anything that is not ASCII.
/// The result may be empty when the input has no ASCII letters or digits.
pub fn generate_slug(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_hyphen = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_lowercase());
            prev_hyphen = false;
        } else if c.is_ascii() {
            if !prev_hyphen && !result.is_empty() {
                result.push('-');
                prev_hyphen = true;
            }
        }
    }

    result.trim_end_matches('-').to_string()
}

/// A slug is URL-safe when it is non-empty and made of ASCII letters,
/// digits, hyphens and underscores.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Candidate slugs for de-duplication: `base`, `base-2`, `base-3`, ...
pub(crate) fn numbered(base: &str, n: u32) -> String {
    if n <= 1 {
        base.to_string()
    } else {
        format!("{}-{}", base, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_generate_slug_simple() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
        assert_eq!(generate_slug("UPPERCASE"), "uppercase");
    }

    #[test]
    fn test_generate_slug_collapses_separators() {
        assert_eq!(generate_slug("  Hello,   World!  "), "hello-world");
        assert_eq!(generate_slug("snake_case--title"), "snake-case-title");
    }

    #[test]
    fn test_generate_slug_drops_non_ascii() {
        assert_eq!(generate_slug("Café au lait"), "caf-au-lait");
        assert_eq!(generate_slug("日本語"), "");
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("hello-world"));
        assert!(is_valid_slug("Post_2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("has space"));
        assert!(!is_valid_slug("slash/inside"));
        assert!(!is_valid_slug("ünïcode"));
    }

    #[test]
    fn test_numbered() {
        assert_eq!(numbered("post", 1), "post");
        assert_eq!(numbered("post", 3), "post-3");
    }

    proptest! {
        #[test]
        fn prop_generated_slug_is_empty_or_valid(text in ".{0,60}") {
            let slug = generate_slug(&text);
            prop_assert!(slug.is_empty() || is_valid_slug(&slug));
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }
    }
}
