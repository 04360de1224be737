//! URL slugs for categories, subcategories and destinations

/// Longest slug produced by [`generate_slug`]
pub const MAX_SLUG_LENGTH: usize = 120;

/// Generate a URL-friendly slug from a name
///
/// Lowercases the name, turns spaces, underscores and ASCII punctuation
/// into single hyphens and keeps non-ASCII letters as they are. Leading and
/// trailing hyphens are dropped.
pub fn generate_slug(name: &str) -> String {
    let mut result = String::new();
    let mut prev_hyphen = false;

    for c in name.to_lowercase().chars() {
        let c = if c.is_ascii_alphanumeric() || !c.is_ascii() { c } else { '-' };
        if c == '-' {
            if !prev_hyphen && !result.is_empty() {
                result.push(c);
                prev_hyphen = true;
            }
        } else if c.is_whitespace() || c.is_control() {
            // Non-ASCII whitespace counts as a separator too
            if !prev_hyphen && !result.is_empty() {
                result.push('-');
                prev_hyphen = true;
            }
        } else {
            result.push(c);
            prev_hyphen = false;
        }
    }

    let trimmed: String = result.chars().take(MAX_SLUG_LENGTH).collect();
    trimmed.trim_end_matches('-').to_string()
}

/// `base` with a numeric suffix, used to resolve slug collisions: `bali-2`
pub fn with_suffix(base: &str, n: u32) -> String {
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
    }

    #[test]
    fn test_generate_slug_with_special_chars() {
        assert_eq!(generate_slug("Bali, Indonesia!"), "bali-indonesia");
    }

    #[test]
    fn test_generate_slug_with_multiple_spaces() {
        assert_eq!(generate_slug("Mount   Bromo"), "mount-bromo");
    }

    #[test]
    fn test_generate_slug_with_underscores() {
        assert_eq!(generate_slug("island_hopping"), "island-hopping");
    }

    #[test]
    fn test_generate_slug_keeps_non_ascii() {
        assert_eq!(generate_slug("Café Tour"), "café-tour");
        assert_eq!(generate_slug("京都"), "京都");
    }

    #[test]
    fn test_generate_slug_only_punctuation_is_empty() {
        assert_eq!(generate_slug("!!! ---"), "");
    }

    #[test]
    fn test_generate_slug_is_bounded() {
        let slug = generate_slug(&"a".repeat(500));
        assert_eq!(slug.chars().count(), MAX_SLUG_LENGTH);
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(with_suffix("bali", 1), "bali");
        assert_eq!(with_suffix("bali", 2), "bali-2");
    }

    proptest! {
        #[test]
        fn slug_has_no_edge_or_double_hyphens(name in "\\PC{0,60}") {
            let slug = generate_slug(&name);
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }

        #[test]
        fn slug_has_no_ascii_punctuation_or_uppercase(name in "[ -~]{0,60}") {
            let slug = generate_slug(&name);
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }

        #[test]
        fn slug_is_idempotent(name in "\\PC{0,60}") {
            let slug = generate_slug(&name);
            prop_assert_eq!(generate_slug(&slug), slug.clone());
        }
    }
}
