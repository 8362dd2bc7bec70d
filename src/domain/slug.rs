//! Utilities for generating deterministic, URL-safe slugs.
//!
//! [`slugify`] is pure and idempotent and never returns an empty string.
//! [`DerivedSlug`] tracks whether a draft's slug still follows its title, and
//! [`ensure_unique_slug`] lets callers reject duplicates against an already
//! loaded collection before the content API sees them.

use thiserror::Error;

/// Token used when the input has no representable characters.
pub const FALLBACK_SLUG: &str = "untitled-project";

/// Fallback used by blog drafts.
pub const FALLBACK_POST_SLUG: &str = "untitled-post";

/// Raised when a slug is already taken by another loaded entity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("slug `{slug}` is already used; use a different title or slug")]
pub struct SlugConflict {
    pub slug: String,
}

/// Derive a slug from human-readable text, falling back to [`FALLBACK_SLUG`].
pub fn slugify(input: &str) -> String {
    slugify_with_fallback(input, FALLBACK_SLUG)
}

/// Derive a slug, returning `fallback` when nothing representable remains.
///
/// `fallback` must itself be a valid slug so the result stays idempotent.
pub fn slugify_with_fallback(input: &str, fallback: &str) -> String {
    debug_assert!(is_canonical(fallback), "fallback slug must be canonical");

    let lowered = input.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_separator = false;

    for ch in lowered.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch);
        } else if ch.is_whitespace() || ch == '-' {
            pending_separator = true;
        }
        // Anything else is stripped without acting as a separator.
    }

    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

fn is_canonical(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'-'))
}

/// Slug field of a draft that follows the title until edited by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedSlug {
    value: String,
    manual: bool,
    fallback: &'static str,
}

impl DerivedSlug {
    /// Empty slug that follows the title.
    pub fn following(fallback: &'static str) -> Self {
        Self {
            value: String::new(),
            manual: false,
            fallback,
        }
    }

    /// Slug of an existing entity. It is treated as manually set so that
    /// retitling a published entity does not move its URL.
    pub fn pinned(value: impl Into<String>, fallback: &'static str) -> Self {
        Self {
            value: value.into(),
            manual: true,
            fallback,
        }
    }

    pub fn title_changed(&mut self, title: &str) {
        if !self.manual {
            self.value = slugify_with_fallback(title, self.fallback);
        }
    }

    /// Record a direct edit; re-derivation stops for this draft's lifetime.
    pub fn set_manual(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.manual = true;
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Slug to submit: the current value normalised, or derived from `title`
    /// when the field was left blank.
    pub fn resolve(&self, title: &str) -> String {
        if self.value.trim().is_empty() {
            slugify_with_fallback(title, self.fallback)
        } else {
            slugify_with_fallback(&self.value, self.fallback)
        }
    }
}

/// Check `candidate` against `(id, slug)` pairs of loaded entities, ignoring
/// the entity identified by `editing`.
pub fn ensure_unique_slug<'a, I>(
    candidate: &str,
    existing: I,
    editing: Option<&str>,
) -> Result<(), SlugConflict>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let taken = existing
        .into_iter()
        .filter(|(id, _)| Some(*id) != editing)
        .any(|(_, slug)| slug == candidate);

    if taken {
        Err(SlugConflict {
            slug: candidate.to_string(),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "Hello World",
        "  Rust -- Systems   Programming  ",
        "Café & Crème",
        "!!!",
        "",
        "---",
        "already-a-slug",
        "Tabs\tand\nnewlines",
        "UPPER_case_under",
        "2024 Year-in-Review!",
        "基础教程",
    ];

    #[test]
    fn slugify_normalises_whitespace_and_hyphens() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(
            slugify("  Rust -- Systems   Programming  "),
            "rust-systems-programming"
        );
        assert_eq!(slugify("2024 Year-in-Review!"), "2024-year-in-review");
    }

    #[test]
    fn slugify_strips_symbols_without_splitting_words() {
        assert_eq!(slugify("Café & Crème"), "caf-crme");
        assert_eq!(slugify("UPPER_case_under"), "uppercaseunder");
    }

    #[test]
    fn slugify_falls_back_for_unrepresentable_input() {
        assert_eq!(slugify(""), FALLBACK_SLUG);
        assert_eq!(slugify("!!!"), FALLBACK_SLUG);
        assert_eq!(slugify("基础教程"), FALLBACK_SLUG);
        assert_eq!(
            slugify_with_fallback("???", FALLBACK_POST_SLUG),
            FALLBACK_POST_SLUG
        );
    }

    #[test]
    fn slugify_is_idempotent_and_never_empty() {
        for input in SAMPLES {
            let once = slugify(input);
            assert!(!once.is_empty(), "empty slug for {input:?}");
            assert_eq!(slugify(&once), once, "not idempotent for {input:?}");
            assert!(is_canonical(&once), "non-canonical slug {once:?}");
        }
    }

    #[test]
    fn derived_slug_follows_title_until_manual_edit() {
        let mut slug = DerivedSlug::following(FALLBACK_SLUG);
        slug.title_changed("First Title");
        assert_eq!(slug.as_str(), "first-title");
        slug.title_changed("Second Title");
        assert_eq!(slug.as_str(), "second-title");

        slug.set_manual("custom");
        slug.title_changed("Third Title");
        assert_eq!(slug.as_str(), "custom");
        assert!(slug.is_manual());
    }

    #[test]
    fn pinned_slug_ignores_title_changes() {
        let mut slug = DerivedSlug::pinned("existing-post", FALLBACK_POST_SLUG);
        slug.title_changed("Renamed");
        assert_eq!(slug.as_str(), "existing-post");
    }

    #[test]
    fn resolve_derives_from_title_when_blank() {
        let mut slug = DerivedSlug::following(FALLBACK_SLUG);
        slug.set_manual("  ");
        assert_eq!(slug.resolve("My Project"), "my-project");
        slug.set_manual("Hand Made");
        assert_eq!(slug.resolve("My Project"), "hand-made");
    }

    #[test]
    fn ensure_unique_slug_ignores_entity_being_edited() {
        let loaded = [("p1", "folio"), ("p2", "other")];
        assert!(ensure_unique_slug("folio", loaded, Some("p1")).is_ok());
        assert_eq!(
            ensure_unique_slug("folio", loaded, None),
            Err(SlugConflict {
                slug: "folio".to_string()
            })
        );
        assert!(ensure_unique_slug("fresh", loaded, None).is_ok());
    }
}
