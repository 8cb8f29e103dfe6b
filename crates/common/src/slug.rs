// Filename slug generation for the canonical `{date}-{slug}` rename.
//
// Slugs: lowercase, diacritics stripped, ASCII alphanumerics joined by
// single hyphens. Fallback: `untitled` when nothing alphanumeric survives.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Slug returned when the input has no alphanumeric content.
pub const FALLBACK_SLUG: &str = "untitled";

/// Convert arbitrary text into a filename-safe slug.
///
/// - Lowercases all characters
/// - Decomposes (NFKD) and drops combining marks, so `é` becomes `e`
/// - Transliterates a few letters that have no decomposition (`ß`, `æ`, `ø`, ...)
/// - Replaces every other non-ASCII-alphanumeric run with a single hyphen
/// - Strips leading and trailing hyphens
///
/// Total and idempotent: the output only contains `[a-z0-9-]` with no
/// leading, trailing or doubled hyphens, which maps to itself. Input with
/// no alphanumeric characters yields [`FALLBACK_SLUG`].
pub fn slugify(text: &str) -> String {
    let mut raw = String::with_capacity(text.len());
    for ch in text.to_lowercase().nfkd().filter(|ch| !is_combining_mark(*ch)) {
        if ch.is_ascii_alphanumeric() {
            // Compatibility forms like `ℌ` decompose to uppercase ASCII.
            raw.push(ch.to_ascii_lowercase());
        } else if let Some(replacement) = transliterate(ch) {
            raw.push_str(replacement);
        } else {
            raw.push('-');
        }
    }

    let slug = raw.split('-').filter(|part| !part.is_empty()).collect::<Vec<_>>().join("-");
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

fn transliterate(ch: char) -> Option<&'static str> {
    let replacement = match ch {
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        'ø' => "o",
        'đ' | 'ð' => "d",
        'ł' => "l",
        'þ' => "th",
        'ı' => "i",
        'ħ' => "h",
        _ => return None,
    };
    Some(replacement)
}
