//! Exact and fuzzy album keys.
//!
//! The exact key is the persisted identity of an album's play history. The
//! fuzzy key folds edition and format noise ("[Explicit]", "(Deluxe Edition)",
//! " - EP", Discogs "(2)" suffixes) so naming variants of one release collide.
//! Passes run in order and each one works on the output of the previous one.

use once_cell::sync::Lazy;
use regex::Regex;

/// Separator between the artist and album halves of a key.
pub const KEY_SEPARATOR: char = '|';

/// Edition/format tags recognised inside brackets or parentheses.
const EDITION_TAGS: &str = r"explicit|deluxe|deluxe edition|special edition|expanded|expanded edition|remastered|remaster|anniversary|anniversary edition|bonus tracks|bonus track|vinyl|lp|cd|digital|limited|limited edition|collector's edition|collectors edition|japan|japanese|uk|us|import";

/// Discogs disambiguation suffix: "Radiohead (2)".
static DISAMBIGUATION_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(\d+\)\s*$").unwrap());

/// "[Explicit]", "[Vinyl]", ...
static BRACKETED_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)\s*\[(?:{EDITION_TAGS})\]")).unwrap());

/// "(Deluxe Edition)", "(Remastered 2017)", "(25th Anniversary Edition)", ...
static PARENTHESIZED_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\s*\((?:{EDITION_TAGS}|remastered \d{{4}}|\d+th anniversary(?: edition)?)\)"
    ))
    .unwrap()
});

/// " - EP", " EP", " - Single", " Single"
static RELEASE_TYPE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:\s+-\s+|\s+)(?:ep|single)\s*$").unwrap());

/// Un-bracketed trailing edition word: "Abbey Road Remastered".
static EDITION_WORD_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s+(?:deluxe edition|special edition|expanded edition|deluxe|remastered|remaster)\s*$",
    )
    .unwrap()
});

/// Build the exact key for an album: `lower(trim(artist)) | lower(trim(album))`.
///
/// # Examples
///
/// ```rust
/// use scrobble_index::normalize::normalize_key;
///
/// assert_eq!(normalize_key("  Radiohead ", " Kid A "), "radiohead|kid a");
/// ```
pub fn normalize_key(artist: &str, album: &str) -> String {
    format!(
        "{}{KEY_SEPARATOR}{}",
        artist.trim().to_lowercase(),
        album.trim().to_lowercase()
    )
}

/// Build the fuzzy key for an album.
///
/// Never fails: a pass that does not match leaves its input unchanged.
///
/// # Examples
///
/// ```rust
/// use scrobble_index::normalize::fuzzy_normalize_key;
///
/// assert_eq!(fuzzy_normalize_key("Radiohead (2)", "Kid A [Explicit]"), "radiohead|kida");
/// assert_eq!(
///     fuzzy_normalize_key("Radiohead", "OK Computer (Remastered 2017)"),
///     "radiohead|okcomputer"
/// );
/// ```
pub fn fuzzy_normalize_key(artist: &str, album: &str) -> String {
    format!(
        "{}{KEY_SEPARATOR}{}",
        fuzzy_component(artist),
        fuzzy_component(album)
    )
}

/// Split a key on its first separator.
///
/// Keys without a separator yield an empty album half instead of failing.
pub fn split_key(key: &str) -> (&str, &str) {
    key.split_once(KEY_SEPARATOR).unwrap_or((key, ""))
}

fn fuzzy_component(value: &str) -> String {
    let reduced = DISAMBIGUATION_SUFFIX.replace(value, "");
    let reduced = BRACKETED_TAG.replace_all(&reduced, "");
    let reduced = PARENTHESIZED_TAG.replace_all(&reduced, "");
    let reduced = RELEASE_TYPE_SUFFIX.replace(&reduced, "");
    let reduced = EDITION_WORD_SUFFIX.replace(&reduced, "");

    reduced
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}
