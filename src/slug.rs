//! Post slug derivation.

/// How many successive suffixes a post write tries before giving up on a slug collision.
pub const SLUG_ATTEMPTS: u64 = 10;

/// Lower-cases `title` and collapses every run of characters outside `[a-z0-9]`
/// into a single `-`, with no leading or trailing `-`. A title with nothing
/// usable in it yields `"post"`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        slug.push_str("post");
    }
    slug
}

/// `slugify(title)` plus `-NNNN`: the low four digits of `now_millis`, advanced
/// by `attempt` so that a retry after a collision picks the next suffix.
pub fn derive_slug(title: &str, now_millis: i64, attempt: u64) -> String {
    let suffix = (now_millis.unsigned_abs() + attempt) % 10_000;
    format!("{}-{:04}", slugify(title), suffix)
}
