use deunicode::deunicode;

/// Derive a URL-safe slug from a display name.
///
/// The name is transliterated to ASCII first ("Café" becomes "Cafe"). ASCII
/// letters and digits are kept (lowercased), every run of other characters
/// becomes a single `-`, and separators are trimmed from both ends.
pub fn slugify(name: &str) -> String {
    let ascii = deunicode(name);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_separator = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}
