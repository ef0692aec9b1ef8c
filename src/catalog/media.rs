use chrono::{DateTime, Utc};

/// Directory uploaded product images live under, followed by YYYY/MM/DD
const PRODUCT_IMAGE_ROOT: &str = "products/images";

/// Resolve an image reference to its stored path.
///
/// A bare file name is placed under the upload-date directory; a relative
/// path (already stored) is kept as is.
pub fn product_image_path(reference: &str, uploaded_at: DateTime<Utc>) -> Result<String, &'static str> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err("The submitted file is empty.");
    }
    if reference.starts_with('/') || reference.contains('\\') || reference.split('/').any(|seg| seg == ".." || seg.is_empty()) {
        return Err("Invalid image path.");
    }
    if reference.len() > 255 {
        return Err("Ensure this filename has at most 255 characters.");
    }
    if reference.contains('/') {
        return Ok(reference.to_string());
    }
    Ok(format!("{}/{}/{}", PRODUCT_IMAGE_ROOT, uploaded_at.format("%Y/%m/%d"), reference))
}

/// Public URL for a stored media path
pub fn media_url(prefix: &str, path: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn bare_names_go_under_upload_date() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
        assert_eq!(product_image_path("phone.png", at).unwrap(), "products/images/2024/03/07/phone.png");
    }

    #[test]
    fn stored_paths_are_kept() {
        let at = Utc::now();
        assert_eq!(
            product_image_path("products/images/2023/01/02/a.jpg", at).unwrap(),
            "products/images/2023/01/02/a.jpg"
        );
    }

    #[test]
    fn rejects_traversal() {
        let at = Utc::now();
        assert!(product_image_path("../etc/passwd", at).is_err());
        assert!(product_image_path("/abs.png", at).is_err());
        assert!(product_image_path("  ", at).is_err());
    }

    #[test]
    fn builds_urls() {
        assert_eq!(media_url("/media/", "products/a.png"), "/media/products/a.png");
        assert_eq!(media_url("https://cdn.example.com/m", "x.png"), "https://cdn.example.com/m/x.png");
    }
}
