use axum::http::{HeaderMap, Uri};
use serde::Serialize;
use std::collections::HashMap;
use url::Url;

use crate::config::ApiConfig;
use crate::database::store::PageWindow;
use crate::error::ApiError;

/// Page-number pagination request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// `page` must be a positive integer. `page_size` falls back to the
    /// default when unusable and is clamped to the configured maximum.
    pub fn from_params(params: &HashMap<String, String>, config: &ApiConfig) -> Result<Self, ApiError> {
        let page = match params.get("page").map(|p| p.trim()) {
            None | Some("") => 1,
            Some("last") => u32::MAX,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(invalid_page)?,
        };

        let page_size = params
            .get("page_size")
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|s| *s > 0)
            .map(|s| s.min(config.max_page_size))
            .unwrap_or(config.default_page_size);

        Ok(Self { page, page_size })
    }

    /// Resolve against the total row count; the first page always exists
    pub fn resolve(self, count: i64) -> Result<Self, ApiError> {
        let pages = Self::page_count(count, self.page_size);
        if self.page == u32::MAX {
            return Ok(Self { page: pages, ..self });
        }
        if self.page > pages {
            return Err(invalid_page());
        }
        Ok(self)
    }

    pub fn window(&self) -> PageWindow {
        PageWindow {
            limit: i64::from(self.page_size),
            offset: i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size),
        }
    }

    fn page_count(count: i64, page_size: u32) -> u32 {
        let size = i64::from(page_size.max(1));
        let pages = (count.max(0) + size - 1) / size;
        u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
    }
}

fn invalid_page() -> ApiError {
    ApiError::not_found("Invalid page.")
}

/// Paginated list body
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T: Serialize> Page<T> {
    pub fn new(request: PageRequest, count: i64, results: Vec<T>, base: Option<&Url>) -> Self {
        let pages = PageRequest::page_count(count, request.page_size);
        let next = (request.page < pages).then(|| base.map(|u| page_link(u, request.page + 1))).flatten();
        let previous = (request.page > 1).then(|| base.map(|u| page_link(u, request.page - 1))).flatten();
        Self { count, next, previous, results }
    }
}

/// Absolute URL of the current request, used to build page links
pub fn request_url(headers: &HeaderMap, uri: &Uri) -> Option<Url> {
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .filter(|p| *p == "https")
        .unwrap_or("http");
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    Url::parse(&format!("{}://{}{}", scheme, host, path_and_query)).ok()
}

/// Same URL with `page` replaced; page 1 drops the parameter
fn page_link(base: &Url, page: u32) -> String {
    let retained: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(k, _)| k != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = base.clone();
    url.set_query(None);
    if !retained.is_empty() || page > 1 {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in &retained {
            pairs.append_pair(k, v);
        }
        if page > 1 {
            pairs.append_pair("page", &page.to_string());
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_to_first_page_of_ten() {
        let config = AppConfig::development().api;
        let request = PageRequest::from_params(&params(&[]), &config).unwrap();
        assert_eq!(request, PageRequest { page: 1, page_size: 10 });
        assert_eq!(request.window(), PageWindow { limit: 10, offset: 0 });
    }

    #[test]
    fn page_size_is_clamped_to_max() {
        let config = AppConfig::development().api;
        let request = PageRequest::from_params(&params(&[("page_size", "100000")]), &config).unwrap();
        assert_eq!(request.page_size, config.max_page_size);

        let request = PageRequest::from_params(&params(&[("page_size", "zero")]), &config).unwrap();
        assert_eq!(request.page_size, config.default_page_size);
    }

    #[test]
    fn invalid_or_out_of_range_pages_are_not_found() {
        let config = AppConfig::development().api;
        assert!(PageRequest::from_params(&params(&[("page", "0")]), &config).is_err());
        assert!(PageRequest::from_params(&params(&[("page", "abc")]), &config).is_err());

        let request = PageRequest::from_params(&params(&[("page", "3")]), &config).unwrap();
        assert!(request.resolve(20).is_err());
        assert!(request.resolve(21).is_ok());
        // an empty first page is still a page
        assert!(PageRequest { page: 1, page_size: 10 }.resolve(0).is_ok());
    }

    #[test]
    fn last_resolves_to_final_page() {
        let config = AppConfig::development().api;
        let request = PageRequest::from_params(&params(&[("page", "last")]), &config).unwrap();
        assert_eq!(request.resolve(25).unwrap().page, 3);
    }

    #[test]
    fn links_keep_filters_and_swap_page() {
        let base = Url::parse("http://shop.test/api/v1/products/?search=phone&page=2").unwrap();
        let page = Page::new(PageRequest { page: 2, page_size: 10 }, 35, Vec::<u8>::new(), Some(&base));
        assert_eq!(page.next.as_deref(), Some("http://shop.test/api/v1/products/?search=phone&page=3"));
        assert_eq!(page.previous.as_deref(), Some("http://shop.test/api/v1/products/?search=phone"));
    }
}
