use super::error::FilterError;
use super::filter::Filter;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Parse "-created_at,-id" or "name asc, id" into order infos
    pub fn validate_and_parse(order: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in order.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            let Some(token) = it.next() else { continue };
            let (column, mut sort) = match token.strip_prefix('-') {
                Some(col) => (col, SortDirection::Desc),
                None => (token, SortDirection::Asc),
            };
            if let Some(dir) = it.next() {
                sort = if dir.eq_ignore_ascii_case("desc") { SortDirection::Desc } else { SortDirection::Asc };
            }
            Filter::validate_identifier(column)?;
            out.push(FilterOrderInfo { column: column.to_string(), sort });
        }
        Ok(out)
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dash_prefix_and_keywords() {
        let infos = FilterOrder::validate_and_parse("-created_at, name asc,id DESC").unwrap();
        assert_eq!(infos.len(), 3);
        assert_eq!(infos[0].sort, SortDirection::Desc);
        assert_eq!(infos[1].sort, SortDirection::Asc);
        assert_eq!(infos[2].sort, SortDirection::Desc);
        assert_eq!(
            FilterOrder::generate(&infos),
            "ORDER BY \"created_at\" DESC, \"name\" ASC, \"id\" DESC"
        );
    }

    #[test]
    fn rejects_injection_in_order() {
        assert!(FilterOrder::validate_and_parse("name; DROP TABLE products").is_err());
    }
}
