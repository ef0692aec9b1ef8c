use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterCondition, FilterData, FilterOrderInfo, SqlResult};

pub struct Filter {
    table_name: String,
    where_data: Vec<FilterCondition>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_identifier(&table_name).map_err(|_| FilterError::InvalidTableName(table_name.clone()))?;
        Ok(Self {
            table_name,
            where_data: vec![],
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if !data.where_clause.is_empty() { self.where_clause(data.where_clause)?; }
        if let Some(order) = data.order { self.order(&order)?; }
        if let Some(limit) = data.limit { self.limit(limit, data.offset)?; }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Vec<FilterCondition>) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = conditions;
        Ok(self)
    }

    pub fn order(&mut self, order_spec: &str) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if limit < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); }
        if let Some(off) = offset { if off < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); } }
        self.limit = Some(limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.where_data, 0)?;

        let query = [
            "SELECT *".to_string(),
            format!("FROM \"{}\"", self.table_name),
            if where_clause.is_empty() { String::new() } else { format!("WHERE {}", where_clause) },
            FilterOrder::generate(&self.order_data),
            self.build_limit_clause(),
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.where_data, 0)?;
        let query = if where_clause.is_empty() {
            format!("SELECT COUNT(*) as count FROM \"{}\"", self.table_name)
        } else {
            format!("SELECT COUNT(*) as count FROM \"{}\" WHERE {}", self.table_name, where_clause)
        };
        Ok(SqlResult { query, params })
    }

    /// Identifiers are interpolated into SQL, so only [A-Za-z_][A-Za-z0-9_]* is accepted
    pub fn validate_identifier(name: &str) -> Result<(), FilterError> {
        let mut chars = name.chars();
        let valid_head = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        if !valid_head || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(FilterError::InvalidColumn(format!("Invalid identifier format: {}", name)));
        }
        Ok(())
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterOp, SqlParam};

    #[test]
    fn builds_full_select() {
        let mut filter = Filter::new("products").unwrap();
        filter
            .assign(FilterData {
                where_clause: vec![FilterCondition::field("available", FilterOp::Eq, SqlParam::Bool(true))],
                order: Some("-created_at,-id".to_string()),
                limit: Some(10),
                offset: Some(20),
                ..Default::default()
            })
            .unwrap();
        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT * FROM \"products\" WHERE \"available\" = $1 ORDER BY \"created_at\" DESC, \"id\" DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(sql.params, vec![SqlParam::Bool(true)]);
    }

    #[test]
    fn count_ignores_order_and_limit() {
        let mut filter = Filter::new("categories").unwrap();
        filter.order("name").unwrap().limit(5, None).unwrap();
        assert_eq!(filter.to_count_sql().unwrap().query, "SELECT COUNT(*) as count FROM \"categories\"");
    }

    #[test]
    fn validates_table_names() {
        assert!(Filter::new("products").is_ok());
        assert!(Filter::new("_private").is_ok());
        assert!(matches!(Filter::new("1abc"), Err(FilterError::InvalidTableName(_))));
        assert!(Filter::new("drop table;").is_err());
        assert!(Filter::new("").is_err());
    }

    #[test]
    fn rejects_negative_limits() {
        let mut filter = Filter::new("products").unwrap();
        assert!(filter.limit(-1, None).is_err());
        assert!(filter.limit(1, Some(-3)).is_err());
    }
}
