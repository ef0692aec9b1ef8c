use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
    ILike,
}

impl FilterOp {
    pub fn to_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gte => ">=",
            FilterOp::Lte => "<=",
            FilterOp::ILike => "ILIKE",
        }
    }
}

/// A bind parameter with the SQL type it must be sent as
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub column: String,
    pub operator: FilterOp,
    pub data: SqlParam,
}

#[derive(Debug, Clone)]
pub enum FilterCondition {
    Field(FilterWhereInfo),
    /// Parenthesised group joined with OR
    Or(Vec<FilterCondition>),
}

impl FilterCondition {
    pub fn field(column: impl Into<String>, operator: FilterOp, data: SqlParam) -> Self {
        FilterCondition::Field(FilterWhereInfo { column: column.into(), operator, data })
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterData {
    /// Conditions joined with AND
    pub where_clause: Vec<FilterCondition>,
    /// Order spec such as "-created_at,-id" or "name asc"
    pub order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

/// Escape LIKE wildcards so user text matches literally
pub fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
