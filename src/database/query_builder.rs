use sqlx::{self, postgres::PgArguments, FromRow, PgPool, Row};

use crate::database::store::StoreError;
use crate::filter::types::SqlResult;
use crate::filter::{Filter, FilterData, SqlParam};

/// Typed SELECT/COUNT runner over a `Filter`
pub struct QueryBuilder<T> {
    table_name: String,
    filter: Option<Filter>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    pub fn new(table_name: impl Into<String>) -> Result<Self, StoreError> {
        let name = table_name.into();
        // Reuse Filter table name validation
        Filter::new(&name)?;
        Ok(Self {
            table_name: name,
            filter: None,
            _phantom: std::marker::PhantomData,
        })
    }

    pub fn filter(mut self, filter_data: FilterData) -> Result<Self, StoreError> {
        let mut filter = Filter::new(&self.table_name)?;
        filter.assign(filter_data)?;
        self.filter = Some(filter);
        Ok(self)
    }

    pub async fn select_all(self, pool: &PgPool) -> Result<Vec<T>, StoreError> {
        let sql_result = self.sql_result()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_all(pool).await?)
    }

    pub async fn select_optional(self, pool: &PgPool) -> Result<Option<T>, StoreError> {
        let sql_result = self.sql_result()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_optional(pool).await?)
    }

    pub async fn count(self, pool: &PgPool) -> Result<i64, StoreError> {
        let sql_result = match &self.filter {
            Some(filter) => filter.to_count_sql()?,
            None => SqlResult {
                query: format!("SELECT COUNT(*) as count FROM \"{}\"", self.table_name),
                params: vec![],
            },
        };

        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(pool).await?;
        Ok(row.try_get("count")?)
    }

    fn sql_result(&self) -> Result<SqlResult, StoreError> {
        match &self.filter {
            Some(filter) => Ok(filter.to_sql()?),
            None => Ok(SqlResult {
                query: format!("SELECT * FROM \"{}\"", self.table_name),
                params: vec![],
            }),
        }
    }
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &SqlParam,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        SqlParam::Bool(b) => q.bind(*b),
        SqlParam::Int(i) => q.bind(*i),
        SqlParam::Decimal(d) => q.bind(*d),
        SqlParam::Text(s) => q.bind(s.clone()),
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &SqlParam,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        SqlParam::Bool(b) => q.bind(*b),
        SqlParam::Int(i) => q.bind(*i),
        SqlParam::Decimal(d) => q.bind(*d),
        SqlParam::Text(s) => q.bind(s.clone()),
    }
}
