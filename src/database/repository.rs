use sqlx::{self, postgres::PgRow, FromRow, PgPool};

use crate::database::query_builder::QueryBuilder;
use crate::database::store::StoreError;
use crate::filter::{FilterCondition, FilterData, FilterOp, SqlParam};

/// Read access to one table through `FilterData`
pub struct Repository<T> {
    table_name: &'static str,
    pool: PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Repository<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(table_name: &'static str, pool: PgPool) -> Self {
        Self {
            table_name,
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn select_any(&self, filter_data: FilterData) -> Result<Vec<T>, StoreError> {
        QueryBuilder::<T>::new(self.table_name)?
            .filter(filter_data)?
            .select_all(&self.pool)
            .await
    }

    pub async fn select_id(&self, id: i64) -> Result<Option<T>, StoreError> {
        QueryBuilder::<T>::new(self.table_name)?
            .filter(FilterData {
                where_clause: vec![FilterCondition::field("id", FilterOp::Eq, SqlParam::Int(id))],
                ..Default::default()
            })?
            .select_optional(&self.pool)
            .await
    }

    pub async fn count(&self, filter_data: FilterData) -> Result<i64, StoreError> {
        QueryBuilder::<T>::new(self.table_name)?
            .filter(filter_data)?
            .count(&self.pool)
            .await
    }
}
