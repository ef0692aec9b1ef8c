use super::error::FilterError;
use super::filter::Filter;
use super::types::{FilterCondition, FilterOp, FilterWhereInfo, SqlParam};

pub struct FilterWhere {
    param_values: Vec<SqlParam>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Render AND-joined conditions. Returns an empty string when there are none.
    pub fn generate(conditions: &[FilterCondition], starting_param_index: usize) -> Result<(String, Vec<SqlParam>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        let mut parts = Vec::with_capacity(conditions.len());
        for condition in conditions {
            parts.push(filter_where.build_condition(condition)?);
        }
        Ok((parts.join(" AND "), filter_where.param_values))
    }

    pub fn validate(conditions: &[FilterCondition]) -> Result<(), FilterError> {
        for condition in conditions {
            match condition {
                FilterCondition::Field(info) => Filter::validate_identifier(&info.column)?,
                FilterCondition::Or(inner) => {
                    if inner.is_empty() {
                        return Err(FilterError::InvalidWhereClause("logical group requires at least one condition".to_string()));
                    }
                    Self::validate(inner)?;
                }
            }
        }
        Ok(())
    }

    fn build_condition(&mut self, condition: &FilterCondition) -> Result<String, FilterError> {
        match condition {
            FilterCondition::Field(info) => self.build_sql_condition(info),
            FilterCondition::Or(inner) => self.build_group(inner, " OR "),
        }
    }

    fn build_group(&mut self, inner: &[FilterCondition], joiner: &str) -> Result<String, FilterError> {
        let mut parts = Vec::with_capacity(inner.len());
        for condition in inner {
            parts.push(self.build_condition(condition)?);
        }
        Ok(format!("({})", parts.join(joiner)))
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let quoted_column = format!("\"{}\"", condition.column);
        match (&condition.operator, &condition.data) {
            (FilterOp::ILike, data) if !matches!(data, SqlParam::Text(_)) => Err(
                FilterError::InvalidWhereClause(format!("{} requires a text pattern", condition.operator.to_sql())),
            ),
            (op, data) => {
                let placeholder = self.param(data.clone());
                Ok(format!("{} {} {}", quoted_column, op.to_sql(), placeholder))
            }
        }
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}
