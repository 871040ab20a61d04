use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::MySqlPool;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime<Utc>),
    Null,
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::String(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::String(v.to_string())
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        SqlValue::U64(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveTime> for SqlValue {
    fn from(v: NaiveTime) -> Self {
        SqlValue::Time(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::DateTime(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// ===============================
/// Dynamic UPDATE builder
/// ===============================
/// Column names are always `'static` literals from our own code; only values
/// are bound.
#[derive(Debug)]
pub struct SqlUpdate {
    table: &'static str,
    sets: Vec<(&'static str, SqlValue)>,
    conditions: Vec<(&'static str, SqlValue)>,
}

impl SqlUpdate {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            sets: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn set(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.sets.push((column, value.into()));
        self
    }

    /// Set `column` only when `value` is present.
    pub fn set_some<T: Into<SqlValue>>(self, column: &'static str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    pub fn where_eq(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.conditions.push((column, value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn sql(&self) -> String {
        let set_clause = self
            .sets
            .iter()
            .map(|(k, _)| format!("{} = ?", k))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("UPDATE {} SET {}", self.table, set_clause);
        if !self.conditions.is_empty() {
            let where_clause = self
                .conditions
                .iter()
                .map(|(k, _)| format!("{} = ?", k))
                .collect::<Vec<_>>()
                .join(" AND ");
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause);
        }
        sql
    }

    /// Run the update, returning the number of affected rows.
    pub async fn execute(self, pool: &MySqlPool) -> Result<u64, sqlx::Error> {
        let sql = self.sql();
        let mut query = sqlx::query(&sql);

        for (_, value) in self.sets.into_iter().chain(self.conditions) {
            query = match value {
                SqlValue::String(v) => query.bind(v),
                SqlValue::U64(v) => query.bind(v),
                SqlValue::Bool(v) => query.bind(v),
                SqlValue::Date(v) => query.bind(v),
                SqlValue::Time(v) => query.bind(v),
                SqlValue::DateTime(v) => query.bind(v),
                SqlValue::Null => query.bind(None::<String>),
            };
        }

        let result = query.execute(pool).await?;
        Ok(result.rows_affected())
    }
}
