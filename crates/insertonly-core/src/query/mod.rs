//! Immutable query specifications and their compilation to SQL.
//!
//! Statements are described as plain values and turned into SQL text plus
//! positional parameters by [`compile_select`] and [`compile_insert`]. Nothing
//! here touches a connection.

mod compile;

pub use compile::{compile_insert, compile_select, quote_ident};

use serde_json::Value;

use crate::types::Record;

/// Compiled SQL with `?` placeholders and their values in textual order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL text.
    pub sql: String,
    /// Positional parameters.
    pub params: Vec<Value>,
    /// Positions in `params` that target binary columns. Arrays of byte
    /// values at these positions are bound as blobs.
    pub binary_params: Vec<usize>,
}

/// A possibly alias-qualified column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Table alias or name.
    pub qualifier: Option<String>,
    /// Column name.
    pub name: String,
}

impl ColumnRef {
    /// Unqualified column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }

    /// Column qualified with a table alias.
    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }
}

/// One projected expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Plain column. Qualified columns are re-aliased to their bare name.
    Column(ColumnRef),
    /// `MAX(column)`.
    Max(ColumnRef),
}

/// Table a query reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Table name.
    pub table: String,
    /// Optional alias.
    pub alias: Option<String>,
}

impl Source {
    /// Unaliased table.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: None,
        }
    }

    /// Aliased table.
    pub fn aliased(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: Some(alias.into()),
        }
    }
}

/// WHERE clause condition. All predicates of a query are AND-ed.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column = ?`, or `column IS NULL` for a null value.
    Eq(ColumnRef, Value),
    /// `column IN (?, ...)`.
    In(ColumnRef, Vec<Value>),
    /// `column IN (SELECT ...)`.
    InSubquery(ColumnRef, Box<SelectSpec>),
    /// `COALESCE(column, 0) = 0`: false, zero or null.
    IsFalse(ColumnRef),
}

/// Inner join on column equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Joined table.
    pub source: Source,
    /// `left = right` pairs, AND-ed.
    pub on: Vec<(ColumnRef, ColumnRef)>,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// SELECT statement description.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectSpec {
    pub source: Source,
    pub projection: Vec<Projection>,
    pub joins: Vec<Join>,
    pub predicates: Vec<Predicate>,
    pub group_by: Vec<ColumnRef>,
    pub order_by: Vec<(ColumnRef, Order)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectSpec {
    /// Start a query over `source` with an empty projection.
    pub fn from(source: Source) -> Self {
        Self {
            source,
            projection: Vec::new(),
            joins: Vec::new(),
            predicates: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Project these columns, qualified with `qualifier` when given.
    pub fn columns<I, S>(mut self, qualifier: Option<&str>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection.extend(names.into_iter().map(|name| {
            Projection::Column(ColumnRef {
                qualifier: qualifier.map(str::to_string),
                name: name.into(),
            })
        }));
        self
    }

    /// Add a projected expression.
    pub fn project(mut self, projection: Projection) -> Self {
        self.projection.push(projection);
        self
    }

    /// Add an inner join.
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Add a predicate.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Add an equality predicate per entry of `record`.
    pub fn filter_eq(mut self, qualifier: Option<&str>, record: &Record) -> Self {
        for (column, value) in record {
            self.predicates.push(Predicate::Eq(
                ColumnRef {
                    qualifier: qualifier.map(str::to_string),
                    name: column.clone(),
                },
                value.clone(),
            ));
        }
        self
    }

    /// Add a grouping column.
    pub fn group_by(mut self, column: ColumnRef) -> Self {
        self.group_by.push(column);
        self
    }

    /// Add a sort key.
    pub fn order_by(mut self, column: ColumnRef, order: Order) -> Self {
        self.order_by.push((column, order));
        self
    }

    /// Limit the number of rows.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip rows.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// INSERT of one row.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertSpec {
    pub table: String,
    pub values: Record,
    pub binary_columns: Vec<String>,
}

impl InsertSpec {
    /// Describe an insert of `values` into `table`.
    pub fn new(table: impl Into<String>, values: Record) -> Self {
        Self {
            table: table.into(),
            values,
            binary_columns: Vec::new(),
        }
    }

    /// Columns whose values are byte strings.
    pub fn binary_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.binary_columns.extend(columns.into_iter().map(Into::into));
        self
    }
}
