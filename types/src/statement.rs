//! Statement model consumed by load-balancing policies
//!
//! Preparation happens elsewhere; this module only carries what routing
//! needs to introspect: the target table, the declared column types of the
//! bind markers, which of them form the partition key, and the bound values.

use std::sync::Arc;

use crate::column::{ColumnType, Value};
use crate::consistency::ConsistencyLevel;

/// A bind marker of a prepared statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Server-side prepared statement metadata
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    pub query: String,
    pub keyspace: Option<String>,
    pub table: String,
    /// One entry per bind marker, in bind order
    pub columns: Vec<ColumnSpec>,
    /// Bind-marker indexes of the partition-key columns, in key order
    pub routing_indexes: Vec<usize>,
}

impl PreparedStatement {
    pub fn new(query: impl Into<String>, keyspace: Option<&str>, table: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            keyspace: keyspace.map(str::to_string),
            table: table.into(),
            columns: Vec::new(),
            routing_indexes: Vec::new(),
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(ColumnSpec::new(name, column_type));
        self
    }

    pub fn with_routing_indexes(mut self, indexes: Vec<usize>) -> Self {
        self.routing_indexes = indexes;
        self
    }

    pub fn column_types(&self) -> Vec<ColumnType> {
        self.columns.iter().map(|c| c.column_type).collect()
    }

    /// `keyspace.table`, using `fallback_keyspace` when the statement was
    /// prepared without one
    pub fn full_table_name(&self, fallback_keyspace: Option<&str>) -> Option<String> {
        let keyspace = self.keyspace.as_deref().or(fallback_keyspace)?;
        Some(format!("{}.{}", keyspace, self.table))
    }
}

/// A prepared statement with its values
#[derive(Debug, Clone)]
pub struct BoundStatement {
    pub prepared: Arc<PreparedStatement>,
    pub values: Vec<Value>,
    pub consistency: Option<ConsistencyLevel>,
}

impl BoundStatement {
    pub fn new(prepared: Arc<PreparedStatement>, values: Vec<Value>) -> Self {
        Self {
            prepared,
            values,
            consistency: None,
        }
    }

    pub fn with_consistency(mut self, consistency: ConsistencyLevel) -> Self {
        self.consistency = Some(consistency);
        self
    }
}

/// An unprepared query string; never routable
#[derive(Debug, Clone)]
pub struct SimpleStatement {
    pub query: String,
    pub keyspace: Option<String>,
    pub consistency: Option<ConsistencyLevel>,
}

impl SimpleStatement {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            keyspace: None,
            consistency: None,
        }
    }
}

/// A group of statements executed together
#[derive(Debug, Clone, Default)]
pub struct BatchStatement {
    pub statements: Vec<Statement>,
    pub consistency: Option<ConsistencyLevel>,
}

impl BatchStatement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, statement: impl Into<Statement>) -> Self {
        self.statements.push(statement.into());
        self
    }

    pub fn with_consistency(mut self, consistency: ConsistencyLevel) -> Self {
        self.consistency = Some(consistency);
        self
    }
}

/// Any statement the execution layer can send
#[derive(Debug, Clone)]
pub enum Statement {
    Bound(BoundStatement),
    Batch(BatchStatement),
    Simple(SimpleStatement),
}

impl Statement {
    /// Explicitly requested consistency, if any
    pub fn consistency(&self) -> Option<ConsistencyLevel> {
        match self {
            Statement::Bound(s) => s.consistency,
            Statement::Batch(b) => b.consistency,
            Statement::Simple(s) => s.consistency,
        }
    }
}

impl From<BoundStatement> for Statement {
    fn from(s: BoundStatement) -> Self {
        Statement::Bound(s)
    }
}

impl From<BatchStatement> for Statement {
    fn from(b: BatchStatement) -> Self {
        Statement::Batch(b)
    }
}

impl From<SimpleStatement> for Statement {
    fn from(s: SimpleStatement) -> Self {
        Statement::Simple(s)
    }
}
