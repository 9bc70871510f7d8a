//! Values parsed from the external programs' auxiliary output
//!
//! Summary quantities are single numbers. Mass-dependent distributions and
//! spectra keep their rows as the program listed them, one `Vec<f64>` per
//! line; rows need not share a length.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReportValue {
    Scalar(f64),
    Table(Vec<Vec<f64>>),
}

/// Named report values, ordered by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    values: BTreeMap<String, ReportValue>,
}

impl Report {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_scalar(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), ReportValue::Scalar(value));
    }

    pub fn insert_table(&mut self, name: impl Into<String>, rows: Vec<Vec<f64>>) {
        self.values.insert(name.into(), ReportValue::Table(rows));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ReportValue> {
        self.values.get(name)
    }

    /// The value under `name` if it is a scalar
    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<f64> {
        match self.values.get(name)? {
            ReportValue::Scalar(value) => Some(*value),
            ReportValue::Table(_) => None,
        }
    }

    /// The rows under `name` if it is a table
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&[Vec<f64>]> {
        match self.values.get(name)? {
            ReportValue::Table(rows) => Some(rows),
            ReportValue::Scalar(_) => None,
        }
    }

    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of table-valued entries
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.values
            .values()
            .filter(|v| matches!(v, ReportValue::Table(_)))
            .count()
    }
}
