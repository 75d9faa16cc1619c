//! Result table to chart series reduction.
//!
//! A best-effort visualization aid, not an aggregation contract. Rules, in
//! order:
//!
//! 1. No rows: empty series.
//! 2. A numeric column exists: the first one supplies values. If a text-like
//!    column also exists, the first one supplies labels and values are summed
//!    per label in first-seen order. Otherwise each row is its own point,
//!    labelled by its index.
//! 3. No numeric column: the first column is counted per distinct value,
//!    most frequent first, ties in first-seen order.
//!
//! Only the first numeric column is ever charted; further numeric columns are
//! ignored, which can mislead on wide results.

use crate::types::{AskError, ChartSeries, Result, ResultTable, ScalarValue};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    /// At least one value, and every non-null value is a number
    Numeric,
    /// Holds at least one non-numeric value
    Label,
    /// Only nulls
    Empty,
}

fn classify<'a>(values: impl Iterator<Item = &'a ScalarValue>) -> ColumnKind {
    let mut kind = ColumnKind::Empty;
    for value in values.filter(|v| !v.is_null()) {
        if !value.is_numeric() {
            return ColumnKind::Label;
        }
        kind = ColumnKind::Numeric;
    }
    kind
}

/// Reduce a result table to chart labels and values.
///
/// # Errors
///
/// Returns `AskError::ReductionError` if the table has rows but no columns
pub fn reduce(table: &ResultTable) -> Result<ChartSeries> {
    if table.is_empty() {
        return Ok(ChartSeries::empty());
    }
    if table.columns().is_empty() {
        return Err(AskError::ReductionError(format!(
            "result has {} rows but no columns",
            table.row_count()
        )));
    }

    let kinds: Vec<ColumnKind> = (0..table.columns().len())
        .map(|i| classify(table.column_values(i)))
        .collect();

    let value_column = kinds.iter().position(|k| *k == ColumnKind::Numeric);
    let label_column = kinds.iter().position(|k| *k == ColumnKind::Label);

    Ok(match (value_column, label_column) {
        (Some(value), Some(label)) => sum_by_label(table, label, value),
        (Some(value), None) => per_row(table, value),
        (None, _) => count_values(table, 0),
    })
}

fn sum_by_label(table: &ResultTable, label: usize, value: usize) -> ChartSeries {
    let mut order: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in table.rows() {
        let key = row[label].to_string();
        let amount = row[value].as_f64().unwrap_or(0.0);
        match index.get(&key) {
            Some(&i) => order[i].1 += amount,
            None => {
                index.insert(key.clone(), order.len());
                order.push((key, amount));
            }
        }
    }

    order.into_iter().collect()
}

fn per_row(table: &ResultTable, value: usize) -> ChartSeries {
    table
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| (i.to_string(), row[value].as_f64().unwrap_or(0.0)))
        .collect()
}

fn count_values(table: &ResultTable, column: usize) -> ChartSeries {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for value in table.column_values(column) {
        let key = value.to_string();
        match index.get(&key) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().map(|(label, n)| (label, n as f64)).collect()
}
