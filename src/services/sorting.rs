use std::cmp::Ordering;

use thiserror::Error;
use tracing::debug;

use crate::models::{
    dashboard::Dashboard,
    table::{COLUMNS, Cell, ProjectTable, VoteRow},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Error, PartialEq)]
pub enum SortError {
    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column {0} has no sort control")]
    NotSortable(usize),
}

fn as_number(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Numeric when both sides are numbers, otherwise a locale-style string
/// comparison (case-insensitive, lowercase first on ties).
pub fn compare_values(a: &str, b: &str) -> Ordering {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a
            .to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| b.cmp(a)),
    }
}

fn cell_value(row: &VoteRow, column_index: usize) -> &str {
    row.cells.get(column_index).map(Cell::sort_value).unwrap_or("")
}

/// Stable merge sort of positions. Only a strictly smaller right-hand item
/// overtakes the left one, so an inconsistent comparator (mixed numeric and
/// text cells have no total order) still yields a permutation.
fn merge_sort<F>(order: &[usize], compare: &F) -> Vec<usize>
where
    F: Fn(usize, usize) -> Ordering,
{
    if order.len() <= 1 {
        return order.to_vec();
    }

    let (left, right) = order.split_at(order.len() / 2);
    let left = merge_sort(left, compare);
    let right = merge_sort(right, compare);

    let mut merged = Vec::with_capacity(order.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if compare(right[j], left[i]) == Ordering::Less {
            merged.push(right[j]);
            j += 1;
        } else {
            merged.push(left[i]);
            i += 1;
        }
    }
    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);
    merged
}

/// Stable sort of the rows by one column
pub fn sort_rows(rows: &mut Vec<VoteRow>, column_index: usize, descending: bool) {
    let keys: Vec<String> = rows
        .iter()
        .map(|row| cell_value(row, column_index).to_string())
        .collect();
    let positions: Vec<usize> = (0..rows.len()).collect();

    let order = merge_sort(&positions, &|a, b| {
        let (first, second) = if descending { (b, a) } else { (a, b) };
        compare_values(&keys[first], &keys[second])
    });

    let mut slots: Vec<Option<VoteRow>> = rows.drain(..).map(Some).collect();
    rows.extend(order.into_iter().filter_map(|i| slots[i].take()));
}

/// A click on a column header: flip that column's direction and reorder
/// the rows. Other columns keep the direction they remember.
pub fn click_header(
    table: &mut ProjectTable,
    column_index: usize,
) -> Result<SortDirection, SortError> {
    let descending = table
        .get_sort_button_mut(column_index)
        .ok_or(SortError::NotSortable(column_index))?
        .press();

    sort_rows(&mut table.rows, column_index, descending);
    table.last_sort = Some((column_index, descending));

    debug!(table = %table.id, column = COLUMNS[column_index], descending, "table sorted");

    Ok(if descending {
        SortDirection::Descending
    } else {
        SortDirection::Ascending
    })
}

pub fn click_table_header(
    dashboard: &mut Dashboard,
    table_id: &str,
    column_index: usize,
) -> Result<SortDirection, SortError> {
    let table = dashboard
        .get_table_mut(table_id)
        .ok_or_else(|| SortError::TableNotFound(table_id.to_string()))?;
    click_header(table, column_index)
}

/// Column index of a header, by name ("votes") or 1-based position ("2")
pub fn column_index(name: &str) -> Option<usize> {
    let name = name.trim().to_lowercase();

    if let Ok(position) = name.parse::<usize>() {
        return (1..=COLUMNS.len()).contains(&position).then(|| position - 1);
    }

    COLUMNS.iter().position(|column| {
        let column = column.to_lowercase();
        !column.is_empty() && (column == name || column.split(' ').any(|word| word == name))
    })
}
