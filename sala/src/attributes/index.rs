use super::table::{AttributeTable, RowMut};
use crate::error::{Result, SalaError};
use std::cmp::Ordering;
use std::ops::Range;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndexItem {
    pub key: u32,
    pub value: f64,
}

/// Index entry carrying a live handle on its row.
pub struct IndexItemMut<'a> {
    pub key: u32,
    pub value: f64,
    pub row: RowMut<'a>,
}

// NaN of either sign sorts after every other value so range lookups stay partitioned.
#[inline]
fn cmp_value(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => Ordering::Equal,
    }
}

#[inline]
fn sort_value(key: u32, column: Option<usize>, value: impl FnOnce(usize) -> f64) -> f64 {
    column.map_or(key as f64, value)
}

/// Rows ordered by `column` ascending (ties by key). `None` orders by key.
pub fn make_attribute_index(table: &AttributeTable, column: Option<usize>) -> Vec<IndexItem> {
    let mut idx: Vec<IndexItem> = table
        .rows()
        .map(|(key, row)| IndexItem { key, value: sort_value(key, column, |c| row.value(c)) })
        .collect();
    idx.sort_by(|a, b| cmp_value(a.value, b.value).then(a.key.cmp(&b.key)));
    idx
}

/// As `make_attribute_index`, but each entry can write back into its row.
pub fn make_attribute_index_mut(table: &mut AttributeTable, column: Option<usize>) -> Vec<IndexItemMut<'_>> {
    let mut idx: Vec<IndexItemMut<'_>> = table
        .rows_mut()
        .map(|(key, row)| {
            let value = sort_value(key, column, |c| row.value(c));
            IndexItemMut { key, value, row }
        })
        .collect();
    idx.sort_by(|a, b| cmp_value(a.value, b.value).then(a.key.cmp(&b.key)));
    idx
}

/// Positions in a sorted index whose values lie in `[low, high]`. NaN entries never match.
pub fn value_range(index: &[IndexItem], low: f64, high: f64) -> Range<usize> {
    let start = index.partition_point(|it| it.value < low);
    let end = index.partition_point(|it| it.value <= high);
    start..end.max(start)
}

/// What the renderer sees of a table: one display column, its paint order,
/// and normalised values.
pub struct AttributeTableView<'a> {
    table: &'a AttributeTable,
    display_column: Option<usize>,
    index: Vec<IndexItem>,
}

impl<'a> AttributeTableView<'a> {
    pub fn new(table: &'a AttributeTable) -> Self {
        AttributeTableView { table, display_column: None, index: make_attribute_index(table, None) }
    }

    pub fn set_display_column(&mut self, column: Option<usize>) -> Result<()> {
        if let Some(c) = column {
            if c >= self.table.num_columns() {
                return Err(SalaError::UnknownColumn(format!("#{}", c)));
            }
        }
        self.display_column = column;
        self.index = make_attribute_index(self.table, column);
        Ok(())
    }

    #[inline] pub fn display_column(&self) -> Option<usize> { self.display_column }
    #[inline] pub fn index(&self) -> &[IndexItem] { &self.index }

    /// Normalised display value for `key`; -1 for unknown rows or unset values.
    /// Without a display column every row shows at mid-scale.
    pub fn normalised_value(&self, key: u32) -> f64 {
        match (self.table.row(key), self.display_column) {
            (Some(row), Some(c)) => row.normalised_value(c),
            (Some(_), None) => 0.5,
            (None, _) => -1.0,
        }
    }

    /// Keys whose display value is in `[low, high]`, in paint order.
    pub fn keys_in_range(&self, low: f64, high: f64) -> impl Iterator<Item = u32> + '_ {
        self.index[value_range(&self.index, low, high)].iter().map(|it| it.key)
    }
}
