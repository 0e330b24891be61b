use crate::error::{Result, SalaError};
use crate::layers::{LayerKey, LayerManager};
use crate::persist::{read_bool, read_string, write_bool, write_string};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};

/// Value of a cell that has never been written.
pub const UNSET: f64 = -1.0;

/// Normalisation bounds handed to the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayParams {
    pub low: f64,
    pub high: f64,
}

impl Default for DisplayParams {
    fn default() -> Self { DisplayParams { low: 0.0, high: 1.0 } }
}

/// Running min/max/total, -1 until the first write.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ColumnStats {
    pub min: f64,
    pub max: f64,
    pub total: f64,
}

impl Default for ColumnStats {
    fn default() -> Self { ColumnStats { min: -1.0, max: -1.0, total: -1.0 } }
}

#[derive(Clone, Debug)]
pub struct AttributeColumn {
    name: String,
    locked: bool,
    hidden: bool,
    display: DisplayParams,
    // updated through shared row handles
    stats: Cell<ColumnStats>,
}

impl AttributeColumn {
    fn new(name: &str) -> Self {
        AttributeColumn {
            name: name.to_string(),
            locked: false,
            hidden: false,
            display: DisplayParams::default(),
            stats: Cell::new(ColumnStats::default()),
        }
    }

    #[inline] pub fn name(&self) -> &str { &self.name }
    #[inline] pub fn is_locked(&self) -> bool { self.locked }
    #[inline] pub fn is_hidden(&self) -> bool { self.hidden }
    #[inline] pub fn display_params(&self) -> DisplayParams { self.display }
    #[inline] pub fn stats(&self) -> ColumnStats { self.stats.get() }

    fn update_stats(&self, val: f64, old: f64) {
        if val.is_nan() {
            return;
        }
        let mut s = self.stats.get();
        if s.total < 0.0 {
            s.total = val;
        } else {
            s.total += val - old;
        }
        if val > s.max {
            s.max = val;
        }
        if s.min < 0.0 || val < s.min {
            s.min = val;
        }
        self.stats.set(s);
    }

    fn normalise(&self, v: f64) -> f64 {
        let s = self.stats.get();
        if s.max == s.min {
            0.5
        } else if v < 0.0 {
            -1.0
        } else {
            (v - s.min) / (s.max - s.min)
        }
    }
}

#[derive(Clone, Debug)]
pub struct AttributeRow {
    values: Vec<f64>,
    selected: bool,
    layer_key: LayerKey,
}

impl AttributeRow {
    fn new(num_columns: usize) -> Self {
        AttributeRow { values: vec![UNSET; num_columns], selected: false, layer_key: 1 }
    }
}

/// Read-only handle on one row.
#[derive(Clone, Copy)]
pub struct RowRef<'a> {
    row: &'a AttributeRow,
    columns: &'a [AttributeColumn],
}

impl<'a> RowRef<'a> {
    /// Panics if `col` is out of range.
    #[inline] pub fn value(&self, col: usize) -> f64 { self.row.values[col] }
    pub fn normalised_value(&self, col: usize) -> f64 { self.columns[col].normalise(self.row.values[col]) }
    #[inline] pub fn is_selected(&self) -> bool { self.row.selected }
    #[inline] pub fn layer_key(&self) -> LayerKey { self.row.layer_key }
}

/// Mutable handle on one row. Writes keep the column stats current.
pub struct RowMut<'a> {
    row: &'a mut AttributeRow,
    columns: &'a [AttributeColumn],
    mapping: &'a HashMap<String, usize>,
}

impl<'a> RowMut<'a> {
    /// Panics if `col` is out of range.
    #[inline] pub fn value(&self, col: usize) -> f64 { self.row.values[col] }
    pub fn normalised_value(&self, col: usize) -> f64 { self.columns[col].normalise(self.row.values[col]) }

    pub fn set_value(&mut self, col: usize, value: f64) -> &mut Self {
        let old = std::mem::replace(&mut self.row.values[col], value);
        self.columns[col].update_stats(value, old.max(0.0));
        self
    }

    pub fn set_value_by_name(&mut self, name: &str, value: f64) -> Result<&mut Self> {
        let col = *self.mapping.get(name).ok_or_else(|| SalaError::UnknownColumn(name.to_string()))?;
        Ok(self.set_value(col, value))
    }

    /// Adds to the current value, treating an unset cell as zero.
    pub fn incr_value(&mut self, col: usize, by: f64) -> &mut Self {
        let v = self.row.values[col];
        self.set_value(col, if v < 0.0 { by } else { v + by })
    }

    #[inline] pub fn is_selected(&self) -> bool { self.row.selected }
    pub fn set_selected(&mut self, selected: bool) -> &mut Self {
        self.row.selected = selected;
        self
    }

    #[inline] pub fn layer_key(&self) -> LayerKey { self.row.layer_key }
    pub fn add_layer_key(&mut self, key: LayerKey) -> &mut Self {
        self.row.layer_key |= key;
        self
    }
    pub fn remove_layer_key(&mut self, key: LayerKey) -> &mut Self {
        // everything layer cannot be left
        self.row.layer_key = (self.row.layer_key & !key) | 1;
        self
    }
}

/// Columnar per-node results keyed by node key.
#[derive(Clone, Debug, Default)]
pub struct AttributeTable {
    columns: Vec<AttributeColumn>,
    mapping: HashMap<String, usize>,
    rows: BTreeMap<u32, AttributeRow>,
}

impl AttributeTable {
    pub fn new() -> Self { Self::default() }

    #[inline] pub fn num_columns(&self) -> usize { self.columns.len() }
    #[inline] pub fn num_rows(&self) -> usize { self.rows.len() }
    #[inline] pub fn columns(&self) -> &[AttributeColumn] { &self.columns }
    pub fn column(&self, col: usize) -> Option<&AttributeColumn> { self.columns.get(col) }
    pub fn column_index(&self, name: &str) -> Option<usize> { self.mapping.get(name).copied() }

    fn add_column(&mut self, name: &str) -> usize {
        let idx = self.columns.len();
        self.columns.push(AttributeColumn::new(name));
        self.mapping.insert(name.to_string(), idx);
        for row in self.rows.values_mut() {
            row.values.push(UNSET);
        }
        idx
    }

    fn reset_column(&mut self, col: usize) {
        self.columns[col].stats.set(ColumnStats::default());
        for row in self.rows.values_mut() {
            row.values[col] = UNSET;
        }
    }

    /// Creates the column or clears an existing one. Locked columns are refused.
    pub fn insert_or_reset_column(&mut self, name: &str) -> Result<usize> {
        match self.column_index(name) {
            None => Ok(self.add_column(name)),
            Some(i) if self.columns[i].locked => Err(SalaError::LockedColumn(name.to_string())),
            Some(i) => {
                self.reset_column(i);
                Ok(i)
            }
        }
    }

    /// System variant: clears even a locked column, and leaves it locked.
    pub fn insert_or_reset_locked_column(&mut self, name: &str) -> usize {
        let i = match self.column_index(name) {
            None => self.add_column(name),
            Some(i) => {
                self.reset_column(i);
                i
            }
        };
        self.columns[i].locked = true;
        i
    }

    pub fn get_or_insert_column(&mut self, name: &str) -> usize {
        match self.column_index(name) {
            Some(i) => i,
            None => self.add_column(name),
        }
    }

    pub fn get_or_insert_locked_column(&mut self, name: &str) -> usize {
        let i = self.get_or_insert_column(name);
        self.columns[i].locked = true;
        i
    }

    fn unlocked(&self, col: usize) -> Result<&AttributeColumn> {
        let c = self.columns.get(col).ok_or_else(|| SalaError::UnknownColumn(format!("#{}", col)))?;
        if c.locked {
            return Err(SalaError::LockedColumn(c.name.clone()));
        }
        Ok(c)
    }

    pub fn remove_column(&mut self, col: usize) -> Result<()> {
        self.unlocked(col)?;
        let c = self.columns.remove(col);
        self.mapping.remove(&c.name);
        for v in self.mapping.values_mut() {
            if *v > col {
                *v -= 1;
            }
        }
        for row in self.rows.values_mut() {
            row.values.remove(col);
        }
        Ok(())
    }

    pub fn rename_column(&mut self, old: &str, new: &str) -> Result<()> {
        let col = self.column_index(old).ok_or_else(|| SalaError::UnknownColumn(old.to_string()))?;
        self.unlocked(col)?;
        if self.mapping.contains_key(new) {
            return Err(SalaError::DuplicateColumn(new.to_string()));
        }
        self.mapping.remove(old);
        self.mapping.insert(new.to_string(), col);
        self.columns[col].name = new.to_string();
        Ok(())
    }

    pub fn set_column_hidden(&mut self, col: usize, hidden: bool) -> Result<()> {
        let c = self.columns.get_mut(col).ok_or_else(|| SalaError::UnknownColumn(format!("#{}", col)))?;
        c.hidden = hidden;
        Ok(())
    }

    pub fn set_display_params(&mut self, col: usize, params: DisplayParams) -> Result<()> {
        let c = self.columns.get_mut(col).ok_or_else(|| SalaError::UnknownColumn(format!("#{}", col)))?;
        c.display = params;
        Ok(())
    }

    pub fn set_display_params_for_all(&mut self, params: DisplayParams) {
        for c in &mut self.columns {
            c.display = params;
        }
    }

    pub fn add_row(&mut self, key: u32) -> Result<RowMut<'_>> {
        if self.rows.contains_key(&key) {
            return Err(SalaError::DuplicateRow(key));
        }
        let AttributeTable { columns, mapping, rows } = self;
        let columns: &[AttributeColumn] = columns;
        let mapping: &HashMap<String, usize> = mapping;
        let row = rows.entry(key).or_insert_with(|| AttributeRow::new(columns.len()));
        Ok(RowMut { row, columns, mapping })
    }

    pub fn remove_row(&mut self, key: u32) -> bool { self.rows.remove(&key).is_some() }
    pub fn has_row(&self, key: u32) -> bool { self.rows.contains_key(&key) }

    pub fn row(&self, key: u32) -> Option<RowRef<'_>> {
        self.rows.get(&key).map(|row| RowRef { row, columns: &self.columns })
    }

    pub fn row_mut(&mut self, key: u32) -> Option<RowMut<'_>> {
        let AttributeTable { columns, mapping, rows } = self;
        let columns: &[AttributeColumn] = columns;
        let mapping: &HashMap<String, usize> = mapping;
        rows.get_mut(&key).map(move |row| RowMut { row, columns, mapping })
    }

    pub fn keys(&self) -> impl Iterator<Item = u32> + '_ { self.rows.keys().copied() }

    pub fn rows(&self) -> impl Iterator<Item = (u32, RowRef<'_>)> + '_ {
        let columns = self.columns.as_slice();
        self.rows.iter().map(move |(k, row)| (*k, RowRef { row, columns }))
    }

    /// Mutable handles on every row at once, in key order.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = (u32, RowMut<'_>)> + '_ {
        let AttributeTable { columns, mapping, rows } = self;
        let columns: &[AttributeColumn] = columns;
        let mapping: &HashMap<String, usize> = mapping;
        rows.iter_mut().map(move |(k, row)| (*k, RowMut { row, columns, mapping }))
    }

    /// Values of `col` in key order.
    pub fn column_values(&self, col: usize) -> Option<Vec<f64>> {
        if col >= self.columns.len() {
            return None;
        }
        Some(self.rows.values().map(|r| r.values[col]).collect())
    }

    pub fn deselect_all(&mut self) {
        for row in self.rows.values_mut() {
            row.selected = false;
        }
    }

    pub fn selected_keys(&self) -> Vec<u32> {
        self.rows.iter().filter(|(_, r)| r.selected).map(|(k, _)| *k).collect()
    }

    /// Adds a layer named `name` and puts every selected row that is
    /// currently visible into it. Returns the new layer's index.
    pub fn push_selection_to_layer(&mut self, layers: &mut LayerManager, name: &str) -> Result<usize> {
        let index = layers.add_layer(name)?;
        let key = layers.key(index)?;
        for row in self.rows.values_mut() {
            if row.selected && layers.is_visible(row.layer_key) {
                row.layer_key |= key;
            }
        }
        layers.set_layer_visible(index, true)?;
        Ok(index)
    }

    /// Column headers, then one (key, layer key, selected, values) record per row.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32::<LittleEndian>(self.columns.len() as u32)?;
        for c in &self.columns {
            write_string(w, &c.name)?;
            write_bool(w, c.locked)?;
            write_bool(w, c.hidden)?;
            w.write_f64::<LittleEndian>(c.display.low)?;
            w.write_f64::<LittleEndian>(c.display.high)?;
        }
        w.write_u32::<LittleEndian>(self.rows.len() as u32)?;
        for (key, row) in &self.rows {
            w.write_u32::<LittleEndian>(*key)?;
            w.write_u64::<LittleEndian>(row.layer_key)?;
            write_bool(w, row.selected)?;
            for v in &row.values {
                w.write_f64::<LittleEndian>(*v)?;
            }
        }
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let mut table = AttributeTable::new();
        let ncols = r.read_u32::<LittleEndian>()? as usize;
        for _ in 0..ncols {
            let name = read_string(r)?;
            if table.mapping.contains_key(&name) {
                return Err(SalaError::DuplicateColumn(name));
            }
            let i = table.add_column(&name);
            table.columns[i].locked = read_bool(r)?;
            table.columns[i].hidden = read_bool(r)?;
            let low = r.read_f64::<LittleEndian>()?;
            let high = r.read_f64::<LittleEndian>()?;
            table.columns[i].display = DisplayParams { low, high };
        }
        let nrows = r.read_u32::<LittleEndian>()?;
        for _ in 0..nrows {
            let key = r.read_u32::<LittleEndian>()?;
            let layer_key = r.read_u64::<LittleEndian>()?;
            let selected = read_bool(r)?;
            let mut row = table.add_row(key)?;
            row.row.layer_key = layer_key;
            row.row.selected = selected;
            for c in 0..ncols {
                let v = r.read_f64::<LittleEndian>()?;
                // unset cells never went through the stats
                if v < 0.0 {
                    row.row.values[c] = v;
                } else {
                    row.set_value(c, v);
                }
            }
        }
        Ok(table)
    }
}
