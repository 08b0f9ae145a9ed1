use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::KiraError;

pub const MISSING: &str = "NA";

/// Orientation of a densified table: `"12"` keeps rows as rows, `"21"` emits the transpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DimOrder {
    RowsFirst,
    ColumnsFirst,
}

impl fmt::Display for DimOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimOrder::RowsFirst => write!(f, "12"),
            DimOrder::ColumnsFirst => write!(f, "21"),
        }
    }
}

impl FromStr for DimOrder {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "12" => Ok(DimOrder::RowsFirst),
            "21" => Ok(DimOrder::ColumnsFirst),
            other => Err(KiraError::InvalidDimOrder(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn parse(text: &str) -> Self {
        let rows = text
            .split('\n')
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| line.split('\t').map(str::to_string).collect())
            .collect();
        Self { rows }
    }

    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn with_header(mut self, header: &[&str]) -> Self {
        self.rows
            .insert(0, header.iter().map(|cell| cell.to_string()).collect());
        self
    }

    pub fn unite_columns(&self, indices: &[usize], separator: &str) -> Result<Self, KiraError> {
        if indices.is_empty() {
            return Ok(self.clone());
        }
        let mut rows = Vec::with_capacity(self.rows.len());
        for (row_index, row) in self.rows.iter().enumerate() {
            let mut parts = Vec::with_capacity(indices.len());
            for &index in indices {
                let cell = row.get(index).ok_or(KiraError::ColumnIndex {
                    row: row_index,
                    index,
                })?;
                parts.push(cell.as_str());
            }
            let mut united = Vec::with_capacity((row.len() + 1).saturating_sub(indices.len()));
            united.push(parts.join(separator));
            united.extend(
                row.iter()
                    .enumerate()
                    .filter(|(index, _)| !indices.contains(index))
                    .map(|(_, cell)| cell.clone()),
            );
            rows.push(united);
        }
        Ok(Self { rows })
    }

    pub fn skip(&self, row_names: &[&str], column_names: &[&str]) -> Self {
        let Some(header) = self.rows.first() else {
            return self.clone();
        };
        let kept_columns = header
            .iter()
            .enumerate()
            .filter(|(_, name)| !column_names.contains(&name.as_str()))
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        let rows = self
            .rows
            .iter()
            .enumerate()
            .filter(|(index, row)| {
                *index == 0
                    || row
                        .first()
                        .map(|key| !row_names.contains(&key.as_str()))
                        .unwrap_or(true)
            })
            .map(|(_, row)| {
                kept_columns
                    .iter()
                    .filter_map(|&index| row.get(index).cloned())
                    .collect()
            })
            .collect();
        Self { rows }
    }

    pub fn into_keyed(self, order: DimOrder) -> Result<KeyedTable, KiraError> {
        let table = KeyedTable::from_sparse_rows(&self.rows)?;
        Ok(match order {
            DimOrder::RowsFirst => table,
            DimOrder::ColumnsFirst => table.transpose(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyedTable {
    cells: BTreeMap<String, BTreeMap<String, String>>,
}

impl KeyedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sparse_rows(rows: &[Vec<String>]) -> Result<Self, KiraError> {
        let header = rows.first().ok_or(KiraError::EmptyTable)?;
        let columns = header.iter().skip(1).collect::<Vec<_>>();
        let mut seen = BTreeSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(KiraError::DuplicateKey(column.to_string()));
            }
        }

        let mut cells = BTreeMap::new();
        for (index, row) in rows.iter().enumerate().skip(1) {
            if row.len() != header.len() {
                return Err(KiraError::RowWidth {
                    row: index,
                    expected: header.len(),
                    found: row.len(),
                });
            }
            let key = row[0].clone();
            let values = columns
                .iter()
                .zip(row.iter().skip(1))
                .map(|(column, cell)| (column.to_string(), cell.clone()))
                .collect::<BTreeMap<_, _>>();
            if cells.insert(key.clone(), values).is_some() {
                return Err(KiraError::DuplicateKey(key));
            }
        }
        Ok(Self { cells })
    }

    pub fn from_cells<I>(triples: I) -> Result<Self, KiraError>
    where
        I: IntoIterator<Item = (String, String, String)>,
    {
        let mut table = Self::new();
        for (row, column, value) in triples {
            table.insert(row, column, value)?;
        }
        Ok(table)
    }

    fn insert(&mut self, row: String, column: String, value: String) -> Result<(), KiraError> {
        let entry = self.cells.entry(row.clone()).or_default();
        if entry.contains_key(&column) {
            return Err(KiraError::DuplicateKey(format!("{row}/{column}")));
        }
        entry.insert(column, value);
        Ok(())
    }

    pub fn get(&self, row: &str, column: &str) -> Option<&str> {
        self.cells
            .get(row)
            .and_then(|values| values.get(column))
            .map(String::as_str)
    }

    pub fn row_keys(&self) -> Vec<&str> {
        self.cells.keys().map(String::as_str).collect()
    }

    pub fn column_keys(&self) -> BTreeSet<&str> {
        self.cells
            .values()
            .flat_map(|values| values.keys().map(String::as_str))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(BTreeMap::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.cells.iter().flat_map(|(row, values)| {
            values
                .iter()
                .map(move |(column, value)| (row.as_str(), column.as_str(), value.as_str()))
        })
    }

    pub fn transpose(&self) -> Self {
        let mut cells = BTreeMap::<String, BTreeMap<String, String>>::new();
        for (row, column, value) in self.iter() {
            cells
                .entry(column.to_string())
                .or_default()
                .insert(row.to_string(), value.to_string());
        }
        Self { cells }
    }

    pub fn skip(&self, row_names: &[&str], column_names: &[&str]) -> Self {
        let cells = self
            .cells
            .iter()
            .filter(|(row, _)| !row_names.contains(&row.as_str()))
            .map(|(row, values)| {
                let values = values
                    .iter()
                    .filter(|(column, _)| !column_names.contains(&column.as_str()))
                    .map(|(column, value)| (column.clone(), value.clone()))
                    .collect();
                (row.clone(), values)
            })
            .collect();
        Self { cells }
    }

    pub fn select_columns(&self, column_names: &[&str]) -> Self {
        let cells = self
            .cells
            .iter()
            .map(|(row, values)| {
                let values = values
                    .iter()
                    .filter(|(column, _)| column_names.contains(&column.as_str()))
                    .map(|(column, value)| (column.clone(), value.clone()))
                    .collect();
                (row.clone(), values)
            })
            .collect();
        Self { cells }
    }

    pub fn rename_columns<F>(&self, rename: F) -> Result<Self, KiraError>
    where
        F: Fn(&str) -> String,
    {
        Self::from_cells(
            self.iter()
                .map(|(row, column, value)| (row.to_string(), rename(column), value.to_string())),
        )
    }

    pub fn densify(&self, order: DimOrder, id_label: &str) -> Matrix {
        self.densify_with_marker(order, id_label, MISSING)
    }

    /// Rectangular rendering with sorted keys and `missing` in every absent cell.
    /// Row keys without cells still get a line (or a column in `21` order).
    pub fn densify_with_marker(&self, order: DimOrder, id_label: &str, missing: &str) -> Matrix {
        let rows: Vec<&str> = self.cells.keys().map(String::as_str).collect();
        let columns: Vec<&str> = self.column_keys().into_iter().collect();
        let cell = |row: &str, column: &str| {
            self.get(row, column)
                .map(str::to_string)
                .unwrap_or_else(|| missing.to_string())
        };
        let (outer, inner) = match order {
            DimOrder::RowsFirst => (&rows, &columns),
            DimOrder::ColumnsFirst => (&columns, &rows),
        };

        let mut header = Vec::with_capacity(inner.len() + 1);
        header.push(id_label.to_string());
        header.extend(inner.iter().map(|key| key.to_string()));
        let lines = outer
            .iter()
            .map(|outer_key| {
                let mut line = Vec::with_capacity(inner.len() + 1);
                line.push(outer_key.to_string());
                line.extend(inner.iter().map(|inner_key| match order {
                    DimOrder::RowsFirst => cell(*outer_key, *inner_key),
                    DimOrder::ColumnsFirst => cell(*inner_key, *outer_key),
                }));
                line
            })
            .collect();
        Matrix { header, rows: lines }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Matrix {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Matrix {
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        std::iter::once(self.header.clone())
            .chain(self.rows.iter().cloned())
            .collect()
    }

    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        for row in std::iter::once(&self.header).chain(self.rows.iter()) {
            out.push_str(&row.join("\t"));
            out.push('\n');
        }
        out
    }
}

/// Permutation of the three axes of a [`KeyedTable3`], written as the old
/// axis numbers in their new order (`"231"` moves axis 1 last).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisOrder([usize; 3]);

impl AxisOrder {
    pub fn axes(&self) -> [usize; 3] {
        self.0
    }
}

impl FromStr for AxisOrder {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let axes = match value.trim() {
            "123" => [0, 1, 2],
            "132" => [0, 2, 1],
            "213" => [1, 0, 2],
            "231" => [1, 2, 0],
            "312" => [2, 0, 1],
            "321" => [2, 1, 0],
            other => return Err(KiraError::InvalidDimOrder(other.to_string())),
        };
        Ok(Self(axes))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyedTable3 {
    cells: BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>,
}

impl KeyedTable3 {
    pub fn from_tables<I>(tables: I) -> Self
    where
        I: IntoIterator<Item = (String, KeyedTable)>,
    {
        let cells = tables
            .into_iter()
            .map(|(outer, table)| (outer, table.cells))
            .collect();
        Self { cells }
    }

    pub fn get(&self, a: &str, b: &str, c: &str) -> Option<&str> {
        self.cells
            .get(a)
            .and_then(|middle| middle.get(b))
            .and_then(|inner| inner.get(c))
            .map(String::as_str)
    }

    pub fn axis_keys(&self, axis: usize) -> BTreeSet<&str> {
        let mut keys = BTreeSet::new();
        for (a, middle) in &self.cells {
            if axis == 0 {
                keys.insert(a.as_str());
                continue;
            }
            for (b, inner) in middle {
                if axis == 1 {
                    keys.insert(b.as_str());
                } else {
                    keys.extend(inner.keys().map(String::as_str));
                }
            }
        }
        keys
    }

    pub fn permute(&self, order: AxisOrder) -> Self {
        self.permute_with_marker(order, MISSING)
    }

    pub fn permute_with_marker(&self, order: AxisOrder, missing: &str) -> Self {
        let universes = [self.axis_keys(0), self.axis_keys(1), self.axis_keys(2)];
        let [first, second, third] = order.axes();
        let mut cells = BTreeMap::new();
        for x in &universes[first] {
            let mut middle = BTreeMap::new();
            for y in &universes[second] {
                let mut inner = BTreeMap::new();
                for z in &universes[third] {
                    let mut old = [""; 3];
                    old[first] = *x;
                    old[second] = *y;
                    old[third] = *z;
                    let value = self.get(old[0], old[1], old[2]).unwrap_or(missing);
                    inner.insert(z.to_string(), value.to_string());
                }
                middle.insert(y.to_string(), inner);
            }
            cells.insert(x.to_string(), middle);
        }
        Self { cells }
    }

    pub fn slice(&self, outer: &str) -> Option<KeyedTable> {
        self.cells.get(outer).map(|cells| KeyedTable {
            cells: cells.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn parse_skips_comments_and_carriage_returns() {
        let table = RawTable::parse("# model\nId\tA\r\nr1\tx\r\n\n");
        assert_eq!(table.rows(), rows(&[&["Id", "A"], &["r1", "x"]]).as_slice());
    }

    #[test]
    fn unite_puts_joined_key_first() {
        let table = RawTable::from_rows(rows(&[&["a", "b", "c", "d"], &["1", "2", "3", "4"]]));
        let united = table.unite_columns(&[1, 3], "___").unwrap();
        assert_eq!(united.rows()[0], vec!["b___d", "a", "c"]);
        assert_eq!(united.rows()[1], vec!["2___4", "1", "3"]);
    }

    #[test]
    fn unite_rejects_short_rows() {
        let table = RawTable::from_rows(rows(&[&["a", "b"], &["1"]]));
        let err = table.unite_columns(&[1], "___").unwrap_err();
        assert_matches!(err, KiraError::ColumnIndex { row: 1, index: 1 });
    }

    #[test]
    fn duplicate_row_key_is_rejected() {
        let err = KeyedTable::from_sparse_rows(&rows(&[&["Id", "A"], &["r1", "x"], &["r1", "y"]]))
            .unwrap_err();
        assert_matches!(err, KiraError::DuplicateKey(key) if key == "r1");
    }

    #[test]
    fn axis_order_parsing() {
        assert_eq!("231".parse::<AxisOrder>().unwrap().axes(), [1, 2, 0]);
        assert!("221".parse::<AxisOrder>().is_err());
        assert!("3".parse::<DimOrder>().is_err());
    }
}
