//! Tabular Dataset
//!
//! A row-oriented table of uniquely named columns holding loosely typed cells.
//! Tools never mutate a dataset in place: they read a `&Dataset` and return a
//! fresh one, so every iteration of the reasoning loop works on its own snapshot.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tokens read as a missing value when inferring cell types from text
const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Dataset construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatasetError {
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("row {row} has {found} cells, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// A single cell value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
}

/// Hashable identity of a cell, used for duplicate detection and grouping
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CellKey {
    Missing,
    Number(u64),
    Text(String),
}

impl Cell {
    /// Build a numeric cell; non-finite values become `Missing`
    pub fn number(value: f64) -> Self {
        if value.is_finite() {
            Self::Number(value)
        } else {
            Self::Missing
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Infer a cell from raw text: missing tokens, then numbers, then text.
    /// Surrounding whitespace is ignored for the first two; text keeps it.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_TOKENS.contains(&trimmed) {
            return Self::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Self::Number(v),
            _ => Self::Text(raw.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Numeric value, only for cells that already hold a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value with text coercion; unparsable text yields `None`
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Self::Missing => None,
        }
    }

    pub fn key(&self) -> CellKey {
        match self {
            Self::Missing => CellKey::Missing,
            // +0.0 and -0.0 compare equal, so they must share a key
            Self::Number(v) if *v == 0.0 => CellKey::Number(0.0_f64.to_bits()),
            Self::Number(v) => CellKey::Number(v.to_bits()),
            Self::Text(s) => CellKey::Text(s.clone()),
        }
    }

    /// Total order: missing < numbers < text
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Missing, Self::Missing) => Ordering::Equal,
            (Self::Missing, _) => Ordering::Less,
            (_, Self::Missing) => Ordering::Greater,
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "NaN"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Inferred type of a column, from its non-missing cells
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    Text,
    Mixed,
    Empty,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number => write!(f, "number"),
            Self::Text => write!(f, "text"),
            Self::Mixed => write!(f, "mixed"),
            Self::Empty => write!(f, "empty"),
        }
    }
}

/// Ordered table of named columns
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    /// Create a dataset, enforcing unique column names and uniform row width
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, DatasetError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(DatasetError::DuplicateColumn(name.clone()));
            }
        }

        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(DatasetError::RowWidth {
                    row: i,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.row_count(), self.column_count())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, top to bottom
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }

    pub fn column_type(&self, index: usize) -> ColumnType {
        let mut numbers = false;
        let mut texts = false;
        for cell in self.column(index) {
            match cell {
                Cell::Number(_) => numbers = true,
                Cell::Text(_) => texts = true,
                Cell::Missing => {}
            }
        }
        match (numbers, texts) {
            (true, false) => ColumnType::Number,
            (false, true) => ColumnType::Text,
            (true, true) => ColumnType::Mixed,
            (false, false) => ColumnType::Empty,
        }
    }

    pub fn has_missing(&self) -> bool {
        self.rows.iter().flatten().any(Cell::is_missing)
    }

    /// Keep only the rows accepted by `keep`; columns are untouched.
    pub fn retain_rows<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&[Cell]) -> bool,
    {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Rewrite every cell; `map` receives the column index and the old cell.
    pub fn map_cells<F>(&self, mut map: F) -> Self
    where
        F: FnMut(usize, &Cell) -> Cell,
    {
        Self {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .map(|row| row.iter().enumerate().map(|(i, c)| map(i, c)).collect())
                .collect(),
        }
    }

    /// Column names rendered as a bracketed, quoted list
    pub fn column_list(&self) -> String {
        let quoted: Vec<String> = self.columns.iter().map(|c| format!("'{c}'")).collect();
        format!("[{}]", quoted.join(", "))
    }

    /// One-line description used to brief the model
    pub fn brief(&self) -> String {
        let (rows, cols) = self.shape();
        format!("shape ({rows}, {cols}) with columns: {}", self.column_list())
    }

    /// Render up to `limit` rows as an aligned text table with a row index
    pub fn render_table(&self, limit: usize) -> String {
        if self.rows.is_empty() {
            return format!("Empty dataset\nColumns: {}", self.column_list());
        }

        let shown: Vec<Vec<String>> = self
            .rows
            .iter()
            .take(limit)
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect();

        let index_width = shown.len().saturating_sub(1).to_string().len();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                shown
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = " ".repeat(index_width);
        for (name, width) in self.columns.iter().zip(&widths) {
            out.push_str(&format!("  {name:>width$}"));
        }
        for (i, row) in shown.iter().enumerate() {
            out.push('\n');
            out.push_str(&format!("{i:>index_width$}"));
            for (value, width) in row.iter().zip(&widths) {
                out.push_str(&format!("  {value:>width$}"));
            }
        }
        out
    }
}
