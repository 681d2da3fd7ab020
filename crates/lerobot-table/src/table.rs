use std::fmt;

use crate::TableError;

/// A single cell value.
#[derive(Debug, Clone, PartialEq, derive_more::IsVariant)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// Renders the value the way the exporting pandas code would stringify it.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("None"),
            Scalar::Bool(true) => f.write_str("True"),
            Scalar::Bool(false) => f.write_str("False"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) if v.is_nan() => f.write_str("nan"),
            Scalar::Float(v) if v.is_infinite() => {
                f.write_str(if v.is_sign_positive() { "inf" } else { "-inf" })
            }
            Scalar::Float(v) => fmt_float(f, *v),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// Shortest round-trip digits; exponents are signed and at least two digits
/// wide (`1e+20`, `1.5e-05`).
fn fmt_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    let repr = format!("{v:?}");
    match repr.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = exponent
                .strip_prefix('-')
                .map_or(("+", exponent), |digits| ("-", digits));
            write!(f, "{mantissa}e{sign}{digits:0>2}")
        }
        None => f.write_str(&repr),
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("invalid literal for an integer: {value}")]
pub struct IntegerCoercionError {
    #[error(not(source))]
    pub value: Scalar,
}

// 2^63; truncated floats in [-2^63, 2^63) fit in an i64.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

impl Scalar {
    /// Converts the value to an integer.
    ///
    /// Floats are truncated toward zero, booleans become 0 or 1 and text is
    /// parsed as a base-10 integer after trimming surrounding whitespace.
    /// Nulls, non-finite floats and unparsable text are rejected.
    #[expect(clippy::cast_possible_truncation)]
    pub fn to_integer(&self) -> Result<i64, IntegerCoercionError> {
        let fail = || IntegerCoercionError {
            value: self.clone(),
        };
        match self {
            Scalar::Int(v) => Ok(*v),
            Scalar::Bool(b) => Ok(i64::from(*b)),
            Scalar::Float(v) => {
                let truncated = v.trunc();
                if truncated.is_finite() && truncated >= -I64_BOUND && truncated < I64_BOUND {
                    Ok(truncated as i64)
                } else {
                    Err(fail())
                }
            }
            Scalar::Text(s) => s.trim().parse().map_err(|_| fail()),
            Scalar::Null => Err(fail()),
        }
    }
}

/// Logical type of a column, independent of its physical storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    Float,
    Text,
    /// Any other type, carried as its text rendering.
    Other,
}

/// A named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ValueKind,
    values: Vec<Scalar>,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ValueKind, values: Vec<Scalar>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    #[must_use]
    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One level of stored row labels.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelLevel {
    /// Level name, `None` when the index was unnamed.
    pub name: Option<String>,
    pub kind: ValueKind,
    pub values: Vec<Scalar>,
}

/// Row labels of a table (the pandas index).
#[derive(Debug, Clone, PartialEq, derive_more::IsVariant)]
pub enum RowLabels {
    /// Positional labels `start, start + step, ...`, not stored in the file.
    Range {
        name: Option<String>,
        start: i64,
        step: i64,
    },
    /// Labels stored as one or more columns.
    Stored(Vec<LabelLevel>),
}

impl Default for RowLabels {
    fn default() -> Self {
        RowLabels::Range {
            name: None,
            start: 0,
            step: 1,
        }
    }
}

impl RowLabels {
    /// Returns the single stored level, if the labels are exactly one stored column.
    #[must_use]
    pub fn single_level(&self) -> Option<&LabelLevel> {
        match self {
            RowLabels::Stored(levels) if levels.len() == 1 => Some(&levels[0]),
            _ => None,
        }
    }
}

/// An ordered table: regular columns plus row labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    labels: RowLabels,
    num_rows: usize,
}

impl Table {
    /// Builds a table with positional row labels.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, TableError> {
        let num_rows = columns.first().map_or(0, Column::len);
        Self::new(columns, RowLabels::default(), num_rows)
    }

    pub fn new(
        columns: Vec<Column>,
        labels: RowLabels,
        num_rows: usize,
    ) -> Result<Self, TableError> {
        let check = |column: &str, actual: usize| {
            if actual == num_rows {
                Ok(())
            } else {
                Err(TableError::LengthMismatch {
                    column: column.to_owned(),
                    expected: num_rows,
                    actual,
                })
            }
        };
        for column in &columns {
            check(column.name(), column.len())?;
        }
        if let RowLabels::Stored(levels) = &labels {
            for (i, level) in levels.iter().enumerate() {
                check(&reset_level_name(level, i, levels.len()), level.values.len())?;
            }
        }
        Ok(Self {
            columns,
            labels,
            num_rows,
        })
    }

    /// Replaces the row labels.
    pub fn with_labels(self, labels: RowLabels) -> Result<Self, TableError> {
        Self::new(self.columns, labels, self.num_rows)
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    #[must_use]
    pub fn labels(&self) -> &RowLabels {
        &self.labels
    }

    /// Returns the columns of the table with its row labels moved in front.
    ///
    /// Mirrors `DataFrame.reset_index()`: a positional range becomes an
    /// `index` column holding the label values, stored levels become columns
    /// named after the level (or `index` / `level_N` when unnamed), followed
    /// by the regular columns in order.
    #[must_use]
    pub fn reset_labels(&self) -> Vec<Column> {
        let mut reset = match &self.labels {
            RowLabels::Range { name, start, step } => {
                let values = (0..self.num_rows)
                    .scan(*start, |label, _| {
                        let current = *label;
                        *label = label.saturating_add(*step);
                        Some(Scalar::Int(current))
                    })
                    .collect();
                let name = name.clone().unwrap_or_else(|| self.unnamed_index_name());
                vec![Column::new(name, ValueKind::Integer, values)]
            }
            RowLabels::Stored(levels) => levels
                .iter()
                .enumerate()
                .map(|(i, level)| {
                    let name = if levels.len() == 1 && level.name.is_none() {
                        self.unnamed_index_name()
                    } else {
                        reset_level_name(level, i, levels.len())
                    };
                    Column::new(name, level.kind, level.values.clone())
                })
                .collect(),
        };
        reset.extend(self.columns.iter().cloned());
        reset
    }

    fn unnamed_index_name(&self) -> String {
        if self.column("index").is_some() {
            "level_0".to_owned()
        } else {
            "index".to_owned()
        }
    }
}

fn reset_level_name(level: &LabelLevel, position: usize, num_levels: usize) -> String {
    match &level.name {
        Some(name) => name.clone(),
        None if num_levels == 1 => "index".to_owned(),
        None => format!("level_{position}"),
    }
}
