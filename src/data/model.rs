use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use super::schema;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the survey table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell. Raw files hold integer codes and measures;
/// after decoding, categorical columns hold labels. `Null` marks a missing
/// value.
/// Using `BTreeMap` / `BTreeSet` downstream so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Label(String),
    Integer(i64),
    Float(f64),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet / group keys --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Integer(_) => 1,
                Float(_) => 2,
                Label(_) => 3,
            }
        }
        match (self, other) {
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Label(a), Label(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Label(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Label(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Label(s) => serializer.serialize_str(s),
            CellValue::Integer(i) => serializer.serialize_i64(*i),
            CellValue::Float(v) => serializer.serialize_f64(*v),
            CellValue::Null => serializer.serialize_none(),
        }
    }
}

impl CellValue {
    /// Type a raw text field: empty → `Null`, then integer, float, label.
    pub fn parse(s: &str) -> CellValue {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("nan") {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        CellValue::Label(s.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if v.is_finite() => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            CellValue::Label(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret as an integer code. Integral floats count, since columns
    /// with gaps are often exported as floating point.
    pub fn as_code(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            CellValue::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    /// The text written to a CSV field; missing values are empty.
    pub fn to_field(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            other => other.to_string(),
        }
    }
}

static NULL: CellValue = CellValue::Null;

// ---------------------------------------------------------------------------
// Record – one survey respondent
// ---------------------------------------------------------------------------

/// One respondent (one row of the survey table). Identity is row position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// column_name → value.
    pub values: BTreeMap<String, CellValue>,
}

impl Record {
    /// The value of `column`, `Null` when the record has no such column.
    pub fn get(&self, column: &str) -> &CellValue {
        self.values.get(column).unwrap_or(&NULL)
    }

    pub fn set(&mut self, column: impl Into<String>, value: CellValue) {
        self.values.insert(column.into(), value);
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, CellValue)>>(iter: I) -> Self {
        Record {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// AgeEncoding – how the Age column is stored
// ---------------------------------------------------------------------------

/// Age is either real years or a pre-binned ordinal code (1–5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeEncoding {
    Years,
    Coded,
    /// No numeric age values at all.
    Absent,
}

/// Largest age value still read as a bracket code rather than years.
pub const MAX_AGE_CODE: f64 = 10.0;

impl AgeEncoding {
    /// Infer the encoding from the largest observed age.
    ///
    /// Fragile: a genuine years column in which every respondent is aged
    /// ten or under reads as coded.
    pub fn infer(records: &[Record]) -> AgeEncoding {
        let max = records
            .iter()
            .filter_map(|r| r.get(schema::AGE).as_f64())
            .reduce(f64::max);
        match max {
            None => AgeEncoding::Absent,
            Some(m) if m <= MAX_AGE_CODE => AgeEncoding::Coded,
            Some(_) => AgeEncoding::Years,
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the decoded, cleaned survey table
// ---------------------------------------------------------------------------

/// An immutable survey table. Filtering builds a new `Dataset` through
/// [`Dataset::derive`]; nothing edits one in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// All respondents (rows).
    pub records: Vec<Record>,
    /// Column names in file order, synthesized columns last.
    pub column_names: Vec<String>,
    /// How `Age` is stored; fixed when the table is first built.
    pub age_encoding: AgeEncoding,
}

impl Dataset {
    /// Build a dataset from freshly loaded rows, inferring the age encoding.
    pub fn from_records(column_names: Vec<String>, records: Vec<Record>) -> Self {
        let age_encoding = AgeEncoding::infer(&records);
        Dataset {
            records,
            column_names,
            age_encoding,
        }
    }

    /// A dataset with no rows and no columns.
    pub fn empty() -> Self {
        Dataset {
            records: Vec::new(),
            column_names: Vec::new(),
            age_encoding: AgeEncoding::Absent,
        }
    }

    /// A subset of this dataset's rows sharing its columns and age encoding.
    pub fn derive(&self, records: Vec<Record>) -> Self {
        Dataset {
            records,
            column_names: self.column_names.clone(),
            age_encoding: self.age_encoding,
        }
    }

    /// Number of respondents.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// The distinct non-missing values of a column.
    pub fn unique_values(&self, column: &str) -> BTreeSet<CellValue> {
        self.records
            .iter()
            .map(|r| r.get(column))
            .filter(|v| !v.is_null())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ages(values: &[CellValue]) -> Vec<Record> {
        values
            .iter()
            .map(|v| Record::from_iter([(schema::AGE, v.clone())]))
            .collect()
    }

    #[test]
    fn parse_types_fields() {
        assert_eq!(CellValue::parse(""), CellValue::Null);
        assert_eq!(CellValue::parse("NaN"), CellValue::Null);
        assert_eq!(CellValue::parse("35"), CellValue::Integer(35));
        assert_eq!(CellValue::parse("0.82"), CellValue::Float(0.82));
        assert_eq!(CellValue::parse("Ontario"), CellValue::Label("Ontario".into()));
    }

    #[test]
    fn missing_column_reads_as_null() {
        let r = Record::from_iter([("Gender", CellValue::Label("Male".into()))]);
        assert!(r.get("Province").is_null());
    }

    #[test]
    fn age_encoding_threshold() {
        let coded = ages(&[CellValue::Integer(1), CellValue::Integer(5)]);
        assert_eq!(AgeEncoding::infer(&coded), AgeEncoding::Coded);

        let years = ages(&[CellValue::Integer(3), CellValue::Float(42.0)]);
        assert_eq!(AgeEncoding::infer(&years), AgeEncoding::Years);

        let boundary = ages(&[CellValue::Integer(10)]);
        assert_eq!(AgeEncoding::infer(&boundary), AgeEncoding::Coded);

        assert_eq!(AgeEncoding::infer(&ages(&[CellValue::Null])), AgeEncoding::Absent);
    }

    #[test]
    fn derive_keeps_schema() {
        let ds = Dataset::from_records(
            vec![schema::AGE.to_string()],
            ages(&[CellValue::Integer(2), CellValue::Integer(4)]),
        );
        let sub = ds.derive(ds.records[..1].to_vec());
        assert_eq!(sub.len(), 1);
        assert_eq!(sub.column_names, ds.column_names);
        assert_eq!(sub.age_encoding, AgeEncoding::Coded);
    }

    #[test]
    fn unique_values_skip_nulls() {
        let ds = Dataset::from_records(
            vec![schema::AGE.to_string()],
            ages(&[CellValue::Integer(2), CellValue::Null, CellValue::Integer(2)]),
        );
        assert_eq!(
            ds.unique_values(schema::AGE).into_iter().collect::<Vec<_>>(),
            vec![CellValue::Integer(2)]
        );
    }
}
