use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::codes;
use super::model::{CellValue, Dataset, Record};
use super::schema::{HEALTH_UTILITY_ALIASES, HEALTH_UTILITY_INDEX, REQUIRED_COLUMNS};
use crate::error::DataLoadError;

/// A table as read from disk, before any decoding or cleaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl RawTable {
    fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load, decode and clean the raw survey file, then write the cleaned table
/// to `cache_path`.
///
/// The cache is overwritten on every call and never read back; failing to
/// write it is logged, not returned.
pub fn load(raw_path: &Path, cache_path: &Path) -> Result<Dataset, DataLoadError> {
    let table = read_table(raw_path)?;
    let raw_rows = table.rows.len();
    let dataset = clean(table)?;

    log::info!(
        "loaded {} records ({} dropped as incomplete) with {} columns from {}",
        dataset.len(),
        raw_rows - dataset.len(),
        dataset.column_names.len(),
        raw_path.display()
    );
    log::debug!("age column encoding: {:?}", dataset.age_encoding);

    match write_cache(&dataset, cache_path) {
        Ok(()) => log::debug!("wrote processed table to {}", cache_path.display()),
        Err(e) => log::warn!("could not write {}: {e}", cache_path.display()),
    }
    Ok(dataset)
}

/// Read a raw table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one respondent per line
/// * `.parquet` – integer, float and string columns
pub fn read_table(path: &Path) -> Result<RawTable, DataLoadError> {
    if !path.exists() {
        return Err(DataLoadError::NotFound(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => read_csv(path),
        "parquet" | "pq" => read_parquet(path),
        other => Err(DataLoadError::UnsupportedFormat(other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Cleaning
// ---------------------------------------------------------------------------

/// Decode categorical codes, settle the health utility column and drop rows
/// missing a required field.
pub fn clean(mut table: RawTable) -> Result<Dataset, DataLoadError> {
    decode_columns(&mut table);
    resolve_health_utility(&mut table);

    for required in REQUIRED_COLUMNS {
        if !table.has_column(required) {
            return Err(DataLoadError::MissingColumn(required.to_string()));
        }
    }
    table
        .rows
        .retain(|r| REQUIRED_COLUMNS.iter().all(|c| !r.get(c).is_null()));

    Ok(Dataset::from_records(table.columns, table.rows))
}

fn decode_columns(table: &mut RawTable) {
    for map in codes::code_maps() {
        if !table.has_column(map.column) {
            continue;
        }
        let mut unmapped = 0usize;
        for row in &mut table.rows {
            let raw = row.get(map.column);
            let decoded = map.decode(raw);
            if decoded.is_null() && !raw.is_null() {
                unmapped += 1;
            }
            row.set(map.column, decoded);
        }
        log::debug!("decoded {} ({unmapped} unmapped values)", map.column);
    }
}

/// Make sure `Health_utility_index` exists: rename the first known alias,
/// or add the column with every value missing.
fn resolve_health_utility(table: &mut RawTable) {
    if table.has_column(HEALTH_UTILITY_INDEX) {
        return;
    }

    match HEALTH_UTILITY_ALIASES.iter().find(|a| table.has_column(a)) {
        Some(alias) => {
            for name in &mut table.columns {
                if name.as_str() == *alias {
                    *name = HEALTH_UTILITY_INDEX.to_string();
                }
            }
            for row in &mut table.rows {
                let value = row.values.remove(*alias).unwrap_or(CellValue::Null);
                row.set(HEALTH_UTILITY_INDEX, value);
            }
            log::info!("using column '{alias}' as {HEALTH_UTILITY_INDEX}");
        }
        None => {
            table.columns.push(HEALTH_UTILITY_INDEX.to_string());
            for row in &mut table.rows {
                row.set(HEALTH_UTILITY_INDEX, CellValue::Null);
            }
            log::warn!("no {HEALTH_UTILITY_INDEX} column found; treating it as missing");
        }
    }
}

// ---------------------------------------------------------------------------
// Cache writer
// ---------------------------------------------------------------------------

/// Write `dataset` as CSV, replacing whatever was at `path`.
pub fn write_cache(dataset: &Dataset, path: &Path) -> Result<(), DataLoadError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&dataset.column_names)?;
    for record in &dataset.records {
        writer.write_record(
            dataset
                .column_names
                .iter()
                .map(|c| record.get(c).to_field()),
        )?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> Result<RawTable, DataLoadError> {
    let mut reader = csv::Reader::from_path(path)?;
    let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows: Vec<Record> = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(
            columns
                .iter()
                .zip(record.iter())
                .map(|(col, field)| (col.clone(), CellValue::parse(field)))
                .collect(),
        );
    }

    Ok(RawTable { columns, rows })
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

fn read_parquet(path: &Path) -> Result<RawTable, DataLoadError> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut rows: Vec<Record> = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        let arrays = columns
            .iter()
            .zip(batch.columns())
            .map(|(name, col)| normalize_column(name, col))
            .collect::<Result<Vec<_>, _>>()?;
        for row in 0..batch.num_rows() {
            rows.push(
                columns
                    .iter()
                    .zip(&arrays)
                    .map(|(name, col)| (name.clone(), extract_cell(col, row)))
                    .collect(),
            );
        }
    }

    Ok(RawTable { columns, rows })
}

/// Cast a column to one of the types `extract_cell` reads.
///
/// Unsigned and boolean columns become Int64, decimals and half floats
/// Float64, and dictionaries (pandas `category`) their value type. Anything
/// else is an error rather than a column of missing values.
fn normalize_column(name: &str, col: &ArrayRef) -> Result<ArrayRef, DataLoadError> {
    let unsupported = || DataLoadError::UnsupportedColumnType {
        column: name.to_string(),
        data_type: col.data_type().clone(),
    };
    let target = match col.data_type() {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::Float32
        | DataType::Float64
        | DataType::Utf8
        | DataType::LargeUtf8 => return Ok(col.clone()),
        DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Boolean => DataType::Int64,
        DataType::Float16 | DataType::Decimal128(..) | DataType::Decimal256(..) => {
            DataType::Float64
        }
        DataType::Utf8View => DataType::Utf8,
        DataType::Dictionary(_, values) => {
            let decoded = cast(col, values).map_err(|_| unsupported())?;
            return normalize_column(name, &decoded);
        }
        _ => return Err(unsupported()),
    };
    log::debug!("casting column '{name}' from {} to {target}", col.data_type());
    cast(col, &target).map_err(|_| unsupported())
}

/// Extract a single cell from a normalized Arrow column at a given row.
fn extract_cell(col: &ArrayRef, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    match col.data_type() {
        DataType::Int8 => CellValue::Integer(col.as_primitive::<Int8Type>().value(row).into()),
        DataType::Int16 => CellValue::Integer(col.as_primitive::<Int16Type>().value(row).into()),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row).into()),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => float_cell(col.as_primitive::<Float32Type>().value(row).into()),
        DataType::Float64 => float_cell(col.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => CellValue::parse(col.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => CellValue::parse(col.as_string::<i64>().value(row)),
        // normalize_column lets nothing else through
        _ => CellValue::Null,
    }
}

fn float_cell(v: f64) -> CellValue {
    if v.is_nan() {
        CellValue::Null
    } else {
        CellValue::Float(v)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Date32Array, DictionaryArray, Float64Array, Int64Array, UInt8Array};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::data::model::AgeEncoding;
    use crate::data::schema;

    const RAW: &str = "\
Province,Gender,Age,Gen_health_state,Total_income,Immigrant,HUI3
35,1,34,1,2,2,0.91
24,2,67,5,7,1,0.55
35,9,22,2,1,2,0.88
99,1,45,3,3,,
";

    fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn decodes_renames_and_drops_incomplete_rows() {
        let dir = tempfile::tempdir().unwrap();
        let raw = write(dir.path(), "raw.csv", RAW);
        let cache = dir.path().join("processed").join("clean.csv");

        let ds = load(&raw, &cache).unwrap();

        // Gender code 9 and province code 99 are unmapped → dropped.
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.age_encoding, AgeEncoding::Years);
        let first = &ds.records[0];
        assert_eq!(first.get(schema::PROVINCE), &CellValue::Label("Ontario".into()));
        assert_eq!(first.get(schema::GENDER), &CellValue::Label("Male".into()));
        assert_eq!(
            first.get(schema::TOTAL_INCOME),
            &CellValue::Label("$20,000 to $39,999".into())
        );
        assert_eq!(first.get(schema::HEALTH_UTILITY_INDEX), &CellValue::Float(0.91));
        assert!(ds.has_column(schema::HEALTH_UTILITY_INDEX));
        assert!(!ds.has_column("HUI3"));
        assert!(first.get(schema::AGE) == &CellValue::Integer(34));
    }

    #[test]
    fn cache_holds_decoded_labels() {
        let dir = tempfile::tempdir().unwrap();
        let raw = write(dir.path(), "raw.csv", RAW);
        let cache = dir.path().join("processed").join("clean.csv");
        std::fs::create_dir_all(cache.parent().unwrap()).unwrap();
        std::fs::write(&cache, "stale contents\n").unwrap();

        load(&raw, &cache).unwrap();

        let written = std::fs::read_to_string(&cache).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next(),
            Some("Province,Gender,Age,Gen_health_state,Total_income,Immigrant,Health_utility_index")
        );
        assert_eq!(
            lines.next(),
            Some("Ontario,Male,34,Excellent,\"$20,000 to $39,999\",No,0.91")
        );
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn synthesizes_missing_health_utility() {
        let dir = tempfile::tempdir().unwrap();
        let raw = write(dir.path(), "raw.csv", "Province,Gender,Gen_health_state\n48,2,3\n");
        let ds = load(&raw, &dir.path().join("clean.csv")).unwrap();
        assert_eq!(ds.column_names.last().map(String::as_str), Some(schema::HEALTH_UTILITY_INDEX));
        assert!(ds.records[0].get(schema::HEALTH_UTILITY_INDEX).is_null());
        assert_eq!(ds.age_encoding, AgeEncoding::Absent);
    }

    #[test]
    fn first_alias_wins() {
        let mut table = RawTable {
            columns: vec!["hui".into(), "Health_utility_indx".into()],
            rows: vec![Record::from_iter([
                ("hui", CellValue::Float(0.1)),
                ("Health_utility_indx", CellValue::Float(0.2)),
            ])],
        };
        resolve_health_utility(&mut table);
        assert_eq!(table.columns, vec!["hui".to_string(), schema::HEALTH_UTILITY_INDEX.into()]);
        assert_eq!(table.rows[0].get(schema::HEALTH_UTILITY_INDEX), &CellValue::Float(0.2));
    }

    #[test]
    fn missing_required_column_fails() {
        let dir = tempfile::tempdir().unwrap();
        let raw = write(dir.path(), "raw.csv", "Province,Gender\n35,1\n");
        let err = load(&raw, &dir.path().join("clean.csv")).unwrap_err();
        assert!(matches!(err, DataLoadError::MissingColumn(c) if c == schema::GEN_HEALTH_STATE));
    }

    #[test]
    fn missing_file_and_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("clean.csv");
        assert!(matches!(
            load(&dir.path().join("absent.csv"), &cache),
            Err(DataLoadError::NotFound(_))
        ));
        let xlsx = write(dir.path(), "raw.xlsx", "");
        assert!(matches!(
            load(&xlsx, &cache),
            Err(DataLoadError::UnsupportedFormat(ext)) if ext == "xlsx"
        ));
    }

    #[test]
    fn reload_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let raw = write(dir.path(), "raw.csv", RAW);
        let cache = dir.path().join("clean.csv");
        assert_eq!(load(&raw, &cache).unwrap(), load(&raw, &cache).unwrap());
    }

    fn write_parquet(path: &Path, columns: Vec<(&str, ArrayRef)>) {
        let batch = RecordBatch::try_from_iter(columns).unwrap();
        let file = File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn reads_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.parquet");

        write_parquet(
            &path,
            vec![
                ("Province", Arc::new(Int64Array::from(vec![Some(59), Some(10)])) as ArrayRef),
                ("Gender", Arc::new(Int64Array::from(vec![Some(2), None])) as ArrayRef),
                (
                    "Gen_health_state",
                    Arc::new(Float64Array::from(vec![Some(2.0), Some(1.0)])) as ArrayRef,
                ),
            ],
        );

        let ds = load(&path, &dir.path().join("clean.csv")).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(
            ds.records[0].get(schema::PROVINCE),
            &CellValue::Label("British Columbia".into())
        );
        assert_eq!(
            ds.records[0].get(schema::GEN_HEALTH_STATE),
            &CellValue::Label("Very good".into())
        );
    }

    #[test]
    fn parquet_unsigned_and_category_columns_are_cast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.parquet");
        let gender: DictionaryArray<Int32Type> = vec!["1", "2"].into_iter().collect();
        write_parquet(
            &path,
            vec![
                ("Province", Arc::new(UInt8Array::from(vec![35, 24])) as ArrayRef),
                ("Gender", Arc::new(gender) as ArrayRef),
                ("Gen_health_state", Arc::new(UInt8Array::from(vec![1, 5])) as ArrayRef),
            ],
        );

        let ds = load(&path, &dir.path().join("clean.csv")).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records[0].get(schema::PROVINCE), &CellValue::Label("Ontario".into()));
        assert_eq!(ds.records[1].get(schema::PROVINCE), &CellValue::Label("Quebec".into()));
        assert_eq!(ds.records[1].get(schema::GENDER), &CellValue::Label("Female".into()));
        assert_eq!(
            ds.records[1].get(schema::GEN_HEALTH_STATE),
            &CellValue::Label("Poor".into())
        );
    }

    #[test]
    fn parquet_unreadable_column_type_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.parquet");
        write_parquet(
            &path,
            vec![
                ("Province", Arc::new(Int64Array::from(vec![35])) as ArrayRef),
                ("Interview_date", Arc::new(Date32Array::from(vec![19000])) as ArrayRef),
            ],
        );

        let err = load(&path, &dir.path().join("clean.csv")).unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::UnsupportedColumnType { column, data_type: DataType::Date32 }
                if column == "Interview_date"
        ));
    }
}
