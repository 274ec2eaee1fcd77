//! Write a synthetic, integer-coded survey file for trying the pipeline
//! without the real dataset.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Parser, Debug)]
#[command(name = "generate_sample", about = "Generate a synthetic coded survey file")]
struct Args {
    /// Number of respondents.
    #[arg(long, default_value_t = 8000)]
    rows: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Store age as bracket codes 1-5 instead of years.
    #[arg(long)]
    coded_age: bool,

    /// Output path; `.csv` or `.parquet`.
    #[arg(long, default_value = "data/raw/health_dataset.csv")]
    output: PathBuf,
}

const PROVINCE_CODES: &[i64] = &[10, 11, 12, 13, 24, 35, 46, 47, 48, 59, 60, 61, 62];

/// Share of categorical answers recorded as "not stated" (code 9).
const NOT_STATED_RATE: f64 = 0.03;

enum Column {
    Codes(Vec<Option<i64>>),
    Measures(Vec<Option<f64>>),
}

impl Column {
    fn cell(&self, row: usize) -> String {
        match self {
            Column::Codes(v) => v[row].map(|c| c.to_string()).unwrap_or_default(),
            Column::Measures(v) => v[row].map(|m| format!("{m:.3}")).unwrap_or_default(),
        }
    }

    fn to_arrow(&self) -> (DataType, ArrayRef) {
        match self {
            Column::Codes(v) => {
                let array: ArrayRef = Arc::new(Int64Array::from(v.clone()));
                (DataType::Int64, array)
            }
            Column::Measures(v) => {
                let array: ArrayRef = Arc::new(Float64Array::from(v.clone()));
                (DataType::Float64, array)
            }
        }
    }
}

struct Generator {
    rng: StdRng,
}

impl Generator {
    /// A code in `1..=levels`, skewed toward `center`, occasionally not stated.
    fn scale(&mut self, levels: i64, center: f64) -> Option<i64> {
        if self.rng.gen_bool(NOT_STATED_RATE) {
            return Some(9);
        }
        let jitter: f64 = self.rng.gen_range(-1.5..1.5);
        Some((center + jitter).round().clamp(1.0, levels as f64) as i64)
    }

    fn yes_no(&mut self, p_yes: f64) -> Option<i64> {
        Some(if self.rng.gen_bool(p_yes) { 1 } else { 2 })
    }

    fn maybe<T>(&mut self, p_missing: f64, value: T) -> Option<T> {
        if self.rng.gen_bool(p_missing) {
            None
        } else {
            Some(value)
        }
    }
}

fn age_code(age: i64) -> i64 {
    match age {
        ..=19 => 1,
        20..=34 => 2,
        35..=49 => 3,
        50..=64 => 4,
        _ => 5,
    }
}

fn generate(args: &Args) -> Vec<(&'static str, Column)> {
    let mut g = Generator {
        rng: StdRng::seed_from_u64(args.seed),
    };
    let n = args.rows;

    let mut province = Vec::with_capacity(n);
    let mut gender = Vec::with_capacity(n);
    let mut age = Vec::with_capacity(n);
    let mut gen_health = Vec::with_capacity(n);
    let mut mental_health = Vec::with_capacity(n);
    let mut stress = Vec::with_capacity(n);
    let mut income = Vec::with_capacity(n);
    let mut immigrant = Vec::with_capacity(n);
    let mut aboriginal = Vec::with_capacity(n);
    let mut food = Vec::with_capacity(n);
    let mut belonging = Vec::with_capacity(n);
    let mut high_bp = Vec::with_capacity(n);
    let mut diabetic = Vec::with_capacity(n);
    let mut activity = Vec::with_capacity(n);
    let mut vigorous = Vec::with_capacity(n);
    let mut fruit_veg = Vec::with_capacity(n);
    let mut work_hours = Vec::with_capacity(n);
    let mut life_sat = Vec::with_capacity(n);
    let mut hui = Vec::with_capacity(n);

    for _ in 0..n {
        let years: i64 = g.rng.gen_range(12..=85);
        let income_code: i64 = g.rng.gen_range(1..=7);
        // Poorer respondents report worse health on average.
        let health_center = 3.8 - 0.3 * income_code as f64;
        let minutes: f64 = g.rng.gen_range(0.0..900.0);

        let province_idx = g.rng.gen_range(0..PROVINCE_CODES.len());
        province.push(Some(PROVINCE_CODES[province_idx]));
        gender.push(g.scale(2, 1.5));
        age.push(Some(if args.coded_age { age_code(years) } else { years }));
        gen_health.push(g.scale(5, health_center));
        mental_health.push(g.scale(5, health_center - 0.3));
        stress.push(g.scale(5, 2.8));
        income.push(g.maybe(0.05, income_code));
        immigrant.push(g.yes_no(0.25));
        aboriginal.push(g.yes_no(0.05));
        food.push(g.scale(3, 1.0 + 0.2 * (7 - income_code) as f64 / 3.0));
        belonging.push(g.scale(4, 2.0));
        high_bp.push(g.yes_no((years as f64 / 150.0).min(0.6)));
        diabetic.push(g.yes_no((years as f64 / 400.0).min(0.2)));
        let vigorous_share: f64 = g.rng.gen_range(0.0..0.5);
        let servings: f64 = g.rng.gen_range(0.0..10.0);
        let hours: f64 = g.rng.gen_range(0.0..60.0);
        let satisfaction: i64 = g.rng.gen_range(0..=10);
        let noise: f64 = g.rng.gen_range(-0.15..0.15);
        let utility = (0.55 + minutes / 3000.0 + noise).clamp(0.0, 1.0);

        activity.push(g.maybe(0.1, minutes));
        vigorous.push(g.maybe(0.1, minutes * vigorous_share));
        fruit_veg.push(g.maybe(0.05, servings));
        work_hours.push(g.maybe(0.3, hours));
        life_sat.push(g.maybe(0.02, satisfaction));
        hui.push(g.maybe(0.08, utility));
    }

    vec![
        ("Province", Column::Codes(province)),
        ("Gender", Column::Codes(gender)),
        ("Age", Column::Codes(age)),
        ("Gen_health_state", Column::Codes(gen_health)),
        ("Mental_health_state", Column::Codes(mental_health)),
        ("Stress_level", Column::Codes(stress)),
        ("Total_income", Column::Codes(income)),
        ("Immigrant", Column::Codes(immigrant)),
        ("Aboriginal_identity", Column::Codes(aboriginal)),
        ("Food_security", Column::Codes(food)),
        ("Sense_belonging", Column::Codes(belonging)),
        ("High_BP", Column::Codes(high_bp)),
        ("Diabetic", Column::Codes(diabetic)),
        ("Total_physical_act_time", Column::Measures(activity)),
        ("Physical_vigorous_act_time", Column::Measures(vigorous)),
        ("Fruit_veg_con", Column::Measures(fruit_veg)),
        ("Work_hours", Column::Measures(work_hours)),
        ("Life_satisfaction", Column::Codes(life_sat)),
        // Exported under an alias, as some survey extracts are.
        ("HUI3", Column::Measures(hui)),
    ]
}

fn write_csv(path: &Path, columns: &[(&str, Column)], rows: usize) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    writer.write_record(columns.iter().map(|(name, _)| *name))?;
    for row in 0..rows {
        writer.write_record(columns.iter().map(|(_, col)| col.cell(row)))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, columns: &[(&str, Column)]) -> Result<()> {
    let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = columns
        .iter()
        .map(|(name, col)| {
            let (data_type, array) = col.to_arrow();
            (Field::new(*name, data_type, true), array)
        })
        .unzip();
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = std::fs::File::create(path).context("creating Parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let columns = generate(&args);

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let ext = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "csv" => write_csv(&args.output, &columns, args.rows)?,
        "parquet" | "pq" => write_parquet(&args.output, &columns)?,
        other => bail!("Unsupported output extension: .{other}"),
    }

    println!(
        "Wrote {} respondents ({} columns) to {}",
        args.rows,
        columns.len(),
        args.output.display()
    );
    Ok(())
}
