use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use super::model::{CellValue, Dataset, Record};
use super::schema::{self, Scale, VariableRole};
use crate::error::{EmptyStage, EngineError};

// ---------------------------------------------------------------------------
// Requests and views
// ---------------------------------------------------------------------------

/// Which grouped table to build from a filtered dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateRequest {
    /// Respondent counts per (outcome, income) pair.
    Distribution { outcome: String },
    /// Mean outcome score per (food security, immigrant status) pair.
    CrossTab { outcome: String },
    /// Behavior against health utility, one point per respondent.
    Scatter { behavior: String },
}

/// Bounds the number of scatter points handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampling {
    pub ceiling: usize,
    pub seed: u64,
}

impl Default for Sampling {
    fn default() -> Self {
        Sampling {
            ceiling: 5000,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregatedView {
    Distribution(Distribution),
    CrossTab(CrossTab),
    Scatter(Scatter),
}

impl AggregatedView {
    /// Respondents behind the view, after dropping missing values.
    pub fn respondents(&self) -> usize {
        match self {
            AggregatedView::Distribution(d) => d.total,
            AggregatedView::CrossTab(c) => c.total,
            AggregatedView::Scatter(s) => s.total,
        }
    }
}

/// One group of a grouped count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub keys: Vec<CellValue>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionRow {
    pub outcome: String,
    pub income: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub outcome_var: String,
    /// Outcome axis order: severity order for known scales, else by count.
    pub outcome_order: Vec<String>,
    /// Income legend order, lowest bracket first.
    pub income_order: Vec<String>,
    pub rows: Vec<DistributionRow>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTabRow {
    pub food_security: String,
    pub immigrant: String,
    pub mean_score: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTab {
    pub outcome_var: String,
    pub rows: Vec<CrossTabRow>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub income: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scatter {
    pub x_var: String,
    pub y_var: String,
    pub points: Vec<ScatterPoint>,
    /// Usable rows before sampling.
    pub total: usize,
    pub sampled: bool,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Build the requested view. Variable names are checked against the
/// curated whitelist before any data is touched.
pub fn aggregate(
    dataset: &Dataset,
    request: &AggregateRequest,
    sampling: Sampling,
) -> Result<AggregatedView, EngineError> {
    match request {
        AggregateRequest::Distribution { outcome } => {
            distribution(dataset, outcome).map(AggregatedView::Distribution)
        }
        AggregateRequest::CrossTab { outcome } => {
            cross_tab(dataset, outcome).map(AggregatedView::CrossTab)
        }
        AggregateRequest::Scatter { behavior } => {
            scatter(dataset, behavior, sampling).map(AggregatedView::Scatter)
        }
    }
}

fn ensure_rows(dataset: &Dataset) -> Result<(), EngineError> {
    if dataset.is_empty() {
        return Err(EngineError::Empty {
            stage: EmptyStage::Filter,
        });
    }
    Ok(())
}

fn ensure_kept<T>(kept: &[T]) -> Result<(), EngineError> {
    if kept.is_empty() {
        return Err(EngineError::Empty {
            stage: EmptyStage::MissingValues,
        });
    }
    Ok(())
}

/// Count rows per distinct combination of `columns`, skipping rows where
/// any of them is missing. Groups come back in key order.
pub fn count_by(dataset: &Dataset, columns: &[&str]) -> Result<Vec<GroupCount>, EngineError> {
    ensure_rows(dataset)?;

    let mut groups: BTreeMap<Vec<CellValue>, usize> = BTreeMap::new();
    for record in &dataset.records {
        let keys: Vec<CellValue> = columns.iter().map(|c| group_key(record.get(c))).collect();
        if keys.iter().any(CellValue::is_null) {
            continue;
        }
        *groups.entry(keys).or_default() += 1;
    }

    let groups: Vec<GroupCount> = groups
        .into_iter()
        .map(|(keys, count)| GroupCount { keys, count })
        .collect();
    ensure_kept(&groups)?;
    Ok(groups)
}

/// Integral floats group with the equal integer, since both display the same.
fn group_key(value: &CellValue) -> CellValue {
    match value {
        CellValue::Float(_) => value
            .as_code()
            .map(CellValue::Integer)
            .unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

pub fn distribution(dataset: &Dataset, outcome: &str) -> Result<Distribution, EngineError> {
    let var = schema::lookup(outcome, VariableRole::Outcome)?;
    let groups = count_by(dataset, &[var.column, schema::TOTAL_INCOME])?;
    let total: usize = groups.iter().map(|g| g.count).sum();

    let mut totals: BTreeMap<String, usize> = BTreeMap::new();
    let mut incomes: Vec<String> = Vec::new();
    let mut rows: Vec<DistributionRow> = Vec::with_capacity(groups.len());
    for group in groups {
        let label = group.keys[0].to_string();
        let income = group.keys[1].to_string();
        *totals.entry(label.clone()).or_default() += group.count;
        if !incomes.contains(&income) {
            incomes.push(income.clone());
        }
        rows.push(DistributionRow {
            outcome: label,
            income,
            count: group.count,
        });
    }

    let outcome_order = match var.scale() {
        Some(scale @ (Scale::Health | Scale::Stress)) => {
            let mut present: Vec<String> = totals.into_keys().collect();
            present.sort_by_key(|l| scale.score(l).unwrap_or(u8::MAX));
            present
        }
        _ => {
            let mut by_count: Vec<(String, usize)> = totals.into_iter().collect();
            by_count.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            by_count.into_iter().map(|(label, _)| label).collect()
        }
    };
    schema::sort_by_canonical_order(schema::TOTAL_INCOME, &mut incomes);

    fn position(order: &[String], label: &str) -> Option<usize> {
        order.iter().position(|l| l == label)
    }
    rows.sort_by_key(|r| {
        (
            position(&outcome_order, &r.outcome),
            position(&incomes, &r.income),
        )
    });

    log::debug!(
        "distribution of {outcome}: {} groups over {total} respondents",
        rows.len()
    );
    Ok(Distribution {
        outcome_var: var.column.to_string(),
        outcome_order,
        income_order: incomes,
        rows,
        total,
    })
}

// ---------------------------------------------------------------------------
// Cross-tabulated mean
// ---------------------------------------------------------------------------

pub fn cross_tab(dataset: &Dataset, outcome: &str) -> Result<CrossTab, EngineError> {
    let var = schema::lookup(outcome, VariableRole::Outcome)?;
    if var.scale() != Some(Scale::Health) {
        return Err(EngineError::NotAScale(outcome.to_string()));
    }
    ensure_rows(dataset)?;

    // (sum of scores, respondents) per group.
    let mut groups: BTreeMap<(String, String), (u64, usize)> = BTreeMap::new();
    for record in &dataset.records {
        let food = record.get(schema::FOOD_SECURITY).as_label();
        let score = record
            .get(var.column)
            .as_label()
            .and_then(|l| Scale::Health.score(l));
        let immigrant = record.get(schema::IMMIGRANT).as_label();
        if let (Some(food), Some(score), Some(immigrant)) = (food, score, immigrant) {
            let entry = groups
                .entry((food.to_string(), immigrant.to_string()))
                .or_default();
            entry.0 += u64::from(score);
            entry.1 += 1;
        }
    }

    let mut rows: Vec<CrossTabRow> = groups
        .into_iter()
        .map(|((food_security, immigrant), (sum, count))| CrossTabRow {
            food_security,
            immigrant,
            mean_score: sum as f64 / count as f64,
            count,
        })
        .collect();
    ensure_kept(&rows)?;

    rows.sort_by_key(|r| {
        (
            Scale::FoodSecurity
                .score(&r.food_security)
                .unwrap_or(u8::MAX),
            r.immigrant.clone(),
        )
    });
    let total: usize = rows.iter().map(|r| r.count).sum();
    Ok(CrossTab {
        outcome_var: var.column.to_string(),
        rows,
        total,
    })
}

// ---------------------------------------------------------------------------
// Scatter sample
// ---------------------------------------------------------------------------

pub fn scatter(
    dataset: &Dataset,
    behavior: &str,
    sampling: Sampling,
) -> Result<Scatter, EngineError> {
    let var = schema::lookup(behavior, VariableRole::Behavior)?;
    ensure_rows(dataset)?;

    let point = |r: &Record| -> Option<ScatterPoint> {
        Some(ScatterPoint {
            x: r.get(var.column).as_f64()?,
            y: r.get(schema::HEALTH_UTILITY_INDEX).as_f64()?,
            income: r.get(schema::TOTAL_INCOME).as_label()?.to_string(),
        })
    };
    let points: Vec<ScatterPoint> = dataset.records.iter().filter_map(point).collect();
    ensure_kept(&points)?;

    let total = points.len();
    let points = sample(points, sampling);
    let sampled = points.len() < total;
    if sampled {
        log::debug!("sampled {} of {total} scatter points", points.len());
    }
    Ok(Scatter {
        x_var: var.column.to_string(),
        y_var: schema::HEALTH_UTILITY_INDEX.to_string(),
        points,
        total,
        sampled,
    })
}

/// Keep exactly `ceiling` items, chosen with a seeded RNG, in their
/// original relative order. Shorter inputs pass through untouched.
pub fn sample<T>(items: Vec<T>, sampling: Sampling) -> Vec<T> {
    if items.len() <= sampling.ceiling {
        return items;
    }
    let mut rng = StdRng::seed_from_u64(sampling.seed);
    let mut keep = rand::seq::index::sample(&mut rng, items.len(), sampling.ceiling).into_vec();
    keep.sort_unstable();

    let mut keep = keep.into_iter().peekable();
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| {
            if keep.peek() == Some(&i) {
                keep.next();
                Some(item)
            } else {
                None
            }
        })
        .collect()
}
