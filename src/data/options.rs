use serde::Serialize;

use super::filter::{AgeBracket, ALL};
use super::model::Dataset;
use super::schema::{self, VariableRole};

/// Age bounds reported when the Age column exists but holds no values.
const FALLBACK_AGE_RANGE: (i64, i64) = (12, 80);

/// A selectable variable: the column it reads and its display title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableOption {
    pub value: String,
    pub label: String,
}

/// The choices that populate the dashboard's controls.
///
/// Label lists start with `"All"`. A `None` list means the column is absent
/// from the dataset and the control should stay disabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub provinces: Option<Vec<String>>,
    pub genders: Option<Vec<String>>,
    pub incomes: Option<Vec<String>>,
    pub immigrant: Option<Vec<String>>,
    pub aboriginal: Option<Vec<String>>,
    pub age_groups: Vec<String>,
    pub age_range: Option<(i64, i64)>,
    pub outcome_vars: Vec<VariableOption>,
    pub behavior_vars: Vec<VariableOption>,
}

/// Collect the filter choices present in `dataset`.
pub fn discover(dataset: &Dataset) -> FilterOptions {
    FilterOptions {
        provinces: labels(dataset, schema::PROVINCE),
        genders: labels(dataset, schema::GENDER),
        incomes: labels(dataset, schema::TOTAL_INCOME),
        immigrant: labels(dataset, schema::IMMIGRANT),
        aboriginal: labels(dataset, schema::ABORIGINAL_IDENTITY),
        age_groups: std::iter::once(ALL)
            .chain(AgeBracket::ALL.iter().map(|b| b.label()))
            .map(String::from)
            .collect(),
        age_range: age_range(dataset),
        outcome_vars: variable_options(VariableRole::Outcome),
        behavior_vars: variable_options(VariableRole::Behavior),
    }
}

/// `"All"` followed by the column's distinct labels in display order.
fn labels(dataset: &Dataset, column: &str) -> Option<Vec<String>> {
    if !dataset.has_column(column) {
        return None;
    }
    let mut found: Vec<String> = dataset
        .unique_values(column)
        .into_iter()
        .filter_map(|v| v.as_label().map(str::to_string))
        .collect();
    schema::sort_by_canonical_order(column, &mut found);

    let mut out = Vec::with_capacity(found.len() + 1);
    out.push(ALL.to_string());
    out.extend(found);
    Some(out)
}

fn age_range(dataset: &Dataset) -> Option<(i64, i64)> {
    if !dataset.has_column(schema::AGE) {
        return None;
    }
    let ages: Vec<f64> = dataset
        .records
        .iter()
        .filter_map(|r| r.get(schema::AGE).as_f64())
        .collect();
    let min = ages.iter().copied().reduce(f64::min);
    let max = ages.iter().copied().reduce(f64::max);
    match (min, max) {
        (Some(lo), Some(hi)) => Some((lo as i64, hi as i64)),
        _ => Some(FALLBACK_AGE_RANGE),
    }
}

fn variable_options(role: VariableRole) -> Vec<VariableOption> {
    schema::variables(role)
        .map(|v| VariableOption {
            value: v.column.to_string(),
            label: schema::display_title(v.column),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Record};

    fn dataset(columns: &[&str], rows: Vec<Record>) -> Dataset {
        Dataset::from_records(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    #[test]
    fn absent_columns_yield_no_options() {
        let ds = dataset(&[], Vec::new());
        let opts = discover(&ds);
        assert_eq!(opts.provinces, None);
        assert_eq!(opts.age_range, None);
        assert_eq!(opts.outcome_vars.len(), 5);
        assert_eq!(opts.behavior_vars.len(), 4);
        assert_eq!(opts.age_groups[0], "All");
        assert_eq!(opts.age_groups.len(), 6);
    }

    #[test]
    fn labels_are_sorted_and_deduplicated() {
        let rows = ["Quebec", "Alberta", "Quebec"]
            .iter()
            .map(|p| Record::from_iter([(schema::PROVINCE, CellValue::Label(p.to_string()))]))
            .chain([Record::from_iter([(schema::PROVINCE, CellValue::Null)])])
            .collect();
        let opts = discover(&dataset(&[schema::PROVINCE], rows));
        assert_eq!(
            opts.provinces,
            Some(vec!["All".to_string(), "Alberta".into(), "Quebec".into()])
        );
    }

    #[test]
    fn age_range_spans_observed_values() {
        let rows = [CellValue::Integer(18), CellValue::Float(64.5), CellValue::Null]
            .into_iter()
            .map(|a| Record::from_iter([(schema::AGE, a)]))
            .collect();
        assert_eq!(discover(&dataset(&[schema::AGE], rows)).age_range, Some((18, 64)));
    }

    #[test]
    fn empty_age_column_falls_back() {
        let rows = vec![Record::from_iter([(schema::AGE, CellValue::Null)])];
        assert_eq!(
            discover(&dataset(&[schema::AGE], rows)).age_range,
            Some(FALLBACK_AGE_RANGE)
        );
    }

    #[test]
    fn variable_labels_are_titled() {
        let opts = discover(&Dataset::empty());
        assert_eq!(
            opts.outcome_vars[0],
            VariableOption {
                value: "Gen_health_state".into(),
                label: "Gen Health State".into(),
            }
        );
    }
}
