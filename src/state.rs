use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::data::aggregate::{aggregate, AggregateRequest, AggregatedView, Sampling};
use crate::data::filter::{apply, FilterSpec, ALL};
use crate::data::loader;
use crate::data::model::Dataset;
use crate::data::options::{discover, FilterOptions};
use crate::data::schema;
use crate::error::{DataLoadError, EngineError};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Outcome distribution by income level.
    Distribution,
    /// Mean health score by food security and immigrant status.
    CrossTab,
    /// Behavior against health utility, colored by income.
    Scatter,
}

/// Raw control values as the dashboard holds them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSelection {
    pub province: String,
    pub age_group: String,
    pub gender: String,
    pub income: String,
    pub immigrant: String,
    pub aboriginal: String,
    pub outcome_var: String,
    pub behavior_var: String,
}

/// The reset state: no filters, default outcome and behavior.
impl Default for ChartSelection {
    fn default() -> Self {
        ChartSelection {
            province: ALL.into(),
            age_group: ALL.into(),
            gender: ALL.into(),
            income: ALL.into(),
            immigrant: ALL.into(),
            aboriginal: ALL.into(),
            outcome_var: schema::DEFAULT_OUTCOME.into(),
            behavior_var: schema::DEFAULT_BEHAVIOR.into(),
        }
    }
}

impl ChartSelection {
    pub fn filter_spec(&self) -> Result<FilterSpec, EngineError> {
        FilterSpec::from_selections(
            &self.province,
            &self.age_group,
            &self.gender,
            &self.income,
            &self.immigrant,
            &self.aboriginal,
        )
    }

    pub fn request(&self, kind: ChartKind) -> AggregateRequest {
        match kind {
            ChartKind::Distribution => AggregateRequest::Distribution {
                outcome: self.outcome_var.clone(),
            },
            ChartKind::CrossTab => AggregateRequest::CrossTab {
                outcome: self.outcome_var.clone(),
            },
            ChartKind::Scatter => AggregateRequest::Scatter {
                behavior: self.behavior_var.clone(),
            },
        }
    }
}

/// What the presentation layer should show for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChartResponse {
    DataNotLoaded,
    NoData { message: String },
    Invalid { message: String },
    Chart {
        view: AggregatedView,
        respondents: usize,
        age_filter: String,
    },
}

// ---------------------------------------------------------------------------
// Dashboard snapshot
// ---------------------------------------------------------------------------

/// The loaded dataset and everything derived from it once at start-up.
///
/// Built once and shared read-only; every request filters a fresh copy.
#[derive(Debug, Clone)]
pub struct DashboardState {
    dataset: Arc<Dataset>,
    options: FilterOptions,
    sampling: Sampling,
    loaded: bool,
    status_message: String,
}

impl DashboardState {
    /// Load the dataset named by `settings`. A failed load still yields a
    /// state, one with no data and disabled controls.
    pub fn load(settings: &Settings) -> Self {
        let result = loader::load(&settings.raw_path, &settings.cache_path);
        Self::from_load_result(result, settings.sampling())
    }

    pub fn new(dataset: Dataset, sampling: Sampling) -> Self {
        let status_message = format!(
            "Data loaded successfully! {} records from {} variables",
            dataset.len(),
            dataset.column_names.len()
        );
        DashboardState {
            options: discover(&dataset),
            dataset: Arc::new(dataset),
            sampling,
            loaded: true,
            status_message,
        }
    }

    pub fn from_load_result(result: Result<Dataset, DataLoadError>, sampling: Sampling) -> Self {
        match result {
            Ok(dataset) => Self::new(dataset, sampling),
            Err(e) => {
                log::error!("data loading failed: {e}");
                DashboardState {
                    dataset: Arc::new(Dataset::empty()),
                    options: FilterOptions::default(),
                    sampling,
                    loaded: false,
                    status_message: format!("Data loading failed: {e}"),
                }
            }
        }
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// Whether the filter controls should accept input.
    pub fn controls_enabled(&self) -> bool {
        self.loaded
    }

    /// Filter, aggregate and package one chart.
    pub fn render(&self, selection: &ChartSelection, kind: ChartKind) -> ChartResponse {
        if !self.loaded {
            return ChartResponse::DataNotLoaded;
        }

        let spec = match selection.filter_spec() {
            Ok(spec) => spec,
            Err(e) => return e.into(),
        };
        let filtered = apply(&self.dataset, &spec);
        match aggregate(&filtered, &selection.request(kind), self.sampling) {
            Ok(view) => ChartResponse::Chart {
                respondents: view.respondents(),
                view,
                age_filter: spec.age_label().to_string(),
            },
            Err(e) => e.into(),
        }
    }
}

impl From<EngineError> for ChartResponse {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Empty { .. } => ChartResponse::NoData {
                message: "No data available. Try adjusting your filters.".into(),
            },
            other => ChartResponse::Invalid {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Record};

    fn label(s: &str) -> CellValue {
        CellValue::Label(s.to_string())
    }

    fn state() -> DashboardState {
        let rows = [
            ("Ontario", "Good", "Less than $20,000"),
            ("Quebec", "Poor", "$150,000 or more"),
        ]
        .into_iter()
        .map(|(province, health, income)| {
            Record::from_iter([
                (schema::PROVINCE, label(province)),
                (schema::GEN_HEALTH_STATE, label(health)),
                (schema::TOTAL_INCOME, label(income)),
            ])
        })
        .collect();
        let columns = [schema::PROVINCE, schema::GEN_HEALTH_STATE, schema::TOTAL_INCOME]
            .map(String::from)
            .to_vec();
        DashboardState::new(Dataset::from_records(columns, rows), Sampling::default())
    }

    #[test]
    fn default_selection_is_the_reset_state() {
        let s = ChartSelection::default();
        assert_eq!(s.province, "All");
        assert_eq!(s.outcome_var, "Gen_health_state");
        assert_eq!(s.behavior_var, "Total_physical_act_time");
        assert_eq!(s.filter_spec(), Ok(FilterSpec::default()));
    }

    #[test]
    fn renders_a_distribution() {
        let st = state();
        assert!(st.controls_enabled());
        assert_eq!(st.status_message(), "Data loaded successfully! 2 records from 3 variables");

        let selection = ChartSelection {
            province: "Ontario".into(),
            ..ChartSelection::default()
        };
        match st.render(&selection, ChartKind::Distribution) {
            ChartResponse::Chart {
                respondents,
                age_filter,
                ..
            } => {
                assert_eq!(respondents, 1);
                assert_eq!(age_filter, "All ages");
            }
            other => panic!("unexpected response {other:?}"),
        }
        assert_eq!(st.dataset().len(), 2);
    }

    #[test]
    fn no_match_is_reported_as_no_data() {
        let selection = ChartSelection {
            province: "Yukon".into(),
            ..ChartSelection::default()
        };
        assert!(matches!(
            state().render(&selection, ChartKind::Distribution),
            ChartResponse::NoData { .. }
        ));
    }

    #[test]
    fn bad_variables_are_invalid_requests() {
        let selection = ChartSelection {
            behavior_var: "Province".into(),
            ..ChartSelection::default()
        };
        assert!(matches!(
            state().render(&selection, ChartKind::Scatter),
            ChartResponse::Invalid { .. }
        ));
    }

    #[test]
    fn failed_load_disables_controls() {
        let st = DashboardState::from_load_result(
            Err(DataLoadError::MissingColumn("Province".into())),
            Sampling::default(),
        );
        assert!(!st.controls_enabled());
        assert!(st.dataset().is_empty());
        assert_eq!(st.options(), &FilterOptions::default());
        assert!(st.status_message().starts_with("Data loading failed"));
        assert_eq!(
            st.render(&ChartSelection::default(), ChartKind::Distribution),
            ChartResponse::DataNotLoaded
        );
    }
}
