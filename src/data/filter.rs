use serde::{Deserialize, Serialize};

use super::model::{AgeEncoding, CellValue, Dataset};
use super::schema;
use crate::error::EngineError;

/// Selection value meaning "no filter" on a dimension.
pub const ALL: &str = "All";

// ---------------------------------------------------------------------------
// Constraint – what one filter dimension requires of a row
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Constraint {
    /// No filter on this dimension.
    #[default]
    Any,
    /// The column must hold exactly this label.
    Equals(String),
    /// The column must be numeric and within `[lo, hi]`.
    Range { lo: f64, hi: f64 },
}

impl Constraint {
    /// Interpret a dropdown selection: `"All"` (or nothing) is unconstrained.
    pub fn from_selection(selection: &str) -> Constraint {
        match selection.trim() {
            "" | ALL => Constraint::Any,
            label => Constraint::Equals(label.to_string()),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Constraint::Any)
    }

    /// Missing values only pass an unconstrained dimension.
    pub fn matches(&self, value: &CellValue) -> bool {
        match self {
            Constraint::Any => true,
            Constraint::Equals(label) => value.as_label() == Some(label.as_str()),
            Constraint::Range { lo, hi } => value
                .as_f64()
                .is_some_and(|v| *lo <= v && v <= *hi),
        }
    }
}

// ---------------------------------------------------------------------------
// Age brackets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeBracket {
    #[serde(rename = "12-19")]
    Youth,
    #[serde(rename = "20-34")]
    YoungAdult,
    #[serde(rename = "35-49")]
    Adult,
    #[serde(rename = "50-64")]
    MiddleAge,
    #[serde(rename = "65+")]
    Senior,
}

impl AgeBracket {
    pub const ALL: [AgeBracket; 5] = [
        AgeBracket::Youth,
        AgeBracket::YoungAdult,
        AgeBracket::Adult,
        AgeBracket::MiddleAge,
        AgeBracket::Senior,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgeBracket::Youth => "12-19",
            AgeBracket::YoungAdult => "20-34",
            AgeBracket::Adult => "35-49",
            AgeBracket::MiddleAge => "50-64",
            AgeBracket::Senior => "65+",
        }
    }

    /// Inclusive age range in years.
    pub fn years(self) -> (f64, f64) {
        match self {
            AgeBracket::Youth => (12.0, 19.0),
            AgeBracket::YoungAdult => (20.0, 34.0),
            AgeBracket::Adult => (35.0, 49.0),
            AgeBracket::MiddleAge => (50.0, 64.0),
            AgeBracket::Senior => (65.0, 200.0),
        }
    }

    /// The ordinal code used when ages are pre-binned.
    pub fn code(self) -> i64 {
        match self {
            AgeBracket::Youth => 1,
            AgeBracket::YoungAdult => 2,
            AgeBracket::Adult => 3,
            AgeBracket::MiddleAge => 4,
            AgeBracket::Senior => 5,
        }
    }

    pub fn from_label(label: &str) -> Option<AgeBracket> {
        AgeBracket::ALL.into_iter().find(|b| b.label() == label)
    }

    /// The row constraint for this bracket under the given age encoding.
    /// A coded bracket is the degenerate range `[code, code]`.
    pub fn constraint(self, encoding: AgeEncoding) -> Constraint {
        match encoding {
            AgeEncoding::Coded => {
                let code = self.code() as f64;
                Constraint::Range { lo: code, hi: code }
            }
            AgeEncoding::Years | AgeEncoding::Absent => {
                let (lo, hi) = self.years();
                Constraint::Range { lo, hi }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FilterSpec – the active selections
// ---------------------------------------------------------------------------

/// Every filter dimension the dashboard offers. `Default` filters nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub province: Constraint,
    pub age_group: Option<AgeBracket>,
    pub gender: Constraint,
    pub income: Constraint,
    pub immigrant: Constraint,
    pub aboriginal: Constraint,
}

impl FilterSpec {
    /// Build a spec from dropdown selections, where `"All"` means no filter.
    pub fn from_selections(
        province: &str,
        age_group: &str,
        gender: &str,
        income: &str,
        immigrant: &str,
        aboriginal: &str,
    ) -> Result<Self, EngineError> {
        let age_group = match age_group.trim() {
            "" | ALL => None,
            label => Some(
                AgeBracket::from_label(label)
                    .ok_or_else(|| EngineError::UnknownAgeGroup(label.to_string()))?,
            ),
        };
        Ok(FilterSpec {
            province: Constraint::from_selection(province),
            age_group,
            gender: Constraint::from_selection(gender),
            income: Constraint::from_selection(income),
            immigrant: Constraint::from_selection(immigrant),
            aboriginal: Constraint::from_selection(aboriginal),
        })
    }

    /// The active `(column, constraint)` pairs; unconstrained dimensions are
    /// left out.
    pub fn constraints(&self, encoding: AgeEncoding) -> Vec<(&'static str, Constraint)> {
        let age = self
            .age_group
            .map(|b| b.constraint(encoding))
            .unwrap_or_default();
        [
            (schema::PROVINCE, self.province.clone()),
            (schema::AGE, age),
            (schema::GENDER, self.gender.clone()),
            (schema::TOTAL_INCOME, self.income.clone()),
            (schema::IMMIGRANT, self.immigrant.clone()),
            (schema::ABORIGINAL_IDENTITY, self.aboriginal.clone()),
        ]
        .into_iter()
        .filter(|(_, c)| !c.is_any())
        .collect()
    }

    /// Label shown for the age filter, "All ages" when unconstrained.
    pub fn age_label(&self) -> &'static str {
        self.age_group.map(AgeBracket::label).unwrap_or("All ages")
    }
}

/// Return the rows of `dataset` that satisfy every active constraint.
pub fn apply(dataset: &Dataset, spec: &FilterSpec) -> Dataset {
    let constraints = spec.constraints(dataset.age_encoding);
    if constraints.is_empty() {
        return dataset.clone();
    }

    let records = dataset
        .records
        .iter()
        .filter(|r| constraints.iter().all(|(col, c)| c.matches(r.get(col))))
        .cloned()
        .collect();

    let filtered = dataset.derive(records);
    log::debug!(
        "filters {:?} kept {} of {} rows",
        constraints,
        filtered.len(),
        dataset.len()
    );
    filtered
}
