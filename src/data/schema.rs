use serde::Serialize;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

pub const PROVINCE: &str = "Province";
pub const GENDER: &str = "Gender";
pub const AGE: &str = "Age";
pub const GEN_HEALTH_STATE: &str = "Gen_health_state";
pub const MENTAL_HEALTH_STATE: &str = "Mental_health_state";
pub const STRESS_LEVEL: &str = "Stress_level";
pub const WORK_STRESS: &str = "Work_stress";
pub const TOTAL_INCOME: &str = "Total_income";
pub const IMMIGRANT: &str = "Immigrant";
pub const ABORIGINAL_IDENTITY: &str = "Aboriginal_identity";
pub const FOOD_SECURITY: &str = "Food_security";
pub const SENSE_BELONGING: &str = "Sense_belonging";
pub const HEALTH_UTILITY_INDEX: &str = "Health_utility_index";
pub const LIFE_SATISFACTION: &str = "Life_satisfaction";
pub const TOTAL_PHYSICAL_ACT_TIME: &str = "Total_physical_act_time";
pub const PHYSICAL_VIGOROUS_ACT_TIME: &str = "Physical_vigorous_act_time";
pub const FRUIT_VEG_CON: &str = "Fruit_veg_con";
pub const WORK_HOURS: &str = "Work_hours";

/// Rows missing any of these are dropped at load time.
pub const REQUIRED_COLUMNS: &[&str] = &[PROVINCE, GENDER, GEN_HEALTH_STATE];

/// Names the health utility index has been exported under, most likely first.
pub const HEALTH_UTILITY_ALIASES: &[&str] = &[
    "Health_utility_indx",
    "HUI",
    "hui",
    "HUI_index",
    "hui_index",
    "HUI3",
    "hui3",
    "Health_utility",
    "health_utility",
    "HealthUtilityIndex",
    "healthutilityindex",
    "Health_Utility_Index",
    "health_utility_index",
    "Health utility index",
    "health utility index",
    "Utility_index",
    "utility_index",
];

pub const DEFAULT_OUTCOME: &str = GEN_HEALTH_STATE;
pub const DEFAULT_BEHAVIOR: &str = TOTAL_PHYSICAL_ACT_TIME;

// ---------------------------------------------------------------------------
// Ordered scales
// ---------------------------------------------------------------------------

/// A categorical field whose labels have a meaningful non-lexical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    /// Excellent → Poor.
    Health,
    /// Not at all stressful → Extremely stressful.
    Stress,
    /// Lowest bracket → highest bracket.
    Income,
    /// Food secure → Severely food insecure.
    FoodSecurity,
}

pub const HEALTH_ORDER: &[&str] = &["Excellent", "Very good", "Good", "Fair", "Poor"];

pub const STRESS_ORDER: &[&str] = &[
    "Not at all stressful",
    "Not very stressful",
    "A bit stressful",
    "Quite a bit stressful",
    "Extremely stressful",
];

pub const INCOME_ORDER: &[&str] = &[
    "Less than $20,000",
    "$20,000 to $39,999",
    "$40,000 to $59,999",
    "$60,000 to $79,999",
    "$80,000 to $99,999",
    "$100,000 to $149,999",
    "$150,000 or more",
];

pub const FOOD_SECURITY_ORDER: &[&str] = &[
    "Food secure",
    "Moderately food insecure",
    "Severely food insecure",
];

impl Scale {
    pub fn order(self) -> &'static [&'static str] {
        match self {
            Scale::Health => HEALTH_ORDER,
            Scale::Stress => STRESS_ORDER,
            Scale::Income => INCOME_ORDER,
            Scale::FoodSecurity => FOOD_SECURITY_ORDER,
        }
    }

    /// 1-based rank of `label` on this scale.
    pub fn score(self, label: &str) -> Option<u8> {
        self.order()
            .iter()
            .position(|l| *l == label)
            .map(|i| i as u8 + 1)
    }

    /// The scale a column is measured on, if any.
    pub fn for_column(column: &str) -> Option<Scale> {
        match column {
            GEN_HEALTH_STATE | MENTAL_HEALTH_STATE => Some(Scale::Health),
            STRESS_LEVEL | WORK_STRESS => Some(Scale::Stress),
            TOTAL_INCOME => Some(Scale::Income),
            FOOD_SECURITY => Some(Scale::FoodSecurity),
            _ => None,
        }
    }
}

/// Sort labels by the column's canonical order when it has one, lexically
/// otherwise. Labels unknown to the scale sort after the known ones.
pub fn sort_by_canonical_order(column: &str, labels: &mut [String]) {
    match Scale::for_column(column) {
        Some(scale) => labels.sort_by(|a, b| {
            let rank = |l: &str| scale.score(l).unwrap_or(u8::MAX);
            rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
        }),
        None => labels.sort(),
    }
}

// ---------------------------------------------------------------------------
// Curated variables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableRole {
    Outcome,
    Behavior,
}

impl VariableRole {
    fn name(self) -> &'static str {
        match self {
            VariableRole::Outcome => "outcome",
            VariableRole::Behavior => "behavior",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableDef {
    pub column: &'static str,
    pub role: VariableRole,
}

/// The only columns the dashboard offers as chart outcomes and behaviors.
pub const VARIABLES: &[VariableDef] = &[
    VariableDef { column: GEN_HEALTH_STATE, role: VariableRole::Outcome },
    VariableDef { column: MENTAL_HEALTH_STATE, role: VariableRole::Outcome },
    VariableDef { column: STRESS_LEVEL, role: VariableRole::Outcome },
    VariableDef { column: HEALTH_UTILITY_INDEX, role: VariableRole::Outcome },
    VariableDef { column: LIFE_SATISFACTION, role: VariableRole::Outcome },
    VariableDef { column: TOTAL_PHYSICAL_ACT_TIME, role: VariableRole::Behavior },
    VariableDef { column: PHYSICAL_VIGOROUS_ACT_TIME, role: VariableRole::Behavior },
    VariableDef { column: FRUIT_VEG_CON, role: VariableRole::Behavior },
    VariableDef { column: WORK_HOURS, role: VariableRole::Behavior },
];

impl VariableDef {
    /// The ordered scale this variable is measured on, if categorical.
    pub fn scale(&self) -> Option<Scale> {
        Scale::for_column(self.column)
    }
}

pub fn variables(role: VariableRole) -> impl Iterator<Item = &'static VariableDef> {
    VARIABLES.iter().filter(move |v| v.role == role)
}

/// Resolve a requested variable name against the whitelist.
pub fn lookup(name: &str, role: VariableRole) -> Result<&'static VariableDef, EngineError> {
    variables(role)
        .find(|v| v.column == name)
        .ok_or_else(|| EngineError::UnknownVariable(name.to_string(), role.name()))
}

/// `"Gen_health_state"` → `"Gen Health State"`.
pub fn display_title(column: &str) -> String {
    column
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_scores_run_excellent_to_poor() {
        assert_eq!(Scale::Health.score("Excellent"), Some(1));
        assert_eq!(Scale::Health.score("Poor"), Some(5));
        assert_eq!(Scale::Health.score("Okay"), None);
    }

    #[test]
    fn income_sorts_by_bracket_not_lexically() {
        let mut labels = vec![
            "$150,000 or more".to_string(),
            "Less than $20,000".to_string(),
            "$20,000 to $39,999".to_string(),
        ];
        sort_by_canonical_order(TOTAL_INCOME, &mut labels);
        assert_eq!(
            labels,
            ["Less than $20,000", "$20,000 to $39,999", "$150,000 or more"]
        );
    }

    #[test]
    fn unknown_labels_sort_after_known_ones() {
        let mut labels = vec!["Unsure".to_string(), "Poor".to_string(), "Good".to_string()];
        sort_by_canonical_order(GEN_HEALTH_STATE, &mut labels);
        assert_eq!(labels, ["Good", "Poor", "Unsure"]);
    }

    #[test]
    fn lookup_rejects_variables_outside_the_whitelist() {
        assert!(lookup(GEN_HEALTH_STATE, VariableRole::Outcome).is_ok());
        assert_eq!(
            lookup(GEN_HEALTH_STATE, VariableRole::Behavior),
            Err(EngineError::UnknownVariable(GEN_HEALTH_STATE.into(), "behavior"))
        );
        assert!(lookup("Province", VariableRole::Outcome).is_err());
    }

    #[test]
    fn display_title_capitalizes_words() {
        assert_eq!(display_title("Gen_health_state"), "Gen Health State");
        assert_eq!(display_title("HUI"), "Hui");
    }
}
