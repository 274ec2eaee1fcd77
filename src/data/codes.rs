use super::model::CellValue;
use super::schema::{self, FOOD_SECURITY_ORDER, HEALTH_ORDER, INCOME_ORDER, STRESS_ORDER};

// ---------------------------------------------------------------------------
// CodeMap – integer code → label for one categorical column
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Entries {
    /// Code `n` is `labels[n - 1]`.
    Sequential(&'static [&'static str]),
    Explicit(&'static [(i64, &'static str)]),
}

/// Static lookup table decoding one categorical column.
#[derive(Debug, Clone, Copy)]
pub struct CodeMap {
    pub column: &'static str,
    entries: Entries,
}

impl CodeMap {
    const fn sequential(column: &'static str, labels: &'static [&'static str]) -> Self {
        CodeMap {
            column,
            entries: Entries::Sequential(labels),
        }
    }

    const fn explicit(column: &'static str, pairs: &'static [(i64, &'static str)]) -> Self {
        CodeMap {
            column,
            entries: Entries::Explicit(pairs),
        }
    }

    pub fn label(&self, code: i64) -> Option<&'static str> {
        match self.entries {
            Entries::Sequential(labels) => usize::try_from(code)
                .ok()
                .and_then(|c| c.checked_sub(1))
                .and_then(|i| labels.get(i))
                .copied(),
            Entries::Explicit(pairs) => pairs
                .iter()
                .find(|(c, _)| *c == code)
                .map(|(_, l)| *l),
        }
    }

    /// Every label this map can produce.
    pub fn labels(&self) -> Vec<&'static str> {
        match self.entries {
            Entries::Sequential(labels) => labels.to_vec(),
            Entries::Explicit(pairs) => pairs.iter().map(|(_, l)| *l).collect(),
        }
    }

    /// Decode a raw cell. Anything that is not a known code becomes `Null`.
    pub fn decode(&self, value: &CellValue) -> CellValue {
        value
            .as_code()
            .and_then(|code| self.label(code))
            .map(|label| CellValue::Label(label.to_string()))
            .unwrap_or(CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

const PROVINCES: &[(i64, &str)] = &[
    (10, "Newfoundland and Labrador"),
    (11, "Prince Edward Island"),
    (12, "Nova Scotia"),
    (13, "New Brunswick"),
    (24, "Quebec"),
    (35, "Ontario"),
    (46, "Manitoba"),
    (47, "Saskatchewan"),
    (48, "Alberta"),
    (59, "British Columbia"),
    (60, "Yukon"),
    (61, "Northwest Territories"),
    (62, "Nunavut"),
];

const GENDERS: &[&str] = &["Male", "Female"];
const YES_NO: &[&str] = &["Yes", "No"];
const BELONGING: &[&str] = &["Very strong", "Somewhat strong", "Somewhat weak", "Very weak"];

pub const PROVINCE: CodeMap = CodeMap::explicit(schema::PROVINCE, PROVINCES);
pub const GENDER: CodeMap = CodeMap::sequential(schema::GENDER, GENDERS);
pub const TOTAL_INCOME: CodeMap = CodeMap::sequential(schema::TOTAL_INCOME, INCOME_ORDER);

/// Yes/no chronic-condition columns.
pub const YES_NO_COLUMNS: &[&str] = &[
    "Sleep_apnea",
    "High_BP",
    "High_cholesterol",
    "Diabetic",
    "Fatigue_syndrome",
    "Mood_disorder",
    "Anxiety_disorder",
    "Respiratory_chronic_con",
    "Musculoskeletal_con",
    "Cardiovascular_con",
];

/// Categorical columns with their own label tables.
pub const CODE_MAPS: &[CodeMap] = &[
    PROVINCE,
    GENDER,
    CodeMap::sequential(schema::GEN_HEALTH_STATE, HEALTH_ORDER),
    CodeMap::sequential(schema::MENTAL_HEALTH_STATE, HEALTH_ORDER),
    CodeMap::sequential(schema::STRESS_LEVEL, STRESS_ORDER),
    TOTAL_INCOME,
    CodeMap::sequential(schema::IMMIGRANT, YES_NO),
    CodeMap::sequential(schema::ABORIGINAL_IDENTITY, YES_NO),
    CodeMap::sequential(schema::FOOD_SECURITY, FOOD_SECURITY_ORDER),
    CodeMap::sequential(schema::SENSE_BELONGING, BELONGING),
    CodeMap::sequential(schema::WORK_STRESS, STRESS_ORDER),
];

/// Every categorical column the loader knows how to decode.
pub fn code_maps() -> impl Iterator<Item = CodeMap> {
    CODE_MAPS.iter().copied().chain(
        YES_NO_COLUMNS
            .iter()
            .map(|&column| CodeMap::sequential(column, YES_NO)),
    )
}

pub fn code_map(column: &str) -> Option<CodeMap> {
    code_maps().find(|m| m.column == column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_yes_no_column_has_a_map() {
        for col in YES_NO_COLUMNS {
            assert_eq!(code_map(col).map(|m| m.labels()), Some(vec!["Yes", "No"]));
        }
        assert_eq!(code_maps().count(), CODE_MAPS.len() + YES_NO_COLUMNS.len());
        assert_eq!(
            code_map("Diabetic").map(|m| m.decode(&CellValue::Integer(2))),
            Some(CellValue::Label("No".into()))
        );
        assert!(code_map("Province_of_birth").is_none());
    }

    #[test]
    fn decodes_known_codes() {
        assert_eq!(
            PROVINCE.decode(&CellValue::Integer(35)),
            CellValue::Label("Ontario".into())
        );
        assert_eq!(
            TOTAL_INCOME.decode(&CellValue::Integer(1)),
            CellValue::Label("Less than $20,000".into())
        );
    }

    #[test]
    fn integral_floats_decode_like_integers() {
        assert_eq!(
            GENDER.decode(&CellValue::Float(2.0)),
            CellValue::Label("Female".into())
        );
    }

    #[test]
    fn unmapped_values_decode_to_null() {
        for raw in [
            CellValue::Integer(0),
            CellValue::Integer(9),
            CellValue::Integer(-1),
            CellValue::Float(1.5),
            CellValue::Label("Male".into()),
            CellValue::Null,
        ] {
            assert_eq!(GENDER.decode(&raw), CellValue::Null, "{raw:?}");
        }
        assert_eq!(PROVINCE.decode(&CellValue::Integer(14)), CellValue::Null);
    }
}
