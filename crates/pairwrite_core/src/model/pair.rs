//! Pair domain types.
//!
//! # Responsibility
//! - Define the four values stored across `small_numbers` and `large_numbers`.
//! - Validate field presence for inbound drafts.
//!
//! # Invariants
//! - `PairValues` always carries all four fields.
//! - No range validation happens here; storage decides what it accepts.
//! - Draft fields take any numeric spelling that names an integer: JSON
//!   integers, integral floats (`5.0`) and numeric strings (`"5"`).

use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Generated key of a pair's primary row, shared by its secondary row.
pub type PairId = i64;

/// Complete set of values for one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairValues {
    /// Plain integer stored in `small_numbers.field_a`.
    pub field_a: i64,
    /// Non-negative by convention; stored in `small_numbers.field_b`.
    pub field_b: i64,
    /// Large integer stored in `large_numbers.field_c`.
    pub field_c: i64,
    /// Medium-range integer stored in `large_numbers.field_d`.
    pub field_d: i64,
}

impl PairValues {
    pub fn new(field_a: i64, field_b: i64, field_c: i64, field_d: i64) -> Self {
        Self {
            field_a,
            field_b,
            field_c,
            field_d,
        }
    }
}

/// Inbound pair shape where any field may be absent.
///
/// Accepts the legacy column names as aliases so older clients keep working.
/// `null` counts as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairDraft {
    #[serde(default, alias = "intbiasa", deserialize_with = "lenient_int")]
    pub field_a: Option<i64>,
    #[serde(default, alias = "intpositive", deserialize_with = "lenient_int")]
    pub field_b: Option<i64>,
    #[serde(default, alias = "bigintbiasa", deserialize_with = "lenient_int")]
    pub field_c: Option<i64>,
    #[serde(default, alias = "mediumintbiasa", deserialize_with = "lenient_int")]
    pub field_d: Option<i64>,
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_option(LenientInt)
}

struct LenientInt;

impl<'de> Visitor<'de> for LenientInt {
    type Value = Option<i64>;

    fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("an integer, an integral float or a numeric string")
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(Some(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        i64::try_from(value)
            .map(Some)
            .map_err(|_| E::invalid_value(Unexpected::Unsigned(value), &self))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        integral(value)
            .map(Some)
            .ok_or_else(|| E::invalid_value(Unexpected::Float(value), &self))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        let text = value.trim();
        text.parse::<i64>()
            .ok()
            .or_else(|| text.parse::<f64>().ok().and_then(integral))
            .map(Some)
            .ok_or_else(|| E::invalid_value(Unexpected::Str(value), &self))
    }
}

/// `value` as `i64` when it is finite, whole and in range.
fn integral(value: f64) -> Option<i64> {
    // i64::MAX rounds up to 2^63 as f64, so the upper bound is exclusive.
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then_some(value as i64)
}

impl PairDraft {
    /// Converts the draft into complete values.
    ///
    /// # Errors
    /// - Returns `MissingField` for the first absent field, in `fieldA..fieldD`
    ///   order.
    pub fn validate(&self) -> Result<PairValues, PairValidationError> {
        let field_a = self.field_a.ok_or(PairValidationError::MissingField("fieldA"))?;
        let field_b = self.field_b.ok_or(PairValidationError::MissingField("fieldB"))?;
        let field_c = self.field_c.ok_or(PairValidationError::MissingField("fieldC"))?;
        let field_d = self.field_d.ok_or(PairValidationError::MissingField("fieldD"))?;
        Ok(PairValues::new(field_a, field_b, field_c, field_d))
    }
}

impl From<PairValues> for PairDraft {
    fn from(values: PairValues) -> Self {
        Self {
            field_a: Some(values.field_a),
            field_b: Some(values.field_b),
            field_c: Some(values.field_c),
            field_d: Some(values.field_d),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairValidationError {
    MissingField(&'static str),
}

impl Display for PairValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing field `{field}`"),
        }
    }
}

impl Error for PairValidationError {}

#[cfg(test)]
mod tests {
    use super::{PairDraft, PairValidationError, PairValues};

    #[test]
    fn complete_draft_validates() {
        let draft = PairDraft::from(PairValues::new(5, 10, 1_000_000, 500));
        assert_eq!(
            draft.validate().unwrap(),
            PairValues::new(5, 10, 1_000_000, 500)
        );
    }

    #[test]
    fn first_missing_field_is_reported() {
        let draft = PairDraft {
            field_a: Some(1),
            field_b: None,
            field_c: None,
            field_d: Some(4),
        };
        assert_eq!(
            draft.validate().unwrap_err(),
            PairValidationError::MissingField("fieldB")
        );
        assert_eq!(
            PairDraft::default().validate().unwrap_err().to_string(),
            "missing field `fieldA`"
        );
    }

    #[test]
    fn draft_accepts_camel_case_and_legacy_names() {
        let camel: PairDraft = serde_json::from_str(
            r#"{"fieldA": 5, "fieldB": 10, "fieldC": 1000000, "fieldD": 500}"#,
        )
        .unwrap();
        let legacy: PairDraft = serde_json::from_str(
            r#"{"intbiasa": 5, "intpositive": 10, "bigintbiasa": 1000000, "mediumintbiasa": 500}"#,
        )
        .unwrap();
        assert_eq!(camel, legacy);
        assert_eq!(camel.validate().unwrap().field_c, 1_000_000);
    }

    #[test]
    fn draft_tolerates_missing_keys_until_validation() {
        let draft: PairDraft = serde_json::from_str(r#"{"fieldA": -3}"#).unwrap();
        assert_eq!(draft.field_a, Some(-3));
        assert!(draft.validate().is_err());
    }

    #[test]
    fn integral_floats_and_numeric_strings_are_accepted() {
        let draft: PairDraft = serde_json::from_str(
            r#"{"fieldA": 5.0, "fieldB": "10", "fieldC": " 1000000 ", "fieldD": "500.0"}"#,
        )
        .unwrap();
        assert_eq!(
            draft.validate().unwrap(),
            PairValues::new(5, 10, 1_000_000, 500)
        );

        let negative: PairDraft = serde_json::from_str(r#"{"intbiasa": "-7"}"#).unwrap();
        assert_eq!(negative.field_a, Some(-7));
    }

    #[test]
    fn null_counts_as_missing() {
        let draft: PairDraft = serde_json::from_str(
            r#"{"fieldA": 1, "fieldB": null, "fieldC": 3, "fieldD": 4}"#,
        )
        .unwrap();
        assert_eq!(
            draft.validate().unwrap_err(),
            PairValidationError::MissingField("fieldB")
        );
    }

    #[test]
    fn values_without_an_integer_reading_are_rejected() {
        for body in [
            r#"{"fieldA": 5.5}"#,
            r#"{"fieldA": "five"}"#,
            r#"{"fieldA": true}"#,
            r#"{"fieldA": 1e30}"#,
            r#"{"fieldA": 18446744073709551615}"#,
        ] {
            assert!(
                serde_json::from_str::<PairDraft>(body).is_err(),
                "{body} should not deserialize"
            );
        }
    }
}
