use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DomainError;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Star rating in `1..=5`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: u8) -> Result<Self, DomainError> {
        if (MIN_RATING..=MAX_RATING).contains(&value) {
            return Ok(Self(value));
        }
        Err(DomainError::InvalidRating(value.to_string()))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Interprets a slot or entity value, which the dialogue runtime may hand
    /// over as a JSON number (`4`, `4.0`) or as text (`"4"`).
    pub fn from_value(value: &Value) -> Result<Self, DomainError> {
        match value {
            Value::Number(number) => {
                if let Some(int) = number.as_u64() {
                    return u8::try_from(int)
                        .map_err(|_| DomainError::InvalidRating(number.to_string()))
                        .and_then(Self::new);
                }
                match number.as_f64() {
                    Some(float) if float.fract() == 0.0 && float >= 0.0 && float <= 255.0 => {
                        Self::new(float as u8)
                    }
                    _ => Err(DomainError::InvalidRating(number.to_string())),
                }
            }
            Value::String(text) => text.parse(),
            other => Err(DomainError::InvalidRating(other.to_string())),
        }
    }

    pub fn stars_label(self) -> String {
        let plural = if self.0 > 1 { "s" } else { "" };
        format!("{} star{plural}", self.0)
    }
}

impl FromStr for Rating {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Ok(int) = trimmed.parse::<u8>() {
            return Self::new(int);
        }
        match trimmed.parse::<f64>() {
            Ok(float) if float.fract() == 0.0 && (0.0..=255.0).contains(&float) => {
                Self::new(float as u8)
            }
            _ => Err(DomainError::InvalidRating(value.to_owned())),
        }
    }
}

impl TryFrom<u8> for Rating {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Neutral => "Neutral",
            Self::Negative => "Negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            _ => Err(DomainError::InvalidSentiment(value.to_owned())),
        }
    }
}

/// One row of the rating log. `summary` and `sentiment` stay empty until the
/// summarizer amends the row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingLogEntry {
    pub timestamp: String,
    pub user_id: String,
    pub rating: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub sentiment: String,
}

impl RatingLogEntry {
    pub const TIMESTAMP_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    pub fn captured(timestamp: impl Into<String>, user_id: impl Into<String>, rating: Rating) -> Self {
        Self {
            timestamp: timestamp.into(),
            user_id: user_id.into(),
            rating: rating.to_string(),
            summary: String::new(),
            sentiment: String::new(),
        }
    }

    pub fn captured_now(user_id: impl Into<String>, rating: Rating) -> Self {
        let timestamp = chrono::Local::now().format(Self::TIMESTAMP_FORMAT).to_string();
        Self::captured(timestamp, user_id, rating)
    }

    pub fn is_summarized(&self) -> bool {
        !self.summary.is_empty() || !self.sentiment.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Rating, RatingLogEntry, Sentiment};

    #[test]
    fn rating_accepts_numbers_and_numeric_strings() {
        assert_eq!(Rating::from_value(&json!(4)).expect("int").value(), 4);
        assert_eq!(Rating::from_value(&json!(4.0)).expect("float").value(), 4);
        assert_eq!(Rating::from_value(&json!("5")).expect("string").value(), 5);
        assert_eq!(Rating::from_value(&json!(" 2.0 ")).expect("float string").value(), 2);
    }

    #[test]
    fn rating_rejects_out_of_range_and_non_numeric_values() {
        assert!(Rating::from_value(&json!(0)).is_err());
        assert!(Rating::from_value(&json!(6)).is_err());
        assert!(Rating::from_value(&json!(3.5)).is_err());
        assert!(Rating::from_value(&json!("great")).is_err());
        assert!(Rating::from_value(&json!(null)).is_err());
        assert!(Rating::from_value(&json!(-1)).is_err());
    }

    #[test]
    fn stars_label_pluralizes_above_one() {
        assert_eq!(Rating::new(1).expect("rating").stars_label(), "1 star");
        assert_eq!(Rating::new(3).expect("rating").stars_label(), "3 stars");
    }

    #[test]
    fn sentiment_parsing_is_case_insensitive() {
        assert_eq!("POSITIVE".parse::<Sentiment>().expect("sentiment"), Sentiment::Positive);
        assert_eq!(" neutral ".parse::<Sentiment>().expect("sentiment"), Sentiment::Neutral);
        assert!("mixed".parse::<Sentiment>().is_err());
    }

    #[test]
    fn captured_entry_has_empty_summary_fields() {
        let entry = RatingLogEntry::captured("2026-01-01 10:00:00", "user-1", Rating::new(4).expect("rating"));
        assert_eq!(entry.rating, "4");
        assert!(!entry.is_summarized());
    }
}
