//! Format checks for slot values collected by the tracking and address forms.
//!
//! These functions are pure: existence of a tracking ID in the shipment store
//! is checked by the caller.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::shipment::{Pin, TrackingId};
use crate::errors::DomainError;

/// Marker that lets a free-text answer embed a tracking ID ("my tracking number is ...").
const TRACKING_MARKER: &str = "tracking";

fn tracking_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\d{9}\b").expect("tracking id pattern is valid"))
}

/// Pulls a tracking ID out of a raw slot value.
///
/// Surrounding whitespace is ignored. Other text around the digits is only
/// tolerated when it mentions "tracking"; prose that happens to contain nine
/// digits is rejected.
pub fn extract_tracking_id(raw: &str) -> Result<TrackingId, DomainError> {
    let candidate = raw.trim();
    let Some(found) = tracking_id_pattern().find(candidate) else {
        return Err(DomainError::InvalidTrackingId(raw.to_owned()));
    };

    let has_non_digit = candidate.chars().any(|ch| !ch.is_ascii_digit());
    if has_non_digit && !candidate.to_lowercase().contains(TRACKING_MARKER) {
        return Err(DomainError::InvalidTrackingId(raw.to_owned()));
    }

    TrackingId::parse(found.as_str())
}

pub fn validate_pin(raw: &str) -> Result<Pin, DomainError> {
    Pin::parse(raw)
}

#[cfg(test)]
mod tests {
    use super::{extract_tracking_id, validate_pin};
    use crate::errors::DomainError;

    #[test]
    fn bare_nine_digit_id_is_accepted_unchanged() {
        let id = extract_tracking_id("123456789").expect("bare id");
        assert_eq!(id.as_str(), "123456789");
    }

    #[test]
    fn surrounding_whitespace_does_not_count_as_prose() {
        for raw in [" 123456789 ", "123456789\n", "\t123456789"] {
            let id = extract_tracking_id(raw).expect("padded id");
            assert_eq!(id.as_str(), "123456789");
        }
        assert!(extract_tracking_id(" 123456789 x").is_err());
    }

    #[test]
    fn id_inside_tracking_sentence_is_extracted() {
        let id = extract_tracking_id("My Tracking number is 987654321").expect("sentence id");
        assert_eq!(id.as_str(), "987654321");
    }

    #[test]
    fn prose_without_tracking_marker_is_rejected() {
        for raw in ["call me at 123456789", "id 123456789 please", "123456789x", "abc 123456789"] {
            assert!(
                matches!(extract_tracking_id(raw), Err(DomainError::InvalidTrackingId(_))),
                "`{raw}` should be rejected"
            );
        }
    }

    #[test]
    fn wrong_length_runs_are_rejected() {
        assert!(extract_tracking_id("12345678").is_err());
        assert!(extract_tracking_id("1234567890").is_err());
        assert!(extract_tracking_id("tracking 1234567890").is_err());
        assert!(extract_tracking_id("").is_err());
    }

    #[test]
    fn pins_must_be_exactly_six_digits() {
        assert_eq!(validate_pin(" 400001 ").expect("pin").as_str(), "400001");
        for raw in ["40000", "4000011", "40000a", "pin 400001", ""] {
            assert!(validate_pin(raw).is_err(), "`{raw}` should be rejected");
        }
    }
}
