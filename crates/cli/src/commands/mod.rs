pub mod config;
pub mod doctor;
pub mod ratings;
pub mod smoke;

use std::path::Path;

use serde::Serialize;

/// What a command printed and the process exit code it asks for.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

/// Why a command gave up. Each class owns one exit code so scripts can branch
/// on the code without parsing output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Serialization,
    ConfigValidation,
    RatingLog,
    Smoke,
}

impl FailureClass {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Serialization => 1,
            Self::ConfigValidation => 2,
            Self::RatingLog => 4,
            Self::Smoke => 6,
        }
    }
}

#[derive(Debug, Serialize)]
struct Notice<'a> {
    command: &'static str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_class: Option<FailureClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ratings_path: Option<String>,
    message: &'a str,
}

impl CommandResult {
    /// Output that is already rendered and succeeded.
    pub fn printed(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }

    /// Successful run that has nothing to show beyond a message about the
    /// rating log, e.g. when it holds no rows yet.
    pub fn notice(command: &'static str, ratings_path: &Path, message: &str) -> Self {
        let notice = Notice {
            command,
            status: "ok",
            error_class: None,
            ratings_path: Some(ratings_path.display().to_string()),
            message,
        };
        Self::printed(render(&notice))
    }

    pub fn failure(command: &'static str, class: FailureClass, message: &str) -> Self {
        let notice =
            Notice { command, status: "error", error_class: Some(class), ratings_path: None, message };
        Self { exit_code: class.exit_code(), output: render(&notice) }
    }
}

fn render(notice: &Notice<'_>) -> String {
    serde_json::to_string(notice).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"{}\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            notice.command,
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::Value;

    use super::{CommandResult, FailureClass};

    #[test]
    fn failure_carries_class_and_matching_exit_code() {
        let result = CommandResult::failure("ratings", FailureClass::RatingLog, "permission denied");

        assert_eq!(result.exit_code, 4);
        let payload: Value = serde_json::from_str(&result.output).expect("json");
        assert_eq!(payload["error_class"], "rating_log");
        assert_eq!(payload["status"], "error");
        assert!(payload.get("ratings_path").is_none());
    }

    #[test]
    fn notice_names_the_rating_log() {
        let result = CommandResult::notice("ratings", Path::new("logs/ratings_log.csv"), "no entries");

        assert_eq!(result.exit_code, 0);
        let payload: Value = serde_json::from_str(&result.output).expect("json");
        assert_eq!(payload["ratings_path"], "logs/ratings_log.csv");
        assert!(payload.get("error_class").is_none());
    }
}
