use std::path::{Path, PathBuf};

use serde::Serialize;
use shiptrack_agent::OllamaClient;
use shiptrack_core::config::{AppConfig, LoadOptions};
use shiptrack_store::load_seed_file;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_shipment_seed(&config));
            checks.push(check_rating_log(&config.ratings.path));
            checks.push(check_llm_endpoint(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["shipment_seed", "rating_log_writable", "llm_endpoint"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_shipment_seed(config: &AppConfig) -> DoctorCheck {
    let Some(path) = &config.store.seed_path else {
        return DoctorCheck {
            name: "shipment_seed",
            status: CheckStatus::Pass,
            details: "using built-in shipment records".to_string(),
        };
    };

    match load_seed_file(path) {
        Ok(records) => DoctorCheck {
            name: "shipment_seed",
            status: CheckStatus::Pass,
            details: format!("{} records in `{}`", records.len(), path.display()),
        },
        Err(error) => {
            DoctorCheck { name: "shipment_seed", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn check_rating_log(path: &Path) -> DoctorCheck {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    if path.is_file() {
        return match std::fs::OpenOptions::new().append(true).open(path) {
            Ok(_) => DoctorCheck {
                name: "rating_log_writable",
                status: CheckStatus::Pass,
                details: format!("`{}` is writable", path.display()),
            },
            Err(error) => DoctorCheck {
                name: "rating_log_writable",
                status: CheckStatus::Fail,
                details: format!("cannot append to `{}`: {error}", path.display()),
            },
        };
    }

    if dir.is_dir() {
        DoctorCheck {
            name: "rating_log_writable",
            status: CheckStatus::Pass,
            details: format!("`{}` will be created on the first rating", path.display()),
        }
    } else {
        DoctorCheck {
            name: "rating_log_writable",
            status: CheckStatus::Fail,
            details: format!("directory `{}` does not exist", dir.display()),
        }
    }
}

fn check_llm_endpoint(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "llm_endpoint",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let client = OllamaClient::from_config(&config.llm)?;
        client.probe().await
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "llm_endpoint",
            status: CheckStatus::Pass,
            details: format!("`{}` answered; model `{}`", config.llm.base_url, config.llm.model),
        },
        Err(error) => {
            DoctorCheck { name: "llm_endpoint", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
