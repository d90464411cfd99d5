use orderbot_core::catalog::MenuCatalog;
use orderbot_core::config::{AppConfig, ClassifierProvider, LoadOptions, StorageBackend};
use orderbot_db::connect_with_settings;
use serde::Serialize;

use crate::commands::config::redact_endpoint;

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

const DEPENDENT_CHECKS: [&str; 3] =
    ["catalog_validation", "classifier_readiness", "storage_connectivity"];

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
            checks.push(check_catalog(&config));
            checks.push(check_classifier(&config));
            checks.push(check_storage(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(DEPENDENT_CHECKS.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
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

fn check_catalog(config: &AppConfig) -> DoctorCheck {
    match MenuCatalog::load(&config.catalog.path) {
        Ok(catalog) => DoctorCheck {
            name: "catalog_validation",
            status: CheckStatus::Pass,
            details: format!(
                "{} menu item(s) loaded from `{}`",
                catalog.len(),
                config.catalog.path.display()
            ),
        },
        Err(error) => DoctorCheck {
            name: "catalog_validation",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_classifier(config: &AppConfig) -> DoctorCheck {
    let details = match config.classifier.provider {
        ClassifierProvider::Keyword => "keyword classifier (offline)".to_string(),
        ClassifierProvider::Luis => format!(
            "luis endpoint {} (min_confidence {}, timeout {}ms)",
            config.classifier.endpoint.as_ref().map(redact_endpoint).unwrap_or_default(),
            config.classifier.min_confidence,
            config.classifier.timeout_ms
        ),
    };
    DoctorCheck { name: "classifier_readiness", status: CheckStatus::Pass, details }
}

fn check_storage(config: &AppConfig) -> DoctorCheck {
    if config.storage.backend == StorageBackend::Memory {
        return DoctorCheck {
            name: "storage_connectivity",
            status: CheckStatus::Pass,
            details: "in-memory store; conversations are lost on restart".to_string(),
        };
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "storage_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.storage.url,
            config.storage.max_connections,
            config.storage.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

        pool.close().await;
        Ok::<(), String>(())
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "storage_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.storage.url),
        },
        Err(error) => {
            DoctorCheck { name: "storage_connectivity", status: CheckStatus::Fail, details: error }
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
