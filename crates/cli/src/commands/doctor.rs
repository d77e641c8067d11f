use std::path::Path;

use serde::Serialize;
use storefront_core::config::{AppConfig, LoadOptions};
use storefront_core::CatalogSource;
use storefront_shopify::AdminClient;

use super::{runtime, CommandResult};

const EXIT_UNHEALTHY: u8 = 1;

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

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { EXIT_UNHEALTHY };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
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
            checks.push(check_catalog_connectivity(&config));
            checks.push(check_note_storage(&config.notes.path));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["catalog_connectivity", "note_storage"] {
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

fn check_catalog_connectivity(config: &AppConfig) -> DoctorCheck {
    const NAME: &str = "catalog_connectivity";

    let client = match AdminClient::new(&config.shopify) {
        Ok(client) => client,
        Err(error) => {
            return DoctorCheck {
                name: NAME,
                status: CheckStatus::Fail,
                details: error.to_string(),
            }
        }
    };
    let runtime = match runtime("doctor") {
        Ok(runtime) => runtime,
        Err(_) => {
            return DoctorCheck {
                name: NAME,
                status: CheckStatus::Fail,
                details: "failed to initialize async runtime".to_string(),
            }
        }
    };

    match runtime.block_on(client.fetch_catalog()) {
        Ok(products) => DoctorCheck {
            name: NAME,
            status: CheckStatus::Pass,
            details: format!(
                "{} returned {} products",
                client.admin_base_url(),
                products.len()
            ),
        },
        Err(error) => DoctorCheck {
            name: NAME,
            status: CheckStatus::Fail,
            details: format!("{}: {error}", client.admin_base_url()),
        },
    }
}

/// The note file is created on first use; only an unusable existing path fails.
fn check_note_storage(path: &Path) -> DoctorCheck {
    const NAME: &str = "note_storage";

    if path.is_dir() {
        return DoctorCheck {
            name: NAME,
            status: CheckStatus::Fail,
            details: format!("`{}` is a directory, not a file", path.display()),
        };
    }

    let readonly =
        path.metadata().map(|metadata| metadata.permissions().readonly()).unwrap_or(false);
    if readonly {
        return DoctorCheck {
            name: NAME,
            status: CheckStatus::Fail,
            details: format!("`{}` is read-only", path.display()),
        };
    }

    let details = if path.exists() {
        format!("notes append to `{}`", path.display())
    } else {
        format!("`{}` will be created on the first saved note", path.display())
    };
    DoctorCheck { name: NAME, status: CheckStatus::Pass, details }
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
