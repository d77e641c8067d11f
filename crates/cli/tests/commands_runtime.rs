use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use storefront_cli::commands::{catalog, config, doctor, enhance};

const VALID_ENV: [(&str, &str); 3] = [
    ("SHOPIFY_ACCESS_TOKEN", "shpat_cli_test_token"),
    // Nothing listens on the discard port, so any catalog fetch fails fast.
    ("SHOPIFY_SHOP_URL", "http://127.0.0.1:9"),
    ("OPENAI_API_KEY", "sk-cli-test"),
];

#[test]
fn catalog_returns_config_failure_without_credentials() {
    with_env(&[], || {
        let result = catalog::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "catalog");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn catalog_reports_backend_failure_when_shop_is_unreachable() {
    with_env(&VALID_ENV, || {
        let result = catalog::run();
        assert_eq!(result.exit_code, 3, "expected backend failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "catalog");
        assert_eq!(payload["error_class"], "backend_unavailable");
    });
}

#[test]
fn enhance_leaves_text_without_candidates_untouched() {
    with_env(&VALID_ENV, || {
        let result = enhance::run("Happy to help with your order.");

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.output, "Happy to help with your order.");
    });
}

#[test]
fn enhance_skips_text_that_already_has_images() {
    with_env(&VALID_ENV, || {
        let text = "<h3>Blue Mug</h3><img src=\"https://cdn.example.com/mug.png\">";
        let result = enhance::run(text);

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.output, text);
    });
}

#[test]
fn enhance_returns_config_failure_without_credentials() {
    with_env(&[], || {
        let result = enhance::run("<h3>Blue Mug</h3>");
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn doctor_json_skips_backend_checks_when_config_is_invalid() {
    with_env(&[], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "fail");

        let checks = payload["checks"].as_array().expect("checks should be an array");
        assert_eq!(checks.len(), 3);
        assert_eq!(checks[0]["name"], "config_validation");
        assert_eq!(checks[0]["status"], "fail");
        assert!(checks[1..].iter().all(|check| check["status"] == "skipped"));
    });
}

#[test]
fn doctor_flags_unreachable_catalog() {
    with_env(&VALID_ENV, || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        let checks = payload["checks"].as_array().expect("checks should be an array");
        let status_of = |name: &str| {
            checks
                .iter()
                .find(|check| check["name"] == name)
                .map(|check| check["status"].clone())
                .unwrap_or(Value::Null)
        };

        assert_eq!(status_of("config_validation"), "pass");
        assert_eq!(status_of("catalog_connectivity"), "fail");
    });
}

#[test]
fn doctor_human_output_lists_each_check() {
    with_env(&[], || {
        let result = doctor::run(false);

        assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
        assert!(result.output.contains("- [fail] config_validation:"));
        assert!(result.output.contains("- [skip] catalog_connectivity:"));
    });
}

#[test]
fn config_redacts_secrets_and_attributes_env_sources() {
    with_env(&VALID_ENV, || {
        let result = config::run();
        assert_eq!(result.exit_code, 0);
        let output = result.output;

        assert!(output.starts_with("effective config"));
        assert!(output.contains(
            "- shopify.access_token = shpat_*** (source: env (SHOPIFY_ACCESS_TOKEN))"
        ));
        assert!(output.contains("- llm.api_key = sk-*** (source: env (OPENAI_API_KEY))"));
        assert!(output.contains("- llm.model = gpt-3.5-turbo-0125 (source: default)"));
        assert!(!output.contains("shpat_cli_test_token"));
        assert!(!output.contains("sk-cli-test"));
    });
}

#[test]
fn config_reports_validation_failure_without_credentials() {
    with_env(&[], || {
        let result = config::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");
        assert!(result.output.starts_with("config validation failed:"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid json")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SHOPIFY_API_KEY",
        "SHOPIFY_ACCESS_TOKEN",
        "SHOPIFY_SHOP_URL",
        "OPENAI_API_KEY",
        "STOREFRONT_SHOPIFY_API_KEY",
        "STOREFRONT_SHOPIFY_ACCESS_TOKEN",
        "STOREFRONT_SHOPIFY_SHOP_URL",
        "STOREFRONT_SHOPIFY_API_VERSION",
        "STOREFRONT_SHOPIFY_TIMEOUT_SECS",
        "STOREFRONT_LLM_API_KEY",
        "STOREFRONT_LLM_BASE_URL",
        "STOREFRONT_LLM_MODEL",
        "STOREFRONT_LLM_TIMEOUT_SECS",
        "STOREFRONT_LLM_MAX_STEPS",
        "STOREFRONT_ENHANCER_STRATEGY",
        "STOREFRONT_ENHANCER_MARKER_TAG",
        "STOREFRONT_ENHANCER_IMAGE_WIDTH",
        "STOREFRONT_NOTES_PATH",
        "STOREFRONT_SERVER_BIND_ADDRESS",
        "STOREFRONT_SERVER_PORT",
        "STOREFRONT_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "STOREFRONT_LOGGING_LEVEL",
        "STOREFRONT_LOGGING_FORMAT",
        "STOREFRONT_LOG_LEVEL",
        "STOREFRONT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
