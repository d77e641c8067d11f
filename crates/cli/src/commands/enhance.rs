use std::sync::Arc;

use storefront_core::{EnhanceOutcome, Enhancer};
use storefront_shopify::AdminClient;

use super::{load_config, runtime, CommandResult, EXIT_BACKEND, EXIT_CONFIG};

const COMMAND: &str = "enhance";

/// Prints the enhanced text. Enhancement never fails the command: a catalog
/// outage leaves the text unchanged, as it would in a live chat turn.
pub fn run(text: &str) -> CommandResult {
    match enhance(text) {
        Ok(output) => CommandResult::plain(output),
        Err(failure) => failure,
    }
}

fn enhance(text: &str) -> Result<String, CommandResult> {
    let config = load_config(COMMAND)?;
    let client = AdminClient::new(&config.shopify).map_err(|error| {
        CommandResult::failure(COMMAND, "client_setup", error.to_string(), EXIT_BACKEND)
    })?;
    let enhancer =
        Enhancer::from_config(Arc::new(client), &config.enhancer, &config.shopify.shop_base_url())
            .map_err(|error| {
                CommandResult::failure(COMMAND, "enhancer_setup", error.to_string(), EXIT_CONFIG)
            })?;

    let enhancement = runtime(COMMAND)?.block_on(enhancer.enhance_with_report(text));
    if let EnhanceOutcome::Degraded { reason } = &enhancement.outcome {
        eprintln!("enhance: catalog unavailable, text left unchanged: {reason}");
    }
    Ok(enhancement.text)
}
