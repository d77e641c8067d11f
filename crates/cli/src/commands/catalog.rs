use storefront_agent::tools::format_products;
use storefront_core::CatalogSource;
use storefront_shopify::AdminClient;

use super::{load_config, runtime, CommandResult, EXIT_BACKEND};

const COMMAND: &str = "catalog";

pub fn run() -> CommandResult {
    match listing() {
        Ok(text) => CommandResult::plain(text),
        Err(failure) => failure,
    }
}

fn listing() -> Result<String, CommandResult> {
    let config = load_config(COMMAND)?;
    let client = AdminClient::new(&config.shopify).map_err(|error| {
        CommandResult::failure(COMMAND, "client_setup", error.to_string(), EXIT_BACKEND)
    })?;

    let products = runtime(COMMAND)?.block_on(client.fetch_catalog()).map_err(|error| {
        CommandResult::failure(COMMAND, "backend_unavailable", error.to_string(), EXIT_BACKEND)
    })?;

    Ok(format_products(&products, &config.shopify.shop_base_url()))
}
