//! Mention enhancement: rewrites product names in agent output into HTML cards.
//!
//! The pass is deliberately forgiving. Whatever goes wrong (backend down,
//! malformed catalog, template failure) the caller gets the original text back
//! and the failure is logged, so a broken catalog never blocks a reply.
//!
//! Ordering policy: matches are resolved in document order, each product is
//! carded at most once per message (its first mention wins), and cards are
//! inserted immediately after the matched span. Text outside the inserted
//! cards is copied through byte for byte.

pub mod card;
pub mod matcher;

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::CatalogSource;
use crate::config::EnhancerConfig;

pub use card::{CardRenderer, CARD_MARKER};
pub use matcher::{
    find_product_position, matcher_for, MarkerMatcher, Match, MentionMatcher, TitleLineMatcher,
};

#[derive(Debug, Error)]
pub enum EnhancerBuildError {
    #[error("invalid mention pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("invalid card template: {0}")]
    Template(#[from] tera::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnhanceOutcome {
    /// No candidate matched a product; the text is returned as-is.
    Unchanged,
    /// The text already carries an image or a card and was skipped.
    AlreadyEnhanced,
    Enhanced { cards: usize },
    /// Enhancement failed and the original text was returned.
    Degraded { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Enhancement {
    pub text: String,
    pub outcome: EnhanceOutcome,
}

impl Enhancement {
    fn untouched(text: &str, outcome: EnhanceOutcome) -> Self {
        Self { text: text.to_string(), outcome }
    }
}

pub struct Enhancer {
    catalog: Arc<dyn CatalogSource>,
    matcher: Box<dyn MentionMatcher>,
    cards: CardRenderer,
}

impl Enhancer {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        matcher: Box<dyn MentionMatcher>,
        cards: CardRenderer,
    ) -> Self {
        Self { catalog, matcher, cards }
    }

    pub fn from_config(
        catalog: Arc<dyn CatalogSource>,
        config: &EnhancerConfig,
        shop_base_url: &str,
    ) -> Result<Self, EnhancerBuildError> {
        let matcher = matcher_for(config.strategy, &config.marker_tag)?;
        let cards = CardRenderer::new(shop_base_url, config.image_width)?;
        Ok(Self::new(catalog, matcher, cards))
    }

    pub async fn enhance(&self, text: &str) -> String {
        self.enhance_with_report(text).await.text
    }

    pub async fn enhance_with_report(&self, text: &str) -> Enhancement {
        if is_already_enhanced(text) {
            debug!(event_name = "enhancer.skipped", "message already contains product media");
            return Enhancement::untouched(text, EnhanceOutcome::AlreadyEnhanced);
        }

        // Only hit the backend when there is something to look up.
        if self.matcher.find_matches(text).next().is_none() {
            return Enhancement::untouched(text, EnhanceOutcome::Unchanged);
        }

        let catalog = match self.catalog.fetch_catalog().await {
            Ok(catalog) => catalog,
            Err(error) => {
                warn!(
                    event_name = "enhancer.catalog_unavailable",
                    error = %error,
                    "catalog fetch failed, returning message unmodified"
                );
                return Enhancement::untouched(
                    text,
                    EnhanceOutcome::Degraded { reason: error.to_string() },
                );
            }
        };

        // Keyed on catalog position: handles are not guaranteed unique or non-empty.
        let mut carded = HashSet::new();
        let mut insertions = Vec::new();
        for found in self.matcher.find_matches(text) {
            let Some(position) = find_product_position(&found.candidate, &catalog) else {
                continue;
            };
            if !carded.insert(position) {
                continue;
            }
            let product = &catalog[position];

            match self.cards.render(product) {
                Ok(card) => insertions.push((found.span.end, card)),
                Err(error) => {
                    warn!(
                        event_name = "enhancer.card_render_failed",
                        product_handle = %product.handle,
                        error = %error,
                        "card rendering failed, returning message unmodified"
                    );
                    return Enhancement::untouched(
                        text,
                        EnhanceOutcome::Degraded { reason: error.to_string() },
                    );
                }
            }
        }

        if insertions.is_empty() {
            return Enhancement::untouched(text, EnhanceOutcome::Unchanged);
        }

        let cards = insertions.len();
        debug!(event_name = "enhancer.enhanced", cards, "product cards inserted");
        Enhancement {
            text: splice_after(text, &insertions),
            outcome: EnhanceOutcome::Enhanced { cards },
        }
    }
}

/// True when `text` already holds an `<img>` tag or a rendered card.
pub fn is_already_enhanced(text: &str) -> bool {
    image_tag().is_match(text) || text.contains(CARD_MARKER)
}

fn image_tag() -> &'static Regex {
    static IMAGE_TAG: OnceLock<Regex> = OnceLock::new();
    IMAGE_TAG.get_or_init(|| Regex::new(r"(?i)<img[^>]*>").expect("valid image tag regex"))
}

// `insertions` are (byte offset, fragment) pairs in ascending offset order.
fn splice_after(text: &str, insertions: &[(usize, String)]) -> String {
    let extra: usize = insertions.iter().map(|(_, fragment)| fragment.len()).sum();
    let mut output = String::with_capacity(text.len() + extra);
    let mut cursor = 0;
    for (offset, fragment) in insertions {
        output.push_str(&text[cursor..*offset]);
        output.push_str(fragment);
        cursor = *offset;
    }
    output.push_str(&text[cursor..]);
    output
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::{
        is_already_enhanced, CardRenderer, EnhanceOutcome, Enhancer, MarkerMatcher,
        TitleLineMatcher,
    };
    use crate::catalog::{CatalogError, CatalogSource};
    use crate::domain::product::{Product, ProductHandle};

    struct FixedCatalog {
        products: Result<Vec<Product>, CatalogError>,
        calls: AtomicUsize,
    }

    impl FixedCatalog {
        fn with(products: Vec<Product>) -> Arc<Self> {
            Arc::new(Self { products: Ok(products), calls: AtomicUsize::new(0) })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                products: Err(CatalogError::Unavailable("connection refused".to_string())),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CatalogSource for FixedCatalog {
        async fn fetch_catalog(&self) -> Result<Vec<Product>, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.products.clone()
        }
    }

    fn product(title: &str, handle: &str, images: &[&str], prices: &[&str]) -> Product {
        Product {
            title: title.to_string(),
            handle: ProductHandle(handle.to_string()),
            description: None,
            variant_prices: prices.iter().map(ToString::to_string).collect(),
            image_urls: images.iter().map(ToString::to_string).collect(),
        }
    }

    fn red_hat() -> Product {
        product("Red Hat", "red-hat", &["img1.jpg"], &["9.99"])
    }

    fn marker_enhancer(catalog: Arc<FixedCatalog>) -> Enhancer {
        Enhancer::new(
            catalog,
            Box::new(MarkerMatcher::new("h3").expect("valid tag")),
            CardRenderer::new("https://shop.example.com", 100).expect("template"),
        )
    }

    #[tokio::test]
    async fn marker_for_known_product_gets_card_after_it() {
        let enhancer = marker_enhancer(FixedCatalog::with(vec![red_hat()]));

        let report = enhancer.enhance_with_report("<h3>Red Hat</h3>").await;

        assert_eq!(report.outcome, EnhanceOutcome::Enhanced { cards: 1 });
        assert!(report.text.starts_with("<h3>Red Hat</h3>"));
        assert!(report.text.contains("img1.jpg"));
        assert!(report.text.contains("9.99"));
        assert!(report.text.contains("https://shop.example.com/products/red-hat"));
    }

    #[tokio::test]
    async fn blue_mug_card_carries_image_price_and_handle() {
        let catalog = FixedCatalog::with(vec![
            red_hat(),
            product(
                "Blue Mug",
                "blue-mug",
                &["mug-front.png", "mug-back.png"],
                &["12.50", "15.00"],
            ),
        ]);
        let enhancer = marker_enhancer(catalog);

        let output = enhancer.enhance("Our favourite:\n<h3>Blue Mug</h3>\nEnjoy!").await;

        assert!(output.contains("mug-front.png"));
        assert!(!output.contains("mug-back.png"));
        assert!(output.contains("12.50"));
        assert!(output.contains("/products/blue-mug"));
        assert!(output.starts_with("Our favourite:\n<h3>Blue Mug</h3>"));
        assert!(output.ends_with("\nEnjoy!"));
    }

    #[tokio::test]
    async fn text_outside_matches_is_preserved_byte_for_byte() {
        let enhancer = marker_enhancer(FixedCatalog::with(vec![red_hat()]));
        let input = "Intro ✨ line\n<h3>Red Hat</h3>\n  trailing   text ✓";

        let output = enhancer.enhance(input).await;

        let card_start = "Intro ✨ line\n<h3>Red Hat</h3>".len();
        let card_len = output.len() - input.len();
        assert_eq!(&output[..card_start], &input[..card_start]);
        assert_eq!(&output[card_start + card_len..], &input[card_start..]);
    }

    #[tokio::test]
    async fn text_without_candidates_is_unchanged_and_catalog_untouched() {
        let catalog = FixedCatalog::with(vec![red_hat()]);
        let enhancer = marker_enhancer(catalog.clone());
        let input = "We sell hats. Ask me anything!";

        let report = enhancer.enhance_with_report(input).await;

        assert_eq!(report.text, input);
        assert_eq!(report.outcome, EnhanceOutcome::Unchanged);
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn text_with_image_is_returned_unchanged() {
        let catalog = FixedCatalog::with(vec![red_hat()]);
        let enhancer = marker_enhancer(catalog.clone());
        let input = "<h3>Red Hat</h3><IMG src=\"x.jpg\">";

        let report = enhancer.enhance_with_report(input).await;

        assert_eq!(report.text, input);
        assert_eq!(report.outcome, EnhanceOutcome::AlreadyEnhanced);
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn enhancing_twice_is_a_no_op_even_without_images() {
        let catalog = FixedCatalog::with(vec![product("Gift Card", "gift-card", &[], &[])]);
        let enhancer = marker_enhancer(catalog);

        let once = enhancer.enhance("<h3>Gift Card</h3>").await;
        let twice = enhancer.enhance(&once).await;

        assert!(once.contains("Price: N/A"));
        assert!(!once.contains("<img"));
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn unknown_candidate_leaves_text_unchanged() {
        let enhancer = marker_enhancer(FixedCatalog::with(vec![red_hat()]));
        let input = "<h3>Green Scarf</h3>";

        let report = enhancer.enhance_with_report(input).await;

        assert_eq!(report.text, input);
        assert_eq!(report.outcome, EnhanceOutcome::Unchanged);
    }

    #[tokio::test]
    async fn catalog_failure_degrades_to_original_text() {
        let enhancer = marker_enhancer(FixedCatalog::failing());
        let input = "<h3>Red Hat</h3>";

        let report = enhancer.enhance_with_report(input).await;

        assert_eq!(report.text, input);
        assert!(matches!(
            report.outcome,
            EnhanceOutcome::Degraded { ref reason } if reason.contains("connection refused")
        ));
    }

    #[tokio::test]
    async fn each_product_is_carded_once_at_first_mention() {
        let catalog = FixedCatalog::with(vec![
            red_hat(),
            product("Blue Mug", "blue-mug", &["mug.png"], &["12.50"]),
        ]);
        let enhancer = marker_enhancer(catalog);
        let input = "<h3>Red Hat</h3> then <h3>Blue Mug</h3> and again <h3>red hat</h3>";

        let report = enhancer.enhance_with_report(input).await;

        assert_eq!(report.outcome, EnhanceOutcome::Enhanced { cards: 2 });
        assert_eq!(report.text.matches("data-storefront-card=\"red-hat\"").count(), 1);
        assert!(report.text.ends_with("and again <h3>red hat</h3>"));
        let hat_card = report.text.find("red-hat").expect("hat card");
        let mug_card = report.text.find("blue-mug").expect("mug card");
        assert!(hat_card < mug_card);
    }

    #[tokio::test]
    async fn products_sharing_a_blank_handle_each_get_a_card() {
        let catalog = FixedCatalog::with(vec![
            product("Red Hat", "", &["img1.jpg"], &["9.99"]),
            product("Blue Mug", "", &["mug.png"], &["12.50"]),
        ]);
        let enhancer = marker_enhancer(catalog);

        let report = enhancer.enhance_with_report("<h3>Red Hat</h3><h3>Blue Mug</h3>").await;

        assert_eq!(report.outcome, EnhanceOutcome::Enhanced { cards: 2 });
        assert!(report.text.contains("img1.jpg"));
        assert!(report.text.contains("mug.png"));
    }

    #[tokio::test]
    async fn title_line_strategy_cards_bold_titles() {
        let enhancer = Enhancer::new(
            FixedCatalog::with(vec![red_hat()]),
            Box::new(TitleLineMatcher::new().expect("pattern")),
            CardRenderer::new("https://shop.example.com", 200).expect("template"),
        );

        let output = enhancer.enhance("**Red Hat** - Price: 9.99\nWarm and soft.").await;

        assert!(output.starts_with("**Red Hat** - Price<div class=\"product-card\""));
        assert!(output.contains("width=\"200\""));
        assert!(output.ends_with(": 9.99\nWarm and soft."));
    }

    #[test]
    fn image_guard_is_case_insensitive() {
        assert!(is_already_enhanced("see <Img src='a.png'/>"));
        assert!(!is_already_enhanced("an image would be nice"));
    }
}
