use tera::{Context, Tera};

use crate::domain::product::Product;

const CARD_TEMPLATE: &str = "card.html";

/// Attribute every rendered card carries; its presence marks a message as enhanced.
pub const CARD_MARKER: &str = "data-storefront-card";

/// Renders the HTML card spliced in after a product mention.
#[derive(Clone, Debug)]
pub struct CardRenderer {
    tera: Tera,
    shop_base_url: String,
    image_width: u32,
}

impl CardRenderer {
    pub fn new(shop_base_url: impl Into<String>, image_width: u32) -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_template(CARD_TEMPLATE, include_str!("../../templates/card.html"))?;
        Ok(Self { tera, shop_base_url: shop_base_url.into(), image_width })
    }

    pub fn render(&self, product: &Product) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("title", &product.title);
        context.insert("handle", &product.handle.0);
        context.insert("price", &escape_markup(product.first_price()));
        context.insert("image_width", &self.image_width);
        context.insert("image_url", &product.primary_image().map(escape_markup));
        context.insert("product_url", &escape_markup(&product.url(&self.shop_base_url)));
        self.tera.render(CARD_TEMPLATE, &context)
    }
}

// Tera's autoescape also rewrites `/`, which mangles URLs and "N/A"; escape only
// what can break out of a double-quoted attribute.
fn escape_markup(raw: &str) -> String {
    raw.replace('&', "&amp;").replace('"', "&quot;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::{CardRenderer, CARD_MARKER};
    use crate::domain::product::{Product, ProductHandle};

    fn red_hat(images: Vec<String>, prices: Vec<String>) -> Product {
        Product {
            title: "Red Hat".to_string(),
            handle: ProductHandle("red-hat".to_string()),
            description: Some("<p>Wool</p>".to_string()),
            variant_prices: prices,
            image_urls: images,
        }
    }

    #[test]
    fn card_contains_image_price_and_link() {
        let renderer = CardRenderer::new("https://shop.example.com", 100).expect("template");
        let card = renderer
            .render(&red_hat(vec!["https://cdn.example.com/img1.jpg".into()], vec!["9.99".into()]))
            .expect("render");

        assert!(card.contains(r#"<img src="https://cdn.example.com/img1.jpg" width="100""#));
        assert!(card.contains("Price: 9.99"));
        assert!(card.contains(r#"href="https://shop.example.com/products/red-hat""#));
        assert!(card.contains("View Product"));
        assert!(card.contains(CARD_MARKER));
    }

    #[test]
    fn card_without_images_or_prices_omits_image_and_shows_placeholder() {
        let renderer = CardRenderer::new("https://shop.example.com", 100).expect("template");
        let card = renderer.render(&red_hat(vec![], vec![])).expect("render");

        assert!(!card.contains("<img"));
        assert!(card.contains("Price: N/A"));
    }

    #[test]
    fn titles_and_urls_are_escaped() {
        let renderer = CardRenderer::new("https://shop.example.com", 100).expect("template");
        let mut product = red_hat(vec!["img.jpg?a=1&b=\"2\"".into()], vec![]);
        product.title = "<script>x</script>".to_string();

        let card = renderer.render(&product).expect("render");

        assert!(!card.contains("<script>"));
        assert!(card.contains(r#"src="img.jpg?a=1&amp;b=&quot;2&quot;""#));
    }
}
