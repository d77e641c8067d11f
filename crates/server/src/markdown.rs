//! Assistant replies are markdown with inline HTML (product cards); the browser
//! gets them as HTML.

use pulldown_cmark::{html, Options, Parser};

/// Renders assistant markdown to HTML. Raw HTML in the input, such as product
/// cards, passes through unchanged.
pub fn render(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES);
    let mut output = String::with_capacity(markdown.len() + markdown.len() / 4);
    html::push_html(&mut output, parser);
    output
}
