use storefront_core::config::{EnhancerConfig, MatchStrategy};

use crate::llm::ChatMessage;

const ASSISTANT_ROLE: &str = "You're a Shopify assistant providing product info and taking notes. \
Use shopify_products for questions about products, prices and availability. \
Use shopify_orders for questions about orders; pass order_id when the shopper names one. \
Use note_saver when the shopper asks you to remember or write something down. \
Answer only from tool results and never invent products or prices.";

/// System prompt for the agent, with product-naming instructions matching the
/// enhancer's mention strategy.
pub fn system_prompt(enhancer: &EnhancerConfig) -> String {
    let naming = match enhancer.strategy {
        MatchStrategy::Marker => format!(
            "When you mention a product, write its exact catalog title wrapped in \
             <{tag}></{tag}> on its own line, for example <{tag}>Blue Mug</{tag}>. \
             Do not add images or links yourself; the storefront adds them.",
            tag = enhancer.marker_tag
        ),
        MatchStrategy::TitleLine => "When you mention a product, start a new line with its exact \
             catalog title in bold followed by \" - Price: \" and the price, for example \
             **Blue Mug** - Price: 12.00. Do not add images or links yourself."
            .to_string(),
    };
    format!("{ASSISTANT_ROLE}\n\n{naming}")
}

/// Model-facing history: the system prompt followed by every exchanged message,
/// tool calls and tool results included.
#[derive(Clone, Debug, PartialEq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self { messages: vec![ChatMessage::system(system_prompt)] }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Drops everything after the first `len` messages. The system prompt is kept.
    pub fn rollback(&mut self, len: usize) {
        self.messages.truncate(len.max(1));
    }
}

#[cfg(test)]
mod tests {
    use storefront_core::config::{EnhancerConfig, MatchStrategy};

    use super::{system_prompt, Conversation};
    use crate::llm::{ChatMessage, MessageRole};

    fn enhancer(strategy: MatchStrategy) -> EnhancerConfig {
        EnhancerConfig { strategy, marker_tag: "h3".to_string(), image_width: 100 }
    }

    #[test]
    fn marker_prompt_names_the_configured_tag() {
        let prompt = system_prompt(&enhancer(MatchStrategy::Marker));

        assert!(prompt.contains("<h3>Blue Mug</h3>"));
        assert!(prompt.contains("shopify_orders"));
    }

    #[test]
    fn title_line_prompt_asks_for_bold_titles() {
        let prompt = system_prompt(&enhancer(MatchStrategy::TitleLine));

        assert!(prompt.contains("**Blue Mug** - Price: 12.00"));
        assert!(!prompt.contains("<h3>"));
    }

    #[test]
    fn rollback_never_drops_the_system_prompt() {
        let mut conversation = Conversation::new("be helpful");
        conversation.push(ChatMessage::user("hi"));
        conversation.push(ChatMessage::assistant("hello"));

        conversation.rollback(0);

        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0].role, MessageRole::System);
    }
}
