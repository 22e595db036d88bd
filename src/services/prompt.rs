use crate::domains::message::Message;

/// Fixed persona for every reply. The product assumes a single prompting
/// strategy, so this is a constant rather than configuration.
pub const SYSTEM_PERSONA: &str = "You are a helpful and empathetic AI customer support assistant for an e-commerce company. Your role is to:

1. Understand customer queries and provide accurate, helpful information
2. Be polite, professional, and empathetic
3. Provide step-by-step solutions when needed
4. If you don't know something, admit it and offer to escalate to a human agent
5. Keep responses concise but comprehensive
6. Use markdown formatting for better readability

Guidelines:
- Always greet customers warmly
- Listen carefully to their concerns
- Provide clear, actionable solutions
- Confirm understanding before offering solutions
- End conversations positively";

pub const NO_HISTORY: &str = "No previous conversation.";

pub const AFFIRMATIVE_TOKEN: &str = "YES";

/// Renders history as `Customer:`/`Assistant:` lines, oldest first.
pub fn render_history(messages: &[Message]) -> String {
    if messages.is_empty() {
        return NO_HISTORY.to_string();
    }
    messages
        .iter()
        .map(|msg| format!("{}: {}", msg.role.prompt_label(), msg.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_reply_prompt(history: &str, user_text: &str) -> String {
    format!(
        "Current conversation:\n{history}\n\nCustomer: {user_text}\nAssistant:"
    )
}

pub fn build_summary_prompt(conversation_text: &str) -> String {
    format!(
        "Please provide a concise summary of the following customer support conversation. Include:
1. Main issue or question
2. Solutions attempted
3. Current status
4. What the customer needs

Conversation:
{conversation_text}

Summary:"
    )
}

pub fn build_escalation_prompt(conversation_text: &str) -> String {
    format!(
        "Based on this customer support conversation, should it be escalated to a human agent?
Consider:
- Customer frustration level
- Complexity of the issue
- Number of failed resolution attempts
- Urgency

Respond with only YES or NO.

Conversation:
{conversation_text}

Should escalate:"
    )
}

pub fn build_sentiment_prompt(message: &str) -> String {
    format!(
        "Analyze the sentiment of this customer message and respond with only one word: positive, negative, or neutral.

Message: {message}

Sentiment:"
    )
}
