//! The fixed instruction sent to the completion provider.

/// Sentence the model must reply with for off-topic questions.
pub const OFF_TOPIC_REPLY: &str = "I'm only able to answer geography-related questions.";

/// Substitute `question` into the geography-only instruction.
pub fn render(question: &str) -> String {
    format!(
        "You are a geography expert. You only answer questions strictly about geography.\n\
         \n\
         If the question is unrelated to geography, reply with:\n\
         \"{OFF_TOPIC_REPLY}\"\n\
         \n\
         Question: {question}\n"
    )
}
