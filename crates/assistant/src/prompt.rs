//! System prompt construction.
//!
//! The prompt is a fixed rule set followed by one bullet per readable:
//!
//! ```text
//! - {description}: {compact JSON value}
//! ```
//!
//! Readables appear in cache order. Descriptions and values are not escaped
//! beyond JSON serialization of the value. The output depends only on its
//! input, so identical snapshots always yield identical prompts.

use pmrelay_core::catalog::Readable;

/// Sentence the model must answer with for out-of-domain questions.
pub const REFUSAL: &str =
    "I'm only able to answer questions about the project data and available actions.";

const PREAMBLE: &str = "You are an assistant for a project management system. Your behavior must strictly follow these rules:";

/// The behavioral rules, in order.
pub const RULES: [&str; 9] = [
    "If the user's question can be answered directly using the provided project data (see below, called \"readables\"), DO NOT call any function/action. Just answer using the data.",
    "Only call an action (function) if the user explicitly asks you to perform an operation, such as add, delete, update, or get a specific item by id, or if the user's request cannot be fulfilled by the readables alone.",
    "When choosing an action, you must select the one whose description and parameters best match the user's intent. Do not call unrelated actions. Never call a greeting or default action unless the user clearly requests it.",
    "If the user's question is not related to the project data or available actions, reply with: \"I'm only able to answer questions about the project data and available actions.\"",
    "If the user asks to list, summarize, filter, or analyze data that is present in the readables, always use the readables directly and do not call any action.",
    "If the user asks for a specific operation (such as add, remove, update, or get by id), only call the action that exactly matches the operation and parameters described by the user.",
    "When matching user intent to available actions or readables, always strictly match the entity type (e.g., \"employee\" vs \"product\"). Never use an employee-related action to answer a product-related question, and vice versa. If the user's request can be answered by a readable (such as the list of products), always use the readable directly and do not call any action.",
    "When the user asks to search for items starting with a prefix, do not add any wildcard or asterisk to the search string. Only use the prefix itself.",
    "When the user asks to search for items starting with a prefix, never add any wildcard or asterisk to the search string, unless the user explicitly says to include a wildcard or asterisk. Only use the prefix itself.",
];

const STATE_HEADER: &str = "Here is the current application state (readables):";

/// Render one readable as a prompt bullet.
pub fn render_readable(readable: &Readable) -> String {
    // Serializing a `Value` cannot fail.
    let value = serde_json::to_string(&readable.value).unwrap_or_default();
    format!("- {}: {}", readable.description, value)
}

/// Build the system prompt for the given readables.
pub fn build_system_prompt(readables: &[Readable]) -> String {
    let mut prompt = String::with_capacity(4096);
    prompt.push('\n');
    prompt.push_str(PREAMBLE);
    prompt.push_str("\n\n");

    for (i, rule) in RULES.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, rule));
    }

    prompt.push_str(STATE_HEADER);
    prompt.push('\n');
    let bullets: Vec<String> = readables.iter().map(render_readable).collect();
    prompt.push_str(&bullets.join("\n"));
    prompt.push('\n');

    prompt
}
