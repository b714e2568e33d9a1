//! Helpers for sanitizing data before it enters prompts or tracing spans.

use std::path::Path;

/// Sanitizes text for safe inclusion in LLM prompts.
///
/// Escapes ChatML tokens (`<|...|>`) and common instruction tokens so
/// document content cannot smuggle instructions into the conversation.
///
/// # Sequences Escaped
/// - `<|...|>` - ChatML special tokens (system, user, assistant markers)
/// - `<s>`, `</s>` - Sequence boundaries
/// - `[INST]`, `[/INST]` - Llama-style instruction markers
/// - `<<SYS>>`, `<</SYS>>` - Llama-style system prompt markers
pub fn sanitize_for_prompt(text: &str) -> String {
    text.replace("<|", "< |")
        .replace("|>", "| >")
        .replace("<s>", "< s >")
        .replace("</s>", "< / s >")
        .replace("[INST]", "[ INST ]")
        .replace("[/INST]", "[ / INST ]")
        .replace("<<SYS>>", "< < SYS > >")
        .replace("<</SYS>>", "< < / SYS > >")
}

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields — reveals file name without exposing the full path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}
