use super::llm::CompletionModel;
use crate::error::StudyError;
use tracing::warn;

pub const SUMMARY_WINDOW_CHARS: usize = 700;
pub const SUMMARY_WINDOW_OVERLAP: usize = 50;

const SUMMARY_TEMPERATURE: f32 = 0.3;
const SUMMARY_MAX_TOKENS: u32 = 512;

/// Splits `text` into character windows of at most `max_chars`, carrying
/// `overlap` characters between consecutive windows so sentences cut at a
/// boundary still appear whole somewhere.
pub fn window_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let max_chars = max_chars.max(1);
    let step = max_chars.saturating_sub(overlap).max(1);

    let mut windows = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let end = (start + max_chars).min(chars.len());
        windows.push(chars[start..end].iter().collect());

        if end == chars.len() {
            break;
        }
        start += step;
    }

    windows
}

/// Summarizes a document window by window and joins the partial summaries.
/// A failed window degrades to an inline placeholder; only when every
/// window fails does the whole summary fail. Empty text summarizes to an
/// empty string without calling the model.
pub async fn generate_summary(
    model: &dyn CompletionModel,
    text: &str,
) -> Result<String, StudyError> {
    let windows = window_text(text, SUMMARY_WINDOW_CHARS, SUMMARY_WINDOW_OVERLAP);
    if windows.is_empty() {
        return Ok(String::new());
    }

    let mut parts = Vec::with_capacity(windows.len());
    let mut failures = 0usize;

    for (position, window) in windows.iter().enumerate() {
        let prompt = format!("Summarize the following text concisely:\n\n{window}");

        match model
            .complete(&prompt, SUMMARY_TEMPERATURE, SUMMARY_MAX_TOKENS)
            .await
        {
            Ok(summary) => parts.push(summary),
            Err(error) => {
                warn!(part = position + 1, %error, "summary window failed");
                failures += 1;
                parts.push(format!("[error summarizing part {}]", position + 1));
            }
        }
    }

    if failures == windows.len() {
        return Err(StudyError::BackendResponse {
            backend: "study llm".to_string(),
            details: "every summary window failed".to_string(),
        });
    }

    Ok(parts.join(" "))
}
