use super::llm::{extract_json_array, extract_json_object, CompletionModel};
use crate::error::StudyError;
use crate::models::QaPair;
use serde::Deserialize;

const QA_TEMPERATURE: f32 = 0.4;
const QA_MAX_TOKENS: u32 = 1000;
const ANSWER_TEMPERATURE: f32 = 0.1;
const ANSWER_MAX_TOKENS: u32 = 500;
const QUESTIONS_TEMPERATURE: f32 = 0.7;
const QUESTIONS_MAX_TOKENS: u32 = 1024;

/// Some models wrap the array in an envelope instead of returning it bare.
#[derive(Debug, Deserialize)]
struct QaEnvelope {
    qa_pairs: Vec<QaPair>,
}

/// Generates up to `num_pairs` question/answer pairs over `text`. Extra
/// pairs beyond the requested count are discarded.
pub async fn generate_qa_pairs(
    model: &dyn CompletionModel,
    text: &str,
    num_pairs: usize,
) -> Result<Vec<QaPair>, StudyError> {
    let prompt = format!(
        "Generate exactly {num_pairs} question and answer pairs about the following study \
         material. Respond with only a JSON array of objects, each with a \"question\" field \
         and an \"answer\" field.\n\n{text}"
    );

    let reply = model.complete(&prompt, QA_TEMPERATURE, QA_MAX_TOKENS).await?;

    let mut pairs = parse_qa_pairs(&reply)?;
    pairs.truncate(num_pairs);
    Ok(pairs)
}

fn parse_qa_pairs(reply: &str) -> Result<Vec<QaPair>, StudyError> {
    if let Ok(pairs) = serde_json::from_str::<Vec<QaPair>>(reply) {
        return Ok(pairs);
    }

    if let Ok(envelope) = serde_json::from_str::<QaEnvelope>(reply) {
        return Ok(envelope.qa_pairs);
    }

    if let Some(extracted) = extract_json_array(reply) {
        if let Ok(pairs) = serde_json::from_str::<Vec<QaPair>>(extracted) {
            return Ok(pairs);
        }
    }

    if let Some(extracted) = extract_json_object(reply) {
        if let Ok(envelope) = serde_json::from_str::<QaEnvelope>(extracted) {
            return Ok(envelope.qa_pairs);
        }
    }

    Err(StudyError::MalformedOutput(
        "reply contains no question and answer pairs".to_string(),
    ))
}

/// Answers a question strictly from retrieved context, at low temperature
/// so the model stays close to the source.
pub async fn answer_from_context(
    model: &dyn CompletionModel,
    question: &str,
    context: &str,
) -> Result<String, StudyError> {
    let prompt = format!(
        "Answer the question using only the provided context. If the context does not contain \
         the answer, say that it does not.\n\nContext:\n{context}\n\nQuestion: {question}"
    );

    model
        .complete(&prompt, ANSWER_TEMPERATURE, ANSWER_MAX_TOKENS)
        .await
}

/// Free-form practice questions of a requested style and difficulty. The
/// reply is returned as prose, not parsed.
pub async fn generate_questions(
    model: &dyn CompletionModel,
    text: &str,
    question_type: &str,
    difficulty: &str,
) -> Result<String, StudyError> {
    let prompt = format!(
        "Write {difficulty} difficulty {question_type} practice questions covering the \
         following study material. Number each question.\n\n{text}"
    );

    model
        .complete(&prompt, QUESTIONS_TEMPERATURE, QUESTIONS_MAX_TOKENS)
        .await
}

#[cfg(test)]
mod tests {
    use super::{generate_qa_pairs, parse_qa_pairs};
    use crate::error::StudyError;
    use crate::study::llm::CompletionModel;
    use async_trait::async_trait;

    struct FixedModel {
        reply: String,
    }

    #[async_trait]
    impl CompletionModel for FixedModel {
        async fn complete(
            &self,
            _prompt: &str,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, StudyError> {
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn bare_array_parses() {
        let pairs =
            parse_qa_pairs(r#"[{"question": "What is entropy?", "answer": "Disorder."}]"#).unwrap();

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question, "What is entropy?");
    }

    #[test]
    fn enveloped_array_parses() {
        let pairs = parse_qa_pairs(
            r#"{"qa_pairs": [{"question": "Q?", "answer": "A."}, {"question": "Q2?", "answer": "A2."}]}"#,
        )
        .unwrap();

        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn fenced_envelope_parses_via_extraction() {
        let reply = "Here are your pairs:\n```json\n{\"qa_pairs\": [{\"question\": \"Q?\", \"answer\": \"A.\"}]}\n```";
        let pairs = parse_qa_pairs(reply).unwrap();

        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn prose_reply_is_malformed() {
        let result = parse_qa_pairs("Q: What is entropy? A: Disorder.");
        assert!(matches!(result, Err(StudyError::MalformedOutput(_))));
    }

    #[tokio::test]
    async fn surplus_pairs_are_truncated_to_the_request() {
        let model = FixedModel {
            reply: r#"[
                {"question": "Q1?", "answer": "A1."},
                {"question": "Q2?", "answer": "A2."},
                {"question": "Q3?", "answer": "A3."}
            ]"#
            .to_string(),
        };

        let pairs = generate_qa_pairs(&model, "material", 2).await.unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].question, "Q2?");
    }
}
