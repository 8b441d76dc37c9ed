use crate::error::PipelineError;
use base64::{engine::general_purpose::STANDARD, Engine};
use lopdf::Document;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extractors that cannot return a structured error signal failure in-band
/// by prefixing the text they hand over with this marker.
pub const OCR_ERROR_MARKER: &str = "Error:";

#[derive(Debug, Clone, Serialize)]
struct OcrRequest {
    pdf_base64: String,
    source_path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OcrResponse {
    pages: Option<Vec<OcrPage>>,
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OcrPage {
    #[serde(default)]
    markdown: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OcrEndpointConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl OcrEndpointConfig {
    /// Reads `OCR_ENDPOINT` and `OCR_API_KEY`. No endpoint, or a blank one,
    /// means no OCR fallback is available.
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("OCR_ENDPOINT").ok()?;
        let endpoint = endpoint.trim().to_string();
        if endpoint.is_empty() {
            return None;
        }

        let api_key = std::env::var("OCR_API_KEY")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|key| !key.is_empty());

        Some(Self { endpoint, api_key })
    }
}

pub trait PdfExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, PipelineError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, PipelineError> {
        let document =
            Document::load(path).map_err(|error| PipelineError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for page_no in document.get_pages().into_keys() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| PipelineError::PdfParse(error.to_string()))?;

            let text = text.trim();
            if !text.is_empty() {
                pages.push(text.to_string());
            }
        }

        if pages.is_empty() {
            return Err(PipelineError::PdfParse(format!(
                "pdf had no readable page text: {}",
                path.display()
            )));
        }

        Ok(pages.join("\n\n"))
    }
}

/// Extracts the full text of a PDF, native parsing first. Scanned PDFs that
/// lopdf cannot read fall back to a remote OCR endpoint when one is
/// configured; without one the parse error stands.
pub fn extract_document_text(path: &Path) -> Result<String, PipelineError> {
    let extracted = LopdfExtractor::default().extract_text(path);

    match extracted {
        Ok(text) => Ok(text),
        Err(PipelineError::PdfParse(parse_error)) => match extract_with_ocr(path) {
            Ok(Some(text)) => Ok(text),
            Ok(None) => Err(PipelineError::PdfParse(parse_error)),
            Err(ocr_error) => Err(PipelineError::PdfParse(format!(
                "{parse_error}; remote OCR fallback failed: {ocr_error}"
            ))),
        },
        Err(error) => Err(error),
    }
}

fn extract_with_ocr(path: &Path) -> Result<Option<String>, PipelineError> {
    tokio::task::block_in_place(|| extract_with_ocr_blocking(path))
}

fn extract_with_ocr_blocking(path: &Path) -> Result<Option<String>, PipelineError> {
    let config = match OcrEndpointConfig::from_env() {
        Some(config) => config,
        None => return Ok(None),
    };

    let pdf_bytes = std::fs::read(path).map_err(PipelineError::Io)?;
    let payload = OcrRequest {
        pdf_base64: STANDARD.encode(pdf_bytes),
        source_path: path.to_string_lossy().to_string(),
    };

    let mut request = Client::new().post(&config.endpoint).json(&payload);
    if let Some(api_key) = &config.api_key {
        request = request.bearer_auth(api_key);
    }

    let response = request.send()?;
    if !response.status().is_success() {
        return Err(PipelineError::OcrFailed(format!(
            "OCR request to {} returned {}",
            config.endpoint,
            response.status()
        )));
    }

    let payload: OcrResponse = response.json()?;
    let text = payload_to_text(&payload, path)?;

    Ok(Some(text))
}

fn payload_to_text(payload: &OcrResponse, path: &Path) -> Result<String, PipelineError> {
    if let Some(listed) = &payload.pages {
        let pages: Vec<&str> = listed
            .iter()
            .filter_map(|page| page.markdown.as_deref())
            .map(str::trim)
            .filter(|markdown| !markdown.is_empty())
            .collect();

        if !pages.is_empty() {
            return Ok(pages.join("\n\n"));
        }
    }

    if let Some(raw_text) = &payload.text {
        let pages: Vec<&str> = raw_text
            .split('\u{000c}')
            .map(str::trim)
            .filter(|chunk| !chunk.is_empty())
            .collect();

        if !pages.is_empty() {
            return Ok(pages.join("\n\n"));
        }
    }

    Err(PipelineError::OcrFailed(format!(
        "OCR response was empty for {}",
        path.display()
    )))
}
