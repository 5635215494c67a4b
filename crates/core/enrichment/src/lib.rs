#[macro_use]
extern crate async_trait;

#[macro_use]
extern crate serde;

mod http;
mod parse;
mod reference;

pub use http::*;
pub use parse::*;
pub use reference::*;

use vigil_result::Result;

/// System instruction for the stage-1 short summary
pub static SUMMARY_SYSTEM_PROMPT: &str = "You summarise community incident reports. \
    Write a neutral, factual summary of the report in at most three sentences. \
    Use only the text provided. Do not speculate and do not reference any images.";

/// Marker the model is instructed to emit between narrative and JSON
pub static EXTRACTED_SENTINEL: &str = "=====EXTRACTED=====";

/// System instruction for the stage-2 full forensic report
pub static FULL_REPORT_SYSTEM_PROMPT: &str = "You write forensic incident reports for \
    law enforcement review. Respond with exactly one narrative paragraph describing the \
    incident, with no headings, markdown or labels. After the paragraph, emit a line \
    containing only the marker =====EXTRACTED===== followed by one strict JSON object \
    with exactly these keys: weapons (array of strings), vehicleTypes (array of \
    strings), licensePlates (array of strings), suspectsCount (number), facesDetected \
    (number), ocrText (string), confidenceScore (number between 0 and 1). Emit nothing \
    after the JSON object.";

/// Image inlined into a multimodal completion request
#[derive(Debug, Clone)]
pub struct InlineImage {
    /// Content type of the original object
    pub content_type: String,
    /// Base64-encoded payload
    pub data: String,
}

/// Completion service used by the enrichment workflow
///
/// Callers must treat every failure as recoverable: report visibility
/// never depends on this service being available.
#[async_trait]
pub trait AbstractLanguageModel: Sync + Send {
    /// Request a completion for the given instruction and prompt,
    /// optionally attaching inline images
    async fn complete(&self, system: &str, prompt: &str, images: &[InlineImage])
        -> Result<String>;
}

/// Language model service
#[derive(Clone)]
pub enum LanguageModel {
    /// Scripted mock model
    Reference(ReferenceModel),
    /// OpenAI-compatible HTTP API
    Http(HttpLanguageModel),
}

impl std::ops::Deref for LanguageModel {
    type Target = dyn AbstractLanguageModel;

    fn deref(&self) -> &Self::Target {
        match self {
            LanguageModel::Reference(model) => model,
            LanguageModel::Http(model) => model,
        }
    }
}
