use std::time::Duration;

use lazy_static::lazy_static;
use reqwest::Client;
use vigil_config::config;
use vigil_result::{create_error, Result};

use crate::{AbstractLanguageModel, InlineImage};

lazy_static! {
    static ref CLIENT: Client = reqwest::Client::builder()
        .user_agent("Mozilla/5.0 (compatible; Vigil/0.1; +https://github.com/vigil-app/backend)")
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(5))
        .build()
        .expect("reqwest Client");
}

/// Completion request body (OpenAI-compatible)
#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Vec<Content>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Content {
    Text {
        text: String,
    },
    ImageUrl {
        image_url: ImageUrl,
    },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

/// Completion response body (OpenAI-compatible)
#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Driver for any OpenAI-compatible chat completions API
#[derive(Clone, Default)]
pub struct HttpLanguageModel;

#[async_trait]
impl AbstractLanguageModel for HttpLanguageModel {
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        images: &[InlineImage],
    ) -> Result<String> {
        let config = config().await;

        let mut user_content = vec![Content::Text {
            text: prompt.to_string(),
        }];

        for image in images {
            user_content.push(Content::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:{};base64,{}", image.content_type, image.data),
                },
            });
        }

        let body = CompletionRequest {
            model: &config.ai.model,
            messages: vec![
                Message {
                    role: "system",
                    content: vec![Content::Text {
                        text: system.to_string(),
                    }],
                },
                Message {
                    role: "user",
                    content: user_content,
                },
            ],
        };

        let response = CLIENT
            .post(format!("{}/chat/completions", config.ai.endpoint))
            .bearer_auth(&config.ai.api_key)
            .timeout(Duration::from_secs(config.ai.timeout))
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                tracing::warn!("Completion request failed: {err:?}");
                create_error!(EnrichmentFailed)
            })?;

        if !response.status().is_success() {
            tracing::warn!("Completion request rejected: {}", response.status());
            return Err(create_error!(EnrichmentFailed));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|_| create_error!(EnrichmentFailed))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| create_error!(EnrichmentFailed))
    }
}
