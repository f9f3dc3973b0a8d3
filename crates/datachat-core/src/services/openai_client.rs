use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use super::assistant_service::{
    Assistant, AssistantError, AssistantResult, AssistantService, FilePurpose, MessageHandle,
    RunEventStream, ThreadHandle, UploadedFile,
};
use super::run_events::{ApiErrorBody, RunEventDecoder};
use crate::config::{AppConfig, Secrets};
use crate::models::Role;

const ASSISTANTS_BETA_HEADER: &str = "openai-beta";
const ASSISTANTS_BETA_VALUE: &str = "assistants=v2";

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

/// Assistants API v2 client over reqwest
#[derive(Clone)]
pub struct OpenAiAssistantClient {
    http: Client,
    base_url: String,
}

impl OpenAiAssistantClient {
    pub fn new(api_key: &str, base_url: &str) -> AssistantResult<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| AssistantError::Stream(format!("invalid API key header: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ASSISTANTS_BETA_HEADER,
            HeaderValue::from_static(ASSISTANTS_BETA_VALUE),
        );

        let http = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(secrets: &Secrets, config: &AppConfig) -> AssistantResult<Self> {
        Self::new(secrets.api_key(), &config.api_base)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and fail on any non-success status, keeping the
    /// service's error message.
    async fn send(&self, request: RequestBuilder) -> AssistantResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(|e| e.error.message)
            .unwrap_or(body);
        error!(status = status.as_u16(), message = %message, "Assistant API request failed");
        Err(AssistantError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> AssistantResult<T> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl AssistantService for OpenAiAssistantClient {
    async fn retrieve_assistant(&self, assistant_id: &str) -> AssistantResult<Assistant> {
        debug!(assistant_id = %assistant_id, "Retrieving assistant");
        self.send_json(self.http.get(self.url(&format!("assistants/{}", assistant_id))))
            .await
    }

    async fn create_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        purpose: FilePurpose,
    ) -> AssistantResult<UploadedFile> {
        let len = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = Form::new()
            .text("purpose", purpose.as_str())
            .part("file", part);

        let file: UploadedFile = self
            .send_json(self.http.post(self.url("files")).multipart(form))
            .await?;
        info!(file_id = %file.id, bytes = len, "Uploaded file");
        Ok(file)
    }

    async fn update_code_interpreter_files(
        &self,
        assistant_id: &str,
        file_ids: &[String],
    ) -> AssistantResult<Assistant> {
        let body = serde_json::json!({
            "tool_resources": {
                "code_interpreter": { "file_ids": file_ids }
            }
        });
        self.send_json(
            self.http
                .post(self.url(&format!("assistants/{}", assistant_id)))
                .json(&body),
        )
        .await
    }

    async fn create_thread(&self) -> AssistantResult<ThreadHandle> {
        self.send_json(self.http.post(self.url("threads")).json(&serde_json::json!({})))
            .await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> AssistantResult<MessageHandle> {
        let body = serde_json::json!({ "role": role.as_str(), "content": content });
        self.send_json(
            self.http
                .post(self.url(&format!("threads/{}/messages", thread_id)))
                .json(&body),
        )
        .await
    }

    async fn stream_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        temperature: f32,
    ) -> AssistantResult<RunEventStream> {
        let body = serde_json::json!({
            "assistant_id": assistant_id,
            "temperature": temperature,
            "stream": true,
        });
        let response = self
            .send(
                self.http
                    .post(self.url(&format!("threads/{}/runs", thread_id)))
                    .json(&body),
            )
            .await?;
        info!(thread_id = %thread_id, "Run stream opened");

        let mut sse = Box::pin(response.bytes_stream().eventsource());
        let stream: RunEventStream = Box::pin(async_stream::stream! {
            let mut decoder = RunEventDecoder::new();
            while let Some(event) = sse.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        yield Err(AssistantError::Stream(e.to_string()));
                        return;
                    }
                };
                match decoder.feed(&event.event, &event.data) {
                    Ok(decoded) => {
                        for item in decoded {
                            yield Ok(item);
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Run stream reported a failure");
                        yield Err(e);
                        return;
                    }
                }
                if decoder.is_finished() {
                    return;
                }
            }
            yield Err(AssistantError::Stream(
                "stream closed before the run completed".to_string(),
            ));
        });

        Ok(stream)
    }

    async fn file_content(&self, file_id: &str) -> AssistantResult<Vec<u8>> {
        let response = self
            .send(self.http.get(self.url(&format!("files/{}/content", file_id))))
            .await?;
        Ok(response.bytes().await?.to_vec())
    }
}
