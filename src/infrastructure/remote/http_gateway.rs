use crate::application::ports::mutation_gateway::{
    DomainMutationGateway, RemoteError, RemoteMutationRequest,
};
use crate::domain::entities::AttachmentRef;
use crate::domain::value_objects::{EntityKind, RemoteId};
use crate::shared::config::RemoteConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::{Map, Value};
use std::time::Duration;

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";
const ATTACHMENT_FIELD: &str = "attachment";

/// Domain mutation endpoint over HTTP. One POST per replayed record.
pub struct HttpMutationGateway {
    client: reqwest::Client,
    base_url: String,
    expense_path: String,
    trip_path: String,
}

impl HttpMutationGateway {
    pub fn new(config: &RemoteConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            expense_path: config.expense_path.clone(),
            trip_path: config.trip_path.clone(),
        })
    }

    pub fn endpoint(&self, kind: EntityKind) -> String {
        let path = match kind {
            EntityKind::Expense => &self.expense_path,
            EntityKind::Trip => &self.trip_path,
        };
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl DomainMutationGateway for HttpMutationGateway {
    async fn submit(&self, request: RemoteMutationRequest) -> Result<RemoteId, RemoteError> {
        let url = self.endpoint(request.kind);
        let builder = self
            .client
            .post(&url)
            .header(IDEMPOTENCY_HEADER, request.idempotency_key.as_str());

        let builder = match request.attachment {
            Some(attachment) => builder.multipart(build_form(request.fields, attachment)?),
            None => builder.json(&Value::Object(request.fields)),
        };

        let response = builder.send().await.map_err(|err| {
            tracing::debug!(target: "outbox::replayer", url = %url, error = %err, "request did not complete");
            RemoteError::Transport(err.to_string())
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| RemoteError::Transport(err.to_string()))?;

        interpret_response(status, &body)
    }
}

fn build_form(fields: Map<String, Value>, attachment: AttachmentRef) -> Result<Form, RemoteError> {
    let mut form = Form::new();
    for (key, value) in fields {
        form = form.text(key, form_value(value));
    }

    let part = Part::bytes(attachment.bytes.to_vec()).file_name(attachment.file_name);
    let part = match attachment.content_type {
        Some(content_type) => part.mime_str(&content_type).map_err(|err| {
            RemoteError::Validation(format!("Invalid attachment content type: {err}"))
        })?,
        None => part,
    };

    Ok(form.part(ATTACHMENT_FIELD, part))
}

fn form_value(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Classifies a completed HTTP exchange.
///
/// Only 400, 409 and 422 reject the record itself. Every other non-2xx status (auth, routing,
/// throttling, server trouble) says nothing about the content, so the record is retried on a
/// later cycle.
pub fn interpret_response(status: u16, body: &str) -> Result<RemoteId, RemoteError> {
    match status {
        200..=299 => {
            let id = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|value| match value.get("id") {
                    Some(Value::String(id)) => Some(id.clone()),
                    Some(Value::Number(id)) => Some(id.to_string()),
                    _ => None,
                })
                .ok_or_else(|| {
                    RemoteError::Transport(format!(
                        "server accepted the request ({status}) without returning an id"
                    ))
                })?;
            RemoteId::new(id).map_err(RemoteError::Transport)
        }
        400 | 409 | 422 => Err(RemoteError::Validation(
            rejection_message(body)
                .unwrap_or_else(|| format!("Request rejected with status {status}")),
        )),
        _ => Err(RemoteError::Transport(format!(
            "server responded with status {status}"
        ))),
    }
}

fn rejection_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => {
            let message = match value.get("error") {
                Some(Value::String(error)) => Some(error),
                Some(Value::Object(error)) => match error.get("message") {
                    Some(Value::String(message)) => Some(message),
                    _ => None,
                },
                _ => None,
            }
            .or_else(|| match value.get("message") {
                Some(Value::String(message)) => Some(message),
                _ => None,
            });
            Some(message.cloned().unwrap_or_else(|| trimmed.to_string()))
        }
        Err(_) => Some(trimmed.to_string()),
    }
}
