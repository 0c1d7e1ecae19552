//! Request-body stage for create/update: accepts multipart (with an optional
//! `image` file), JSON or urlencoded bodies and validates the image before
//! the event operation runs.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use bytes::{Bytes, BytesMut};
use serde_json::{Map, Value};

use super::response::{json_rejection_message, ApiError};
use crate::service::EventInput;
use crate::uploads::{check_image_type, size_exceeded, ImageUpload, IMAGE_FIELD};
use crate::AppState;

const UNSUPPORTED_CONTENT_TYPE: &str = concat!(
    "Unsupported Content-Type: expected multipart/form-data, ",
    "application/json or application/x-www-form-urlencoded"
);

/// Parsed create/update body.
#[derive(Debug, Default)]
pub struct EventForm {
    pub input: EventInput,
    pub image: Option<ImageUpload>,
}

#[axum::async_trait]
impl FromRequest<Arc<AppState>> for EventForm {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, ApiError> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state).await.map_err(|e| {
                ApiError::bad_request(format!("Invalid multipart data: {}", e.body_text()))
            })?;
            return from_multipart(multipart, state.uploads.max_size()).await;
        }

        if content_type.starts_with("application/json") {
            let Json(object) = Json::<Map<String, Value>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(json_rejection_message(&e)))?;
            return Ok(EventForm {
                input: input_from_json(object),
                image: None,
            });
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| {
                    ApiError::bad_request(format!("Invalid form body: {}", e.body_text()))
                })?;
            let mut input = EventInput::default();
            for (name, value) in fields {
                input.set(&name, value);
            }
            return Ok(EventForm { input, image: None });
        }

        // A body-less request carries no fields at all
        let body = Bytes::from_request(req, state).await.map_err(|e| {
            ApiError::bad_request(format!("Failed to read request body: {}", e.body_text()))
        })?;
        if body.is_empty() {
            Ok(EventForm::default())
        } else {
            Err(ApiError::bad_request(UNSUPPORTED_CONTENT_TYPE))
        }
    }
}

async fn from_multipart(mut multipart: Multipart, max_size: u64) -> Result<EventForm, ApiError> {
    let mut form = EventForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        if field_name != IMAGE_FIELD {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("Invalid {field_name}: {e}")))?;
            form.input.set(&field_name, text);
            continue;
        }

        // Browsers submit an empty, unnamed part when no file was chosen
        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };

        if form.image.is_some() {
            return Err(ApiError::bad_request("Only one image file is allowed"));
        }

        let content_type = field.content_type().map(|s| s.to_string());
        check_image_type(&file_name, content_type.as_deref())?;

        let mut buf = BytesMut::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read image: {e}")))?
        {
            if (buf.len() + chunk.len()) as u64 > max_size {
                return Err(size_exceeded(max_size).into());
            }
            buf.extend_from_slice(&chunk);
        }

        form.image = Some(ImageUpload::new(
            &file_name,
            content_type.as_deref(),
            buf.freeze(),
            max_size,
        )?);
    }

    Ok(form)
}

/// Flatten a JSON object into text fields. `null` counts as absent.
fn input_from_json(object: Map<String, Value>) -> EventInput {
    let mut input = EventInput::default();
    for (name, value) in object {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s,
            other => other.to_string(),
        };
        input.set(&name, text);
    }
    input
}
