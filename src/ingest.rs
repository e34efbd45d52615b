//! Inbound request decoding
//!
//! Normalizes the two accepted payload encodings (multipart form uploads and
//! JSON bodies) into one [`ParsedForm`], enforcing the
//! exactly-one-of-image-or-ingredients invariant before the pipeline runs.

use crate::image::mime::detect_image_mime;
use crate::models::{ImageSource, Language, ParsedForm, DEFAULT_CUISINE};
use crate::{Error, Result};
use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{header, HeaderMap};
use base64::Engine as _;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonPayload {
    #[serde(default)]
    ingredients: Vec<String>,
    image: Option<String>,
    language: Option<String>,
    cuisine_type: Option<String>,
}

/// Decode an inbound request body into a normalized form.
pub async fn parse_request(headers: &HeaderMap, body: &[u8]) -> Result<ParsedForm> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let lowered = content_type.to_ascii_lowercase();

    if lowered.starts_with("multipart/form-data") {
        let raw = if is_base64_transport(headers) {
            decode_transport_base64(body)?
        } else {
            body.to_vec()
        };
        parse_multipart(&content_type, raw).await
    } else if lowered.starts_with("application/json") {
        parse_json(body)
    } else {
        Err(Error::InvalidRequest(format!(
            "Unsupported content type: {}",
            if content_type.is_empty() {
                "(none)"
            } else {
                &content_type
            }
        )))
    }
}

/// Serverless platforms hand binary bodies over base64-encoded; callers
/// following that convention mark it with `Content-Transfer-Encoding`.
fn is_base64_transport(headers: &HeaderMap) -> bool {
    headers
        .get("content-transfer-encoding")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("base64"))
}

fn decode_transport_base64(body: &[u8]) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(body)
        .map_err(|_| Error::InvalidRequest("Base64-transported body is not text".to_string()))?;
    base64::engine::general_purpose::STANDARD
        .decode(text.trim())
        .map_err(|e| {
            Error::InvalidRequest(format!("Base64-transported body could not be decoded: {}", e))
        })
}

async fn parse_multipart(content_type: &str, body: Vec<u8>) -> Result<ParsedForm> {
    // Rebuild a request so the multipart extractor can stream the buffered
    // body; the boundary lives in the content-type header.
    let request = Request::builder()
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .map_err(|e| Error::Invariant(format!("Failed to rebuild multipart request: {}", e)))?;

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| Error::InvalidRequest(format!("Malformed multipart body: {}", e)))?;

    let mut image: Option<ImageSource> = None;
    let mut language = Language::default();
    let mut cuisine_type = DEFAULT_CUISINE.to_string();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(format!("Malformed multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                if image.is_some() {
                    // only the first file is kept; drain later ones
                    // chunk-by-chunk without buffering
                    while field
                        .chunk()
                        .await
                        .map_err(|e| {
                            Error::InvalidRequest(format!("Malformed multipart field: {}", e))
                        })?
                        .is_some()
                    {}
                    continue;
                }

                let declared_mime = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| {
                        Error::InvalidRequest(format!("Failed to read image field: {}", e))
                    })?
                    .to_vec();
                let mime_type =
                    declared_mime.unwrap_or_else(|| detect_image_mime(&bytes).to_string());
                image = Some(ImageSource::Bytes { bytes, mime_type });
            }
            // repeated scalar fields: last value wins
            "language" => language = Language::from_code(&read_text_field(field).await?),
            "cuisineType" => cuisine_type = read_text_field(field).await?,
            _ => {}
        }
    }

    if image.is_none() {
        return Err(Error::InvalidRequest("No image uploaded".to_string()));
    }

    Ok(ParsedForm {
        image,
        language,
        cuisine_type,
        ingredients: Vec::new(),
    })
}

async fn read_text_field(field: Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| Error::InvalidRequest(format!("Failed to read form field: {}", e)))
}

fn parse_json(body: &[u8]) -> Result<ParsedForm> {
    let payload: JsonPayload = serde_json::from_slice(body)
        .map_err(|e| Error::InvalidRequest(format!("Malformed JSON body: {}", e)))?;

    let image = payload.image.as_deref().map(parse_image_value).transpose()?;
    let ingredients: Vec<String> = payload
        .ingredients
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    match (&image, ingredients.is_empty()) {
        (None, true) => Err(Error::InvalidRequest(
            "Either an image or a non-empty ingredients list is required".to_string(),
        )),
        (Some(_), false) => Err(Error::InvalidRequest(
            "Send either an image or an ingredients list, not both".to_string(),
        )),
        _ => Ok(ParsedForm {
            image,
            language: payload
                .language
                .as_deref()
                .map(Language::from_code)
                .unwrap_or_default(),
            cuisine_type: payload
                .cuisine_type
                .filter(|cuisine| !cuisine.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CUISINE.to_string()),
            ingredients,
        }),
    }
}

/// Accepts either a `data:` URL carrying the bytes inline or a remote URL
/// the generation service can fetch itself.
fn parse_image_value(value: &str) -> Result<ImageSource> {
    if let Some(rest) = value.strip_prefix("data:") {
        let (meta, data) = rest
            .split_once(',')
            .ok_or_else(|| Error::InvalidRequest("Malformed data URL".to_string()))?;
        let mime = meta.strip_suffix(";base64").ok_or_else(|| {
            Error::InvalidRequest("Only base64 data URLs are supported".to_string())
        })?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| Error::InvalidRequest(format!("Invalid base64 image data: {}", e)))?;
        let mime_type = if mime.is_empty() {
            detect_image_mime(&bytes).to_string()
        } else {
            mime.to_string()
        };
        Ok(ImageSource::Bytes { bytes, mime_type })
    } else if value.starts_with("http://") || value.starts_with("https://") {
        Ok(ImageSource::Url(value.to_string()))
    } else {
        Err(Error::InvalidRequest(
            "Image must be a data URL or an http(s) URL".to_string(),
        ))
    }
}
