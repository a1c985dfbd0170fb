//! Request extractors whose rejections render as [`AppError`]

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Multipart, Request},
    http::{header, request::Parts},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as Json};

use crate::error::{AppError, AppResult};

/// JSON body; malformed input is a 422
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string; malformed input is a 422
pub struct AppQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) = axum::extract::Query::<T>::from_request_parts(parts, state).await?;
        Ok(AppQuery(value))
    }
}

/// An uploaded file
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Upload {
    /// Lower-case extension of the original file name
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    /// Image type read from the magic bytes: `png` or `jpg`
    pub fn image_kind(&self) -> Option<&'static str> {
        // PNG signature
        if self.data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some("png");
        }
        // JPEG: SOI marker followed by another marker
        if self.data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some("jpg");
        }
        None
    }

    /// A jpeg/png file name whose content really is a jpeg or png
    pub fn is_image(&self) -> bool {
        matches!(self.extension().as_deref(), Some("jpg" | "jpeg" | "png")) && self.image_kind().is_some()
    }
}

/// A JSON body or a multipart form, parsed into `T`
///
/// Multipart text fields become JSON strings (the lenient deserializers in
/// `validation::de` take care of numbers and booleans); file fields are
/// collected separately.
pub struct FormOrJson<T> {
    pub data: T,
    pub files: Vec<(String, Upload)>,
}

impl<T> FormOrJson<T> {
    /// Take the file uploaded under `name`
    pub fn file(&mut self, name: &str) -> Option<Upload> {
        let idx = self.files.iter().position(|(n, _)| n == name)?;
        Some(self.files.remove(idx).1)
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for FormOrJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if !is_multipart {
            let AppJson(data) = AppJson::<T>::from_request(req, state).await?;
            return Ok(Self { data, files: Vec::new() });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let (fields, files) = read_multipart(&mut multipart).await?;
        let data = serde_json::from_value(Json::Object(fields))
            .map_err(|e| AppError::invalid("body", e.to_string()))?;
        Ok(Self { data, files })
    }
}

/// Split a multipart form into text fields and files
pub async fn read_multipart(multipart: &mut Multipart) -> AppResult<(Map<String, Json>, Vec<(String, Upload)>)> {
    let mut fields = Map::new();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
                let data = field.bytes().await?.to_vec();
                files.push((name, Upload { file_name, content_type, data }));
            }
            None => {
                let text = field.text().await?;
                fields.insert(name, Json::String(text));
            }
        }
    }
    Ok((fields, files))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn upload(file_name: &str, content_type: &str, data: &[u8]) -> Upload {
        Upload {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_upload_kind() {
        let jpeg = upload("Foto.JPG", "application/octet-stream", &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]);
        assert_eq!(jpeg.extension().as_deref(), Some("jpg"));
        assert_eq!(jpeg.image_kind(), Some("jpg"));
        assert!(jpeg.is_image());

        let png = upload("foto.png", "image/png", &PNG);
        assert_eq!(png.image_kind(), Some("png"));
        assert!(png.is_image());

        assert!(!upload("surat.pdf", "application/pdf", b"%PDF-1.7").is_image());
    }

    #[test]
    fn test_upload_rejects_disguised_files() {
        // markup sent with an image content type
        let html = upload("x.html", "image/png", b"<script>alert(1)</script>");
        assert!(!html.is_image());
        assert_eq!(html.image_kind(), None);

        // image bytes under a non-image name
        assert!(!upload("x.html", "image/png", &PNG).is_image());

        // image name without image bytes
        assert!(!upload("x.png", "image/png", b"<svg onload=alert(1)>").is_image());
    }
}
