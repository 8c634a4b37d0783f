pub mod admin;
pub mod auth;
pub mod free;
pub mod member;

use std::collections::HashMap;

use axum::extract::Multipart;
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, media::UploadedFile};

/// MultipartForm
///
/// Flat view over a multipart request body: text fields keyed by name (a name
/// may repeat), plus file parts with their original filename and content type
/// fully buffered. Parsed once per request so handlers can validate fields in
/// any order.
#[derive(Default)]
pub struct MultipartForm {
    fields: HashMap<String, Vec<String>>,
    files: Vec<(String, UploadedFile)>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if let Some(file_name) = field.file_name().map(str::to_string) {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?
                    .to_vec();
                form.files.push((
                    name,
                    UploadedFile {
                        file_name,
                        content_type,
                        bytes,
                    },
                ));
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                form.fields.entry(name).or_default().push(value);
            }
        }

        Ok(form)
    }

    /// First value of a text field.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// All values of a (possibly repeated) text field.
    pub fn values(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All file parts submitted under the given field name.
    pub fn files_named(&self, name: &str) -> Vec<&UploadedFile> {
        self.files
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, f)| f)
            .collect()
    }

    /// First file part under the given field name.
    pub fn file_named(&self, name: &str) -> Option<&UploadedFile> {
        self.files_named(name).into_iter().next()
    }

    /// Parses a repeated id field (`mediaIdsToDelete`). Accepts either one
    /// value per occurrence or a single JSON array string, matching what the
    /// frontend form encoder produces in each mode.
    pub fn id_values(&self, name: &str) -> Result<Vec<Uuid>, ApiError> {
        let raw = self.values(name);
        let mut ids = Vec::new();
        for value in raw {
            let trimmed = value.trim();
            if trimmed.starts_with('[') {
                let parsed: Vec<Uuid> = serde_json::from_str(trimmed)
                    .map_err(|_| ApiError::BadRequest("Invalid media id list".to_string()))?;
                ids.extend(parsed);
            } else if !trimmed.is_empty() {
                ids.push(
                    trimmed
                        .parse::<Uuid>()
                        .map_err(|_| ApiError::BadRequest("Invalid media id".to_string()))?,
                );
            }
        }
        Ok(ids)
    }
}

/// PageQuery
///
/// `?page&limit` query pair for the admin listings. Defaults and floors keep
/// the offset arithmetic well-defined for any input.
#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    /// Resolves to `(page, limit, offset)` with defaults page=1, limit=10.
    pub fn resolve(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(10).max(1);
        (page, limit, (page - 1) * limit)
    }
}
