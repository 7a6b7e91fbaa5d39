//! Buffered multipart form bodies.
//!
//! Handlers read the whole body up front, then pick text fields and files
//! out of it by name. Boolean fields follow HTML checkbox conventions.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Multipart;

use crate::error::AppError;

/// A file part of a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// A multipart body read into memory.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, Vec<String>>,
    files: Vec<UploadedFile>,
}

impl MultipartForm {
    /// Read every part of `multipart`.
    ///
    /// `file_limits` caps how many files each field may carry; files on a
    /// field not listed are rejected.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a malformed body, a file on an
    /// unexpected field, or too many files on one field.
    pub async fn read(
        mut multipart: Multipart,
        file_limits: &[(&str, usize)],
    ) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(bad_body)? {
            let name = field.name().unwrap_or_default().to_owned();

            match field.file_name().map(str::to_owned) {
                Some(file_name) => {
                    let limit = file_limits
                        .iter()
                        .find(|(allowed, _)| *allowed == name)
                        .map(|(_, limit)| *limit)
                        .ok_or_else(|| AppError::BadRequest(format!("Unexpected field {name}")))?;
                    if form.files_named(&name).count() >= limit {
                        return Err(AppError::BadRequest(format!("Too many files for {name}")));
                    }
                    let content_type = field.content_type().map(str::to_owned);
                    let bytes = field.bytes().await.map_err(bad_body)?;
                    // Browsers send an empty part for an untouched file input.
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form.files.push(UploadedFile {
                        field: name,
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                None => {
                    let value = field.text().await.map_err(bad_body)?;
                    form.fields.entry(name).or_default().push(value);
                }
            }
        }

        Ok(form)
    }

    /// The first value of a text field, trimmed. Blank values count as absent.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    }

    /// The first present field among `names`.
    #[must_use]
    pub fn first_text(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.text(name))
    }

    /// Checkbox semantics: `"true"` or `"on"` means set.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.text(name)
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("on"))
    }

    /// Files sent under `name`, in body order.
    pub fn files_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a UploadedFile> {
        self.files.iter().filter(move |f| f.field == name)
    }

    /// Take the files sent under `name`.
    pub fn take_files(&mut self, name: &str) -> Vec<UploadedFile> {
        let (taken, rest) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|f| f.field == name);
        self.files = rest;
        taken
    }
}

fn bad_body(err: axum::extract::multipart::MultipartError) -> AppError {
    tracing::debug!(error = %err, "malformed multipart body");
    AppError::BadRequest(err.body_text())
}
