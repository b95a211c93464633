//! File upload, listing and deletion.
//!
//! Uploads go out as `multipart/form-data`; the dispatcher leaves the
//! boundary-bearing content type untouched.

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::client::Client;
use crate::error::Error;

/// A file to upload, held in memory.
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// Purpose of the upload, e.g. `fine-tune`.
    pub purpose: String,
    pub file_name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct File {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub purpose: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileList {
    #[serde(default)]
    pub object: String,
    pub data: Vec<File>,
}

impl Client {
    /// Upload a file as multipart form data.
    pub async fn upload_file(&self, upload: FileUpload) -> Result<File, Error> {
        let part = Part::bytes(upload.data).file_name(upload.file_name);
        let form = Form::new().text("purpose", upload.purpose).part("file", part);

        let req = self
            .request(Method::POST, "/files")
            .multipart(form)
            .build()?;
        self.send_request(req).await
    }

    /// List the files owned by the configured account.
    pub async fn list_files(&self) -> Result<FileList, Error> {
        let req = self.request(Method::GET, "/files").build()?;
        self.send_request(req).await
    }

    /// Delete one file by id. The response body is discarded.
    pub async fn delete_file(&self, id: &str) -> Result<(), Error> {
        let req = self.request(Method::DELETE, &format!("/files/{id}")).build()?;
        self.send_request_discard(req).await
    }
}
