//! Remote file listing and retrieval.

use crate::document::Document;
use crate::error::{FormatError, RemoteError};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub children: Vec<FileMeta>,
}

impl FileMeta {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Somewhere diagrams can be browsed and fetched from. Calls block; run
/// them off the UI thread.
pub trait FileSource: Send + Sync {
    fn list_files(&self) -> Result<Vec<FileMeta>, RemoteError>;
    fn list_children(&self, key: &str) -> Result<Vec<FileMeta>, RemoteError>;
    fn fetch_content(&self, id: &str) -> Result<Document, RemoteError>;
}

pub struct HttpFileSource {
    base: String,
    client: Client,
}

impl HttpFileSource {
    pub fn new(base: &str) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/files{}", self.base, path)
    }

    fn get_text(&self, path: &str) -> Result<String, RemoteError> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        Ok(response.text()?)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let body = self.get_text(path)?;
        serde_json::from_str(&body).map_err(|e| FormatError::Syntax(e.to_string()).into())
    }
}

impl FileSource for HttpFileSource {
    fn list_files(&self) -> Result<Vec<FileMeta>, RemoteError> {
        self.get_json("")
    }

    fn list_children(&self, key: &str) -> Result<Vec<FileMeta>, RemoteError> {
        self.get_json(&format!("/tree/{key}"))
    }

    fn fetch_content(&self, id: &str) -> Result<Document, RemoteError> {
        let body = self.get_text(&format!("/{id}"))?;
        Ok(Document::parse(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_hang_off_the_base() {
        let source = HttpFileSource::new("http://localhost:8080/").unwrap();
        assert_eq!(source.base(), "http://localhost:8080");
        assert_eq!(source.url(""), "http://localhost:8080/api/files");
        assert_eq!(source.url("/tree/k1"), "http://localhost:8080/api/files/tree/k1");
    }

    #[test]
    fn listing_tolerates_missing_fields() {
        let files: Vec<FileMeta> = serde_json::from_str(
            r#"[{"id": "1", "name": "flow", "children": [{"id": "2", "name": "sub"}]},
                {"id": "3", "name": "leaf", "description": "plain"}]"#,
        )
        .unwrap();
        assert!(!files[0].is_leaf());
        assert!(files[0].children[0].is_leaf());
        assert_eq!(files[1].description.as_deref(), Some("plain"));
    }
}
