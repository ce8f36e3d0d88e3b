//! Post metadata providers
//!
//! A provider supplies the title, description and tags for a run. The plain
//! text format keeps the title on the first line and the tags on the last;
//! everything in between is the description.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::workflow::Payload;

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("Cannot read metadata file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Metadata file {0} is empty")]
    Empty(String),
}

/// Post text for a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostMetadata {
    pub title: String,
    pub description: String,
    pub tags: String,
}

impl PostMetadata {
    /// Split plain text into title, description and tags
    pub fn parse(text: &str) -> Self {
        let lines: Vec<&str> = text.lines().collect();
        let Some((first, rest)) = lines.split_first() else {
            return Self::default();
        };

        let (middle, tags) = match rest.split_last() {
            Some((last, middle)) => (middle, last.trim()),
            None => (&[][..], ""),
        };

        Self {
            title: first.trim().to_string(),
            description: middle.join("\n").trim().to_string(),
            tags: tags.to_string(),
        }
    }

    /// Payload for uploading `file` with this text
    pub fn into_payload(self, file: impl Into<PathBuf>) -> Payload {
        Payload::new(self.title, self.description, self.tags, file)
    }
}

pub trait MetadataProvider: Send + Sync {
    fn load(&self) -> Result<PostMetadata, MetadataError>;
}

/// Reads metadata from a plain text file
pub struct TextFileMetadata {
    path: PathBuf,
}

impl TextFileMetadata {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetadataProvider for TextFileMetadata {
    fn load(&self) -> Result<PostMetadata, MetadataError> {
        let path = self.path.display().to_string();
        info!(path = %path, "Reading metadata");

        let text = std::fs::read_to_string(&self.path).map_err(|e| MetadataError::Io {
            path: path.clone(),
            source: e,
        })?;
        if text.trim().is_empty() {
            return Err(MetadataError::Empty(path));
        }

        let metadata = PostMetadata::parse(&text);
        debug!(
            title = %metadata.title,
            tags = %metadata.tags,
            description_chars = metadata.description.chars().count(),
            "Parsed metadata"
        );
        Ok(metadata)
    }
}
