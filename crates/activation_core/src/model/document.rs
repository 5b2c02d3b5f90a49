//! Visible document model consumed by activation matching.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Minimal view of one visible text buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDescriptor {
    pub language_id: String,
}

impl DocumentDescriptor {
    pub fn new(language_id: impl Into<String>) -> Self {
        Self {
            language_id: language_id.into(),
        }
    }
}

/// Set of currently visible documents. Order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelSnapshot {
    pub visible_documents: Vec<DocumentDescriptor>,
}

impl ModelSnapshot {
    pub fn new(visible_documents: Vec<DocumentDescriptor>) -> Self {
        Self { visible_documents }
    }

    /// Builds a snapshot from bare language ids.
    pub fn from_languages<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(languages.into_iter().map(DocumentDescriptor::new).collect())
    }

    /// Distinct language ids across all visible documents.
    pub fn languages(&self) -> BTreeSet<&str> {
        self.visible_documents
            .iter()
            .map(|document| document.language_id.as_str())
            .collect()
    }
}
