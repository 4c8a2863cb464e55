//! Opaque evidence artifacts with stable identifiers
//!
//! The core exposes captured artifacts as payloads keyed by id; it never
//! decides file names, paths, or persistence format. Identifiers embed a
//! content hash so re-runs with identical captures produce identical ids.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceId(pub String);

impl std::fmt::Display for EvidenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Captured artifact payload. PNG data stays base64-encoded so a Report
/// serializes cleanly; the consumer decodes when persisting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "format", content = "data", rename_all = "snake_case")]
pub enum EvidencePayload {
    PngBase64(String),
    HtmlFragment(String),
    Text(String),
}

impl EvidencePayload {
    fn bytes(&self) -> &[u8] {
        match self {
            EvidencePayload::PngBase64(s)
            | EvidencePayload::HtmlFragment(s)
            | EvidencePayload::Text(s) => s.as_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub id: EvidenceId,
    pub label: String,
    pub payload: EvidencePayload,
}

/// Ordered store of evidence captured during one run
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EvidenceStore {
    records: Vec<EvidenceRecord>,
}

impl EvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a payload under `label` and return its stable id
    pub fn push(&mut self, label: &str, payload: EvidencePayload) -> EvidenceId {
        let digest = Sha256::digest(payload.bytes());
        let id = EvidenceId(format!(
            "{:02}-{}-{}",
            self.records.len() + 1,
            label,
            &hex::encode(digest)[..8]
        ));
        self.records.push(EvidenceRecord {
            id: id.clone(),
            label: label.to_string(),
            payload,
        });
        id
    }

    pub fn records(&self) -> &[EvidenceRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<EvidenceRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_ordered_and_content_addressed() {
        let mut store = EvidenceStore::new();
        let a = store.push("initial-load", EvidencePayload::Text("abc".to_string()));
        let b = store.push("final-state", EvidencePayload::Text("abc".to_string()));

        assert!(a.0.starts_with("01-initial-load-"));
        assert!(b.0.starts_with("02-final-state-"));
        // Same content, same hash suffix
        assert_eq!(a.0.rsplit('-').next(), b.0.rsplit('-').next());
    }

    #[test]
    fn identical_runs_yield_identical_ids() {
        let mut first = EvidenceStore::new();
        let mut second = EvidenceStore::new();
        let payload = EvidencePayload::PngBase64("aGVsbG8=".to_string());
        assert_eq!(
            first.push("shot", payload.clone()),
            second.push("shot", payload)
        );
    }
}
