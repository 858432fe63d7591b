//! Image records and the versioned store that publishes them.
//!
//! Each mutation replaces one record's `Arc` and publishes a fresh
//! [`RecordSnapshot`]; records that were not touched are shared between
//! snapshots, so observers can compare them with `Arc::ptr_eq`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

use dermascan_gateway::{Diagnosis, ImagePayload};

/// Opaque record identifier, unique for the lifetime of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "img-{}", self.0)
    }
}

/// Processing status of an image record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Uploaded,
    Analyzing,
    Analyzed,
    Failed,
}

/// Result slot of a record. Only `Analyzed` records carry a diagnosis and
/// only `Failed` records carry an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum RecordOutcome {
    Pending,
    Analyzed(Diagnosis),
    Failed(String),
}

/// One submitted image and its analysis state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRecord {
    id: RecordId,
    name: String,
    #[serde(skip)]
    preview: Arc<[u8]>,
    uploaded_at: DateTime<Utc>,
    status: ImageStatus,
    outcome: RecordOutcome,
}

impl ImageRecord {
    fn new(id: RecordId, payload: ImagePayload) -> Self {
        Self {
            id,
            name: payload.name,
            preview: payload.bytes,
            uploaded_at: Utc::now(),
            status: ImageStatus::Uploaded,
            outcome: RecordOutcome::Pending,
        }
    }

    #[must_use]
    pub fn id(&self) -> RecordId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Captured image bytes, shared with the payload that created the record.
    #[must_use]
    pub fn preview(&self) -> &Arc<[u8]> {
        &self.preview
    }

    #[must_use]
    pub fn uploaded_at(&self) -> DateTime<Utc> {
        self.uploaded_at
    }

    #[must_use]
    pub fn status(&self) -> ImageStatus {
        self.status
    }

    #[must_use]
    pub fn outcome(&self) -> &RecordOutcome {
        &self.outcome
    }

    #[must_use]
    pub fn result(&self) -> Option<&Diagnosis> {
        match &self.outcome {
            RecordOutcome::Analyzed(diagnosis) => Some(diagnosis),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            RecordOutcome::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Payload to resend to the gateway.
    pub(crate) fn payload(&self) -> ImagePayload {
        ImagePayload {
            name: self.name.clone(),
            bytes: Arc::clone(&self.preview),
        }
    }

    pub(crate) fn mark_analyzing(&mut self) {
        self.status = ImageStatus::Analyzing;
        self.outcome = RecordOutcome::Pending;
    }

    pub(crate) fn mark_analyzed(&mut self, diagnosis: Diagnosis) {
        self.status = ImageStatus::Analyzed;
        self.outcome = RecordOutcome::Analyzed(diagnosis);
    }

    pub(crate) fn mark_failed(&mut self, message: String) {
        self.status = ImageStatus::Failed;
        self.outcome = RecordOutcome::Failed(message);
    }

    pub(crate) fn mark_uploaded(&mut self) {
        self.status = ImageStatus::Uploaded;
        self.outcome = RecordOutcome::Pending;
    }
}

/// Immutable view of every record, in submission order.
#[derive(Debug, Clone, Default)]
pub struct RecordSnapshot {
    pub version: u64,
    pub records: Vec<Arc<ImageRecord>>,
}

impl RecordSnapshot {
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<&Arc<ImageRecord>> {
        self.records.iter().find(|r| r.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn count(&self, status: ImageStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }
}

/// Keyed, versioned record storage owned by the orchestrator.
pub(crate) struct RecordStore {
    records: Vec<Arc<ImageRecord>>,
    next_id: u64,
    version: u64,
    tx: watch::Sender<Arc<RecordSnapshot>>,
}

impl RecordStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(RecordSnapshot::default()));
        Self {
            records: Vec::new(),
            next_id: 0,
            version: 0,
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<RecordSnapshot>> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> Arc<RecordSnapshot> {
        self.tx.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append one record per payload, in order, and publish once.
    pub fn append(&mut self, payloads: Vec<ImagePayload>) -> Vec<RecordId> {
        let mut ids = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let id = RecordId(self.next_id);
            self.next_id += 1;
            self.records.push(Arc::new(ImageRecord::new(id, payload)));
            ids.push(id);
        }
        self.publish();
        ids
    }

    pub fn get(&self, id: RecordId) -> Option<&Arc<ImageRecord>> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Ids of the records currently in `status`, in submission order.
    pub fn ids_with_status(&self, status: ImageStatus) -> Vec<RecordId> {
        self.records
            .iter()
            .filter(|r| r.status == status)
            .map(|r| r.id)
            .collect()
    }

    /// Apply `mutate` to one record and publish. Returns `false` for unknown ids.
    pub fn update(&mut self, id: RecordId, mutate: impl FnOnce(&mut ImageRecord)) -> bool {
        let Some(slot) = self.records.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        let mut record = ImageRecord::clone(slot);
        mutate(&mut record);
        *slot = Arc::new(record);
        self.publish();
        true
    }

    pub fn remove(&mut self, id: RecordId) -> Option<Arc<ImageRecord>> {
        let index = self.records.iter().position(|r| r.id == id)?;
        let removed = self.records.remove(index);
        self.publish();
        Some(removed)
    }

    fn publish(&mut self) {
        self.version += 1;
        self.tx.send_replace(Arc::new(RecordSnapshot {
            version: self.version,
            records: self.records.clone(),
        }));
    }
}
