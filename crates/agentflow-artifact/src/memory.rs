use std::sync::Mutex;

use async_trait::async_trait;

use crate::{ArtifactData, ArtifactDescriptor, ArtifactSink, Error, StoredReference};

/// One artifact recorded by [`MemoryArtifactSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct SavedArtifact {
  pub organization_id: String,
  pub descriptor: ArtifactDescriptor,
  pub reference: StoredReference,
}

/// Sink that keeps artifacts in memory.
///
/// URL artifacts keep their URL; inline bytes get a `memory://` URL.
#[derive(Debug, Default)]
pub struct MemoryArtifactSink {
  saved: Mutex<Vec<SavedArtifact>>,
}

impl MemoryArtifactSink {
  pub fn new() -> Self {
    Self::default()
  }

  /// Snapshot of everything saved so far, in save order.
  pub fn saved(&self) -> Vec<SavedArtifact> {
    self
      .saved
      .lock()
      .map(|saved| saved.clone())
      .unwrap_or_default()
  }
}

#[async_trait]
impl ArtifactSink for MemoryArtifactSink {
  async fn save(
    &self,
    organization_id: &str,
    descriptor: ArtifactDescriptor,
  ) -> Result<StoredReference, Error> {
    let artifact_id = uuid::Uuid::new_v4().to_string();
    let url = match &descriptor.data {
      ArtifactData::Url(url) => url.clone(),
      ArtifactData::Bytes { .. } => format!("memory://{}/{}", organization_id, artifact_id),
    };
    let reference = StoredReference { artifact_id, url };

    let mut saved = self
      .saved
      .lock()
      .map_err(|_| Error::Invalid("memory sink poisoned".to_string()))?;
    saved.push(SavedArtifact {
      organization_id: organization_id.to_string(),
      descriptor,
      reference: reference.clone(),
    });

    Ok(reference)
  }
}
