use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::fs;
use tracing::debug;

use crate::{
  ArtifactData, ArtifactDescriptor, ArtifactKind, ArtifactSink, Error, StoredReference,
  extension_for,
};

/// Filesystem-based artifact sink.
///
/// Artifacts are stored in a directory structure:
/// ```text
/// {root}/
/// └── {organization_id}/
///     ├── {artifact_id}.png   (inline bytes only)
///     └── {artifact_id}.json  (metadata, always)
/// ```
pub struct FsArtifactSink {
  root: PathBuf,
}

/// Metadata written next to every artifact.
#[derive(Serialize)]
struct ArtifactRecord<'a> {
  artifact_id: &'a str,
  organization_id: &'a str,
  kind: ArtifactKind,
  url: &'a str,
  prompt: Option<&'a str>,
  model: Option<&'a str>,
}

impl FsArtifactSink {
  /// Create a new filesystem sink at the given root path.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Get the root directory of the sink.
  pub fn root(&self) -> &Path {
    &self.root
  }

  fn org_dir(&self, organization_id: &str) -> Result<PathBuf, Error> {
    let valid = !organization_id.is_empty()
      && organization_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
      return Err(Error::Invalid(format!(
        "invalid organization id: '{}'",
        organization_id
      )));
    }
    Ok(self.root.join(organization_id))
  }
}

#[async_trait]
impl ArtifactSink for FsArtifactSink {
  async fn save(
    &self,
    organization_id: &str,
    descriptor: ArtifactDescriptor,
  ) -> Result<StoredReference, Error> {
    let dir = self.org_dir(organization_id)?;
    fs::create_dir_all(&dir).await?;

    let artifact_id = uuid::Uuid::new_v4().to_string();
    let url = match &descriptor.data {
      ArtifactData::Url(url) => url.clone(),
      ArtifactData::Bytes {
        bytes,
        content_type,
      } => {
        let path = dir.join(format!("{}.{}", artifact_id, extension_for(content_type)));
        fs::write(&path, bytes).await?;
        format!("file://{}", path.display())
      }
    };

    let record = ArtifactRecord {
      artifact_id: &artifact_id,
      organization_id,
      kind: descriptor.kind,
      url: &url,
      prompt: descriptor.prompt.as_deref(),
      model: descriptor.model.as_deref(),
    };
    let metadata = serde_json::to_vec_pretty(&record)?;
    fs::write(dir.join(format!("{}.json", artifact_id)), metadata).await?;

    debug!(artifact_id = %artifact_id, url = %url, "artifact_saved");

    Ok(StoredReference { artifact_id, url })
  }
}
