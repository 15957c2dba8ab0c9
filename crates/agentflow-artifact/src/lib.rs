//! Agentflow Artifact
//!
//! This crate provides the artifact sink trait and implementations for agentflow.
//! Artifacts are the media produced by generation steps (images, videos). They
//! are persisted per organization, separately from run state; the run state
//! only carries the stored reference URL.
//!
//! The [`ArtifactSink`] trait defines the platform/backend layer for artifact
//! storage. Implementations handle the actual storage (filesystem, memory, a
//! media library service) while behaviors only see [`StoredReference`]s.

mod fs;
mod memory;

pub use fs::FsArtifactSink;
pub use memory::{MemoryArtifactSink, SavedArtifact};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Error type for artifact storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The descriptor cannot be stored by this sink.
  #[error("invalid artifact: {0}")]
  Invalid(String),

  /// An I/O error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// Failed to encode artifact metadata.
  #[error("metadata error: {0}")]
  Metadata(#[from] serde_json::Error),
}

/// Kind of media an artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
  Image,
  Video,
}

/// Artifact content as returned by a generation provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactData {
  /// Media hosted elsewhere.
  Url(String),
  /// Inline media bytes.
  Bytes { bytes: Bytes, content_type: String },
}

/// Everything a sink needs to persist one artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactDescriptor {
  pub kind: ArtifactKind,
  pub data: ArtifactData,
  /// Prompt the media was generated from.
  pub prompt: Option<String>,
  /// Model that produced the media.
  pub model: Option<String>,
}

/// Reference to a persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredReference {
  pub artifact_id: String,
  /// URL the artifact can be fetched from.
  pub url: String,
}

/// Artifact storage trait.
///
/// Implementations provide the actual storage backend.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
  /// Persist an artifact for an organization.
  async fn save(
    &self,
    organization_id: &str,
    descriptor: ArtifactDescriptor,
  ) -> Result<StoredReference, Error>;
}

/// File extension for a media content type.
pub(crate) fn extension_for(content_type: &str) -> &'static str {
  match content_type {
    "image/png" => "png",
    "image/jpeg" | "image/jpg" => "jpg",
    "image/webp" => "webp",
    "image/gif" => "gif",
    "video/mp4" => "mp4",
    "video/webm" => "webm",
    _ => "bin",
  }
}
