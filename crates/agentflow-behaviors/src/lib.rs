//! Agentflow Behaviors
//!
//! The standard behavior set, keyed by behavior id:
//!
//! | id                   | step type        | writes                                |
//! |----------------------|------------------|---------------------------------------|
//! | `api`                | trigger          |                                       |
//! | `schedule`           | trigger          |                                       |
//! | `rss-feed`           | third_party      | `prompt`, `sourceUrl`                 |
//! | `generate-image`     | generate_image   | `imageUrl`, `imagePrompt`             |
//! | `generate-character` | generate_image   | `imageUrl`, `imagePrompt`, `character`|
//! | `generate-video`     | generate_video   | `videoUrl`, `videoPrompt`             |
//! | `social-media`       | publish          |                                       |

mod feed;
mod generate;
mod generate_character;
mod generate_image;
mod generate_video;
mod rss_feed;
mod social_media;
mod trigger;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use agentflow_artifact::ArtifactSink;
use agentflow_behavior::{
  BehaviorRegistry, FeedSource, GenerationProvider, Publisher, RegistryError,
};

pub use feed::{FeedItem, first_item};
pub use generate_character::GenerateCharacterBehavior;
pub use generate_image::GenerateImageBehavior;
pub use generate_video::GenerateVideoBehavior;
pub use rss_feed::RssFeedBehavior;
pub use social_media::SocialMediaBehavior;
pub use trigger::{ApiTrigger, ScheduleTrigger};

/// External services the standard behaviors depend on.
#[derive(Clone)]
pub struct BehaviorDeps {
  pub feeds: Arc<dyn FeedSource>,
  pub generator: Arc<dyn GenerationProvider>,
  pub artifacts: Arc<dyn ArtifactSink>,
  pub publisher: Arc<dyn Publisher>,
}

/// Registry with every standard behavior registered.
pub fn standard_registry(deps: &BehaviorDeps) -> Result<BehaviorRegistry, RegistryError> {
  BehaviorRegistry::builder()
    .register(ApiTrigger)
    .register(ScheduleTrigger)
    .register(RssFeedBehavior::new(deps.feeds.clone()))
    .register(GenerateImageBehavior::new(
      deps.generator.clone(),
      deps.artifacts.clone(),
    ))
    .register(GenerateCharacterBehavior::new(
      deps.generator.clone(),
      deps.artifacts.clone(),
    ))
    .register(GenerateVideoBehavior::new(
      deps.generator.clone(),
      deps.artifacts.clone(),
    ))
    .register(SocialMediaBehavior::new(deps.publisher.clone()))
    .build()
}

#[cfg(test)]
mod tests {
  use super::*;
  use agentflow_artifact::MemoryArtifactSink;
  use agentflow_behavior::memory::{MemoryPublisher, StaticFeedSource, StaticGenerationProvider};

  #[test]
  fn test_standard_registry_ids() {
    let deps = BehaviorDeps {
      feeds: Arc::new(StaticFeedSource::new()),
      generator: Arc::new(StaticGenerationProvider::new("https://cdn", "png")),
      artifacts: Arc::new(MemoryArtifactSink::new()),
      publisher: Arc::new(MemoryPublisher::new()),
    };

    let registry = standard_registry(&deps).unwrap();
    assert_eq!(
      registry.ids(),
      vec![
        "api",
        "generate-character",
        "generate-image",
        "generate-video",
        "rss-feed",
        "schedule",
        "social-media",
      ]
    );
  }
}
