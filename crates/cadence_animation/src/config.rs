//! Engine configuration (cadence.toml)
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```toml
//! [timeline]
//! duration = 2000.0
//! loop = true
//! autoplay = false
//!
//! [animation]
//! duration = 300.0
//! ease = "outQuad"
//! ```

use crate::animation::{AnimationOptions, DEFAULT_DURATION_MS};
use crate::easing::Easing;
use crate::error::Result;
use crate::timeline::TimelineOptions;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub timeline: TimelineDefaults,
    pub animation: AnimationDefaults,
}

/// Defaults for timelines created through the engine
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimelineDefaults {
    /// Timeline length in milliseconds
    pub duration: f64,
    /// Wrap back to the start when the end is reached
    #[serde(rename = "loop")]
    pub looping: bool,
    /// Start playing and register with the engine on creation
    pub autoplay: bool,
}

impl Default for TimelineDefaults {
    fn default() -> Self {
        Self {
            duration: 1000.0,
            looping: false,
            autoplay: true,
        }
    }
}

/// Defaults for animation options created through the engine
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnimationDefaults {
    /// Pass duration in milliseconds
    pub duration: f64,
    pub ease: Easing,
}

impl Default for AnimationDefaults {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION_MS,
            ease: Easing::Linear,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    /// Read and parse a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Timeline options seeded with the configured defaults
    pub fn timeline_options(&self) -> TimelineOptions {
        TimelineOptions::new()
            .duration(self.timeline.duration)
            .looping(self.timeline.looping)
            .autoplay(self.timeline.autoplay)
    }

    /// Animation options seeded with the configured defaults
    pub fn animation_options(&self) -> AnimationOptions {
        AnimationOptions::new()
            .duration(self.animation.duration)
            .ease(self.animation.ease)
    }
}
