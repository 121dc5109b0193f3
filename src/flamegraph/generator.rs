//! SVG flamegraph generation from collapsed stall stacks.

use crate::aggregator::stack_builder::CollapsedStack;
use crate::utils::config::DURATION_UNIT;
use crate::utils::error::FlamegraphError;
use inferno::flamegraph::{self, Options};
use log::info;

/// Flamegraph configuration
#[derive(Debug, Clone)]
pub struct FlamegraphConfig {
    pub title: String,

    /// Image width in pixels; inferno picks one when `None`
    pub width: Option<usize>,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self {
            title: "Reactor Stalls".to_string(),
            width: None,
        }
    }
}

impl FlamegraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }
}

/// Generate SVG flamegraph from collapsed stacks
///
/// **Public** - main entry point for flamegraph rendering
///
/// # Errors
/// * `FlamegraphError::EmptyStacks` - nothing to draw
/// * `FlamegraphError::Render` - inferno rejected the input
pub fn generate_flamegraph(
    stacks: &[CollapsedStack],
    config: Option<&FlamegraphConfig>,
) -> Result<String, FlamegraphError> {
    if stacks.is_empty() {
        return Err(FlamegraphError::EmptyStacks);
    }

    let config = config.cloned().unwrap_or_default();
    info!("Generating flamegraph with {} stacks", stacks.len());

    let mut options = Options::default();
    options.title = config.title;
    options.count_name = DURATION_UNIT.to_string();
    options.image_width = config.width;

    let lines: Vec<String> = stacks.iter().map(CollapsedStack::to_line).collect();
    let mut svg = Vec::new();
    flamegraph::from_lines(&mut options, lines.iter().map(String::as_str), &mut svg)
        .map_err(|e| FlamegraphError::Render(e.to_string()))?;

    String::from_utf8(svg).map_err(|e| FlamegraphError::Render(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stacks_rejected() {
        assert!(matches!(
            generate_flamegraph(&[], None),
            Err(FlamegraphError::EmptyStacks)
        ));
    }

    #[test]
    fn test_config_builder() {
        let config = FlamegraphConfig::new().with_title("shard 3").with_width(800);
        assert_eq!(config.title, "shard 3");
        assert_eq!(config.width, Some(800));
    }
}
