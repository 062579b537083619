//! Compositing requests with explicit input slots
//!
//! A [`CompositeRequest`] collects inputs as they arrive. Only a
//! [`ReadyRequest`], obtained through [`CompositeRequest::into_ready`], can be
//! handed to the processor, so a run never starts with a missing image.

use crate::{
    config::CompositeConfig,
    error::{CompositeError, Result},
};
use image::RgbaImage;
use std::fmt;

/// Named input slot of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSlot {
    Background,
    Foreground,
}

impl fmt::Display for InputSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSlot::Background => write!(f, "background"),
            InputSlot::Foreground => write!(f, "foreground"),
        }
    }
}

/// Inputs for one compositing run, possibly incomplete
#[derive(Debug, Clone, Default)]
pub struct CompositeRequest {
    pub background: Option<RgbaImage>,
    pub foreground: Option<RgbaImage>,
    pub config: CompositeConfig,
}

impl CompositeRequest {
    /// Create an empty request with the given configuration
    #[must_use]
    pub fn new(config: CompositeConfig) -> Self {
        Self {
            background: None,
            foreground: None,
            config,
        }
    }

    #[must_use]
    pub fn with_background(mut self, background: RgbaImage) -> Self {
        self.background = Some(background);
        self
    }

    #[must_use]
    pub fn with_foreground(mut self, foreground: RgbaImage) -> Self {
        self.foreground = Some(foreground);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: CompositeConfig) -> Self {
        self.config = config;
        self
    }

    /// Slots that still have no image, in background-then-foreground order
    #[must_use]
    pub fn missing_inputs(&self) -> Vec<InputSlot> {
        let mut missing = Vec::new();
        if self.background.is_none() {
            missing.push(InputSlot::Background);
        }
        if self.foreground.is_none() {
            missing.push(InputSlot::Foreground);
        }
        missing
    }

    /// Whether both images are present
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.background.is_some() && self.foreground.is_some()
    }

    /// Turn into a request the processor accepts
    ///
    /// # Errors
    /// - `MissingInput` naming every empty slot
    /// - `InvalidParameter` if the configuration does not validate
    pub fn into_ready(self) -> Result<ReadyRequest> {
        let missing = self.missing_inputs();
        match (self.background, self.foreground) {
            (Some(background), Some(foreground)) => {
                self.config.validate()?;
                Ok(ReadyRequest {
                    background,
                    foreground,
                    config: self.config,
                })
            },
            _ => {
                let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
                Err(CompositeError::missing_input(format!(
                    "{} image required before compositing",
                    names.join(" and ")
                )))
            },
        }
    }
}

/// A request with both images present and a validated configuration
#[derive(Debug, Clone)]
pub struct ReadyRequest {
    background: RgbaImage,
    foreground: RgbaImage,
    config: CompositeConfig,
}

impl ReadyRequest {
    #[must_use]
    pub fn background(&self) -> &RgbaImage {
        &self.background
    }

    #[must_use]
    pub fn foreground(&self) -> &RgbaImage {
        &self.foreground
    }

    #[must_use]
    pub fn config(&self) -> &CompositeConfig {
        &self.config
    }

    /// Split into background, foreground and configuration
    #[must_use]
    pub fn into_parts(self) -> (RgbaImage, RgbaImage, CompositeConfig) {
        (self.background, self.foreground, self.config)
    }
}
