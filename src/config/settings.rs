//! Stream muxer settings carried by every pipeline
//!
//! Each pipeline batches its sources through a single multiplexing stage.
//! These values seed that stage when the pipeline is created and are
//! updated through the batch-properties and output-size setters.

use serde::{Deserialize, Serialize};

/// Default number of frames per batch
pub const DEFAULT_BATCH_SIZE: u32 = 1;

/// Default batch push timeout in microseconds
pub const DEFAULT_BATCH_TIMEOUT_US: u32 = 40_000;

/// Default muxer output width
pub const DEFAULT_MUX_WIDTH: u32 = 1920;

/// Default muxer output height
pub const DEFAULT_MUX_HEIGHT: u32 = 1080;

/// Batch and output configuration for a pipeline's stream muxer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMuxSettings {
    /// Frames collected into one batch
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Time to wait for a full batch before pushing a partial one (µs)
    #[serde(default = "default_batch_timeout")]
    pub batch_timeout: u32,

    /// Output frame width
    #[serde(default = "default_width")]
    pub width: u32,

    /// Output frame height
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_batch_size() -> u32 {
    DEFAULT_BATCH_SIZE
}

fn default_batch_timeout() -> u32 {
    DEFAULT_BATCH_TIMEOUT_US
}

fn default_width() -> u32 {
    DEFAULT_MUX_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_MUX_HEIGHT
}

impl Default for StreamMuxSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_timeout: DEFAULT_BATCH_TIMEOUT_US,
            width: DEFAULT_MUX_WIDTH,
            height: DEFAULT_MUX_HEIGHT,
        }
    }
}

impl StreamMuxSettings {
    /// Check that a batch property pair is usable
    pub fn check_batch_properties(batch_size: u32, batch_timeout: u32) -> Result<(), String> {
        if batch_size == 0 {
            return Err("batch size must be at least 1".to_string());
        }
        if batch_timeout == 0 {
            return Err("batch timeout must be at least 1 µs".to_string());
        }
        Ok(())
    }

    /// Check that an output size is usable
    pub fn check_output_size(width: u32, height: u32) -> Result<(), String> {
        if width == 0 || height == 0 {
            return Err(format!("invalid output size {}x{}", width, height));
        }
        Ok(())
    }

    /// Validate the whole settings block
    pub fn validate(&self) -> Result<(), String> {
        Self::check_batch_properties(self.batch_size, self.batch_timeout)?;
        Self::check_output_size(self.width, self.height)
    }

    pub fn set_batch_properties(&mut self, batch_size: u32, batch_timeout: u32) {
        self.batch_size = batch_size;
        self.batch_timeout = batch_timeout;
    }

    pub fn set_output_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}
