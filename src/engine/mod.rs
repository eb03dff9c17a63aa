//! MediaEngine trait for the underlying media-processing engine
//!
//! The registry never builds graph elements itself. Every construction,
//! link and state transition is delegated through [`MediaEngine`], which
//! enables both a real engine binding and the in-process
//! [`SimulatedEngine`] used by default and in tests. Implementations must
//! be `Send` because the service holds the engine behind its lock and the
//! lock may be taken from any caller thread.
//!
//! Engines report asynchronous happenings (state changes, window events)
//! as [`EngineEvent`]s through the [`EventSender`] handed to
//! [`MediaEngine::initialize`]; the service's main loop dispatches them to
//! registered listeners.

pub mod simulated;

pub use simulated::SimulatedEngine;

use crate::component::ComponentParams;
pub use crate::main_loop::EventSender;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by an engine call.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine refused the request
    #[error("{0}")]
    Rejected(String),

    /// The engine does not provide this operation
    #[error("{0} is not supported by this engine")]
    Unsupported(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Lifecycle state of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PipelineState {
    #[default]
    Idle,
    Paused,
    Playing,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Idle => "IDLE",
            PipelineState::Paused => "PAUSED",
            PipelineState::Playing => "PLAYING",
        };
        f.write_str(s)
    }
}

/// Window-system event raised by a pipeline's display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    KeyPress { key: String },
    ButtonPress { button: u32, x: i32, y: i32 },
    WindowDelete,
}

/// Event posted by the engine to the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    StateChanged {
        pipeline: String,
        previous: PipelineState,
        current: PipelineState,
    },
    Display {
        pipeline: String,
        event: DisplayEvent,
    },
    EndOfStream {
        pipeline: String,
    },
    Error {
        pipeline: String,
        message: String,
    },
}

impl EngineEvent {
    pub fn pipeline(&self) -> &str {
        match self {
            EngineEvent::StateChanged { pipeline, .. }
            | EngineEvent::Display { pipeline, .. }
            | EngineEvent::EndOfStream { pipeline }
            | EngineEvent::Error { pipeline, .. } => pipeline,
        }
    }
}

/// Unified interface to the media-processing engine.
///
/// Names passed to the engine are the registry names; the engine keeps its
/// own name-keyed element table.
///
/// # Example
///
/// ```ignore
/// fn build_source(engine: &mut dyn MediaEngine) -> EngineResult<()> {
///     engine.build_component(
///         "cam-0",
///         &ComponentParams::CsiSource { width: 1280, height: 720, fps_n: 30, fps_d: 1 },
///     )
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait MediaEngine: Send {
    /// One-time engine initialisation; called lazily on first service use.
    fn initialize(&mut self, events: EventSender) -> EngineResult<()>;

    /// Build the element(s) backing a component
    fn build_component(&mut self, name: &str, params: &ComponentParams) -> EngineResult<()>;

    /// Release a component's elements
    fn release_component(&mut self, name: &str);

    /// Build an empty pipeline with its stream muxer
    fn build_pipeline(&mut self, name: &str) -> EngineResult<()>;

    /// Tear down a pipeline; linked components are released from it first
    fn release_pipeline(&mut self, name: &str);

    /// Link a component's elements into a pipeline
    fn link(&mut self, pipeline: &str, component: &str) -> EngineResult<()>;

    /// Unlink a component's elements from a pipeline
    fn unlink(&mut self, pipeline: &str, component: &str) -> EngineResult<()>;

    fn set_batch_properties(
        &mut self,
        pipeline: &str,
        batch_size: u32,
        batch_timeout: u32,
    ) -> EngineResult<()>;

    fn set_output_size(&mut self, pipeline: &str, width: u32, height: u32) -> EngineResult<()>;

    /// Transition to playing
    fn play(&mut self, pipeline: &str) -> EngineResult<()>;

    /// Transition from playing to paused
    fn pause(&mut self, pipeline: &str) -> EngineResult<()>;

    /// Write the pipeline graph as a DOT file and return its path
    fn dump_to_dot(&self, _pipeline: &str, _file_name: &str) -> EngineResult<PathBuf> {
        Err(EngineError::Unsupported("dot dump"))
    }
}
