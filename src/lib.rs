//! # Pipeline Services: registry and ownership engine for media pipelines
//!
//! A process-wide service that manages named, reusable components (sources,
//! sinks, on-screen displays, tiled displays, inference stages) and the
//! pipelines that own them. The service keeps both name-indexed registries
//! behind one lock and enforces the ownership rules: unique names, at most
//! one parent pipeline per component, no deletion while in use, and
//! validate-then-commit bulk operations.
//!
//! ## Architecture
//!
//! - **Service**: [`Services`] facade holding the registries, the engine and
//!   the main loop
//! - **Components**: [`BuiltinComponent`] enum over the concrete kinds, all
//!   implementing the [`Component`] capability trait
//! - **Pipelines**: [`Pipeline`] bookkeeping handles with listener tables
//! - **Engine**: [`MediaEngine`] trait; [`SimulatedEngine`] is the in-process
//!   default
//! - **Events**: crossbeam-channel [`MainLoop`] dispatching engine events to
//!   listeners outside the service lock
//! - **API**: [`api`] module with one code-returning function per operation
//!   over a lazily created singleton
//!
//! ## Configuration
//!
//! [`ServiceConfig`] is read from `services.toml` in the platform config
//! directory (or the file named by `PIPELINE_SERVICES_CONFIG`):
//!
//! - **Linux**: `~/.config/pipeline-services/services.toml`
//! - **macOS**: `~/Library/Application Support/pipeline-services/services.toml`
//! - **Windows**: `%APPDATA%\pipeline-services\services.toml`
//!
//! ## Example
//!
//! ```ignore
//! use pipeline_services::{ServiceConfig, Services};
//!
//! let services = Services::new(ServiceConfig::load_or_default());
//! services.pipeline_new("p1")?;
//! services.source_csi_new("cam", 1280, 720, 30, 1)?;
//! services.sink_overlay_new("window", 0, 0, 1280, 720)?;
//! services.pipeline_component_add_many("p1", &["cam", "window"])?;
//! services.pipeline_play("p1")?;
//! services.run_main_loop()?;
//! ```

pub mod api;
pub mod component;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod main_loop;
pub mod pipeline;
pub mod registry;
pub mod service;

// Re-export commonly used types
pub use component::{BuiltinComponent, Component, ComponentKind, ComponentParams, EntityKind};
pub use config::{PipelineManifest, ServiceConfig, StreamMuxSettings};
pub use engine::{DisplayEvent, EngineEvent, MediaEngine, PipelineState, SimulatedEngine};
pub use error::{Result, ResultCode, ServiceError};
pub use main_loop::{MainLoop, MainLoopHandle};
pub use pipeline::{DisplayEventHandler, Pipeline, StateChangeListener, UserData};
pub use service::Services;
