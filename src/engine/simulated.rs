//! Simulated Engine Implementation
//!
//! An in-process [`MediaEngine`] that keeps a name-keyed element table and
//! enforces the same structural rules a real engine would, without touching
//! any media. It is the default engine for the service and for tests.
//!
//! # Behaviour
//!
//! - **Elements**: building a name twice is rejected; releasing a component
//!   also unlinks it from whatever pipeline holds it.
//! - **Links**: a component can be linked into one pipeline at a time.
//! - **Muxer**: batch properties and output size are rejected while playing.
//! - **Play**: rejected for pipelines with no linked source.
//! - **Events**: every state transition is posted as
//!   [`EngineEvent::StateChanged`].
//! - **Dot dumps**: written as Graphviz text into the configured directory;
//!   rejected when no directory is configured.
//!
//! # Example
//!
//! ```ignore
//! use pipeline_services::engine::SimulatedEngine;
//!
//! let engine = SimulatedEngine::new().with_dot_dir("/tmp/pipeline-dots");
//! let services = Services::with_engine(config, Box::new(engine));
//! ```

use crate::component::{ComponentKind, ComponentParams, TiledDisplay};
use crate::config::StreamMuxSettings;
use crate::engine::{EngineError, EngineEvent, EngineResult, EventSender, MediaEngine, PipelineState};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
struct SimPipeline {
    state: PipelineState,
    linked: Vec<String>,
    mux: StreamMuxSettings,
}

/// In-process engine with no media backend.
#[derive(Debug, Default)]
pub struct SimulatedEngine {
    events: Option<EventSender>,
    components: HashMap<String, ComponentKind>,
    pipelines: HashMap<String, SimPipeline>,
    dot_dir: Option<PathBuf>,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable dot dumps into `dir`
    pub fn with_dot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dot_dir = Some(dir.into());
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.events.is_some()
    }

    pub fn state(&self, pipeline: &str) -> Option<PipelineState> {
        self.pipelines.get(pipeline).map(|p| p.state)
    }

    /// Components linked into `pipeline`, in link order
    pub fn linked(&self, pipeline: &str) -> Option<&[String]> {
        self.pipelines.get(pipeline).map(|p| p.linked.as_slice())
    }

    pub fn mux_settings(&self, pipeline: &str) -> Option<StreamMuxSettings> {
        self.pipelines.get(pipeline).map(|p| p.mux)
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    fn pipeline_mut(&mut self, name: &str) -> EngineResult<&mut SimPipeline> {
        self.pipelines
            .get_mut(name)
            .ok_or_else(|| EngineError::Rejected(format!("no pipeline element '{}'", name)))
    }

    fn transition(&mut self, pipeline: &str, next: PipelineState) -> EngineResult<()> {
        let sim = self.pipeline_mut(pipeline)?;
        let previous = sim.state;
        sim.state = next;
        if previous != next {
            if let Some(events) = &self.events {
                events.send(EngineEvent::StateChanged {
                    pipeline: pipeline.to_string(),
                    previous,
                    current: next,
                });
            }
        }
        Ok(())
    }

    fn render_dot(&self, name: &str, sim: &SimPipeline) -> String {
        let kind_of = |c: &String| self.components.get(c).copied();
        let sources: Vec<&String> = sim
            .linked
            .iter()
            .filter(|c| kind_of(*c).is_some_and(|k| k.is_source()))
            .collect();
        let sinks: Vec<&String> = sim
            .linked
            .iter()
            .filter(|c| kind_of(*c).is_some_and(|k| k.is_sink()))
            .collect();

        let mux = format!("{}-streammux", name);
        let mut out = String::new();
        let _ = writeln!(out, "digraph \"{}\" {{", name);
        let _ = writeln!(out, "  label=\"{} [{}]\";", name, sim.state);
        let _ = writeln!(
            out,
            "  \"{}\" [label=\"streammux\\nbatch-size={} batch-timeout={}\\n{}x{}\"];",
            mux, sim.mux.batch_size, sim.mux.batch_timeout, sim.mux.width, sim.mux.height
        );
        for c in &sim.linked {
            let kind = kind_of(c);
            let name = kind.map(|k| k.display_name()).unwrap_or("unknown");
            if kind == Some(ComponentKind::TiledDisplay) {
                let (rows, columns) = TiledDisplay::tile_grid(sources.len() as u32);
                let _ = writeln!(
                    out,
                    "  \"{}\" [label=\"{}\\n({})\\n{}x{} tiles\"];",
                    c, c, name, rows, columns
                );
            } else {
                let _ = writeln!(out, "  \"{}\" [label=\"{}\\n({})\"];", c, c, name);
            }
        }

        for source in sources {
            let _ = writeln!(out, "  \"{}\" -> \"{}\";", source, mux);
        }

        // Fixed processing order after the muxer.
        let mut upstream = mux.clone();
        for kind in [ComponentKind::PrimaryGie, ComponentKind::TiledDisplay, ComponentKind::Osd] {
            if let Some(c) = sim.linked.iter().find(|c| kind_of(*c) == Some(kind)) {
                let _ = writeln!(out, "  \"{}\" -> \"{}\";", upstream, c);
                upstream = c.clone();
            }
        }
        for sink in sinks {
            let _ = writeln!(out, "  \"{}\" -> \"{}\";", upstream, sink);
        }

        out.push_str("}\n");
        out
    }
}

impl MediaEngine for SimulatedEngine {
    fn initialize(&mut self, events: EventSender) -> EngineResult<()> {
        if self.events.is_none() {
            self.events = Some(events);
            tracing::debug!("Simulated engine initialized");
        }
        Ok(())
    }

    fn build_component(&mut self, name: &str, params: &ComponentParams) -> EngineResult<()> {
        if self.components.contains_key(name) {
            return Err(EngineError::Rejected(format!(
                "element '{}' already exists",
                name
            )));
        }
        self.components.insert(name.to_string(), params.kind());
        Ok(())
    }

    fn release_component(&mut self, name: &str) {
        self.components.remove(name);
        for sim in self.pipelines.values_mut() {
            sim.linked.retain(|c| c != name);
        }
    }

    fn build_pipeline(&mut self, name: &str) -> EngineResult<()> {
        if self.pipelines.contains_key(name) {
            return Err(EngineError::Rejected(format!(
                "pipeline element '{}' already exists",
                name
            )));
        }
        self.pipelines.insert(name.to_string(), SimPipeline::default());
        Ok(())
    }

    fn release_pipeline(&mut self, name: &str) {
        if self.state(name).is_some_and(|s| s != PipelineState::Idle) {
            let _ = self.transition(name, PipelineState::Idle);
        }
        self.pipelines.remove(name);
    }

    fn link(&mut self, pipeline: &str, component: &str) -> EngineResult<()> {
        if !self.components.contains_key(component) {
            return Err(EngineError::Rejected(format!(
                "no component element '{}'",
                component
            )));
        }
        if let Some((owner, _)) = self
            .pipelines
            .iter()
            .find(|(_, sim)| sim.linked.iter().any(|c| c == component))
        {
            return Err(EngineError::Rejected(format!(
                "'{}' is already linked into '{}'",
                component, owner
            )));
        }
        self.pipeline_mut(pipeline)?.linked.push(component.to_string());
        Ok(())
    }

    fn unlink(&mut self, pipeline: &str, component: &str) -> EngineResult<()> {
        let sim = self.pipeline_mut(pipeline)?;
        let before = sim.linked.len();
        sim.linked.retain(|c| c != component);
        if sim.linked.len() == before {
            return Err(EngineError::Rejected(format!(
                "'{}' is not linked into '{}'",
                component, pipeline
            )));
        }
        Ok(())
    }

    fn set_batch_properties(
        &mut self,
        pipeline: &str,
        batch_size: u32,
        batch_timeout: u32,
    ) -> EngineResult<()> {
        let sim = self.pipeline_mut(pipeline)?;
        if sim.state == PipelineState::Playing {
            return Err(EngineError::Rejected(
                "stream muxer cannot be changed while playing".to_string(),
            ));
        }
        sim.mux.set_batch_properties(batch_size, batch_timeout);
        Ok(())
    }

    fn set_output_size(&mut self, pipeline: &str, width: u32, height: u32) -> EngineResult<()> {
        let sim = self.pipeline_mut(pipeline)?;
        if sim.state == PipelineState::Playing {
            return Err(EngineError::Rejected(
                "stream muxer cannot be changed while playing".to_string(),
            ));
        }
        sim.mux.set_output_size(width, height);
        Ok(())
    }

    fn play(&mut self, pipeline: &str) -> EngineResult<()> {
        let has_source = {
            let sim = self
                .pipelines
                .get(pipeline)
                .ok_or_else(|| EngineError::Rejected(format!("no pipeline element '{}'", pipeline)))?;
            sim.linked.iter().any(|c| {
                self.components
                    .get(c)
                    .is_some_and(|kind| kind.is_source())
            })
        };
        if !has_source {
            return Err(EngineError::Rejected(format!(
                "pipeline '{}' has no sources",
                pipeline
            )));
        }
        self.transition(pipeline, PipelineState::Playing)
    }

    fn pause(&mut self, pipeline: &str) -> EngineResult<()> {
        let state = self.pipeline_mut(pipeline)?.state;
        if state != PipelineState::Playing {
            return Err(EngineError::Rejected(format!(
                "pipeline '{}' is {}, not PLAYING",
                pipeline, state
            )));
        }
        self.transition(pipeline, PipelineState::Paused)
    }

    fn dump_to_dot(&self, pipeline: &str, file_name: &str) -> EngineResult<PathBuf> {
        let dir = self.dot_dir.as_ref().ok_or_else(|| {
            EngineError::Rejected("dot dump directory is not configured".to_string())
        })?;
        let sim = self
            .pipelines
            .get(pipeline)
            .ok_or_else(|| EngineError::Rejected(format!("no pipeline element '{}'", pipeline)))?;

        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.dot", file_name));
        std::fs::write(&path, self.render_dot(pipeline, sim))?;
        Ok(path)
    }
}
