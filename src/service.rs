//! Service facade over the component and pipeline registries.
//!
//! [`Services`] is the single synchronisation boundary: every operation takes
//! the service-wide lock for its full duration, so no two registry operations
//! ever run concurrently. The media engine is initialised lazily by the
//! first operation that needs it.
//!
//! # Threading
//!
//! ```text
//! caller threads ──► Services (Mutex<ServiceState>) ──► MediaEngine
//!                                                          │ EngineEvent
//! main-loop thread ◄── MainLoop (crossbeam channel) ◄──────┘
//!        │
//!        └──► listener / handler callbacks (lock released)
//! ```
//!
//! The main loop takes the lock only to snapshot the listener tables;
//! callbacks run after it is released, so a callback may call back into the
//! service. Cached pipeline state is updated by the facade when a transition
//! succeeds, never by queued events.
//!
//! # Bulk operations
//!
//! Bulk deletes and bulk removals validate every name, including repeats,
//! before mutating anything. Bulk attach rolls back the attachments it made when a later one
//! fails. Bulk pipeline creation is sequential and keeps the pipelines
//! created before the first failure.

use crate::component::{BuiltinComponent, Component, ComponentKind, ComponentParams, EntityKind};
use crate::config::{ServiceConfig, StreamMuxSettings};
use crate::engine::{
    EngineError, EngineEvent, MediaEngine, PipelineState, SimulatedEngine,
};
use crate::error::{PipelineOp, ResourceKind, Result, ServiceError};
use crate::main_loop::{EventSender, MainLoop, MainLoopHandle};
use crate::pipeline::{DisplayEventHandler, Pipeline, StateChangeListener, UserData};
use crate::registry::{ComponentRegistry, PipelineRegistry};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Registry state guarded by the service lock.
struct ServiceState {
    components: ComponentRegistry,
    pipelines: PipelineRegistry,
    engine: Box<dyn MediaEngine>,
    engine_ready: bool,
    config: ServiceConfig,
    max_sources_in_use: u32,
}

/// Process-wide service owning both registries and the main loop.
pub struct Services {
    state: Mutex<ServiceState>,
    main_loop: MainLoop,
}

impl Services {
    /// Create a service backed by the [`SimulatedEngine`].
    pub fn new(config: ServiceConfig) -> Self {
        let mut engine = SimulatedEngine::new();
        if let Some(dir) = &config.dot_dump_dir {
            engine = engine.with_dot_dir(dir);
        }
        Self::with_engine(config, Box::new(engine))
    }

    pub fn with_engine(config: ServiceConfig, engine: Box<dyn MediaEngine>) -> Self {
        let max_sources_in_use = config.max_sources_in_use;
        Self {
            state: Mutex::new(ServiceState {
                components: ComponentRegistry::new(),
                pipelines: PipelineRegistry::new(),
                engine,
                engine_ready: false,
                config,
                max_sources_in_use,
            }),
            main_loop: MainLoop::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ServiceState> {
        // Callbacks never run under the lock, so a poisoned guard still
        // holds consistent registry state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock and make sure the engine has been initialised.
    fn session(&self) -> Result<MutexGuard<'_, ServiceState>> {
        let mut state = self.lock();
        if !state.engine_ready {
            state
                .engine
                .initialize(self.main_loop.event_sender())
                .map_err(|e| {
                    tracing::error!("Media engine initialisation failed: {}", e);
                    ServiceError::EngineInit(e.to_string())
                })?;
            state.engine_ready = true;
            tracing::info!("Media engine initialised");
        }
        Ok(state)
    }

    pub fn config(&self) -> ServiceConfig {
        self.lock().config.clone()
    }

    // ==================== Components ====================

    /// Create a component from typed parameters.
    ///
    /// Resource files are checked before anything is constructed.
    pub fn component_create(&self, name: &str, params: ComponentParams) -> Result<()> {
        self.session()?.create_component(name, params)
    }

    pub fn source_csi_new(
        &self,
        name: &str,
        width: u32,
        height: u32,
        fps_n: u32,
        fps_d: u32,
    ) -> Result<()> {
        self.component_create(
            name,
            ComponentParams::CsiSource {
                width,
                height,
                fps_n,
                fps_d,
            },
        )
    }

    /// `uri` names a file inside the configured stream directory.
    pub fn source_uri_new(
        &self,
        name: &str,
        uri: &str,
        cudadec_mem_type: u32,
        intra_decode: bool,
    ) -> Result<()> {
        self.component_create(
            name,
            ComponentParams::UriSource {
                uri: uri.to_string(),
                cudadec_mem_type,
                intra_decode,
            },
        )
    }

    pub fn sink_overlay_new(
        &self,
        name: &str,
        offset_x: u32,
        offset_y: u32,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.component_create(
            name,
            ComponentParams::OverlaySink {
                offset_x,
                offset_y,
                width,
                height,
            },
        )
    }

    pub fn osd_new(&self, name: &str, clock_enabled: bool) -> Result<()> {
        self.component_create(name, ComponentParams::Osd { clock_enabled })
    }

    pub fn display_tiled_new(&self, name: &str, width: u32, height: u32) -> Result<()> {
        self.component_create(name, ComponentParams::TiledDisplay { width, height })
    }

    pub fn gie_primary_new(
        &self,
        name: &str,
        infer_config_file: &str,
        model_engine_file: &str,
        interval: u32,
        unique_id: u32,
    ) -> Result<()> {
        self.component_create(
            name,
            ComponentParams::PrimaryGie {
                infer_config_file: infer_config_file.to_string(),
                model_engine_file: model_engine_file.to_string(),
                interval,
                unique_id,
            },
        )
    }

    pub fn component_delete(&self, name: &str) -> Result<()> {
        self.session()?.delete_component(name)
    }

    /// Delete every named component, or none of them.
    ///
    /// A repeated name fails as `NotFound`, as it would once the first
    /// occurrence had been deleted.
    pub fn component_delete_many<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        let mut state = self.session()?;
        let mut seen = HashSet::new();
        for name in names {
            let name = name.as_ref();
            if !seen.insert(name) {
                tracing::error!("Component '{}' is listed more than once", name);
                return Err(ServiceError::component_not_found(name));
            }
            state.check_component_deletable(name)?;
        }
        tracing::debug!("All {} components validated for deletion", names.len());
        for name in names {
            state.remove_component_entry(name.as_ref());
        }
        Ok(())
    }

    /// Delete every component, or none of them if any is in use.
    pub fn component_delete_all(&self) -> Result<()> {
        let mut state = self.session()?;
        let names = state.components.names();
        for name in &names {
            state.check_component_deletable(name)?;
        }
        for name in &names {
            state.remove_component_entry(name);
        }
        tracing::info!("All {} components deleted", names.len());
        Ok(())
    }

    pub fn component_list(&self) -> Vec<String> {
        self.lock().components.names()
    }

    pub fn component_list_size(&self) -> usize {
        self.lock().components.len()
    }

    pub fn component_params(&self, name: &str) -> Result<ComponentParams> {
        let state = self.lock();
        state
            .components
            .get(name)
            .map(|c| c.params())
            .ok_or_else(|| ServiceError::component_not_found(name))
    }

    pub fn component_is_in_use(&self, name: &str) -> Result<bool> {
        let state = self.lock();
        state
            .components
            .get(name)
            .map(|c| c.is_in_use())
            .ok_or_else(|| ServiceError::component_not_found(name))
    }

    /// Name of the pipeline the component is attached to, if any
    pub fn component_parent(&self, name: &str) -> Result<Option<String>> {
        let state = self.lock();
        state
            .components
            .get(name)
            .map(|c| c.parent().map(str::to_string))
            .ok_or_else(|| ServiceError::component_not_found(name))
    }

    pub fn source_is_live(&self, name: &str) -> Result<bool> {
        let state = self.lock();
        let component = state
            .components
            .get(name)
            .ok_or_else(|| ServiceError::component_not_found(name))?;
        component.is_live().ok_or_else(|| ServiceError::NotASource {
            name: name.to_string(),
        })
    }

    pub fn num_sources_in_use(&self) -> usize {
        self.lock().num_sources_in_use()
    }

    pub fn num_sources_in_use_max(&self) -> u32 {
        self.lock().max_sources_in_use
    }

    /// Set the attach-time bound on sources in use.
    ///
    /// Lowering it below current usage only blocks further attachments.
    pub fn set_num_sources_in_use_max(&self, max: u32) {
        let mut state = self.lock();
        tracing::info!(
            "Max sources in use changed from {} to {}",
            state.max_sources_in_use,
            max
        );
        state.max_sources_in_use = max;
    }

    // ==================== Pipelines ====================

    pub fn pipeline_new(&self, name: &str) -> Result<()> {
        self.session()?.create_pipeline(name)
    }

    /// Create pipelines in order, stopping at the first failure.
    ///
    /// Pipelines created before the failure are kept.
    pub fn pipeline_new_many<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        let mut state = self.session()?;
        for name in names {
            state.create_pipeline(name.as_ref())?;
        }
        Ok(())
    }

    pub fn pipeline_delete(&self, name: &str) -> Result<()> {
        let mut state = self.session()?;
        if !state.pipelines.contains(name) {
            tracing::error!("Pipeline '{}' was not found", name);
            return Err(ServiceError::pipeline_not_found(name));
        }
        state.delete_pipeline(name);
        Ok(())
    }

    pub fn pipeline_delete_many<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        let mut state = self.session()?;
        for name in names {
            if !state.pipelines.contains(name.as_ref()) {
                tracing::error!("Pipeline '{}' was not found", name.as_ref());
                return Err(ServiceError::pipeline_not_found(name.as_ref()));
            }
        }
        tracing::debug!("All {} pipelines validated for deletion", names.len());
        for name in names {
            state.delete_pipeline(name.as_ref());
        }
        Ok(())
    }

    pub fn pipeline_delete_all(&self) -> Result<()> {
        let mut state = self.session()?;
        let names = state.pipelines.names();
        for name in &names {
            state.delete_pipeline(name);
        }
        tracing::info!("All {} pipelines deleted", names.len());
        Ok(())
    }

    pub fn pipeline_list(&self) -> Vec<String> {
        self.lock().pipelines.names()
    }

    pub fn pipeline_list_size(&self) -> usize {
        self.lock().pipelines.len()
    }

    /// Components attached to a pipeline, in attach order
    pub fn pipeline_components(&self, name: &str) -> Result<Vec<String>> {
        let state = self.lock();
        state
            .pipelines
            .get(name)
            .map(Pipeline::components)
            .ok_or_else(|| ServiceError::pipeline_not_found(name))
    }

    pub fn pipeline_component_add(&self, pipeline: &str, component: &str) -> Result<()> {
        self.session()?.add_component(pipeline, component)
    }

    /// Attach components in order; on failure every attachment made by this
    /// call is undone.
    pub fn pipeline_component_add_many<S: AsRef<str>>(
        &self,
        pipeline: &str,
        components: &[S],
    ) -> Result<()> {
        let mut state = self.session()?;
        if !state.pipelines.contains(pipeline) {
            tracing::error!("Pipeline '{}' was not found", pipeline);
            return Err(ServiceError::pipeline_not_found(pipeline));
        }
        let mut seen = HashSet::new();
        for name in components {
            let name = name.as_ref();
            if !state.components.contains(name) {
                tracing::error!("Component '{}' was not found", name);
                return Err(ServiceError::component_not_found(name));
            }
            if !seen.insert(name) {
                return Err(log_failure(ServiceError::operation_failed(
                    PipelineOp::AddComponent,
                    pipeline,
                    format!("'{}' is listed more than once", name),
                )));
            }
        }
        tracing::debug!(
            "All {} components validated for Pipeline '{}'",
            components.len(),
            pipeline
        );

        let mut attached: Vec<&str> = Vec::with_capacity(components.len());
        for name in components {
            let name = name.as_ref();
            if let Err(e) = state.add_component(pipeline, name) {
                for done in attached.iter().rev() {
                    state.rollback_attach(pipeline, done);
                }
                return Err(match e {
                    e @ ServiceError::OperationFailed { .. } => e,
                    other => ServiceError::operation_failed(
                        PipelineOp::AddComponent,
                        pipeline,
                        other.to_string(),
                    ),
                });
            }
            attached.push(name);
        }
        Ok(())
    }

    pub fn pipeline_component_remove(&self, pipeline: &str, component: &str) -> Result<()> {
        self.session()?.remove_component(pipeline, component)
    }

    /// Detach every named component, or none of them.
    ///
    /// A repeated name fails as `NotOwned`, as it would once the first
    /// occurrence had been detached. If the engine rejects a detach, the
    /// detachments already made by this call are restored.
    pub fn pipeline_component_remove_many<S: AsRef<str>>(
        &self,
        pipeline: &str,
        components: &[S],
    ) -> Result<()> {
        let mut state = self.session()?;
        let mut seen = HashSet::new();
        for name in components {
            let name = name.as_ref();
            state.check_removable(pipeline, name)?;
            if !seen.insert(name) {
                tracing::error!("Component '{}' is listed more than once", name);
                return Err(ServiceError::NotOwned {
                    component: name.to_string(),
                    pipeline: pipeline.to_string(),
                });
            }
        }
        tracing::debug!(
            "All {} components validated for removal from Pipeline '{}'",
            components.len(),
            pipeline
        );

        let attachments = state
            .pipelines
            .get(pipeline)
            .map(Pipeline::attachments)
            .unwrap_or_default();
        let mut removed: Vec<&str> = Vec::with_capacity(components.len());
        for name in components {
            let name = name.as_ref();
            if let Err(e) = state.remove_component(pipeline, name) {
                state.rollback_remove(pipeline, &removed, attachments);
                return Err(e);
            }
            removed.push(name);
        }
        Ok(())
    }

    pub fn pipeline_streammux_settings(&self, name: &str) -> Result<StreamMuxSettings> {
        let state = self.lock();
        state
            .pipelines
            .get(name)
            .map(Pipeline::streammux)
            .ok_or_else(|| ServiceError::pipeline_not_found(name))
    }

    pub fn pipeline_streammux_batch_properties_set(
        &self,
        name: &str,
        batch_size: u32,
        batch_timeout: u32,
    ) -> Result<()> {
        let mut state = self.session()?;
        let ServiceState {
            pipelines, engine, ..
        } = &mut *state;
        let pipeline = pipelines
            .get_mut(name)
            .ok_or_else(|| ServiceError::pipeline_not_found(name))?;
        pipeline
            .check_batch_properties(batch_size, batch_timeout)
            .map_err(log_failure)?;
        engine
            .set_batch_properties(name, batch_size, batch_timeout)
            .map_err(|e| engine_failure(PipelineOp::StreamMuxSet, name, e))?;
        pipeline.set_batch_properties(batch_size, batch_timeout)
    }

    pub fn pipeline_streammux_output_size_set(
        &self,
        name: &str,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let mut state = self.session()?;
        let ServiceState {
            pipelines, engine, ..
        } = &mut *state;
        let pipeline = pipelines
            .get_mut(name)
            .ok_or_else(|| ServiceError::pipeline_not_found(name))?;
        pipeline
            .check_output_size(width, height)
            .map_err(log_failure)?;
        engine
            .set_output_size(name, width, height)
            .map_err(|e| engine_failure(PipelineOp::StreamMuxSet, name, e))?;
        pipeline.set_output_size(width, height)
    }

    /// Start the pipeline. Playing an already playing pipeline succeeds.
    pub fn pipeline_play(&self, name: &str) -> Result<()> {
        let mut state = self.session()?;
        let ServiceState {
            pipelines, engine, ..
        } = &mut *state;
        let pipeline = pipelines
            .get_mut(name)
            .ok_or_else(|| ServiceError::pipeline_not_found(name))?;
        if pipeline.is_playing() {
            return Ok(());
        }
        engine
            .play(name)
            .map_err(|e| engine_failure(PipelineOp::Play, name, e))?;
        pipeline.set_state(PipelineState::Playing);
        tracing::info!("Pipeline '{}' is playing", name);
        Ok(())
    }

    /// Pause a playing pipeline.
    pub fn pipeline_pause(&self, name: &str) -> Result<()> {
        let mut state = self.session()?;
        let ServiceState {
            pipelines, engine, ..
        } = &mut *state;
        let pipeline = pipelines
            .get_mut(name)
            .ok_or_else(|| ServiceError::pipeline_not_found(name))?;
        if !pipeline.is_playing() {
            return Err(log_failure(ServiceError::operation_failed(
                PipelineOp::Pause,
                name,
                format!("pipeline is {}", pipeline.state()),
            )));
        }
        engine
            .pause(name)
            .map_err(|e| engine_failure(PipelineOp::Pause, name, e))?;
        pipeline.set_state(PipelineState::Paused);
        tracing::info!("Pipeline '{}' is paused", name);
        Ok(())
    }

    pub fn pipeline_get_state(&self, name: &str) -> Result<PipelineState> {
        let state = self.lock();
        state
            .pipelines
            .get(name)
            .map(Pipeline::state)
            .ok_or_else(|| ServiceError::pipeline_not_found(name))
    }

    /// Write the pipeline graph to `<dump dir>/<file_name>.dot`.
    pub fn pipeline_dump_to_dot(&self, name: &str, file_name: &str) -> Result<PathBuf> {
        let state = self.session()?;
        if !state.pipelines.contains(name) {
            return Err(ServiceError::pipeline_not_found(name));
        }
        let path = state
            .engine
            .dump_to_dot(name, file_name)
            .map_err(|e| engine_failure(PipelineOp::DumpToDot, name, e))?;
        tracing::info!("Pipeline '{}' graph written to {:?}", name, path);
        Ok(path)
    }

    /// Same as [`Self::pipeline_dump_to_dot`] with a local timestamp prefix.
    pub fn pipeline_dump_to_dot_with_ts(&self, name: &str, file_name: &str) -> Result<PathBuf> {
        let stamped = format!(
            "{}-{}",
            chrono::Local::now().format("%Y%m%d-%H%M%S%.3f"),
            file_name
        );
        self.pipeline_dump_to_dot(name, &stamped)
    }

    // ==================== Listeners ====================

    pub fn pipeline_state_change_listener_add(
        &self,
        name: &str,
        listener: StateChangeListener,
        user_data: Option<UserData>,
    ) -> Result<()> {
        self.with_pipeline(name, |p| p.add_state_change_listener(listener, user_data))
    }

    pub fn pipeline_state_change_listener_remove(
        &self,
        name: &str,
        listener: &StateChangeListener,
    ) -> Result<()> {
        self.with_pipeline(name, |p| p.remove_state_change_listener(listener))
    }

    pub fn pipeline_display_event_handler_add(
        &self,
        name: &str,
        handler: DisplayEventHandler,
        user_data: Option<UserData>,
    ) -> Result<()> {
        self.with_pipeline(name, |p| p.add_display_event_handler(handler, user_data))
    }

    pub fn pipeline_display_event_handler_remove(
        &self,
        name: &str,
        handler: &DisplayEventHandler,
    ) -> Result<()> {
        self.with_pipeline(name, |p| p.remove_display_event_handler(handler))
    }

    fn with_pipeline<F>(&self, name: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Pipeline) -> Result<()>,
    {
        let mut state = self.lock();
        let pipeline = state
            .pipelines
            .get_mut(name)
            .ok_or_else(|| ServiceError::pipeline_not_found(name))?;
        f(pipeline).map_err(log_failure)
    }

    // ==================== Main Loop ====================

    /// Block dispatching engine events until the loop is asked to quit.
    pub fn run_main_loop(&self) -> Result<()> {
        drop(self.session()?);
        self.main_loop.run(|event| self.dispatch(event));
        Ok(())
    }

    pub fn quit_main_loop(&self) {
        self.main_loop.handle().quit();
    }

    pub fn main_loop_handle(&self) -> MainLoopHandle {
        self.main_loop.handle()
    }

    pub fn is_main_loop_running(&self) -> bool {
        self.main_loop.is_running()
    }

    /// Sender an engine (or a test) can use to post events directly
    pub fn event_sender(&self) -> EventSender {
        self.main_loop.event_sender()
    }

    fn dispatch(&self, event: EngineEvent) {
        match event {
            EngineEvent::StateChanged {
                pipeline,
                previous,
                current,
            } => {
                let listeners = {
                    let state = self.lock();
                    match state.pipelines.get(&pipeline) {
                        Some(p) => p.state_listeners(),
                        None => {
                            tracing::debug!("State change for unknown pipeline '{}'", pipeline);
                            return;
                        }
                    }
                };
                tracing::debug!(
                    "Pipeline '{}' changed state {} -> {}",
                    pipeline,
                    previous,
                    current
                );
                for (listener, data) in listeners {
                    listener(previous, current, data.as_ref());
                }
            }
            EngineEvent::Display { pipeline, event } => {
                let handlers = {
                    let state = self.lock();
                    match state.pipelines.get(&pipeline) {
                        Some(p) => p.display_handlers(),
                        None => return,
                    }
                };
                for (handler, data) in handlers {
                    handler(&event, data.as_ref());
                }
            }
            EngineEvent::EndOfStream { pipeline } => {
                tracing::info!("Pipeline '{}' reached end of stream", pipeline);
            }
            EngineEvent::Error { pipeline, message } => {
                tracing::error!("Pipeline '{}' reported an error: {}", pipeline, message);
            }
        }
    }
}

impl Drop for Services {
    fn drop(&mut self) {
        if self.main_loop.is_running() {
            tracing::warn!("Services dropped while the main loop is still running");
            self.main_loop.handle().quit();
        }
    }
}

impl ServiceState {
    fn num_sources_in_use(&self) -> usize {
        self.pipelines.iter().map(|(_, p)| p.num_sources()).sum()
    }

    // ==================== Component Lifecycle ====================

    fn create_component(&mut self, name: &str, params: ComponentParams) -> Result<()> {
        let kind = params.kind().entity();
        if self.components.contains(name) {
            tracing::error!("{} name '{}' is not unique", kind, name);
            return Err(ServiceError::NameNotUnique {
                kind,
                name: name.to_string(),
            });
        }

        let params = self.resolve_resources(params)?;
        let construction_failed = |reason: String| {
            tracing::error!("New {} '{}' threw exception on create: {}", kind, name, reason);
            ServiceError::ConstructionFailed {
                kind,
                name: name.to_string(),
                reason,
            }
        };

        let component = BuiltinComponent::from_params(name, &params)
            .map_err(|e| construction_failed(e.to_string()))?;
        self.engine
            .build_component(name, &params)
            .map_err(|e| construction_failed(e.to_string()))?;

        if self.components.insert(name, component).is_err() {
            self.engine.release_component(name);
            return Err(ServiceError::NameNotUnique {
                kind,
                name: name.to_string(),
            });
        }
        tracing::info!("New {} '{}' created", kind, name);
        Ok(())
    }

    /// Check referenced files and rewrite their paths to resolved form.
    fn resolve_resources(&self, params: ComponentParams) -> Result<ComponentParams> {
        match params {
            ComponentParams::UriSource {
                uri,
                cudadec_mem_type,
                intra_decode,
            } => {
                let path = self.config.stream_path(&uri);
                require_file(ResourceKind::StreamFile, &path)?;
                Ok(ComponentParams::UriSource {
                    uri: format!("file:{}", path.display()),
                    cudadec_mem_type,
                    intra_decode,
                })
            }
            ComponentParams::PrimaryGie {
                infer_config_file,
                model_engine_file,
                interval,
                unique_id,
            } => {
                let config = self.config.infer_config_path(&infer_config_file);
                require_file(ResourceKind::InferConfigFile, &config)?;
                let model = self.config.model_engine_path(&model_engine_file);
                require_file(ResourceKind::ModelEngineFile, &model)?;
                Ok(ComponentParams::PrimaryGie {
                    infer_config_file: config.display().to_string(),
                    model_engine_file: model.display().to_string(),
                    interval,
                    unique_id,
                })
            }
            other => Ok(other),
        }
    }

    fn check_component_deletable(&self, name: &str) -> Result<()> {
        let component = self.components.get(name).ok_or_else(|| {
            tracing::error!("Component '{}' was not found", name);
            ServiceError::component_not_found(name)
        })?;
        if component.is_in_use() {
            tracing::error!("Component '{}' is in use", name);
            return Err(ServiceError::InUse {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn delete_component(&mut self, name: &str) -> Result<()> {
        self.check_component_deletable(name)?;
        self.remove_component_entry(name);
        Ok(())
    }

    fn remove_component_entry(&mut self, name: &str) {
        if self.components.remove(name).is_some() {
            self.engine.release_component(name);
            tracing::info!("Component '{}' deleted", name);
        }
    }

    // ==================== Pipeline Lifecycle ====================

    fn create_pipeline(&mut self, name: &str) -> Result<()> {
        if self.pipelines.contains(name) {
            tracing::error!("Pipeline name '{}' is not unique", name);
            return Err(ServiceError::NameNotUnique {
                kind: EntityKind::Pipeline,
                name: name.to_string(),
            });
        }

        let mux = self.config.streammux;
        let built = self.engine.build_pipeline(name).and_then(|_| {
            self.engine
                .set_batch_properties(name, mux.batch_size, mux.batch_timeout)?;
            self.engine.set_output_size(name, mux.width, mux.height)
        });
        if let Err(e) = built {
            tracing::error!("New Pipeline '{}' threw exception on create: {}", name, e);
            self.engine.release_pipeline(name);
            return Err(ServiceError::ConstructionFailed {
                kind: EntityKind::Pipeline,
                name: name.to_string(),
                reason: e.to_string(),
            });
        }

        if self.pipelines.insert(name, Pipeline::new(name, mux)).is_err() {
            self.engine.release_pipeline(name);
            return Err(ServiceError::NameNotUnique {
                kind: EntityKind::Pipeline,
                name: name.to_string(),
            });
        }
        tracing::info!("New Pipeline '{}' created", name);
        Ok(())
    }

    /// Detach every component, then destroy the pipeline. Never fails.
    fn delete_pipeline(&mut self, name: &str) {
        let Some(pipeline) = self.pipelines.get_mut(name) else {
            return;
        };
        for component in pipeline.detach_all() {
            if let Some(c) = self.components.get_mut(&component) {
                if let Err(e) = c.detach_from(name) {
                    tracing::warn!("Component '{}' detach on delete: {}", component, e);
                }
            }
        }
        self.engine.release_pipeline(name);
        self.pipelines.remove(name);
        tracing::info!("Pipeline '{}' deleted", name);
    }

    // ==================== Composition ====================

    fn add_component(&mut self, pipeline: &str, component: &str) -> Result<()> {
        if !self.pipelines.contains(pipeline) {
            tracing::error!("Pipeline '{}' was not found", pipeline);
            return Err(ServiceError::pipeline_not_found(pipeline));
        }
        let (kind, parent) = match self.components.get(component) {
            Some(c) => (c.kind(), c.parent().map(str::to_string)),
            None => {
                tracing::error!("Component '{}' was not found", component);
                return Err(ServiceError::component_not_found(component));
            }
        };

        if let Some(parent) = parent {
            return Err(log_failure(ServiceError::operation_failed(
                PipelineOp::AddComponent,
                pipeline,
                format!("'{}' is already in use by Pipeline '{}'", component, parent),
            )));
        }
        if kind.is_source() && self.num_sources_in_use() >= self.max_sources_in_use as usize {
            tracing::error!(
                "Max sources in use ({}) reached, cannot add '{}'",
                self.max_sources_in_use,
                component
            );
            return Err(ServiceError::SourceLimitReached {
                max: self.max_sources_in_use,
            });
        }

        let Self {
            components,
            pipelines,
            engine,
            ..
        } = self;
        let (Some(p), Some(c)) = (pipelines.get_mut(pipeline), components.get_mut(component))
        else {
            return Err(ServiceError::pipeline_not_found(pipeline));
        };

        p.check_add(component, kind).map_err(log_failure)?;
        engine
            .link(pipeline, component)
            .map_err(|e| engine_failure(PipelineOp::AddComponent, pipeline, e))?;
        p.add_component(component, kind)?;
        if let Err(e) = c.attach_to(pipeline) {
            let _ = p.remove_component(component);
            let _ = engine.unlink(pipeline, component);
            return Err(log_failure(ServiceError::operation_failed(
                PipelineOp::AddComponent,
                pipeline,
                e.to_string(),
            )));
        }

        tracing::info!("Component '{}' added to Pipeline '{}'", component, pipeline);
        Ok(())
    }

    /// Re-attach components detached earlier in the same bulk call and put
    /// the pipeline's attach order back to `attachments`.
    fn rollback_remove(
        &mut self,
        pipeline: &str,
        removed: &[&str],
        attachments: Vec<(String, ComponentKind)>,
    ) {
        for component in removed {
            if let Err(e) = self.engine.link(pipeline, component) {
                tracing::warn!("Relink of '{}' into '{}' failed: {}", component, pipeline, e);
            }
            if let Some(c) = self.components.get_mut(component) {
                let _ = c.attach_to(pipeline);
            }
        }
        if let Some(p) = self.pipelines.get_mut(pipeline) {
            p.restore_attachments(attachments);
        }
        tracing::debug!(
            "Restored {} components to Pipeline '{}'",
            removed.len(),
            pipeline
        );
    }

    /// Undo an attachment made earlier in the same bulk call.
    fn rollback_attach(&mut self, pipeline: &str, component: &str) {
        if let Some(p) = self.pipelines.get_mut(pipeline) {
            let _ = p.remove_component(component);
        }
        let _ = self.engine.unlink(pipeline, component);
        if let Some(c) = self.components.get_mut(component) {
            let _ = c.detach_from(pipeline);
        }
        tracing::debug!(
            "Rolled back '{}' from Pipeline '{}'",
            component,
            pipeline
        );
    }

    fn check_removable(&self, pipeline: &str, component: &str) -> Result<()> {
        let p = self.pipelines.get(pipeline).ok_or_else(|| {
            tracing::error!("Pipeline '{}' was not found", pipeline);
            ServiceError::pipeline_not_found(pipeline)
        })?;
        let c = self.components.get(component).ok_or_else(|| {
            tracing::error!("Component '{}' was not found", component);
            ServiceError::component_not_found(component)
        })?;
        if !c.is_parent(pipeline) {
            tracing::error!(
                "Component '{}' is not in use by Pipeline '{}'",
                component,
                pipeline
            );
            return Err(ServiceError::NotOwned {
                component: component.to_string(),
                pipeline: pipeline.to_string(),
            });
        }
        p.check_remove(component).map_err(log_failure)
    }

    fn remove_component(&mut self, pipeline: &str, component: &str) -> Result<()> {
        self.check_removable(pipeline, component)?;

        let Self {
            components,
            pipelines,
            engine,
            ..
        } = self;
        let (Some(p), Some(c)) = (pipelines.get_mut(pipeline), components.get_mut(component))
        else {
            return Err(ServiceError::component_not_found(component));
        };

        engine
            .unlink(pipeline, component)
            .map_err(|e| engine_failure(PipelineOp::RemoveComponent, pipeline, e))?;
        p.remove_component(component)?;
        c.detach_from(pipeline).map_err(|e| {
            log_failure(ServiceError::operation_failed(
                PipelineOp::RemoveComponent,
                pipeline,
                e.to_string(),
            ))
        })?;

        tracing::info!(
            "Component '{}' removed from Pipeline '{}'",
            component,
            pipeline
        );
        Ok(())
    }
}

fn require_file(resource: ResourceKind, path: &std::path::Path) -> Result<()> {
    if !path.is_file() {
        tracing::error!("{} not found: {:?}", resource, path);
        return Err(ServiceError::ResourceNotFound {
            resource,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn log_failure(e: ServiceError) -> ServiceError {
    tracing::error!("{}", e);
    e
}

/// Convert a rejected engine call into the operation's error.
fn engine_failure(op: PipelineOp, pipeline: &str, e: EngineError) -> ServiceError {
    let err = match e {
        EngineError::Unsupported(what) => ServiceError::NotImplemented(what.to_string()),
        other => ServiceError::operation_failed(op, pipeline, other.to_string()),
    };
    log_failure(err)
}
