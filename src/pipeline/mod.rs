//! Pipeline handles.
//!
//! A [`Pipeline`] is the registry's bookkeeping view of one engine pipeline:
//! which components are attached (by name, in attach order), the cached
//! lifecycle state, the stream-muxer settings and the listener tables. It
//! references components, never owns them; the component registry stays the
//! sole owner.
//!
//! # Structure
//!
//! ```text
//! [source]* ──► [streammux] ──► [gie]? ──► [tiled display]? ──► [osd]? ──► [sink]*
//! ```
//!
//! Sources and sinks may repeat. The inference stage, tiled display and OSD
//! each occupy a single slot.

pub mod listener;

pub use listener::{
    CallbackTable, DisplayEventFn, DisplayEventHandler, StateChangeFn, StateChangeListener,
    UserData,
};

use crate::component::ComponentKind;
use crate::config::StreamMuxSettings;
use crate::engine::PipelineState;
use crate::error::{PipelineOp, Result, ServiceError};

#[derive(Debug)]
pub struct Pipeline {
    name: String,
    components: Vec<(String, ComponentKind)>,
    state: PipelineState,
    streammux: StreamMuxSettings,
    state_listeners: CallbackTable<StateChangeFn>,
    display_handlers: CallbackTable<DisplayEventFn>,
}

impl Pipeline {
    pub fn new(name: &str, streammux: StreamMuxSettings) -> Self {
        Self {
            name: name.to_string(),
            components: Vec::new(),
            state: PipelineState::Idle,
            streammux,
            state_listeners: CallbackTable::new(),
            display_handlers: CallbackTable::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attached component names in attach order
    pub fn components(&self) -> Vec<String> {
        self.components.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn contains(&self, component: &str) -> bool {
        self.components.iter().any(|(n, _)| n == component)
    }

    pub fn num_sources(&self) -> usize {
        self.components
            .iter()
            .filter(|(_, kind)| kind.is_source())
            .count()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: PipelineState) {
        self.state = state;
    }

    pub fn is_playing(&self) -> bool {
        self.state == PipelineState::Playing
    }

    pub fn streammux(&self) -> StreamMuxSettings {
        self.streammux
    }

    fn fail(&self, op: PipelineOp, reason: impl Into<String>) -> ServiceError {
        ServiceError::operation_failed(op, &self.name, reason)
    }

    // ==================== Composition ====================

    /// Check whether `component` could be attached right now.
    pub fn check_add(&self, component: &str, kind: ComponentKind) -> Result<()> {
        if self.is_playing() {
            return Err(self.fail(
                PipelineOp::AddComponent,
                "components cannot be added while playing",
            ));
        }
        if self.contains(component) {
            return Err(self.fail(
                PipelineOp::AddComponent,
                format!("'{}' is already attached", component),
            ));
        }
        if kind.is_single_slot() {
            if let Some((existing, _)) = self.components.iter().find(|(_, k)| *k == kind) {
                return Err(self.fail(
                    PipelineOp::AddComponent,
                    format!("{} slot is already taken by '{}'", kind, existing),
                ));
            }
        }
        Ok(())
    }

    pub fn add_component(&mut self, component: &str, kind: ComponentKind) -> Result<()> {
        self.check_add(component, kind)?;
        self.components.push((component.to_string(), kind));
        Ok(())
    }

    /// Check whether `component` could be detached right now.
    pub fn check_remove(&self, component: &str) -> Result<()> {
        if self.is_playing() {
            return Err(self.fail(
                PipelineOp::RemoveComponent,
                "components cannot be removed while playing",
            ));
        }
        if !self.contains(component) {
            return Err(self.fail(
                PipelineOp::RemoveComponent,
                format!("'{}' is not attached", component),
            ));
        }
        Ok(())
    }

    pub fn remove_component(&mut self, component: &str) -> Result<()> {
        self.check_remove(component)?;
        self.components.retain(|(n, _)| n != component);
        Ok(())
    }

    /// Attachments with their kinds, in attach order
    pub(crate) fn attachments(&self) -> Vec<(String, ComponentKind)> {
        self.components.clone()
    }

    /// Replace the attachment list wholesale. Used to undo a failed bulk
    /// removal; the caller restores the components' own parent links.
    pub(crate) fn restore_attachments(&mut self, attachments: Vec<(String, ComponentKind)>) {
        self.components = attachments;
    }

    /// Drop every attachment, returning the detached names.
    ///
    /// Used on pipeline teardown, where detachment cannot fail.
    pub(crate) fn detach_all(&mut self) -> Vec<String> {
        self.components.drain(..).map(|(n, _)| n).collect()
    }

    // ==================== Stream Muxer ====================

    pub fn check_batch_properties(&self, batch_size: u32, batch_timeout: u32) -> Result<()> {
        self.check_mux_unlocked()?;
        StreamMuxSettings::check_batch_properties(batch_size, batch_timeout)
            .map_err(|e| self.fail(PipelineOp::StreamMuxSet, e))
    }

    pub fn set_batch_properties(&mut self, batch_size: u32, batch_timeout: u32) -> Result<()> {
        self.check_batch_properties(batch_size, batch_timeout)?;
        self.streammux.set_batch_properties(batch_size, batch_timeout);
        Ok(())
    }

    pub fn check_output_size(&self, width: u32, height: u32) -> Result<()> {
        self.check_mux_unlocked()?;
        StreamMuxSettings::check_output_size(width, height)
            .map_err(|e| self.fail(PipelineOp::StreamMuxSet, e))
    }

    pub fn set_output_size(&mut self, width: u32, height: u32) -> Result<()> {
        self.check_output_size(width, height)?;
        self.streammux.set_output_size(width, height);
        Ok(())
    }

    fn check_mux_unlocked(&self) -> Result<()> {
        if self.is_playing() {
            return Err(self.fail(
                PipelineOp::StreamMuxSet,
                "stream muxer cannot be changed while playing",
            ));
        }
        Ok(())
    }

    // ==================== Listeners ====================

    pub fn add_state_change_listener(
        &mut self,
        listener: StateChangeListener,
        user_data: Option<UserData>,
    ) -> Result<()> {
        if !self.state_listeners.add(listener, user_data) {
            return Err(ServiceError::ListenerNotUnique {
                pipeline: self.name.clone(),
            });
        }
        Ok(())
    }

    pub fn remove_state_change_listener(&mut self, listener: &StateChangeListener) -> Result<()> {
        if !self.state_listeners.remove(listener) {
            return Err(ServiceError::ListenerNotFound {
                pipeline: self.name.clone(),
            });
        }
        Ok(())
    }

    pub fn add_display_event_handler(
        &mut self,
        handler: DisplayEventHandler,
        user_data: Option<UserData>,
    ) -> Result<()> {
        if !self.display_handlers.add(handler, user_data) {
            return Err(ServiceError::HandlerNotUnique {
                pipeline: self.name.clone(),
            });
        }
        Ok(())
    }

    pub fn remove_display_event_handler(&mut self, handler: &DisplayEventHandler) -> Result<()> {
        if !self.display_handlers.remove(handler) {
            return Err(ServiceError::HandlerNotFound {
                pipeline: self.name.clone(),
            });
        }
        Ok(())
    }

    pub fn state_listeners(&self) -> Vec<(StateChangeListener, Option<UserData>)> {
        self.state_listeners.snapshot()
    }

    pub fn display_handlers(&self) -> Vec<(DisplayEventHandler, Option<UserData>)> {
        self.display_handlers.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pipeline() -> Pipeline {
        Pipeline::new("p1", StreamMuxSettings::default())
    }

    #[test]
    fn test_single_slot_kinds() {
        let mut p = pipeline();
        p.add_component("cam-0", ComponentKind::CsiSource).unwrap();
        p.add_component("cam-1", ComponentKind::UriSource).unwrap();
        p.add_component("osd", ComponentKind::Osd).unwrap();

        let err = p.add_component("osd-2", ComponentKind::Osd).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::OperationFailed {
                op: PipelineOp::AddComponent,
                ..
            }
        ));
        assert_eq!(p.components(), vec!["cam-0", "cam-1", "osd"]);
        assert_eq!(p.num_sources(), 2);
    }

    #[test]
    fn test_duplicate_attach_rejected() {
        let mut p = pipeline();
        p.add_component("sink", ComponentKind::OverlaySink).unwrap();
        assert!(p.add_component("sink", ComponentKind::OverlaySink).is_err());
    }

    #[test]
    fn test_playing_locks_structure() {
        let mut p = pipeline();
        p.add_component("cam", ComponentKind::CsiSource).unwrap();
        p.set_state(PipelineState::Playing);

        assert!(p.add_component("sink", ComponentKind::OverlaySink).is_err());
        assert!(p.remove_component("cam").is_err());
        assert!(p.set_batch_properties(2, 100).is_err());
        assert!(p.set_output_size(640, 480).is_err());

        p.set_state(PipelineState::Paused);
        p.set_output_size(640, 480).unwrap();
        p.remove_component("cam").unwrap();
        assert!(p.components().is_empty());
    }

    #[test]
    fn test_invalid_mux_values() {
        let mut p = pipeline();
        assert!(p.set_batch_properties(0, 100).is_err());
        assert!(p.set_output_size(0, 0).is_err());
        assert_eq!(p.streammux(), StreamMuxSettings::default());
    }

    #[test]
    fn test_detach_all_drains() {
        let mut p = pipeline();
        p.add_component("a", ComponentKind::CsiSource).unwrap();
        p.add_component("b", ComponentKind::OverlaySink).unwrap();
        assert_eq!(p.detach_all(), vec!["a", "b"]);
        assert!(!p.contains("a"));
    }

    #[test]
    fn test_restore_attachments_keeps_order() {
        let mut p = pipeline();
        p.add_component("a", ComponentKind::CsiSource).unwrap();
        p.add_component("b", ComponentKind::Osd).unwrap();
        p.add_component("c", ComponentKind::OverlaySink).unwrap();
        let saved = p.attachments();

        p.remove_component("a").unwrap();
        p.remove_component("c").unwrap();
        p.restore_attachments(saved);

        assert_eq!(p.components(), vec!["a", "b", "c"]);
        assert_eq!(p.num_sources(), 1);
    }

    #[test]
    fn test_listener_registration() {
        let mut p = pipeline();
        let listener: StateChangeListener = Arc::new(|_, _, _| {});
        p.add_state_change_listener(listener.clone(), None).unwrap();
        assert!(matches!(
            p.add_state_change_listener(listener.clone(), None),
            Err(ServiceError::ListenerNotUnique { .. })
        ));
        p.remove_state_change_listener(&listener).unwrap();
        assert!(matches!(
            p.remove_state_change_listener(&listener),
            Err(ServiceError::ListenerNotFound { .. })
        ));

        let handler: DisplayEventHandler = Arc::new(|_, _| {});
        assert!(matches!(
            p.remove_display_event_handler(&handler),
            Err(ServiceError::HandlerNotFound { .. })
        ));
        p.add_display_event_handler(handler.clone(), None).unwrap();
        assert!(matches!(
            p.add_display_event_handler(handler, None),
            Err(ServiceError::HandlerNotUnique { .. })
        ));
        assert_eq!(p.display_handlers().len(), 1);
    }
}
