//! Flat, code-returning surface over the process-wide service.
//!
//! Each function maps to one service operation and returns a [`ResultCode`]
//! instead of a `Result`. The first call from any thread creates the
//! singleton: it loads [`ServiceConfig::load_or_default`], installs logging
//! and builds a [`Services`] backed by the simulated engine. The engine
//! itself is initialised by the first operation that needs it.
//!
//! List functions return owned snapshots; later mutations do not affect a
//! list already returned.
//!
//! # Example
//!
//! ```ignore
//! use pipeline_services::api;
//!
//! assert!(api::pipeline_new("p1").is_success());
//! assert!(api::source_csi_new("cam", 1280, 720, 30, 1).is_success());
//! assert!(api::pipeline_component_add("p1", "cam").is_success());
//! api::main_loop_run(); // until Ctrl-C
//! ```

use crate::config::ServiceConfig;
use crate::engine::PipelineState;
use crate::error::{Result, ResultCode};
use crate::logging;
use crate::main_loop::install_interrupt_handler;
use crate::pipeline::{DisplayEventHandler, StateChangeListener, UserData};
use crate::service::Services;
use std::sync::OnceLock;

static SERVICES: OnceLock<Services> = OnceLock::new();

/// The process-wide service, created on first use.
pub fn services() -> &'static Services {
    SERVICES.get_or_init(|| {
        let config = ServiceConfig::load_or_default();
        logging::init(&config);
        tracing::info!("Pipeline services created");
        Services::new(config)
    })
}

fn code(result: Result<()>) -> ResultCode {
    ResultCode::from(result)
}

fn value<T>(result: Result<T>) -> std::result::Result<T, ResultCode> {
    result.map_err(|e| e.code())
}

// ==================== Components ====================

pub fn source_csi_new(name: &str, width: u32, height: u32, fps_n: u32, fps_d: u32) -> ResultCode {
    code(services().source_csi_new(name, width, height, fps_n, fps_d))
}

pub fn source_uri_new(
    name: &str,
    uri: &str,
    cudadec_mem_type: u32,
    intra_decode: bool,
) -> ResultCode {
    code(services().source_uri_new(name, uri, cudadec_mem_type, intra_decode))
}

pub fn source_is_live(name: &str) -> std::result::Result<bool, ResultCode> {
    value(services().source_is_live(name))
}

pub fn source_num_in_use_get() -> usize {
    services().num_sources_in_use()
}

pub fn source_num_in_use_max_get() -> u32 {
    services().num_sources_in_use_max()
}

pub fn source_num_in_use_max_set(max: u32) {
    services().set_num_sources_in_use_max(max)
}

pub fn sink_overlay_new(
    name: &str,
    offset_x: u32,
    offset_y: u32,
    width: u32,
    height: u32,
) -> ResultCode {
    code(services().sink_overlay_new(name, offset_x, offset_y, width, height))
}

pub fn osd_new(name: &str, clock_enabled: bool) -> ResultCode {
    code(services().osd_new(name, clock_enabled))
}

pub fn display_tiled_new(name: &str, width: u32, height: u32) -> ResultCode {
    code(services().display_tiled_new(name, width, height))
}

pub fn gie_primary_new(
    name: &str,
    infer_config_file: &str,
    model_engine_file: &str,
    interval: u32,
    unique_id: u32,
) -> ResultCode {
    code(services().gie_primary_new(
        name,
        infer_config_file,
        model_engine_file,
        interval,
        unique_id,
    ))
}

pub fn component_delete(name: &str) -> ResultCode {
    code(services().component_delete(name))
}

pub fn component_delete_many<S: AsRef<str>>(names: &[S]) -> ResultCode {
    code(services().component_delete_many(names))
}

pub fn component_delete_all() -> ResultCode {
    code(services().component_delete_all())
}

pub fn component_list_size() -> usize {
    services().component_list_size()
}

pub fn component_list_all() -> Vec<String> {
    services().component_list()
}

// ==================== Pipelines ====================

pub fn pipeline_new(name: &str) -> ResultCode {
    code(services().pipeline_new(name))
}

pub fn pipeline_new_many<S: AsRef<str>>(names: &[S]) -> ResultCode {
    code(services().pipeline_new_many(names))
}

pub fn pipeline_delete(name: &str) -> ResultCode {
    code(services().pipeline_delete(name))
}

pub fn pipeline_delete_many<S: AsRef<str>>(names: &[S]) -> ResultCode {
    code(services().pipeline_delete_many(names))
}

pub fn pipeline_delete_all() -> ResultCode {
    code(services().pipeline_delete_all())
}

pub fn pipeline_list_size() -> usize {
    services().pipeline_list_size()
}

pub fn pipeline_list_all() -> Vec<String> {
    services().pipeline_list()
}

pub fn pipeline_component_add(pipeline: &str, component: &str) -> ResultCode {
    code(services().pipeline_component_add(pipeline, component))
}

pub fn pipeline_component_add_many<S: AsRef<str>>(pipeline: &str, components: &[S]) -> ResultCode {
    code(services().pipeline_component_add_many(pipeline, components))
}

pub fn pipeline_component_remove(pipeline: &str, component: &str) -> ResultCode {
    code(services().pipeline_component_remove(pipeline, component))
}

pub fn pipeline_component_remove_many<S: AsRef<str>>(
    pipeline: &str,
    components: &[S],
) -> ResultCode {
    code(services().pipeline_component_remove_many(pipeline, components))
}

pub fn pipeline_streammux_batch_properties_set(
    pipeline: &str,
    batch_size: u32,
    batch_timeout: u32,
) -> ResultCode {
    code(services().pipeline_streammux_batch_properties_set(pipeline, batch_size, batch_timeout))
}

pub fn pipeline_streammux_output_size_set(pipeline: &str, width: u32, height: u32) -> ResultCode {
    code(services().pipeline_streammux_output_size_set(pipeline, width, height))
}

pub fn pipeline_play(pipeline: &str) -> ResultCode {
    code(services().pipeline_play(pipeline))
}

pub fn pipeline_pause(pipeline: &str) -> ResultCode {
    code(services().pipeline_pause(pipeline))
}

pub fn pipeline_get_state(pipeline: &str) -> std::result::Result<PipelineState, ResultCode> {
    value(services().pipeline_get_state(pipeline))
}

pub fn pipeline_dump_to_dot(pipeline: &str, file_name: &str) -> ResultCode {
    code(services().pipeline_dump_to_dot(pipeline, file_name).map(|_| ()))
}

pub fn pipeline_dump_to_dot_with_ts(pipeline: &str, file_name: &str) -> ResultCode {
    code(
        services()
            .pipeline_dump_to_dot_with_ts(pipeline, file_name)
            .map(|_| ()),
    )
}

pub fn pipeline_state_change_listener_add(
    pipeline: &str,
    listener: StateChangeListener,
    user_data: Option<UserData>,
) -> ResultCode {
    code(services().pipeline_state_change_listener_add(pipeline, listener, user_data))
}

pub fn pipeline_state_change_listener_remove(
    pipeline: &str,
    listener: &StateChangeListener,
) -> ResultCode {
    code(services().pipeline_state_change_listener_remove(pipeline, listener))
}

pub fn pipeline_display_event_handler_add(
    pipeline: &str,
    handler: DisplayEventHandler,
    user_data: Option<UserData>,
) -> ResultCode {
    code(services().pipeline_display_event_handler_add(pipeline, handler, user_data))
}

pub fn pipeline_display_event_handler_remove(
    pipeline: &str,
    handler: &DisplayEventHandler,
) -> ResultCode {
    code(services().pipeline_display_event_handler_remove(pipeline, handler))
}

// ==================== Main Loop ====================

/// Run the main loop until Ctrl-C or [`main_loop_quit`].
pub fn main_loop_run() -> ResultCode {
    let services = services();
    if let Err(e) = install_interrupt_handler(services.main_loop_handle()) {
        tracing::warn!("Could not install interrupt handler: {}", e);
    }
    code(services.run_main_loop())
}

pub fn main_loop_quit() {
    services().quit_main_loop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn reset() {
        let _ = pipeline_delete_all();
        let _ = component_delete_all();
    }

    #[test]
    #[serial]
    fn test_singleton_is_shared() {
        reset();
        assert!(std::ptr::eq(services(), services()));
        assert_eq!(pipeline_new("api-p1"), ResultCode::Success);
        assert_eq!(pipeline_new("api-p1"), ResultCode::PipelineNameNotUnique);
        assert_eq!(pipeline_list_all(), vec!["api-p1"]);
        reset();
    }

    #[test]
    #[serial]
    fn test_codes_for_scenario() {
        reset();
        assert_eq!(pipeline_new("api-p1"), ResultCode::Success);
        assert_eq!(
            source_csi_new("api-s1", 1280, 720, 30, 1),
            ResultCode::Success
        );
        assert_eq!(pipeline_component_add("api-p1", "api-s1"), ResultCode::Success);
        assert_eq!(component_delete("api-s1"), ResultCode::ComponentInUse);
        assert_eq!(source_num_in_use_get(), 1);
        assert_eq!(source_is_live("api-s1"), Ok(true));
        assert_eq!(
            pipeline_get_state("api-p1"),
            Ok(PipelineState::Idle)
        );
        assert_eq!(
            pipeline_component_remove("api-p1", "api-s1"),
            ResultCode::Success
        );
        assert_eq!(component_delete("api-s1"), ResultCode::Success);
        assert_eq!(component_delete("api-s1"), ResultCode::ComponentNameNotFound);
        reset();
    }
}
