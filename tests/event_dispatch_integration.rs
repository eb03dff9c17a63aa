//! Integration tests for the main loop and listener dispatch
//!
//! Engine events flow through the main loop to the listeners registered on
//! each pipeline, with the service lock released while callbacks run.

mod common;

use common::builders::TestEnvBuilder;
use common::mock_helpers::{recording_display_handler, recording_state_listener, spawn_main_loop};
use pipeline_services::{
    DisplayEvent, EngineEvent, PipelineState, ResultCode, Services, StateChangeListener,
};
use std::sync::Arc;

fn playable(services: &Services, pipeline: &str) {
    services.pipeline_new(pipeline).unwrap();
    let cam = format!("{}-cam", pipeline);
    services.source_csi_new(&cam, 1280, 720, 30, 1).unwrap();
    services.pipeline_component_add(pipeline, &cam).unwrap();
}

#[test]
fn test_state_changes_reach_listeners() {
    let env = TestEnvBuilder::new().build();
    let services = Arc::new(env.services);
    playable(&services, "p1");

    let (listener, transitions) = recording_state_listener();
    services
        .pipeline_state_change_listener_add("p1", listener, None)
        .unwrap();

    let runner = spawn_main_loop(services.clone());
    assert!(common::wait_until(|| services.is_main_loop_running()));

    services.pipeline_play("p1").unwrap();
    services.pipeline_pause("p1").unwrap();
    assert!(common::wait_until(|| transitions.lock().unwrap().len() == 2));

    services.quit_main_loop();
    runner.join().unwrap();

    assert_eq!(
        *transitions.lock().unwrap(),
        vec![
            (PipelineState::Idle, PipelineState::Playing),
            (PipelineState::Playing, PipelineState::Paused),
        ]
    );
}

#[test]
fn test_listeners_only_see_their_pipeline() {
    let env = TestEnvBuilder::new().build();
    let services = Arc::new(env.services);
    playable(&services, "p1");
    playable(&services, "p2");

    let (first, first_log) = recording_state_listener();
    let (second, second_log) = recording_state_listener();
    services
        .pipeline_state_change_listener_add("p1", first, None)
        .unwrap();
    services
        .pipeline_state_change_listener_add("p2", second, None)
        .unwrap();

    services.pipeline_play("p2").unwrap();
    services.quit_main_loop();
    services.run_main_loop().unwrap();

    assert!(first_log.lock().unwrap().is_empty());
    assert_eq!(second_log.lock().unwrap().len(), 1);
}

#[test]
fn test_display_events_reach_handlers() {
    let env = TestEnvBuilder::new().build();
    let services = Arc::new(env.services);
    services.pipeline_new("p1").unwrap();

    let (handler, events) = recording_display_handler();
    services
        .pipeline_display_event_handler_add("p1", handler.clone(), None)
        .unwrap();
    assert_eq!(
        services
            .pipeline_display_event_handler_add("p1", handler.clone(), None)
            .unwrap_err()
            .code(),
        ResultCode::PipelineHandlerNotUnique
    );

    let sender = services.event_sender();
    sender.send(EngineEvent::Display {
        pipeline: "p1".to_string(),
        event: DisplayEvent::KeyPress {
            key: "q".to_string(),
        },
    });
    sender.send(EngineEvent::Display {
        pipeline: "gone".to_string(),
        event: DisplayEvent::WindowDelete,
    });
    services.quit_main_loop();
    services.run_main_loop().unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec![DisplayEvent::KeyPress {
            key: "q".to_string()
        }]
    );

    services
        .pipeline_display_event_handler_remove("p1", &handler)
        .unwrap();
    assert_eq!(
        services
            .pipeline_display_event_handler_remove("p1", &handler)
            .unwrap_err()
            .code(),
        ResultCode::PipelineHandlerNotFound
    );
}

#[test]
fn test_listener_user_data() {
    let env = TestEnvBuilder::new().build();
    let services = env.services;
    playable(&services, "p1");

    let listener: StateChangeListener = Arc::new(|_, _, data| {
        if let Some(tag) = data.and_then(|d| d.downcast_ref::<std::sync::Mutex<String>>()) {
            tag.lock().unwrap().push_str("called");
        }
    });
    let tag = Arc::new(std::sync::Mutex::new(String::new()));
    let user_data: pipeline_services::UserData = tag.clone();
    services
        .pipeline_state_change_listener_add("p1", listener, Some(user_data))
        .unwrap();

    services.pipeline_play("p1").unwrap();
    services.quit_main_loop();
    services.run_main_loop().unwrap();

    assert_eq!(tag.lock().unwrap().as_str(), "called");
}

#[test]
fn test_listener_uniqueness_is_by_identity() {
    let env = TestEnvBuilder::new().build();
    let s = &env.services;
    s.pipeline_new("p1").unwrap();

    let (listener, _) = recording_state_listener();
    let (other, _) = recording_state_listener();
    s.pipeline_state_change_listener_add("p1", listener.clone(), None)
        .unwrap();
    s.pipeline_state_change_listener_add("p1", other, None)
        .unwrap();
    assert_eq!(
        s.pipeline_state_change_listener_add("p1", listener.clone(), None)
            .unwrap_err()
            .code(),
        ResultCode::PipelineListenerNotUnique
    );

    s.pipeline_state_change_listener_remove("p1", &listener)
        .unwrap();
    assert_eq!(
        s.pipeline_state_change_listener_remove("p1", &listener)
            .unwrap_err()
            .code(),
        ResultCode::PipelineListenerNotFound
    );
    assert_eq!(
        s.pipeline_state_change_listener_add("ghost", listener, None)
            .unwrap_err()
            .code(),
        ResultCode::PipelineNameNotFound
    );
}

#[test]
fn test_handle_quits_running_loop() {
    let env = TestEnvBuilder::new().build();
    let services = Arc::new(env.services);
    let handle = services.main_loop_handle();
    let runner = spawn_main_loop(services.clone());
    assert!(common::wait_until(|| services.is_main_loop_running()));

    handle.quit();
    runner.join().unwrap();
    assert!(!services.is_main_loop_running());
}

#[test]
fn test_dot_dump_files() {
    let env = TestEnvBuilder::new().dot_dumps().build();
    let s = &env.services;
    playable(s, "p1");
    s.sink_overlay_new("window", 0, 0, 1280, 720).unwrap();
    s.pipeline_component_add("p1", "window").unwrap();

    let path = s.pipeline_dump_to_dot("p1", "p1-graph").unwrap();
    assert_eq!(path, env.dot_dir().join("p1-graph.dot"));
    let dot = std::fs::read_to_string(&path).unwrap();
    assert!(dot.contains("\"p1-cam\" -> \"p1-streammux\";"));
    assert!(dot.contains("\"p1-streammux\" -> \"window\";"));

    let stamped = s.pipeline_dump_to_dot_with_ts("p1", "p1-graph").unwrap();
    assert!(stamped.is_file());
    assert_ne!(stamped, path);
}
