//! Listener and main-loop helpers

use pipeline_services::{
    DisplayEvent, DisplayEventHandler, PipelineState, Services, StateChangeListener,
};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

pub type Transitions = Arc<Mutex<Vec<(PipelineState, PipelineState)>>>;
pub type DisplayLog = Arc<Mutex<Vec<DisplayEvent>>>;

/// State listener that records every `(previous, current)` pair
pub fn recording_state_listener() -> (StateChangeListener, Transitions) {
    let log: Transitions = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let listener: StateChangeListener = Arc::new(move |previous, current, _| {
        sink.lock().unwrap().push((previous, current));
    });
    (listener, log)
}

/// Display handler that records every event
pub fn recording_display_handler() -> (DisplayEventHandler, DisplayLog) {
    let log: DisplayLog = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let handler: DisplayEventHandler = Arc::new(move |event, _| {
        sink.lock().unwrap().push(event.clone());
    });
    (handler, log)
}

/// Run the service main loop on a background thread
pub fn spawn_main_loop(services: Arc<Services>) -> JoinHandle<()> {
    thread::spawn(move || {
        services.run_main_loop().expect("main loop");
    })
}
