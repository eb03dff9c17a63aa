//! Blocking main loop that delivers engine events.
//!
//! The loop runs on whichever thread calls [`MainLoop::run`] and blocks on a
//! crossbeam channel. Engines post [`EngineEvent`]s through an
//! [`EventSender`]; any thread can stop the loop through a
//! [`MainLoopHandle`].
//!
//! The channel is unbounded: engines post events while the service lock is
//! held, and the loop takes that same lock to look up listeners, so a full
//! bounded channel could stall both sides.

use crate::engine::EngineEvent;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};

/// Messages consumed by the main loop.
#[derive(Debug, Clone)]
pub enum LoopMessage {
    Event(EngineEvent),
    Quit,
}

/// Engine-side handle for posting events to the main loop.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<LoopMessage>,
}

impl EventSender {
    /// Post an event. Returns false once the loop has been dropped.
    pub fn send(&self, event: EngineEvent) -> bool {
        self.tx.send(LoopMessage::Event(event)).is_ok()
    }
}

/// Cloneable handle used to stop a running loop.
#[derive(Debug, Clone)]
pub struct MainLoopHandle {
    tx: Sender<LoopMessage>,
}

impl MainLoopHandle {
    pub fn quit(&self) {
        let _ = self.tx.send(LoopMessage::Quit);
    }
}

pub struct MainLoop {
    tx: Sender<LoopMessage>,
    rx: Receiver<LoopMessage>,
    running: AtomicBool,
}

impl MainLoop {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            running: AtomicBool::new(false),
        }
    }

    pub fn event_sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    pub fn handle(&self) -> MainLoopHandle {
        MainLoopHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Block, passing each event to `dispatch`, until a quit request arrives.
    ///
    /// Only one thread may run the loop at a time; a second concurrent call
    /// returns immediately.
    pub fn run<F>(&self, mut dispatch: F)
    where
        F: FnMut(EngineEvent),
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Main loop is already running");
            return;
        }

        tracing::info!("Main loop started");
        while let Ok(msg) = self.rx.recv() {
            match msg {
                LoopMessage::Event(event) => dispatch(event),
                LoopMessage::Quit => break,
            }
        }

        self.running.store(false, Ordering::Release);
        tracing::info!("Main loop exited");
    }
}

impl Default for MainLoop {
    fn default() -> Self {
        Self::new()
    }
}

/// Quit the loop on Ctrl-C / SIGINT.
///
/// The handler can only be installed once per process.
pub fn install_interrupt_handler(handle: MainLoopHandle) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        tracing::info!("Interrupt received, quitting main loop");
        handle.quit();
    })
}
