use std::sync::Arc;

use parking_lot::Mutex;

use crate::event::{EditorEvent, EventHandler};

/// Forwards every editor event to the `log` facade
#[derive(Debug, Default)]
pub struct LogEventHandler;

impl EventHandler for LogEventHandler {
    fn handle_event(&mut self, event: &EditorEvent) {
        match event {
            EditorEvent::ImageLoadFailed { source, reason } => {
                log::warn!("Image load failed for {source}: {reason}");
            }
            EditorEvent::BackgroundLoaded { .. }
            | EditorEvent::Saved { .. }
            | EditorEvent::Downloaded { .. }
            | EditorEvent::Closed => log::info!("{event:?}"),
            _ => log::debug!("{event:?}"),
        }
    }
}

/// Keeps a copy of every event; handy for hosts that poll instead of subscribing
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<EditorEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EditorEvent> {
        self.events.lock().clone()
    }

    pub fn drain(&self) -> Vec<EditorEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventHandler for EventRecorder {
    fn handle_event(&mut self, event: &EditorEvent) {
        self.events.lock().push(event.clone());
    }
}
