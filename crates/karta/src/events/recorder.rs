//! Listener collecting events into a JSON file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::{Event, EventListener, Phase};

/// Collects every event and writes them as a JSON array when the run
/// completes.
///
/// Events are stored in arrival order. With more than one listener worker
/// that order may differ from the order the phases occurred in, and events
/// still queued when `runComplete` arrives are only included by a later
/// [`JsonEventRecorder::write_to`].
#[derive(Debug)]
pub struct JsonEventRecorder {
    path: Option<PathBuf>,
    events: Mutex<Vec<Event>>,
}

impl JsonEventRecorder {
    /// Record events and write them to `path` on `runComplete`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Record events in memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Write every recorded event to `path` as a pretty-printed JSON array.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be written.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        let events = self.events.lock();
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &*events)?;
        writer.flush()
    }
}

impl EventListener for JsonEventRecorder {
    fn on_event(&self, event: &Event) {
        self.events.lock().push(event.clone());
        if event.phase != Phase::RunComplete {
            return;
        }
        if let Some(path) = &self.path {
            match self.write_to(path) {
                Ok(()) => log::debug!("wrote events to {}", path.display()),
                Err(err) => log::warn!("failed to write events to {}: {err}", path.display()),
            }
        }
    }
}
