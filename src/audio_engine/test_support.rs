//! In-memory output backend for exercising the engine and controller without
//! an audio device.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{CompletionNotifier, OutputBackend, OutputStream, PlaybackError, StreamId, StreamRequest};

#[derive(Default)]
struct Recorded {
    opened: Vec<StreamRequest>,
    stopped: Vec<StreamId>,
    finishers: HashMap<StreamId, CompletionNotifier>,
}

/// Cloning shares the recording.
#[derive(Clone, Default)]
pub(crate) struct FakeBackend {
    recorded: Arc<Mutex<Recorded>>,
    fail_next: Arc<AtomicBool>,
}

impl FakeBackend {
    pub fn opened(&self) -> Vec<StreamRequest> {
        self.recorded.lock().unwrap().opened.clone()
    }

    /// Ids in the order their streams were stopped. A stream stopped twice
    /// appears once.
    pub fn stopped(&self) -> Vec<StreamId> {
        self.recorded.lock().unwrap().stopped.clone()
    }

    pub fn fail_next_open(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Simulates stream `id` reaching the end of its data. Also fires for a
    /// stream that was already stopped, the way a drained callback can race a
    /// stop.
    pub fn complete(&self, id: StreamId) {
        let finisher = self.recorded.lock().unwrap().finishers.remove(&id);
        if let Some(finisher) = finisher {
            finisher();
        }
    }
}

impl OutputBackend for FakeBackend {
    fn open(
        &self,
        request: StreamRequest,
        on_finished: CompletionNotifier,
    ) -> Result<Box<dyn OutputStream>, PlaybackError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(PlaybackError::DeviceOpen {
                device: request.device.unwrap_or_else(|| "default".to_string()),
                reason: "device unavailable".to_string(),
            });
        }

        let id = request.id;
        let mut recorded = self.recorded.lock().unwrap();
        recorded.opened.push(request);
        recorded.finishers.insert(id, on_finished);
        Ok(Box::new(FakeStream {
            id,
            recorded: Arc::clone(&self.recorded),
            stopped: false,
        }))
    }
}

struct FakeStream {
    id: StreamId,
    recorded: Arc<Mutex<Recorded>>,
    stopped: bool,
}

impl OutputStream for FakeStream {
    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.recorded.lock().unwrap().stopped.push(self.id);
        }
    }
}
