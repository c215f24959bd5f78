//! Scripted producer
//!
//! A `SensorSource` whose payloads are pushed explicitly, with arbitrary frame
//! ids. Used to reproduce late, stale and duplicated deliveries.

use std::sync::atomic::{AtomicBool, Ordering};

use contracts::{FrameId, FramePacket, FramePayload, ImageData, PacketCallback, SensorSource};
use parking_lot::Mutex;

/// Producer driven by the caller
pub struct ScriptedSource {
    sensor_id: String,
    listening: AtomicBool,
    callback: Mutex<Option<PacketCallback>>,
}

impl ScriptedSource {
    pub fn new(sensor_id: impl Into<String>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            listening: AtomicBool::new(false),
            callback: Mutex::new(None),
        }
    }

    /// Deliver a payload tagged with `frame_id` on the calling thread
    ///
    /// Returns `false` if nobody is listening (the payload is discarded).
    pub fn push(&self, frame_id: FrameId, payload: FramePayload) -> bool {
        // Clone the callback out so it is not invoked under the lock
        let callback = match self.callback.lock().as_ref() {
            Some(callback) if self.is_listening() => callback.clone(),
            _ => return false,
        };
        callback(FramePacket {
            producer_id: self.sensor_id.clone(),
            frame_id,
            timestamp: 0.0,
            payload,
        });
        true
    }

    /// Deliver an image payload
    pub fn push_image(&self, frame_id: FrameId, image: ImageData) -> bool {
        self.push(frame_id, FramePayload::Image(image))
    }
}

impl SensorSource for ScriptedSource {
    fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    fn listen(&self, callback: PacketCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.callback.lock() = Some(callback);
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
        self.callback.lock().take();
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockCamera;
    use std::sync::Arc;
    use std::sync::mpsc;

    #[test]
    fn test_push_requires_listener() {
        let source = ScriptedSource::new("cam");
        assert!(!source.push_image(1, MockCamera::render(2, 2, 1)));

        let (tx, rx) = mpsc::channel();
        source.listen(Arc::new(move |packet| {
            let _ = tx.send(packet.frame_id);
        }));

        assert!(source.push_image(5, MockCamera::render(2, 2, 5)));
        assert!(source.push_image(3, MockCamera::render(2, 2, 3)));
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![5, 3]);

        source.stop();
        assert!(!source.push_image(6, MockCamera::render(2, 2, 6)));
    }
}
