//! Audio playback seam for collision feedback.
//!
//! The simulation never waits on audio: triggers are handed to an
//! [`AudioSink`], which either queues them for a device thread or records them.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::{error::AudioError, feedback::AudioTrigger};

/// Handle to a loaded sound asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AudioClip {
    name: Arc<str>,
}

impl AudioClip {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Output device able to play a clip at a volume in `[0, 1]`.
pub trait AudioBackend: Send + 'static {
    fn play(&mut self, clip: &AudioClip, volume: f32) -> Result<(), AudioError>;
}

/// Non-blocking destination for triggers produced during a step.
pub trait AudioSink: Send {
    fn submit(&mut self, trigger: AudioTrigger) -> Result<(), AudioError>;
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudioSink;

impl AudioSink for NullAudioSink {
    fn submit(&mut self, _trigger: AudioTrigger) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Records triggers in memory; clones share the same log.
#[derive(Debug, Default, Clone)]
pub struct CapturingAudioSink {
    triggers: Arc<Mutex<Vec<AudioTrigger>>>,
}

impl CapturingAudioSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn triggers(&self) -> Vec<AudioTrigger> {
        self.triggers.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.triggers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.lock().is_empty()
    }

    pub fn clear(&self) {
        self.triggers.lock().clear();
    }
}

impl AudioSink for CapturingAudioSink {
    fn submit(&mut self, trigger: AudioTrigger) -> Result<(), AudioError> {
        self.triggers.lock().push(trigger);
        Ok(())
    }
}

/// Bounded queue drained by a dedicated playback thread.
///
/// A full queue rejects the trigger with [`AudioError::DeviceBusy`] instead of
/// blocking the frame loop.
pub struct ChannelAudioSink {
    sender: Option<Sender<AudioTrigger>>,
    worker: Option<JoinHandle<()>>,
    played: Arc<AtomicUsize>,
}

impl ChannelAudioSink {
    pub fn spawn<B: AudioBackend>(backend: B, capacity: usize) -> Result<Self, AudioError> {
        let (sender, receiver) = bounded(capacity.max(1));
        let played = Arc::new(AtomicUsize::new(0));
        let worker_played = Arc::clone(&played);

        let worker = thread::Builder::new()
            .name("audio-feedback".into())
            .spawn(move || Self::drain(backend, receiver, worker_played))
            .map_err(|err| {
                log::warn!("failed to start audio thread: {err}");
                AudioError::DeviceUnavailable
            })?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            played,
        })
    }

    fn drain<B: AudioBackend>(mut backend: B, receiver: Receiver<AudioTrigger>, played: Arc<AtomicUsize>) {
        for trigger in receiver.iter() {
            match backend.play(&trigger.clip, trigger.volume) {
                Ok(()) => {
                    played.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => log::warn!("audio playback failed for '{}': {err}", trigger.clip.name()),
            }
        }
        log::debug!("audio thread stopped");
    }

    /// Triggers the backend has played successfully so far.
    pub fn played(&self) -> usize {
        self.played.load(Ordering::Relaxed)
    }

    /// Closes the queue and waits for queued triggers to finish playing.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("audio thread panicked");
            }
        }
    }
}

impl AudioSink for ChannelAudioSink {
    fn submit(&mut self, trigger: AudioTrigger) -> Result<(), AudioError> {
        let sender = self.sender.as_ref().ok_or(AudioError::DeviceUnavailable)?;
        sender.try_send(trigger).map_err(|err| match err {
            TrySendError::Full(_) => AudioError::DeviceBusy,
            TrySendError::Disconnected(_) => AudioError::DeviceUnavailable,
        })
    }
}

impl Drop for ChannelAudioSink {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rigidbody::BodyHandle;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    fn trigger(volume: f32) -> AudioTrigger {
        AudioTrigger {
            clip: AudioClip::new("hit"),
            volume,
            body: BodyHandle::default(),
            entry: None,
        }
    }

    struct Recorder(Sender<f32>);

    impl AudioBackend for Recorder {
        fn play(&mut self, _clip: &AudioClip, volume: f32) -> Result<(), AudioError> {
            self.0.send(volume).map_err(|_| AudioError::DeviceUnavailable)
        }
    }

    /// Blocks until released, so the queue can be filled deterministically.
    struct Gate(Receiver<()>);

    impl AudioBackend for Gate {
        fn play(&mut self, _clip: &AudioClip, _volume: f32) -> Result<(), AudioError> {
            self.0.recv().map_err(|_| AudioError::DeviceUnavailable)
        }
    }

    #[test]
    fn channel_sink_plays_on_worker_thread() {
        let (tx, rx) = unbounded();
        let mut sink = ChannelAudioSink::spawn(Recorder(tx), 4).expect("spawn");

        sink.submit(trigger(0.25)).expect("queued");
        let volume = rx.recv_timeout(Duration::from_secs(5)).expect("played");
        assert_eq!(volume, 0.25);

        sink.shutdown();
    }

    #[test]
    fn full_queue_reports_busy_device() {
        let (release, gate) = unbounded();
        let mut sink = ChannelAudioSink::spawn(Gate(gate), 1).expect("spawn");

        // First trigger may be picked up by the worker; keep submitting until
        // the single queue slot is occupied.
        let mut busy = None;
        for _ in 0..3 {
            if let Err(err) = sink.submit(trigger(1.0)) {
                busy = Some(err);
                break;
            }
        }
        assert_eq!(busy, Some(AudioError::DeviceBusy));

        for _ in 0..3 {
            let _ = release.send(());
        }
        sink.shutdown();
    }

    #[test]
    fn capturing_sink_clones_share_log() {
        let sink = CapturingAudioSink::new();
        let mut writer = sink.clone();
        writer.submit(trigger(0.5)).expect("captured");

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.triggers()[0].volume, 0.5);
        sink.clear();
        assert!(sink.is_empty());
    }
}
