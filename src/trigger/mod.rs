//! Trigger phrase detection on a short-lived, mono capture lease.

mod energy;
mod keyword;

pub use energy::EnergyTrigger;
pub use keyword::KeywordTrigger;

use crate::audio::{AudioBackend, CaptureArbiter, CaptureStream, Holder, OpenRequest};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Frame-by-frame trigger model. Frames are mono `i16` of `frame_length()` samples.
pub trait TriggerModel: Send {
    fn name(&self) -> &'static str;

    fn sample_rate(&self) -> u32;

    fn frame_length(&self) -> usize;

    /// Returns `true` once the trigger fired.
    fn process(&mut self, frame: &[i16]) -> bool;

    /// Forget any partial match before a new listening session.
    fn reset(&mut self) {}
}

impl<M: TriggerModel + ?Sized> TriggerModel for Box<M> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn frame_length(&self) -> usize {
        (**self).frame_length()
    }

    fn process(&mut self, frame: &[i16]) -> bool {
        (**self).process(frame)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Idle,
    Listening,
}

pub struct TriggerDetector<M: TriggerModel> {
    model: M,
    state: TriggerState,
    cancel: Option<Arc<AtomicBool>>,
}

impl<M: TriggerModel> TriggerDetector<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            state: TriggerState::Idle,
            cancel: None,
        }
    }

    /// Abandon listening, returning `false`, once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Block until the model fires. Any acquisition or read failure closes the stream
    /// and returns `false`; the stream never outlives this call.
    pub fn detect<B: AudioBackend>(&mut self, arbiter: &CaptureArbiter<B>) -> bool {
        self.model.reset();
        let request = OpenRequest::mono(self.model.sample_rate(), self.model.frame_length());
        let mut lease = match arbiter.acquire(Holder::Detector, request) {
            Ok(lease) => lease,
            Err(err) => {
                tracing::warn!(model = self.model.name(), error = %err, "trigger listener could not open the microphone");
                return false;
            }
        };
        self.state = TriggerState::Listening;
        tracing::debug!(model = self.model.name(), device = %lease.candidate(), "listening for trigger");

        let fired = loop {
            if self.cancelled() {
                tracing::debug!("trigger listening cancelled");
                break false;
            }
            match lease.stream_mut().read_frame() {
                Ok(frame) => {
                    if self.model.process(frame.samples()) {
                        break true;
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "trigger stream failed");
                    break false;
                }
            }
        };

        lease.release();
        self.state = TriggerState::Idle;
        if fired {
            tracing::info!(model = self.model.name(), "trigger detected");
        }
        fired
    }
}
