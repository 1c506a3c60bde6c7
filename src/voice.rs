//! The interaction loop: wait for the trigger, hand the microphone to the recorder,
//! transcribe, answer, and speak.

use crate::assistant::{AssistantContext, DIDNT_HEAR_RESPONSE};
use crate::audio::{AudioBackend, CaptureArbiter, CaptureError, Holder, VoiceActivityRecorder};
use crate::trigger::{TriggerDetector, TriggerModel};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// What one pass through the loop ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The trigger listener gave up without a match; the loop backed off.
    NoTrigger,
    /// Nothing usable was transcribed.
    NotHeard { spoken: bool },
    Answered { spoken: bool },
    /// The recorder could not get a working microphone; the didn't-hear response was spoken.
    CaptureFailed { reason: String, spoken: bool },
}

pub struct InteractionLoop<B: AudioBackend, M: TriggerModel> {
    arbiter: CaptureArbiter<B>,
    detector: TriggerDetector<M>,
    recorder: VoiceActivityRecorder,
    context: AssistantContext,
    retry_backoff: Duration,
}

impl<B: AudioBackend, M: TriggerModel> InteractionLoop<B, M> {
    pub fn new(
        arbiter: CaptureArbiter<B>,
        detector: TriggerDetector<M>,
        recorder: VoiceActivityRecorder,
        context: AssistantContext,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            arbiter,
            detector,
            recorder,
            context,
            retry_backoff,
        }
    }

    pub fn arbiter(&self) -> &CaptureArbiter<B> {
        &self.arbiter
    }

    pub fn context(&self) -> &AssistantContext {
        &self.context
    }

    /// Run cycles until `stop` is set. The flag is checked between cycles only.
    pub fn run(&mut self, stop: &AtomicBool) {
        tracing::info!(
            transcriber = self.context.transcriber.name(),
            speaker = self.context.speaker.name(),
            "assistant ready"
        );
        let mut cycles = 0u64;
        while !stop.load(Ordering::Relaxed) {
            let outcome = self.run_cycle();
            cycles += 1;
            tracing::debug!(cycle = cycles, ?outcome, "cycle finished");
        }
        tracing::info!(cycles, "assistant stopped");
    }

    pub fn run_cycle(&mut self) -> CycleOutcome {
        if !self.detector.detect(&self.arbiter) {
            self.arbiter.clock().sleep(self.retry_backoff);
            return CycleOutcome::NoTrigger;
        }

        let recorded = self
            .arbiter
            .handoff(Holder::Detector, Holder::Recorder)
            .and_then(|()| self.recorder.record(&self.arbiter));
        let utterance = match recorded {
            Ok(utterance) => utterance,
            Err(err) => return self.capture_failed(err),
        };

        let transcript = self
            .context
            .transcriber
            .transcribe(&utterance, utterance.channels());
        if self.context.log_content {
            tracing::info!(transcript = %transcript, "heard");
        } else {
            tracing::info!(chars = transcript.chars().count(), "heard");
        }

        let response = self.context.respond(&transcript);
        if self.context.log_content {
            tracing::info!(response = %response, "responding");
        }
        let spoken = self.context.speak(&response);
        if transcript.trim().is_empty() {
            CycleOutcome::NotHeard { spoken }
        } else {
            CycleOutcome::Answered { spoken }
        }
    }

    fn capture_failed(&self, err: CaptureError) -> CycleOutcome {
        match err {
            CaptureError::NoInputDeviceFound | CaptureError::DeviceExhausted { .. } => {
                tracing::error!(error = %err, "no working microphone for recording");
            }
            _ => tracing::warn!(error = %err, "recording could not start"),
        }
        let spoken = self.context.speak(DIDNT_HEAR_RESPONSE);
        CycleOutcome::CaptureFailed {
            reason: err.to_string(),
            spoken,
        }
    }
}
