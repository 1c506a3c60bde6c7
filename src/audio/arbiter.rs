//! Exclusive access to the capture hardware.
//!
//! The trigger detector and the recorder both need the microphone, and most drivers
//! refuse a second opener. The arbiter hands out one lease at a time and enforces a
//! settle delay between one holder closing its stream and the next open.

use super::device::{resolve, DevicePolicy, FallbackPlan, OpenCandidate};
use super::{AudioBackend, CaptureError, CaptureStream, Clock, StreamConfig};
use crate::lock_or_recover;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Component that may own the capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Holder {
    Detector,
    Recorder,
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Holder::Detector => f.write_str("trigger detector"),
            Holder::Recorder => f.write_str("recorder"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbiterConfig {
    /// Quiet time between one stream closing and the next opening.
    pub settle_delay: Duration,
    /// How long `acquire`/`handoff` wait for the current holder before giving up.
    pub lease_wait: Duration,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(100),
            lease_wait: Duration::from_secs(5),
        }
    }
}

/// Channel layout requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    /// Whatever the device policy resolved (stereo on known hardware).
    Resolved,
    /// Force one channel on every candidate.
    MonoOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenRequest {
    pub sample_rate: u32,
    pub frame_size: usize,
    pub channels: ChannelMode,
}

impl OpenRequest {
    pub fn mono(sample_rate: u32, frame_size: usize) -> Self {
        Self {
            sample_rate,
            frame_size,
            channels: ChannelMode::MonoOnly,
        }
    }

    pub fn resolved(sample_rate: u32, frame_size: usize) -> Self {
        Self {
            sample_rate,
            frame_size,
            channels: ChannelMode::Resolved,
        }
    }
}

#[derive(Debug, Default)]
struct LeaseState {
    holder: Option<Holder>,
    released_at: Option<Duration>,
}

/// Lease bookkeeping shared by the arbiter and its outstanding lease.
struct LeaseTable {
    state: Mutex<LeaseState>,
    released: Condvar,
    clock: Arc<dyn Clock>,
    config: ArbiterConfig,
}

impl LeaseTable {
    /// Block while `busy` holds, up to `lease_wait`.
    fn wait_until<F>(&self, mut busy: F) -> Result<MutexGuard<'_, LeaseState>, CaptureError>
    where
        F: FnMut(&LeaseState) -> bool,
    {
        let started = Instant::now();
        let mut state = lock_or_recover(&self.state, "capture lease table");
        while busy(&*state) {
            let waited = started.elapsed();
            if waited >= self.config.lease_wait {
                let holder = state.holder.unwrap_or(Holder::Recorder);
                return Err(CaptureError::LeaseBusy { holder, waited });
            }
            let (guard, _) = self
                .released
                .wait_timeout(state, self.config.lease_wait - waited)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
        Ok(state)
    }

    fn settle(&self, released_at: Option<Duration>) {
        let Some(released_at) = released_at else {
            return;
        };
        let since = self.clock.now().saturating_sub(released_at);
        if since < self.config.settle_delay {
            let remaining = self.config.settle_delay - since;
            tracing::trace!(
                remaining_ms = remaining.as_millis() as u64,
                "waiting for device to settle"
            );
            self.clock.sleep(remaining);
        }
    }

    /// Drop a reservation that never produced an open stream.
    fn cancel(&self, holder: Holder) {
        let mut state = lock_or_recover(&self.state, "capture lease table");
        if state.holder == Some(holder) {
            state.holder = None;
        }
        drop(state);
        self.released.notify_all();
    }

    fn release(&self, holder: Holder) {
        let mut state = lock_or_recover(&self.state, "capture lease table");
        if state.holder == Some(holder) {
            state.holder = None;
            state.released_at = Some(self.clock.now());
        }
        drop(state);
        self.released.notify_all();
        tracing::debug!(%holder, "capture lease released");
    }
}

/// Serializes access to the capture device across the detector and the recorder.
pub struct CaptureArbiter<B: AudioBackend> {
    backend: B,
    policy: DevicePolicy,
    table: LeaseTable,
}

impl<B: AudioBackend> CaptureArbiter<B> {
    pub fn new(
        backend: B,
        policy: DevicePolicy,
        config: ArbiterConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            policy,
            table: LeaseTable {
                state: Mutex::new(LeaseState::default()),
                released: Condvar::new(),
                clock,
                config,
            },
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn policy(&self) -> &DevicePolicy {
        &self.policy
    }

    pub fn config(&self) -> &ArbiterConfig {
        &self.table.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.table.clock.as_ref()
    }

    pub fn current_holder(&self) -> Option<Holder> {
        lock_or_recover(&self.table.state, "capture lease table").holder
    }

    /// Wait until `from` has given the device back and the settle delay has passed, so
    /// `to` can open without racing the previous stream's teardown.
    pub fn handoff(&self, from: Holder, to: Holder) -> Result<(), CaptureError> {
        let state = self.table.wait_until(|state| state.holder == Some(from))?;
        let released_at = state.released_at;
        drop(state);
        self.table.settle(released_at);
        tracing::debug!(%from, %to, "capture handoff");
        Ok(())
    }

    /// Open a stream for `holder`, walking the fallback plan until one candidate opens.
    pub fn acquire(
        &self,
        holder: Holder,
        request: OpenRequest,
    ) -> Result<CaptureLease<'_, B::Stream>, CaptureError> {
        let mut state = self.table.wait_until(|state| state.holder.is_some())?;
        state.holder = Some(holder);
        let released_at = state.released_at;
        drop(state);

        self.table.settle(released_at);
        match self.open_first(request) {
            Ok((stream, candidate)) => {
                tracing::debug!(%holder, %candidate, "capture lease granted");
                Ok(CaptureLease {
                    table: &self.table,
                    stream,
                    holder,
                    candidate,
                    released: false,
                })
            }
            Err(err) => {
                self.table.cancel(holder);
                Err(err)
            }
        }
    }

    fn open_first(
        &self,
        request: OpenRequest,
    ) -> Result<(B::Stream, OpenCandidate), CaptureError> {
        let devices = self.backend.enumerate()?;
        let resolved = resolve(&devices, &self.policy)?;
        tracing::debug!(
            device = %resolved.descriptor.name,
            index = resolved.descriptor.index,
            channels = resolved.channels,
            rule = ?resolved.rule,
            "resolved capture device"
        );
        let mut plan = FallbackPlan::build(&devices, &resolved, &self.policy);
        if request.channels == ChannelMode::MonoOnly {
            plan = plan.mono_only();
        }

        for candidate in plan.candidates() {
            let config =
                StreamConfig::new(request.sample_rate, candidate.channels, request.frame_size);
            match self.backend.open(candidate, &config) {
                Ok(stream) => return Ok((stream, candidate.clone())),
                // Every open failure falls through to the next candidate.
                Err(err) => {
                    tracing::warn!(
                        %candidate,
                        error = %err,
                        transient = err.is_transient(),
                        "capture open failed; trying next candidate"
                    );
                }
            }
        }
        Err(CaptureError::DeviceExhausted {
            attempts: plan.len(),
        })
    }
}

/// Exclusive ownership of one open stream. Closing the stream ends the lease.
pub struct CaptureLease<'a, S: CaptureStream> {
    table: &'a LeaseTable,
    stream: S,
    holder: Holder,
    candidate: OpenCandidate,
    released: bool,
}

impl<S: CaptureStream> CaptureLease<'_, S> {
    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn config(&self) -> &StreamConfig {
        self.stream.config()
    }

    pub fn holder(&self) -> Holder {
        self.holder
    }

    pub fn candidate(&self) -> &OpenCandidate {
        &self.candidate
    }

    /// Close the stream and hand the device back.
    pub fn release(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.stream.close();
        self.table.release(self.holder);
    }
}

impl<S: CaptureStream> Drop for CaptureLease<'_, S> {
    fn drop(&mut self) {
        self.finish();
    }
}
