//! Scripted capture backend for unit tests.

use super::{
    AudioBackend, AudioFrame, CaptureError, CaptureStream, Clock, DeviceDescriptor, ManualClock,
    OpenCandidate, StreamConfig, StreamReadError,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const LOUD: i16 = 1_000;
pub(crate) const QUIET: i16 = 10;

#[derive(Debug, Clone)]
pub(crate) enum ScriptedRead {
    Level(i16),
    Samples(Vec<i16>),
    Fail(StreamReadError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    Open,
    Close,
}

#[derive(Default)]
pub(crate) struct Shared {
    pub(crate) events: Mutex<Vec<(Event, Duration)>>,
    pub(crate) open_now: AtomicUsize,
    pub(crate) max_open: AtomicUsize,
    pub(crate) attempts: Mutex<Vec<OpenCandidate>>,
    pub(crate) opened_configs: Mutex<Vec<StreamConfig>>,
}

impl Shared {
    pub(crate) fn events(&self) -> Vec<(Event, Duration)> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn open_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|(event, _)| *event == Event::Open)
            .count()
    }
}

pub(crate) struct FakeBackend {
    devices: Vec<DeviceDescriptor>,
    clock: ManualClock,
    failing_opens: AtomicUsize,
    successes_left: AtomicUsize,
    open_errors: Mutex<VecDeque<CaptureError>>,
    scripts: Mutex<VecDeque<Vec<ScriptedRead>>>,
    pub(crate) shared: Arc<Shared>,
}

impl FakeBackend {
    pub(crate) fn new(devices: Vec<DeviceDescriptor>, clock: ManualClock) -> Self {
        Self {
            devices,
            clock,
            failing_opens: AtomicUsize::new(0),
            successes_left: AtomicUsize::new(usize::MAX),
            open_errors: Mutex::new(VecDeque::new()),
            scripts: Mutex::new(VecDeque::new()),
            shared: Arc::new(Shared::default()),
        }
    }

    pub(crate) fn failing_first(self, count: usize) -> Self {
        self.failing_opens.store(count, Ordering::SeqCst);
        self
    }

    /// Fail the next open with `err` instead of a scripted `DeviceOpen`.
    pub(crate) fn failing_next_with(self, err: CaptureError) -> Self {
        self.open_errors.lock().unwrap().push_back(err);
        self
    }

    /// Let `count` more opens succeed, then fail every later attempt.
    pub(crate) fn fail_all_opens_after(&self, count: usize) {
        self.successes_left.store(count, Ordering::SeqCst);
    }

    /// Queue the reads served by the next opened stream; unscripted reads are quiet.
    pub(crate) fn with_script(self, script: Vec<ScriptedRead>) -> Self {
        self.scripts.lock().unwrap().push_back(script);
        self
    }
}

impl AudioBackend for FakeBackend {
    type Stream = FakeStream;

    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, CaptureError> {
        Ok(self.devices.clone())
    }

    fn open(
        &self,
        candidate: &OpenCandidate,
        config: &StreamConfig,
    ) -> Result<FakeStream, CaptureError> {
        self.shared.attempts.lock().unwrap().push(candidate.clone());
        if let Some(err) = self.open_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        let fail = self
            .failing_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
            || self
                .successes_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                    usize::MAX => Some(n),
                    n => n.checked_sub(1),
                })
                .is_err();
        if fail {
            return Err(CaptureError::DeviceOpen {
                target: candidate.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        let open = self.shared.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_open.fetch_max(open, Ordering::SeqCst);
        self.shared
            .events
            .lock()
            .unwrap()
            .push((Event::Open, self.clock.now()));
        self.shared.opened_configs.lock().unwrap().push(*config);
        let reads = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        Ok(FakeStream {
            config: *config,
            reads: reads.into(),
            clock: self.clock.clone(),
            shared: self.shared.clone(),
            closed: false,
        })
    }
}

pub(crate) struct FakeStream {
    config: StreamConfig,
    reads: VecDeque<ScriptedRead>,
    clock: ManualClock,
    shared: Arc<Shared>,
    closed: bool,
}

impl FakeStream {
    pub(crate) fn standalone(
        config: StreamConfig,
        reads: Vec<ScriptedRead>,
        clock: ManualClock,
    ) -> Self {
        Self {
            config,
            reads: reads.into(),
            clock,
            shared: Arc::new(Shared::default()),
            closed: false,
        }
    }
}

impl CaptureStream for FakeStream {
    fn config(&self) -> &StreamConfig {
        &self.config
    }

    fn read_frame(&mut self) -> Result<AudioFrame, StreamReadError> {
        if self.closed {
            return Err(StreamReadError::Closed);
        }
        self.clock.advance(self.config.frame_duration());
        let samples = match self.reads.pop_front() {
            Some(ScriptedRead::Fail(err)) => return Err(err),
            Some(ScriptedRead::Samples(samples)) => samples,
            Some(ScriptedRead::Level(level)) => vec![level; self.config.samples_per_frame()],
            None => vec![QUIET; self.config.samples_per_frame()],
        };
        Ok(AudioFrame::new(samples, self.config.channels))
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.shared.open_now.fetch_sub(1, Ordering::SeqCst);
        self.shared
            .events
            .lock()
            .unwrap()
            .push((Event::Close, self.clock.now()));
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

pub(crate) fn device(index: usize, name: &str, inputs: u16, is_default: bool) -> DeviceDescriptor {
    DeviceDescriptor {
        index,
        name: name.to_string(),
        max_input_channels: inputs,
        is_default,
    }
}

/// Built-in mono default plus a stereo ReSpeaker array.
pub(crate) fn respeaker_topology() -> Vec<DeviceDescriptor> {
    vec![
        device(0, "Built-in Microphone", 1, true),
        device(1, "ReSpeaker 4 Mic Array (UAC1.0)", 2, false),
    ]
}

pub(crate) fn levels(level: i16, count: usize) -> Vec<ScriptedRead> {
    vec![ScriptedRead::Level(level); count]
}
