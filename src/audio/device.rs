//! Input device discovery and the ordered fallback plan used when opening streams.
//!
//! Devices are enumerated fresh on every acquisition because USB microphones and
//! audio servers come and go while the assistant runs.

use super::CaptureError;
use serde::Serialize;
use std::fmt;

/// One enumerated input endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    pub index: usize,
    pub name: String,
    pub max_input_channels: u16,
    pub is_default: bool,
}

impl DeviceDescriptor {
    pub fn has_input(&self) -> bool {
        self.max_input_channels > 0
    }

    fn name_matches(&self, tokens: &[String]) -> bool {
        let name = self.name.to_lowercase();
        tokens
            .iter()
            .any(|token| !token.is_empty() && name.contains(&token.to_lowercase()))
    }
}

/// Name heuristics and fixed indices that steer device selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePolicy {
    pub preferred_index: Option<usize>,
    pub hardware_tokens: Vec<String>,
    pub audio_server_tokens: Vec<String>,
    pub fallback_index: usize,
}

impl Default for DevicePolicy {
    fn default() -> Self {
        Self {
            preferred_index: None,
            hardware_tokens: vec!["seeed".to_string(), "respeaker".to_string()],
            audio_server_tokens: vec!["pulse".to_string()],
            fallback_index: 0,
        }
    }
}

impl DevicePolicy {
    fn known_hardware<'a>(&self, devices: &'a [DeviceDescriptor]) -> Option<&'a DeviceDescriptor> {
        devices
            .iter()
            .find(|d| d.has_input() && d.name_matches(&self.hardware_tokens))
    }

    fn audio_server<'a>(&self, devices: &'a [DeviceDescriptor]) -> Option<&'a DeviceDescriptor> {
        devices
            .iter()
            .find(|d| d.has_input() && d.name_matches(&self.audio_server_tokens))
    }
}

/// Which selection rule produced a [`ResolvedDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Preferred,
    KnownHardware,
    AudioServer,
    SystemDefault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDevice {
    pub descriptor: DeviceDescriptor,
    pub channels: u16,
    pub rule: Resolution,
}

/// Pick the device to record from.
///
/// A usable preferred index wins; otherwise known hardware, then an audio server
/// endpoint, then the system default input.
pub fn resolve(
    devices: &[DeviceDescriptor],
    policy: &DevicePolicy,
) -> Result<ResolvedDevice, CaptureError> {
    if let Some(index) = policy.preferred_index {
        match devices.iter().find(|d| d.index == index) {
            Some(device) if device.has_input() => {
                return Ok(ResolvedDevice {
                    descriptor: device.clone(),
                    channels: device.max_input_channels.min(2),
                    rule: Resolution::Preferred,
                });
            }
            Some(device) => {
                tracing::debug!(index, name = %device.name, "preferred device has no inputs");
            }
            None => tracing::debug!(index, "preferred device index not present"),
        }
    }

    if let Some(device) = policy.known_hardware(devices) {
        return Ok(ResolvedDevice {
            descriptor: device.clone(),
            channels: device.max_input_channels.min(2),
            rule: Resolution::KnownHardware,
        });
    }

    if let Some(device) = policy.audio_server(devices) {
        return Ok(ResolvedDevice {
            descriptor: device.clone(),
            channels: 1,
            rule: Resolution::AudioServer,
        });
    }

    devices
        .iter()
        .find(|d| d.is_default && d.has_input())
        .map(|device| ResolvedDevice {
            descriptor: device.clone(),
            channels: device.max_input_channels.min(1),
            rule: Resolution::SystemDefault,
        })
        .ok_or(CaptureError::NoInputDeviceFound)
}

/// Where a stream should be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceTarget {
    Index(usize),
    SystemDefault,
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceTarget::Index(index) => write!(f, "device #{index}"),
            DeviceTarget::SystemDefault => f.write_str("system default device"),
        }
    }
}

/// A single open attempt: target plus channel layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenCandidate {
    pub target: DeviceTarget,
    pub channels: u16,
    pub label: &'static str,
}

impl fmt::Display for OpenCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} ch, {})", self.target, self.channels, self.label)
    }
}

/// Ordered list of open attempts, tried front to back until one succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPlan {
    candidates: Vec<OpenCandidate>,
}

impl FallbackPlan {
    /// preferred → hardware/2ch → hardware/1ch → audio server/1ch → fixed index/1ch
    /// → system default/1ch, with repeated (target, channels) pairs removed.
    pub fn build(
        devices: &[DeviceDescriptor],
        resolved: &ResolvedDevice,
        policy: &DevicePolicy,
    ) -> Self {
        let mut plan = Self {
            candidates: Vec::with_capacity(6),
        };
        plan.push(
            DeviceTarget::Index(resolved.descriptor.index),
            resolved.channels.max(1),
            "preferred",
        );
        if let Some(hardware) = policy.known_hardware(devices) {
            plan.push(DeviceTarget::Index(hardware.index), 2, "hardware stereo");
            plan.push(DeviceTarget::Index(hardware.index), 1, "hardware mono");
        }
        if let Some(server) = policy.audio_server(devices) {
            plan.push(DeviceTarget::Index(server.index), 1, "audio server");
        }
        plan.push(
            DeviceTarget::Index(policy.fallback_index),
            1,
            "fixed fallback index",
        );
        plan.push(DeviceTarget::SystemDefault, 1, "system default");
        plan
    }

    /// Same order with every attempt forced to one channel.
    pub fn mono_only(self) -> Self {
        let mut plan = Self {
            candidates: Vec::with_capacity(self.candidates.len()),
        };
        for candidate in self.candidates {
            plan.push(candidate.target, 1, candidate.label);
        }
        plan
    }

    fn push(&mut self, target: DeviceTarget, channels: u16, label: &'static str) {
        let duplicate = self
            .candidates
            .iter()
            .any(|c| c.target == target && c.channels == channels);
        if !duplicate {
            self.candidates.push(OpenCandidate {
                target,
                channels,
                label,
            });
        }
    }

    pub fn candidates(&self) -> &[OpenCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(index: usize, name: &str, inputs: u16, is_default: bool) -> DeviceDescriptor {
        DeviceDescriptor {
            index,
            name: name.to_string(),
            max_input_channels: inputs,
            is_default,
        }
    }

    #[test]
    fn default_only_topology_resolves_to_mono_default() {
        let devices = vec![device(0, "Built-in Microphone", 1, true)];
        let resolved = resolve(&devices, &DevicePolicy::default()).expect("default device");
        assert_eq!(resolved.descriptor.index, 0);
        assert_eq!(resolved.channels, 1);
        assert_eq!(resolved.rule, Resolution::SystemDefault);
    }

    #[test]
    fn known_hardware_caps_channels_at_two() {
        let devices = vec![
            device(0, "HDA Intel PCH", 2, true),
            device(3, "seeed-4mic-voicecard", 4, false),
        ];
        let resolved = resolve(&devices, &DevicePolicy::default()).unwrap();
        assert_eq!(resolved.descriptor.index, 3);
        assert_eq!(resolved.channels, 2);
        assert_eq!(resolved.rule, Resolution::KnownHardware);
    }

    #[test]
    fn hardware_token_match_is_case_insensitive() {
        let devices = vec![device(1, "ReSpeaker USB Mic Array", 1, false)];
        let resolved = resolve(&devices, &DevicePolicy::default()).unwrap();
        assert_eq!(resolved.rule, Resolution::KnownHardware);
        assert_eq!(resolved.channels, 1);
    }

    #[test]
    fn audio_server_is_forced_to_mono() {
        let devices = vec![
            device(0, "default", 2, true),
            device(5, "PulseAudio Sound Server", 32, false),
        ];
        let resolved = resolve(&devices, &DevicePolicy::default()).unwrap();
        assert_eq!(resolved.descriptor.index, 5);
        assert_eq!(resolved.channels, 1);
        assert_eq!(resolved.rule, Resolution::AudioServer);
    }

    #[test]
    fn preferred_index_without_inputs_falls_through() {
        let devices = vec![
            device(0, "HDMI Output", 0, false),
            device(1, "USB Mic", 1, true),
        ];
        let policy = DevicePolicy {
            preferred_index: Some(0),
            ..DevicePolicy::default()
        };
        let resolved = resolve(&devices, &policy).unwrap();
        assert_eq!(resolved.descriptor.index, 1);
        assert_eq!(resolved.rule, Resolution::SystemDefault);
    }

    #[test]
    fn valid_preferred_index_wins_over_hardware() {
        let devices = vec![
            device(0, "USB Mic", 2, true),
            device(2, "seeed-2mic", 2, false),
        ];
        let policy = DevicePolicy {
            preferred_index: Some(0),
            ..DevicePolicy::default()
        };
        let resolved = resolve(&devices, &policy).unwrap();
        assert_eq!(resolved.descriptor.index, 0);
        assert_eq!(resolved.channels, 2);
        assert_eq!(resolved.rule, Resolution::Preferred);
    }

    #[test]
    fn empty_topology_reports_no_input_device() {
        let err = resolve(&[], &DevicePolicy::default()).unwrap_err();
        assert!(matches!(err, CaptureError::NoInputDeviceFound));
    }

    #[test]
    fn output_only_devices_report_no_input_device() {
        let devices = vec![device(0, "seeed playback", 0, true)];
        let err = resolve(&devices, &DevicePolicy::default()).unwrap_err();
        assert!(matches!(err, CaptureError::NoInputDeviceFound));
    }

    #[test]
    fn fallback_plan_follows_fixed_order() {
        let devices = vec![
            device(0, "default", 2, true),
            device(2, "seeed-2mic-voicecard", 2, false),
            device(4, "pulse", 32, false),
        ];
        let policy = DevicePolicy {
            preferred_index: Some(0),
            fallback_index: 1,
            ..DevicePolicy::default()
        };
        let resolved = resolve(&devices, &policy).unwrap();
        let plan = FallbackPlan::build(&devices, &resolved, &policy);
        let order: Vec<(DeviceTarget, u16)> = plan
            .candidates()
            .iter()
            .map(|c| (c.target, c.channels))
            .collect();
        assert_eq!(
            order,
            vec![
                (DeviceTarget::Index(0), 2),
                (DeviceTarget::Index(2), 2),
                (DeviceTarget::Index(2), 1),
                (DeviceTarget::Index(4), 1),
                (DeviceTarget::Index(1), 1),
                (DeviceTarget::SystemDefault, 1),
            ]
        );
    }

    #[test]
    fn fallback_plan_drops_repeated_attempts() {
        let devices = vec![device(0, "Built-in Microphone", 1, true)];
        let policy = DevicePolicy::default();
        let resolved = resolve(&devices, &policy).unwrap();
        let plan = FallbackPlan::build(&devices, &resolved, &policy);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.candidates()[0].target, DeviceTarget::Index(0));
        assert_eq!(plan.candidates()[1].target, DeviceTarget::SystemDefault);
    }

    #[test]
    fn mono_only_plan_collapses_stereo_attempts() {
        let devices = vec![device(2, "seeed-2mic-voicecard", 2, true)];
        let policy = DevicePolicy::default();
        let resolved = resolve(&devices, &policy).unwrap();
        let plan = FallbackPlan::build(&devices, &resolved, &policy).mono_only();
        assert!(plan.candidates().iter().all(|c| c.channels == 1));
        let targets: Vec<DeviceTarget> = plan.candidates().iter().map(|c| c.target).collect();
        assert_eq!(
            targets,
            vec![
                DeviceTarget::Index(2),
                DeviceTarget::Index(0),
                DeviceTarget::SystemDefault
            ]
        );
    }
}
