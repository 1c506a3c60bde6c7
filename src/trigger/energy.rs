use super::TriggerModel;
use crate::audio::rms_level;

const SMOOTHING: f32 = 0.05;
const WARMUP_FRAMES: usize = 3;

/// Fires when a frame's RMS jumps above both an absolute floor and `ratio` times the
/// running ambient average.
pub struct EnergyTrigger {
    sample_rate: u32,
    frame_length: usize,
    ratio: f32,
    floor: f32,
    ambient: Option<f32>,
    frames: usize,
}

impl EnergyTrigger {
    pub fn new(sample_rate: u32, frame_length: usize, ratio: f32, floor: f32) -> Self {
        Self {
            sample_rate,
            frame_length,
            ratio,
            floor,
            ambient: None,
            frames: 0,
        }
    }

    pub fn ambient_level(&self) -> Option<f32> {
        self.ambient
    }
}

impl TriggerModel for EnergyTrigger {
    fn name(&self) -> &'static str {
        "energy"
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn process(&mut self, frame: &[i16]) -> bool {
        let level = rms_level(frame);
        self.frames += 1;
        let Some(ambient) = self.ambient else {
            self.ambient = Some(level);
            return false;
        };
        if self.frames > WARMUP_FRAMES && level > self.floor && level > ambient * self.ratio {
            tracing::debug!(level, ambient, "energy spike");
            return true;
        }
        self.ambient = Some(ambient + SMOOTHING * (level - ambient));
        false
    }

    fn reset(&mut self) {
        self.ambient = None;
        self.frames = 0;
    }
}
