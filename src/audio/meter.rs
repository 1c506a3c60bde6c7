const FULL_SCALE: f32 = 32_768.0;
const FLOOR_DB: f32 = -96.0;

/// Largest absolute sample; `i16::MIN` maps to 32768 without overflow.
pub fn peak_amplitude(samples: &[i16]) -> u16 {
    samples
        .iter()
        .map(|sample| sample.unsigned_abs())
        .max()
        .unwrap_or(0)
}

/// Root-mean-square level on the raw 16-bit scale.
pub fn rms_level(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy: f64 = samples
        .iter()
        .map(|&s| {
            let s = f64::from(s);
            s * s
        })
        .sum::<f64>()
        / samples.len() as f64;
    energy.sqrt() as f32
}

/// Level relative to full scale, clamped to a -96 dB floor.
pub fn level_dbfs(level: f32) -> f32 {
    if level <= 0.0 {
        return FLOOR_DB;
    }
    (20.0 * (level / FULL_SCALE).log10()).max(FLOOR_DB)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_handles_most_negative_sample() {
        assert_eq!(peak_amplitude(&[0, -32768, 100]), 32768);
    }

    #[test]
    fn peak_of_empty_frame_is_zero() {
        assert_eq!(peak_amplitude(&[]), 0);
    }

    #[test]
    fn rms_of_constant_signal_matches_magnitude() {
        let level = rms_level(&[-500, 500, -500, 500]);
        assert!((level - 500.0).abs() < 1e-3);
    }

    #[test]
    fn dbfs_floor_applies_to_silence() {
        assert_eq!(level_dbfs(0.0), FLOOR_DB);
        assert!(level_dbfs(32_767.0) > -0.01);
    }
}
