use super::validation::{normalize_tokens, validate_command};
use super::{AppConfig, LogLevel, TranscriberKind, TriggerEngine};
use crate::audio::{ArbiterConfig, VadConfig};
use clap::Parser;
use std::time::Duration;

fn parse(args: &[&str]) -> AppConfig {
    let mut argv = vec!["test-app"];
    argv.extend_from_slice(args);
    AppConfig::parse_from(argv)
}

#[test]
fn defaults_validate_and_match_capture_tunables() {
    let mut cfg = parse(&[]);
    cfg.validate().expect("defaults are valid");

    let pipeline = cfg.capture_pipeline_config();
    assert_eq!(pipeline.sample_rate, 16_000);
    assert_eq!(pipeline.frame_size, 1024);
    assert_eq!(pipeline.silence_ms, 2_000);
    assert_eq!(pipeline.max_recording_ms, 30_000);
    assert_eq!(pipeline.volume_threshold, 50.0);
    assert_eq!(pipeline.settle_delay_ms, 100);
    assert_eq!(cfg.trigger_engine, TriggerEngine::Energy);
    assert_eq!(cfg.transcriber, TranscriberKind::Command);
    assert_eq!(cfg.log_level, LogLevel::Info);
    assert_eq!(cfg.speak_cmd, "espeak -a 200 -s 150");
    assert_eq!(cfg.ai_history, 10);
}

#[test]
fn pipeline_config_converts_into_capture_settings() {
    let cfg = parse(&[
        "--silence-ms",
        "1500",
        "--settle-delay-ms",
        "250",
        "--calibration-frames",
        "0",
    ]);
    let pipeline = cfg.capture_pipeline_config();

    let vad = VadConfig::from(&pipeline);
    assert_eq!(vad.silence_duration, Duration::from_millis(1_500));
    assert_eq!(vad.max_duration, Duration::from_millis(30_000));
    assert_eq!(vad.calibration_frames, 0);

    let arbiter = ArbiterConfig::from(&pipeline);
    assert_eq!(arbiter.settle_delay, Duration::from_millis(250));
    assert_eq!(arbiter.lease_wait, Duration::from_millis(5_000));
}

#[test]
fn device_policy_carries_tokens_and_indices() {
    let mut cfg = parse(&[
        "--input-device-index",
        "3",
        "--hardware-token",
        " USB Mic ",
        "--hardware-token",
        "usb mic",
        "--fallback-device-index",
        "2",
    ]);
    cfg.validate().unwrap();
    let policy = cfg.device_policy();
    assert_eq!(policy.preferred_index, Some(3));
    assert_eq!(policy.hardware_tokens, vec!["usb mic".to_string()]);
    assert_eq!(policy.audio_server_tokens, vec!["pulse".to_string()]);
    assert_eq!(policy.fallback_index, 2);
}

#[test]
fn rejects_sample_rate_out_of_bounds() {
    let mut cfg = parse(&["--sample-rate", "4000"]);
    assert!(cfg.validate().is_err());
    let mut cfg = parse(&["--sample-rate", "96000"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_silence_longer_than_recording_cap() {
    let mut cfg = parse(&["--max-recording-ms", "1000", "--silence-ms", "2000"]);
    assert!(cfg.validate().is_err());
    let mut cfg = parse(&["--max-recording-ms", "2000", "--silence-ms", "2000"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_recording_cap_over_hard_limit() {
    let mut cfg = parse(&["--max-recording-ms", "0"]);
    assert!(cfg.validate().is_err());
    let mut cfg = parse(&["--max-recording-ms", "120001"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_calibration_multiplier_below_one() {
    let mut cfg = parse(&["--calibration-multiplier", "0.5"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_zero_read_error_budget() {
    let mut cfg = parse(&["--max-read-errors", "0"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn keyword_trigger_requires_a_transcriber_command() {
    let mut cfg = parse(&["--trigger-engine", "keyword"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--trigger-engine", "keyword", "--stt-cmd", "whisper-cli -"]);
    cfg.validate().unwrap();
    assert_eq!(cfg.wake_words, vec!["hey pi".to_string()]);
}

#[cfg(not(feature = "whisper"))]
#[test]
fn whisper_transcriber_requires_feature() {
    let mut cfg = parse(&["--transcriber", "whisper"]);
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("'whisper' feature"));
}

#[test]
fn rejects_missing_whisper_model_path() {
    let mut cfg = parse(&["--whisper-model-path", "/definitely/not/here/ggml.bin"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_unbalanced_command_quotes() {
    let mut cfg = parse(&["--speak-cmd", "espeak 'unterminated"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn fallback_speak_commands_keep_their_order() {
    let mut cfg = parse(&[
        "--fallback-speak-cmd",
        "pico2wave-say",
        "--fallback-speak-cmd",
        "flite -t",
    ]);
    cfg.validate().unwrap();
    assert_eq!(cfg.fallback_speak_cmds, vec!["pico2wave-say", "flite -t"]);

    let mut cfg = parse(&["--fallback-speak-cmd", "flite 'broken"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_empty_commands() {
    assert!(validate_command("   ", "--ai-cmd").is_err());
    assert!(validate_command("say\nhello", "--speak-cmd").is_err());
    assert!(validate_command("piper --model 'en US.onnx'", "--speak-cmd").is_ok());
}

#[test]
fn command_argv_respects_quoting() {
    let argv = AppConfig::command_argv("llm -m 'gpt small' --no-stream").unwrap();
    assert_eq!(argv, vec!["llm", "-m", "gpt small", "--no-stream"]);
}

#[test]
fn normalize_tokens_rejects_control_characters() {
    let tokens = vec!["ok".to_string(), "bad\u{7}".to_string()];
    assert!(normalize_tokens(&tokens, "--hardware-token").is_err());
}

#[test]
fn rejects_invalid_language_code() {
    let mut cfg = parse(&["--lang", "en$"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_language_with_unknown_primary_code() {
    let mut cfg = parse(&["--lang", "zz-ZZ"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_language_with_region_suffixes() {
    let mut cfg = parse(&["--lang", "en-US"]);
    assert!(cfg.validate().is_ok());
    let mut cfg = parse(&["--lang", "pt_BR"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn accepts_auto_language() {
    let mut cfg = parse(&["--lang", "auto"]);
    assert!(cfg.validate().is_ok());
}
