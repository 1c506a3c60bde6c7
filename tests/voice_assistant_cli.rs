use std::process::Command;

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn assistant_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_voice-assistant").expect("voice-assistant test binary not built")
}

fn assistant() -> Command {
    let mut cmd = Command::new(assistant_bin());
    for var in [
        "VOICE_ASSISTANT_INPUT_DEVICE",
        "VOICE_ASSISTANT_STT_CMD",
        "VOICE_ASSISTANT_SPEAK_CMD",
        "VOICE_ASSISTANT_AI_CMD",
        "VOICE_ASSISTANT_LOGS",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn help_lists_capture_flags() {
    let output = assistant()
        .arg("--help")
        .output()
        .expect("run voice-assistant --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("--silence-ms"));
    assert!(combined.contains("--list-input-devices"));
}

#[test]
fn help_explains_trigger_engines() {
    let output = assistant()
        .arg("--help")
        .output()
        .expect("run voice-assistant --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("`energy` fires on any loud sound"));
    assert!(combined.contains("`keyword` listens for the wake phrase"));
}

#[test]
fn list_input_devices_prints_devices_and_selection() {
    let output = assistant()
        .arg("--list-input-devices")
        .env(
            "VOICE_ASSISTANT_TEST_DEVICES",
            "Built-in Microphone:1:default,ReSpeaker 4 Mic Array:2",
        )
        .output()
        .expect("run voice-assistant --list-input-devices");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Available audio input devices:"));
    assert!(stdout.contains("[1] ReSpeaker 4 Mic Array (2 ch)"));
    assert!(stdout.contains("Recording device: [1] ReSpeaker 4 Mic Array (2 ch, KnownHardware)"));
}

#[test]
fn list_input_devices_json_is_machine_readable() {
    let output = assistant()
        .args(["--list-input-devices", "--json"])
        .env("VOICE_ASSISTANT_TEST_DEVICES", "PulseAudio Sound Server:2")
        .output()
        .expect("run voice-assistant --list-input-devices --json");
    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(report["devices"][0]["name"], "PulseAudio Sound Server");
    assert_eq!(report["selected"]["channels"], 1);
    assert_eq!(report["selected"]["rule"], "audio_server");
}

#[test]
fn empty_device_list_is_reported() {
    let output = assistant()
        .arg("--list-input-devices")
        .env("VOICE_ASSISTANT_TEST_DEVICES", "")
        .output()
        .expect("run voice-assistant --list-input-devices");
    assert!(output.status.success());
    assert!(combined_output(&output).contains("No audio input devices detected."));
}

#[test]
fn invalid_tunables_are_rejected() {
    let output = assistant()
        .args(["--list-input-devices", "--sample-rate", "4000"])
        .env("VOICE_ASSISTANT_TEST_DEVICES", "")
        .output()
        .expect("run voice-assistant");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("--sample-rate"));
}
