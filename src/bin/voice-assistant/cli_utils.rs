use anyhow::{Context, Result};
use voice_assistant::audio::{self, AudioBackend, CpalBackend, DeviceDescriptor};
use voice_assistant::config::AppConfig;

/// Parse `VOICE_ASSISTANT_TEST_DEVICES` entries of the form `name:channels[:default]`.
fn parse_test_devices(raw: &str) -> Vec<DeviceDescriptor> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .enumerate()
        .map(|(index, item)| {
            let mut parts = item.split(':');
            let name = parts.next().unwrap_or_default().trim().to_string();
            let max_input_channels = parts
                .next()
                .and_then(|ch| ch.trim().parse().ok())
                .unwrap_or(1);
            let is_default = parts.next().is_some_and(|flag| flag.trim() == "default");
            DeviceDescriptor {
                index,
                name,
                max_input_channels,
                is_default,
            }
        })
        .collect()
}

fn enumerate_devices(config: &AppConfig) -> Result<Vec<DeviceDescriptor>> {
    if let Ok(raw) = std::env::var("VOICE_ASSISTANT_TEST_DEVICES") {
        return Ok(parse_test_devices(&raw));
    }
    let backend = CpalBackend::new(config.capture_pipeline_config().read_timeout());
    backend
        .enumerate()
        .context("failed to list audio input devices")
}

pub(crate) fn list_input_devices(config: &AppConfig) -> Result<()> {
    let devices = enumerate_devices(config)?;
    let selected = audio::resolve(&devices, &config.device_policy()).ok();

    if config.json {
        let report = serde_json::json!({
            "devices": devices,
            "selected": selected,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if devices.is_empty() {
        println!("No audio input devices detected.");
        return Ok(());
    }
    println!("Available audio input devices:");
    for device in &devices {
        let default = if device.is_default { ", default" } else { "" };
        println!(
            "  [{}] {} ({} ch{default})",
            device.index, device.name, device.max_input_channels
        );
    }
    match selected {
        Some(resolved) => println!(
            "Recording device: [{}] {} ({} ch, {:?})",
            resolved.descriptor.index, resolved.descriptor.name, resolved.channels, resolved.rule
        ),
        None => println!("Recording device: none usable"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_devices_parse_names_channels_and_default() {
        let devices = parse_test_devices("Built-in:1:default, ReSpeaker 4 Mic:2 ,,Loopback");
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].name, "Built-in");
        assert!(devices[0].is_default);
        assert_eq!(devices[1].index, 1);
        assert_eq!(devices[1].max_input_channels, 2);
        assert!(!devices[1].is_default);
        assert_eq!(devices[2].max_input_channels, 1);
    }

    #[test]
    fn empty_override_means_no_devices() {
        assert!(parse_test_devices("  ").is_empty());
    }
}
