//! Voice assistant entrypoint: wires the microphone, trigger, transcriber, handlers, and
//! speech output into one interaction loop.

mod cli_utils;

use anyhow::{bail, Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use voice_assistant::assistant::{
    AiResponder, AssistantContext, CommandResponder, CommandSpeaker, GeneralCommands,
    HandlerChain, SpeakerChain, Transcriber,
};
use voice_assistant::audio::{
    ArbiterConfig, CaptureArbiter, CpalBackend, SystemClock, VoiceActivityRecorder,
};
use voice_assistant::config::{AppConfig, TranscriberKind, TriggerEngine};
use voice_assistant::stt::CommandTranscriber;
use voice_assistant::trigger::{EnergyTrigger, KeywordTrigger, TriggerDetector, TriggerModel};
use voice_assistant::{logging, telemetry, InteractionLoop};

use crate::cli_utils::list_input_devices;

fn build_transcriber(config: &AppConfig) -> Result<Arc<dyn Transcriber>> {
    match config.transcriber {
        TranscriberKind::Command => {
            let Some(cmd) = &config.stt_cmd else {
                bail!("--stt-cmd (or VOICE_ASSISTANT_STT_CMD) is required with --transcriber command");
            };
            Ok(Arc::new(CommandTranscriber::new(
                AppConfig::command_argv(cmd)?,
                Duration::from_millis(config.stt_timeout_ms),
            )))
        }
        #[cfg(feature = "whisper")]
        TranscriberKind::Whisper => {
            let Some(model) = &config.whisper_model_path else {
                bail!("--transcriber whisper requires --whisper-model-path");
            };
            Ok(Arc::new(voice_assistant::stt::WhisperTranscriber::new(
                model,
                &config.lang,
            )?))
        }
        #[cfg(not(feature = "whisper"))]
        TranscriberKind::Whisper => {
            bail!("--transcriber whisper requires building with the 'whisper' feature")
        }
    }
}

fn build_speaker(config: &AppConfig) -> Result<SpeakerChain> {
    let timeout = Duration::from_millis(config.speak_timeout_ms);
    let primary = CommandSpeaker::new(AppConfig::command_argv(&config.speak_cmd)?, timeout);
    let mut chain = SpeakerChain::new().with(primary);
    for cmd in &config.fallback_speak_cmds {
        chain = chain.with(CommandSpeaker::new(AppConfig::command_argv(cmd)?, timeout));
    }
    Ok(chain)
}

fn build_ai(config: &AppConfig) -> Result<Option<Box<dyn AiResponder>>> {
    let Some(cmd) = &config.ai_cmd else {
        return Ok(None);
    };
    let responder = CommandResponder::new(
        AppConfig::command_argv(cmd)?,
        Duration::from_millis(config.ai_timeout_ms),
    )
    .with_history_limit(config.ai_history);
    Ok(Some(Box::new(responder)))
}

fn build_trigger(config: &AppConfig, transcriber: &Arc<dyn Transcriber>) -> Box<dyn TriggerModel> {
    match config.trigger_engine {
        TriggerEngine::Energy => Box::new(EnergyTrigger::new(
            config.sample_rate,
            config.frame_size,
            config.trigger_energy_ratio,
            config.trigger_floor,
        )),
        TriggerEngine::Keyword => Box::new(KeywordTrigger::new(
            Arc::clone(transcriber),
            config.wake_words.clone(),
            config.sample_rate,
            config.frame_size,
            config.trigger_floor,
        )),
    }
}

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    if config.list_input_devices {
        return list_input_devices(&config);
    }

    telemetry::init_tracing(&config)?;
    logging::install_panic_hook(&config);

    let pipeline = config.capture_pipeline_config();
    let backend = CpalBackend::new(pipeline.read_timeout());
    tracing::info!(host = backend.host_name(), "audio host selected");
    let arbiter = CaptureArbiter::new(
        backend,
        config.device_policy(),
        ArbiterConfig::from(&pipeline),
        Arc::new(SystemClock::new()),
    );

    let transcriber = build_transcriber(&config)?;
    let context = AssistantContext {
        transcriber: Arc::clone(&transcriber),
        handlers: HandlerChain::new().with(GeneralCommands::new()),
        ai: build_ai(&config)?,
        speaker: Box::new(build_speaker(&config)?),
        log_content: config.log_content,
    };
    let recorder =
        VoiceActivityRecorder::new(pipeline.vad_config(), pipeline.sample_rate, pipeline.frame_size);

    let stop = Arc::new(AtomicBool::new(false));
    let signal_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        tracing::info!("shutdown requested");
        signal_stop.store(true, Ordering::Relaxed);
    })
    .context("failed to install the shutdown handler")?;

    let detector =
        TriggerDetector::new(build_trigger(&config, &transcriber)).with_cancel(Arc::clone(&stop));
    let mut assistant =
        InteractionLoop::new(arbiter, detector, recorder, context, pipeline.retry_backoff());
    assistant.run(&stop);
    Ok(())
}
