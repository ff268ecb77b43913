mod common;

use std::time::Duration;

use common::{harness, harness_with, ScriptedModel, ScriptedSpeech};
use sami::notify::Event;
use sami::session::{Step, VoiceLoop, ERROR_REPLY, LISTENING_ACK, SLEEP_ACK};
use sami::speech::SpeechError;

fn voice_loop(h: &common::Harness, speech: &std::sync::Arc<ScriptedSpeech>) -> VoiceLoop {
    VoiceLoop::new(h.engine.clone(), speech.clone())
}

#[tokio::test]
async fn speech_without_wake_word_is_ignored() {
    let h = harness(ScriptedModel::answering("unused"), None);
    let speech = ScriptedSpeech::new(&["open spotify"]);
    let voice = voice_loop(&h, &speech);

    assert_eq!(voice.step().await.unwrap(), Step::Standby);
    assert!(h.desktop.calls().is_empty());
    assert!(speech.spoken().is_empty());
    assert!(!h.engine.state().snapshot().active);
}

#[tokio::test]
async fn wake_command_and_exit() {
    let h = harness(ScriptedModel::answering("unused"), None);
    let speech = ScriptedSpeech::new(&["hey sami", "open spotify", "stop"]);
    let voice = voice_loop(&h, &speech);

    assert_eq!(voice.step().await.unwrap(), Step::Woke);
    assert!(h.engine.state().snapshot().active);

    assert!(matches!(voice.step().await.unwrap(), Step::Replied(_)));
    assert_eq!(h.desktop.calls(), vec!["open_app spotify"]);

    assert_eq!(voice.step().await.unwrap(), Step::Slept);
    assert!(!h.engine.state().snapshot().active);

    assert_eq!(speech.spoken()[0], LISTENING_ACK);
    assert_eq!(speech.spoken()[2], SLEEP_ACK);
    assert!(matches!(voice.step().await, Err(SpeechError::InputClosed)));
}

#[tokio::test]
async fn stop_with_an_object_is_a_command_not_an_exit() {
    let h = harness(ScriptedModel::answering("unused"), None);
    let speech = ScriptedSpeech::new(&["hey sami", "stop music"]);
    let voice = voice_loop(&h, &speech);

    voice.step().await.unwrap();
    assert!(matches!(voice.step().await.unwrap(), Step::Replied(_)));
    assert_eq!(h.desktop.calls(), vec!["media_control stop"]);
    assert!(h.engine.state().snapshot().active);
}

#[tokio::test]
async fn one_shot_command_after_wake_word() {
    let h = harness(ScriptedModel::answering("unused"), None);
    let speech = ScriptedSpeech::new(&["hey sami open spotify"]);
    let voice = voice_loop(&h, &speech);

    assert!(matches!(voice.step().await.unwrap(), Step::Replied(_)));
    assert_eq!(h.desktop.calls(), vec!["open_app spotify"]);
    assert_eq!(speech.spoken().len(), 1);
}

#[tokio::test]
async fn language_switch_changes_the_speaking_language() {
    let h = harness(ScriptedModel::answering("unused"), None);
    let speech = ScriptedSpeech::new(&["hey sami", "speak in hindi", "hello"]);
    let voice = voice_loop(&h, &speech);

    voice.step().await.unwrap();
    assert_eq!(
        voice.step().await.unwrap(),
        Step::LanguageSwitched("hi-in".to_string())
    );
    assert_eq!(h.engine.state().snapshot().current_language, "hi-in");
    assert_eq!(speech.spoken()[1], "Okay, switching to hindi.");

    voice.step().await.unwrap();
    assert_eq!(speech.last_language().as_deref(), Some("hi-in"));
}

#[tokio::test]
async fn silence_sleeps_outside_continuous_mode() {
    let h = harness_with(ScriptedModel::answering("unused"), None, |config| {
        config.assistant.continuous_mode = false;
    });
    let speech = ScriptedSpeech::new(&["hey sami", ""]);
    let voice = voice_loop(&h, &speech);

    voice.step().await.unwrap();
    assert_eq!(voice.step().await.unwrap(), Step::Slept);
    assert!(!h.engine.state().snapshot().active);
}

#[tokio::test]
async fn silence_keeps_listening_in_continuous_mode() {
    let h = harness(ScriptedModel::answering("unused"), None);
    let speech = ScriptedSpeech::new(&["hey sami", ""]);
    let voice = voice_loop(&h, &speech);

    voice.step().await.unwrap();
    assert_eq!(voice.step().await.unwrap(), Step::Silence);
    assert!(h.engine.state().snapshot().active);
}

#[tokio::test]
async fn continuous_mode_times_out_to_standby() {
    let h = harness_with(ScriptedModel::answering("unused"), None, |config| {
        config.assistant.continuous_timeout_secs = 0;
    });
    let speech = ScriptedSpeech::new(&["hey sami", "open spotify"]);
    let voice = voice_loop(&h, &speech);

    voice.step().await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    assert_eq!(voice.step().await.unwrap(), Step::TimedOut);
    assert!(!h.engine.state().snapshot().active);
    assert!(h.desktop.calls().is_empty());
}

#[tokio::test]
async fn muted_microphone_skips_listening() {
    let h = harness(ScriptedModel::answering("unused"), None);
    let speech = ScriptedSpeech::new(&["hey sami"]);
    let voice = voice_loop(&h, &speech);

    voice.set_mic_enabled(false);
    assert_eq!(voice.step().await.unwrap(), Step::Muted);
    assert!(h
        .notifier
        .events()
        .contains(&Event::Mic { listening: false }));

    voice.set_mic_enabled(true);
    assert_eq!(voice.step().await.unwrap(), Step::Woke);
}

#[tokio::test]
async fn run_greets_and_stops_when_input_closes() {
    let h = harness(ScriptedModel::answering("unused"), None);
    let speech = ScriptedSpeech::new(&["hey sami open spotify"]);
    let voice = voice_loop(&h, &speech);

    voice.run().await.unwrap();

    let spoken = speech.spoken();
    assert_eq!(spoken[0], "SAMi online.");
    assert_eq!(spoken.len(), 2);
    assert_eq!(h.desktop.calls(), vec!["open_app spotify"]);
}

#[tokio::test]
async fn run_recovers_from_a_device_error() {
    let h = harness(ScriptedModel::answering("unused"), None);
    let speech = ScriptedSpeech::with_results(vec![
        Ok("hey sami".to_string()),
        Err(SpeechError::Device("microphone unplugged".into())),
        Ok("open spotify".to_string()),
        Ok("hey sami".to_string()),
    ]);
    let voice = voice_loop(&h, &speech);

    voice.run().await.unwrap();

    assert_eq!(
        speech.spoken(),
        vec!["SAMi online.", LISTENING_ACK, ERROR_REPLY, LISTENING_ACK]
    );
    // the error put the loop back in standby, so this was not a command
    assert!(h.desktop.calls().is_empty());
    assert!(h.engine.state().snapshot().active);
}

#[tokio::test]
async fn run_goes_to_standby_after_a_device_error() {
    let h = harness(ScriptedModel::answering("unused"), None);
    let speech = ScriptedSpeech::with_results(vec![
        Ok("hey sami".to_string()),
        Err(SpeechError::Device("microphone unplugged".into())),
    ]);
    let voice = voice_loop(&h, &speech);

    voice.run().await.unwrap();

    assert_eq!(speech.spoken().last().map(String::as_str), Some(ERROR_REPLY));
    assert!(!h.engine.state().snapshot().active);
}
