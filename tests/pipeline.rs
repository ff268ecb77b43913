mod common;

use common::{harness, harness_with, ScriptedModel};
use sami::backend::BackendError;
use sami::core::{store::USER_PROFILE, Role};
use sami::engine::{LOCAL_UNREACHABLE, WAKE_ACK};
use sami::notify::Event;

const LANG: &str = "en-in";

#[tokio::test]
async fn greeting_is_answered_by_rules_alone() {
    let h = harness(ScriptedModel::answering("unused"), None);

    let reply = h.engine.process("hello", LANG).await.unwrap();

    assert!(!reply.text.is_empty());
    assert_eq!(h.local.calls(), 0);
}

#[tokio::test]
async fn each_utterance_logs_one_user_and_one_assistant_turn() {
    let h = harness(ScriptedModel::answering("Entangled particles share state."), None);

    h.engine.process("hello", LANG).await.unwrap();
    h.engine
        .process("explain quantum entanglement", LANG)
        .await
        .unwrap();

    let memory = h.engine.memory();
    assert_eq!(memory.turn_count().unwrap(), 4);
    let turns = memory.recent_turns(4).unwrap();
    let roles: Vec<Role> = turns.iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    assert_eq!(turns[0].content, "hello");
    assert_eq!(turns[3].content, "Entangled particles share state.");
}

#[tokio::test]
async fn blank_input_is_ignored() {
    let h = harness(ScriptedModel::answering("unused"), None);

    assert!(h.engine.process("   ", LANG).await.is_none());
    assert_eq!(h.engine.memory().turn_count().unwrap(), 0);
}

#[tokio::test]
async fn bare_wake_word_is_acknowledged() {
    let h = harness(ScriptedModel::answering("unused"), None);

    let reply = h.engine.process("hey sami", LANG).await.unwrap();

    assert_eq!(reply.text, WAKE_ACK);
    assert_eq!(h.local.calls(), 0);
}

#[tokio::test]
async fn wake_word_prefix_is_stripped_before_rules() {
    let h = harness(ScriptedModel::answering("unused"), None);

    let reply = h.engine.process("Hey Sami open spotify", LANG).await.unwrap();

    assert_eq!(h.desktop.calls(), vec!["open_app spotify"]);
    assert!(reply.text.contains("open_app spotify"));
    assert_eq!(h.local.calls(), 0);
}

#[tokio::test]
async fn misheard_command_words_are_corrected() {
    let h = harness(ScriptedModel::answering("unused"), None);

    h.engine.process("opne spotify", LANG).await.unwrap();

    assert_eq!(h.desktop.calls(), vec!["open_app spotify"]);
    let turns = h.engine.memory().recent_turns(2).unwrap();
    assert_eq!(turns[0].content, "open spotify");
}

#[tokio::test]
async fn unknown_tool_is_reported_inline() {
    let h = harness(
        ScriptedModel::answering(
            "```json\n[{\"tool\": \"teleport\", \"args\": \"mars\"}]\n```",
        ),
        None,
    );

    let reply = h
        .engine
        .process("explain quantum entanglement", LANG)
        .await
        .unwrap();

    assert_eq!(
        reply.text,
        "I have executed the requested actions: Tool 'teleport' is not available."
    );
    assert!(h.desktop.calls().is_empty());
}

#[tokio::test]
async fn model_requested_tool_runs_on_the_desktop() {
    let h = harness(
        ScriptedModel::answering("```json\n[{\"tool\": \"open_app\", \"args\": \"notepad\"}]\n```"),
        None,
    );

    let reply = h
        .engine
        .process("explain quantum entanglement", LANG)
        .await
        .unwrap();

    assert_eq!(h.desktop.calls(), vec!["open_app notepad"]);
    assert!(reply.text.starts_with("I have executed the requested actions: Tool 'open_app' returned:"));
}

#[tokio::test]
async fn malformed_action_block_is_spoken_as_text() {
    let raw = "Let me do that.\n```json\n[{\"tool\": \"open_app\",,]\n```";
    let h = harness(ScriptedModel::answering(raw), None);

    let reply = h
        .engine
        .process("explain quantum entanglement", LANG)
        .await
        .unwrap();

    assert_eq!(reply.text, raw);
    assert!(h.desktop.calls().is_empty());
}

#[tokio::test]
async fn mode_toggle_moves_the_next_command_to_another_tier() {
    let h = harness(ScriptedModel::answering("ok"), None);

    h.engine
        .process("explain quantum entanglement", LANG)
        .await
        .unwrap();
    assert!(h.local.last_prompt().contains("fast-response"));
    assert!(!h.local.last_prompt().contains("Deep Reasoning Mode"));

    h.engine.process("enable deep mode", LANG).await.unwrap();
    let modes = h.engine.state().modes();
    assert!(modes.deep_think_mode);
    assert!(!modes.quick_response_mode);
    assert!(h
        .notifier
        .events()
        .iter()
        .any(|e| matches!(e, Event::Mode(m) if m.deep_think_mode)));

    h.engine
        .process("explain quantum entanglement", LANG)
        .await
        .unwrap();
    assert!(h.local.last_prompt().contains("Deep Reasoning Mode"));
    assert_eq!(h.local.calls(), 2);
}

#[tokio::test]
async fn friendly_persona_uses_friendly_instruction() {
    let h = harness(ScriptedModel::answering("ok"), None);

    h.engine.process("be my friend", LANG).await.unwrap();
    h.engine
        .process("explain quantum entanglement", LANG)
        .await
        .unwrap();

    assert!(h.local.last_prompt().contains("friendly AI companion"));
}

#[tokio::test]
async fn quick_tier_answers_live_questions_from_search() {
    let h = harness(ScriptedModel::answering("unused"), None);

    let reply = h
        .engine
        .process("latest news about rust", LANG)
        .await
        .unwrap();

    assert_eq!(
        reply.text,
        "Here is what I found:\nsummary of latest news about rust"
    );
    assert_eq!(h.local.calls(), 0);
    assert_eq!(
        h.research.queries.lock().unwrap().clone(),
        vec![("latest news about rust".to_string(), true)]
    );
}

#[tokio::test]
async fn cloud_failure_falls_back_to_local_model() {
    let cloud = ScriptedModel::failing(|| BackendError::Unreachable("down".into()));
    let h = harness(ScriptedModel::answering("  local answer  "), Some(cloud));

    let reply = h
        .engine
        .process("explain quantum entanglement", LANG)
        .await
        .unwrap();

    assert_eq!(reply.text, "local answer");
    assert_eq!(h.cloud.as_ref().unwrap().calls(), 1);
    assert_eq!(h.local.calls(), 1);
    assert!(h
        .local
        .last_prompt()
        .ends_with("User: explain quantum entanglement"));
}

#[tokio::test]
async fn unreachable_local_model_gets_an_apology() {
    let h = harness(
        ScriptedModel::failing(|| BackendError::Unreachable("connection refused".into())),
        None,
    );

    let reply = h
        .engine
        .process("explain quantum entanglement", LANG)
        .await
        .unwrap();

    assert_eq!(reply.text, LOCAL_UNREACHABLE);
    assert_eq!(h.engine.memory().turn_count().unwrap(), 2);
}

#[tokio::test]
async fn quick_mode_does_not_retry_rate_limits() {
    let h = harness(
        ScriptedModel::failing(|| BackendError::RateLimited("quota".into())),
        None,
    );

    h.engine
        .process("explain quantum entanglement", LANG)
        .await
        .unwrap();

    assert_eq!(h.local.calls(), 1);
}

#[tokio::test]
async fn stated_name_is_remembered_and_reused() {
    let h = harness(ScriptedModel::answering("Nice to meet you."), None);

    h.engine
        .process("my name is ada lovelace", LANG)
        .await
        .unwrap();
    assert_eq!(
        h.engine
            .memory()
            .get_setting(USER_PROFILE, "name")
            .unwrap()
            .as_deref(),
        Some("ada lovelace")
    );

    h.engine
        .process("explain quantum entanglement", LANG)
        .await
        .unwrap();
    assert!(h.local.last_prompt().contains("ada lovelace"));
}

#[tokio::test]
async fn events_describe_the_exchange() {
    let h = harness(ScriptedModel::answering("unused"), None);

    h.engine.process("hello", LANG).await.unwrap();

    let events = h.notifier.events();
    assert_eq!(events.first(), Some(&Event::status("Processing...")));
    assert_eq!(events.last(), Some(&Event::status("Ready")));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::Conversation { role: Role::User, content, .. } if content == "hello"
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Conversation { role: Role::Assistant, .. })));
}

#[tokio::test]
async fn configured_wake_word_is_honoured() {
    let h = harness_with(ScriptedModel::answering("unused"), None, |config| {
        config.assistant.wake_word = "nova".to_string();
    });

    let reply = h.engine.process("Nova", LANG).await.unwrap();

    assert_eq!(reply.text, WAKE_ACK);
}

#[tokio::test]
async fn name_is_not_learned_when_the_model_is_down() {
    let h = harness(
        ScriptedModel::failing(|| BackendError::Unreachable("connection refused".into())),
        None,
    );

    let reply = h.engine.process("my name is ada", LANG).await.unwrap();

    assert_eq!(reply.text, LOCAL_UNREACHABLE);
    assert_eq!(
        h.engine.memory().get_setting(USER_PROFILE, "name").unwrap(),
        None
    );
}

#[tokio::test]
async fn everyday_sentences_do_not_touch_the_desktop() {
    let h = harness(ScriptedModel::answering("ok"), None);

    for said in [
        "look at this",
        "what does a clock do",
        "good luck with the exam",
        "fried rice recipe",
        "which is the closest star",
    ] {
        h.engine.process(said, LANG).await.unwrap();
    }

    assert!(h.desktop.calls().is_empty());
    assert!(!h.local.last_prompt().contains("friendly AI companion"));
}

#[tokio::test]
async fn image_prompt_is_embellished_outside_fast_mode() {
    let h = harness_with(
        ScriptedModel::answering("\"A majestic red fox in watercolor\""),
        None,
        |config| config.assistant.quick_response_mode = false,
    );

    let reply = h
        .engine
        .process("generate an image of a red fox", LANG)
        .await
        .unwrap();

    assert_eq!(reply.text, "Here is the generated image of red fox.");
    let image = reply.image.unwrap();
    assert!(
        image.contains("/prompt/A%20majestic%20red%20fox%20in%20watercolor?"),
        "{image}"
    );
    assert!(h.local.last_prompt().starts_with("Rewrite this image prompt"));
    assert!(h.local.last_prompt().ends_with("Prompt: red fox"));
}

#[tokio::test]
async fn image_prompt_is_used_verbatim_in_fast_mode() {
    let h = harness(ScriptedModel::answering("unused"), None);

    let reply = h
        .engine
        .process("generate an image of a red fox", LANG)
        .await
        .unwrap();

    assert!(reply.image.unwrap().contains("/prompt/red%20fox?"));
    assert_eq!(h.local.calls(), 0);
}

#[tokio::test]
async fn failed_image_embellishment_keeps_the_plain_prompt() {
    let h = harness_with(
        ScriptedModel::failing(|| BackendError::Unreachable("down".into())),
        None,
        |config| config.assistant.quick_response_mode = false,
    );

    let reply = h
        .engine
        .process("generate an image of a red fox", LANG)
        .await
        .unwrap();

    assert!(reply.image.unwrap().contains("/prompt/red%20fox?"));
    assert_eq!(h.local.calls(), 1);
}
