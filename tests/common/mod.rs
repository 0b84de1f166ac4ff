//! Shared helpers for session integration tests

use std::path::Path;
use std::sync::Arc;

use lingodrill::audio::NullPlayer;
use lingodrill::config::DrillConfig;
use lingodrill::dialogue::Dialogue;
use lingodrill::session::DialogueSession;
use lingodrill::storage::{JsonFileStore, MemoryStore, ProgressStore};

/// Config with all pauses zeroed so tests run at full speed
pub fn instant_config() -> DrillConfig {
    let mut config = DrillConfig::default();
    config.timing.message_transition_ms = 0;
    config.timing.success_pause_ms = 0;
    config.timing.skip_pause_ms = 0;
    config
}

/// One-step dialogue expecting "The patient is stable"
pub fn single_step_dialogue() -> Dialogue {
    Dialogue::from_json(
        r#"{
            "id": "test-single",
            "title": "Single step",
            "conversation": [
                {
                    "type": "conversation",
                    "prompt": "How is the patient?",
                    "expected_response": "The patient is stable",
                    "response_audio_url": "audio/stable.mp3"
                }
            ]
        }"#,
    )
    .expect("sample dialogue should parse")
}

/// Instruction intro plus two responsive steps
pub fn three_step_dialogue() -> Dialogue {
    Dialogue::from_json(
        r#"{
            "id": "test-three",
            "title": "Ward round",
            "conversation": [
                {
                    "type": "instruction",
                    "prompt": "You are on the morning ward round.",
                    "audio_url": "audio/intro.mp3"
                },
                {
                    "type": "conversation",
                    "prompt": "Greet the patient.",
                    "expected_response": "Good morning"
                },
                {
                    "type": "conversation",
                    "prompt": "Ask about the pain.",
                    "expected_response": "Where does it hurt"
                },
                {
                    "type": "conversation",
                    "prompt": "Say goodbye.",
                    "expected_response": "Goodbye"
                }
            ]
        }"#,
    )
    .expect("sample dialogue should parse")
}

pub fn memory_session(dialogue: Dialogue) -> DialogueSession<MemoryStore> {
    let config = instant_config();
    let progress = ProgressStore::new(MemoryStore::new(), config.storage.clone());
    DialogueSession::new(dialogue, config, Arc::new(NullPlayer), progress)
        .expect("session should build")
}

pub fn file_session(dialogue: Dialogue, store_path: &Path) -> DialogueSession<JsonFileStore> {
    let config = instant_config();
    let store = JsonFileStore::open(store_path).expect("store should open");
    let progress = ProgressStore::new(store, config.storage.clone());
    DialogueSession::new(dialogue, config, Arc::new(NullPlayer), progress)
        .expect("session should build")
}
