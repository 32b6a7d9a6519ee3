//! End-to-end tests for the vnchat dialogue director.
//!
//! These exercise the full pipeline from story documents on disk through
//! prompt assembly, a scripted model, directive parsing and stage direction
//! to the serialized command stream.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use vnchat_config::DirectorConfig;
use vnchat_core::error::ProviderError;
use vnchat_core::message::Role;
use vnchat_core::provider::{ChatRequest, ChatResponse, Provider};
use vnchat_core::session::SessionClock;
use vnchat_core::transcript::TranscriptEntry;
use vnchat_core::{CommandKind, SceneCommand};
use vnchat_director::{StoryContext, TurnOutcome, TurnRequest, TurnRunner};

// ── Mock Provider ────────────────────────────────────────────────────────

/// Replays scripted replies and records every request.
struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> ChatRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        let content = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedProvider exhausted");
        Ok(ChatResponse {
            content,
            model,
            usage: None,
        })
    }
}

/// Simulates the host loading a save while the request is in flight.
struct SaveLoadingProvider {
    inner: ScriptedProvider,
    host_clock: SessionClock,
}

#[async_trait::async_trait]
impl Provider for SaveLoadingProvider {
    fn name(&self) -> &str {
        "e2e_save_loading"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let response = self.inner.complete(request).await;
        self.host_clock.invalidate();
        response
    }
}

// ── Story fixture ────────────────────────────────────────────────────────

fn write(dir: &Path, name: &str, value: Value) {
    std::fs::write(dir.join(name), serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

fn story() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "global.json",
        json!({
            "front_prompt": "You narrate a school story.",
            "format_prompt": "Tag speakers with <<<name>>>.",
            "back_prompt": "Continue.",
            "user_name": "Player",
            "model": "test/model",
            "API_max_trying_limit": 2
        }),
    );
    write(
        dir.path(),
        "controls.json",
        json!({
            "live2d_front_match": "{{",
            "live2d_back_match": "}}",
            "bg_front_match": "[bg:",
            "bg_back_match": "]",
            "bgm_front_match": "[bgm:",
            "bgm_back_match": "]",
            "scene_front_match": "[scene:",
            "scene_back_match": "]",
            "paragraph_spliter": "\n\n",
            "page_max_chars": 20,
            "bg_table": [
                { "key": "classroom", "value": "classroom.webp" },
                { "key": "roof", "value": "" }
            ],
            "bgm_table": [{ "key": "calm", "value": "calm.mp3" }],
            "scene_table": [{ "day1.txt": { "night": "day1_night.txt" } }],
            "figure_table": [
                {
                    "speaker": "Alice",
                    "default_live2d_path": "alice/model.json",
                    "refer_table": {
                        "smile": [{ "motion": "happy", "expression": "smile" }]
                    }
                },
                {
                    "speaker": "Bob",
                    "default_live2d_path": "bob/model.json",
                    "refer_table": {
                        "nod": [{ "motion": "nod", "expression": "calm" }]
                    }
                }
            ]
        }),
    );
    write(
        dir.path(),
        "alice.json",
        json!({ "data": { "name": "Alice", "description": "{{char}} is the class president." } }),
    );
    write(
        dir.path(),
        "lore.json",
        json!({ "entries": [
            { "id": 1, "keys": ["festival"], "content": "The festival is on Friday.", "position": 1 },
            { "id": 2, "keys": ["Friday"], "content": "Friday classes end at noon.", "position": 1 },
            { "id": 3, "keys": ["exam"], "content": "Exams are next month.", "position": 1 }
        ]}),
    );
    dir
}

fn commands(outcome: TurnOutcome) -> Vec<SceneCommand> {
    match outcome {
        TurnOutcome::Completed { commands, .. } => commands,
        TurnOutcome::Stale => panic!("unexpected stale turn"),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_two_turns_with_figures_and_music() {
    let dir = story();
    let context = StoryContext::from_dir(DirectorConfig::default(), dir.path()).unwrap();
    let provider = Arc::new(ScriptedProvider::new(&[
        "<<<Alice>>>{{Alice:smile}}[bg:classroom][bgm:calm]Good morning!",
        "",
        "<<<Alice|Bob>>>{{Alice:smile|Bob:nod}}[bgm:calm]Shall we go? It is getting late.[scene:night]",
    ]));
    let mut runner = TurnRunner::new(context, provider.clone()).with_seed(11);

    // Turn 1: one figure, centre stage.
    let first = commands(
        runner
            .run(&TurnRequest::new("Hi Alice"), &[], "day1.txt")
            .await
            .unwrap(),
    );
    let kinds: Vec<_> = first.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![
            CommandKind::Bgm,
            CommandKind::ChangeBg,
            CommandKind::ChangeFigure,
            CommandKind::Say
        ]
    );

    // Turn 2: the first reply is empty and retried; Bob joins and both
    // figures move aside, music repeats and is suppressed, pages are split
    // at 20 chars.
    let transcript = vec![
        TranscriptEntry::scripted("Player", "Hi Alice"),
        TranscriptEntry::generated("Alice", "Good morning!", "p1", "<<<Alice>>>Good morning!"),
    ];
    let second = commands(
        runner
            .run(&TurnRequest::new("Let's go"), &transcript, "day1.txt")
            .await
            .unwrap(),
    );
    assert_eq!(provider.calls(), 3);

    assert!(!second.iter().any(|c| c.kind == CommandKind::Bgm));
    let says: Vec<&str> = second
        .iter()
        .filter(|c| c.kind == CommandKind::Say)
        .map(|c| c.content.as_str())
        .collect();
    assert_eq!(says, vec!["Shall we go?", " It is getting late."]);
    assert_eq!(second.last().unwrap().kind, CommandKind::ChangeScene);
    assert_eq!(second.last().unwrap().content, "day1_night.txt");

    // Figures are re-sent for each page; moves only happen on the first.
    let transforms = second
        .iter()
        .filter(|c| c.kind == CommandKind::SetTransform)
        .count();
    assert_eq!(transforms, 2);
    let xs: Vec<f64> = runner
        .stage()
        .roster()
        .entities()
        .iter()
        .map(|e| e.position.x)
        .collect();
    assert_eq!(xs, vec![-300.0, 300.0]);

    // Speaker string joins both names.
    let say = second.iter().find(|c| c.kind == CommandKind::Say).unwrap();
    assert_eq!(
        say.get("speaker").map(ToString::to_string),
        Some("Alice|Bob".to_string())
    );
}

#[tokio::test]
async fn e2e_prompt_carries_recursive_lore_and_history() {
    let dir = story();
    let context = StoryContext::from_dir(DirectorConfig::default(), dir.path()).unwrap();
    let provider = Arc::new(ScriptedProvider::new(&["<<<Alice>>>Sure."]));
    let mut runner = TurnRunner::new(context, provider.clone()).with_seed(1);

    let transcript = vec![TranscriptEntry::scripted("Teacher", "Remember the festival.")];
    runner
        .run(&TurnRequest::new("What should we prepare?"), &transcript, "")
        .await
        .unwrap();

    let sent = provider.request(0);
    assert_eq!(sent.model, "test/model");
    let contents: Vec<&str> = sent.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec![
            "You narrate a school story.",
            "Tag speakers with <<<name>>>.",
            "Alice is the class president.",
            "The festival is on Friday.",
            "Friday classes end at noon.",
            "Teacher:Remember the festival.",
            "What should we prepare?",
            "Continue.",
        ]
    );
    assert_eq!(sent.messages[5].role, Role::System);
    assert_eq!(sent.messages[6].role, Role::User);
}

#[tokio::test]
async fn e2e_command_stream_serializes_as_bare_scalars() {
    let dir = story();
    let context = StoryContext::from_dir(DirectorConfig::default(), dir.path()).unwrap();
    let provider = Arc::new(ScriptedProvider::new(&[
        "<<<Alice>>>{{Alice:smile}}[bg:roof]Up here.",
    ]));
    let mut runner = TurnRunner::new(context, provider).with_seed(5);

    let outcome = runner
        .run(&TurnRequest::new("Where are you?"), &[], "")
        .await
        .unwrap();
    let value = serde_json::to_value(&outcome).unwrap();

    assert_eq!(value["status"], "completed");
    assert_eq!(value["auto_advance"], true);
    let stream = value["commands"].as_array().unwrap();

    // "roof" maps to an empty value, so no background command.
    assert_eq!(stream[0]["kind"], "changeFigure");
    assert_eq!(stream[0]["args"][2], json!({ "key": "next", "value": true }));
    assert_eq!(stream[0]["args"][4], json!({ "key": "id", "value": 0.0 }));
    assert_eq!(stream[1]["kind"], "say");
    assert_eq!(stream[1]["content"], "Up here.");
}

#[tokio::test]
async fn e2e_stale_turn_is_discarded() {
    let dir = story();
    let context = StoryContext::from_dir(DirectorConfig::default(), dir.path()).unwrap();
    let clock = SessionClock::new();
    let provider = Arc::new(SaveLoadingProvider {
        inner: ScriptedProvider::new(&["<<<Alice>>>{{Alice:smile}}Hello."]),
        host_clock: clock.clone(),
    });
    let mut runner = TurnRunner::new(context, provider)
        .with_seed(2)
        .with_clock(clock);

    let outcome = runner.run(&TurnRequest::new("Hi"), &[], "").await.unwrap();

    assert_eq!(outcome, TurnOutcome::Stale);
    assert!(runner.stage().roster().is_empty());
}
