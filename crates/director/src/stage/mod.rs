//! Stage direction — turns resolved directives into scene commands.
//!
//! The orchestrator owns all cross-turn presentation state: the figure
//! roster, the last background/music/scene/speaker emitted, and the ids
//! that tie dialogue pages back to the reply they came from.

pub mod roster;

pub use roster::{MAX_FIGURES, Point, Roster, ScreenEntity};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tracing::{debug, warn};
use uuid::Uuid;
use vnchat_config::{DirectorConfig, StageLayout};
use vnchat_core::command::{CommandKind, SceneCommand};

use crate::tables::Live2DFeature;

pub struct DialogueOrchestrator {
    layout: StageLayout,
    bg_allow_repeat: bool,
    bgm_allow_repeat: bool,
    scene_allow_repeat: bool,

    roster: Roster,
    last_background: Option<String>,
    last_bgm: Option<String>,
    last_scene: Option<String>,
    last_speaker: String,

    paragraph_id: String,
    sentence_id: String,
    rng: StdRng,
}

impl DialogueOrchestrator {
    pub fn new(config: &DirectorConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Deterministic figure placement and pose choice.
    pub fn with_seed(config: &DirectorConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(config: &DirectorConfig, rng: StdRng) -> Self {
        Self {
            layout: config.layout,
            bg_allow_repeat: config.background.allow_repeat,
            bgm_allow_repeat: config.bgm.allow_repeat,
            scene_allow_repeat: config.scene.allow_repeat,
            roster: Roster::new(),
            last_background: None,
            last_bgm: None,
            last_scene: None,
            last_speaker: String::new(),
            paragraph_id: String::new(),
            sentence_id: String::new(),
            rng,
        }
    }

    /// Pick up new layout and repeat settings; the roster and memos stay.
    pub fn reconfigure(&mut self, config: &DirectorConfig) {
        self.layout = config.layout;
        self.bg_allow_repeat = config.background.allow_repeat;
        self.bgm_allow_repeat = config.bgm.allow_repeat;
        self.scene_allow_repeat = config.scene.allow_repeat;
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn paragraph_id(&self) -> &str {
        &self.paragraph_id
    }

    pub fn sentence_id(&self) -> &str {
        &self.sentence_id
    }

    /// Start a new model reply.
    pub fn begin_paragraph(&mut self) {
        self.paragraph_id = Uuid::new_v4().to_string();
    }

    /// Start a new directive paragraph within the reply.
    pub fn begin_sentence(&mut self) {
        self.sentence_id = Uuid::new_v4().to_string();
    }

    /// Pick one of a trigger's features at random.
    pub fn choose_feature<'f>(&mut self, features: &'f [Live2DFeature]) -> Option<&'f Live2DFeature> {
        features.choose(&mut self.rng)
    }

    /// A dialogue page. An empty speaker repeats the previous one.
    pub fn say(&mut self, speaker: &str, full_reply: &str, page: &str) -> SceneCommand {
        let speaker = if speaker.trim().is_empty() {
            self.last_speaker.clone()
        } else {
            speaker.to_string()
        };

        let mut command = SceneCommand::new(CommandKind::Say, page);
        if !speaker.is_empty() {
            command = command.arg("speaker", speaker.as_str());
        }
        let command = command
            .arg("AiFullShowText", full_reply)
            .arg("AiShowTextUUIDForSentence", self.sentence_id.as_str())
            .arg("AiShowTextUUIDForParagraph", self.paragraph_id.as_str());

        self.last_speaker = speaker;
        command
    }

    pub fn background(&mut self, resolved: Option<&str>) -> Option<SceneCommand> {
        let value = Self::accept("background", resolved, &self.last_background, self.bg_allow_repeat)?;
        self.last_background = Some(value.to_string());
        Some(SceneCommand::new(CommandKind::ChangeBg, value).arg("next", true))
    }

    pub fn bgm(&mut self, resolved: Option<&str>) -> Option<SceneCommand> {
        let value = Self::accept("bgm", resolved, &self.last_bgm, self.bgm_allow_repeat)?;
        self.last_bgm = Some(value.to_string());
        Some(SceneCommand::new(CommandKind::Bgm, value).arg("next", true))
    }

    pub fn scene(&mut self, resolved: Option<&str>) -> Option<SceneCommand> {
        let value = Self::accept("scene", resolved, &self.last_scene, self.scene_allow_repeat)?;
        self.last_scene = Some(value.to_string());
        Some(SceneCommand::new(CommandKind::ChangeScene, value))
    }

    fn accept<'v>(
        channel: &str,
        resolved: Option<&'v str>,
        last: &Option<String>,
        allow_repeat: bool,
    ) -> Option<&'v str> {
        let Some(value) = resolved else {
            warn!(channel, "Nothing resolved, no command emitted");
            return None;
        };
        if !allow_repeat && last.as_deref() == Some(value) {
            debug!(channel, value, "Repeat suppressed");
            return None;
        }
        Some(value)
    }

    /// Show the figures named in one paragraph.
    ///
    /// `features[i]` is the pose for the character whose model is
    /// `default_paths[i]`. Figures not named are removed; new ones are added;
    /// everyone is laid out again and moved if their x changed.
    pub fn figures(
        &mut self,
        features: &[Live2DFeature],
        default_paths: &[String],
    ) -> Vec<SceneCommand> {
        if features.is_empty() || default_paths.is_empty() {
            warn!("No figures resolved, stage left unchanged");
            return Vec::new();
        }

        let mut commands = Vec::new();

        for id in self.roster.remove_absent(default_paths) {
            commands.push(
                SceneCommand::new(CommandKind::ChangeFigure, "")
                    .arg("id", id)
                    .arg("next", true),
            );
        }
        self.roster.add_missing(default_paths, &mut self.rng);
        self.roster.layout(&self.layout);

        for (feature, default_path) in features.iter().zip(default_paths) {
            let factor = self.layout.position_change_factor;
            let Some(entity) = self.roster.by_path_mut(default_path) else {
                warn!(path = %default_path, "Figure missing from roster after layout");
                continue;
            };

            let content = if feature.override_path.is_empty() {
                default_path.as_str()
            } else {
                feature.override_path.as_str()
            };
            let transform = entity.position.transform_json();

            commands.push(
                SceneCommand::new(CommandKind::ChangeFigure, content)
                    .arg("motion", feature.motion.as_str())
                    .arg("expression", feature.expression.as_str())
                    .arg("next", true)
                    .arg("transform", transform.as_str())
                    .arg("id", entity.id),
            );

            if entity.last_position.x != entity.position.x {
                let duration = factor * (entity.last_position.x - entity.position.x).abs();
                commands.push(
                    SceneCommand::new(CommandKind::SetTransform, transform)
                        .arg("target", entity.id)
                        .arg("next", true)
                        .arg("duration", duration),
                );
                entity.last_position = entity.position;
            }
        }

        debug!(
            on_stage = self.roster.len(),
            commands = commands.len(),
            "Figures dispatched"
        );
        commands
    }
}
