//! Scene commands — the outbound contract handed to the renderer.
//!
//! Each command is a kind, a content string and an ordered list of
//! `{key, value}` arguments. The director never touches the renderer
//! directly; it returns `Vec<SceneCommand>` and the host applies it.

use serde::{Deserialize, Serialize};

/// The kind of presentation command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandKind {
    /// Show a line of dialogue
    Say,
    /// Switch the background image
    ChangeBg,
    /// Switch the background music
    Bgm,
    /// Jump to another scene file
    ChangeScene,
    /// Show, update or (with empty content) remove a figure
    ChangeFigure,
    /// Animate a figure's transform
    SetTransform,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Say => "say",
            CommandKind::ChangeBg => "changeBg",
            CommandKind::Bgm => "bgm",
            CommandKind::ChangeScene => "changeScene",
            CommandKind::ChangeFigure => "changeFigure",
            CommandKind::SetTransform => "setTransform",
        }
    }
}

/// An argument value. Serialized untagged so the wire form is a bare JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Flag(v)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        ArgValue::Number(v)
    }
}

impl From<u32> for ArgValue {
    fn from(v: u32) -> Self {
        ArgValue::Number(f64::from(v))
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        ArgValue::Text(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::Text(v.to_string())
    }
}

impl std::fmt::Display for ArgValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgValue::Flag(b) => write!(f, "{b}"),
            ArgValue::Number(n) => write!(f, "{n}"),
            ArgValue::Text(s) => f.write_str(s),
        }
    }
}

/// A single `{key, value}` argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandArg {
    pub key: String,
    pub value: ArgValue,
}

/// A typed presentation command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCommand {
    pub kind: CommandKind,
    pub content: String,
    #[serde(default)]
    pub args: Vec<CommandArg>,
}

impl SceneCommand {
    pub fn new(kind: CommandKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument (builder style).
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.args.push(CommandArg {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Look up the first argument with the given key.
    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.args.iter().find(|a| a.key == key).map(|a| &a.value)
    }
}
