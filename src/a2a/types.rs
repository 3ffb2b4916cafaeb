//! Messages, tasks and status events

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form extension metadata attached to messages and tasks
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key carrying the caller-supplied goal for a task
pub const GOAL_METADATA_KEY: &str = "goal";

/// Current time as an RFC 3339 UTC timestamp
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Fresh v4 UUID string, used for task, context and message ids
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Sender of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// Discriminator carried by every message on the wire (`"kind": "message"`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Message,
}

/// File payload of a file part, either inline bytes or a URI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Base64-encoded content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// One content part of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Metadata>,
    },
    File {
        file: FileContent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Metadata>,
    },
    Data {
        data: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Metadata>,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text {
            text: text.into(),
            metadata: None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text, .. } => Some(text),
            Part::File { .. } | Part::Data { .. } => None,
        }
    }
}

/// A single exchanged message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub kind: MessageKind,
    pub message_id: String,
    pub role: Role,
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Message {
    /// A user message with a single text part
    pub fn user_text(message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Message,
            message_id: message_id.into(),
            role: Role::User,
            parts: vec![Part::text(text)],
            task_id: None,
            context_id: None,
            metadata: None,
        }
    }

    /// An agent-authored text message bound to a task and context, with a fresh id
    pub fn agent_text(
        text: impl Into<String>,
        task_id: impl Into<String>,
        context_id: impl Into<String>,
    ) -> Self {
        Self {
            kind: MessageKind::Message,
            message_id: new_id(),
            role: Role::Agent,
            parts: vec![Part::text(text)],
            task_id: Some(task_id.into()),
            context_id: Some(context_id.into()),
            metadata: None,
        }
    }

    pub fn with_context(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value);
        self
    }

    /// Text segments of this message in order; non-text parts are skipped
    pub fn text_segments(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(Part::as_text)
    }

    /// All text parts joined with newlines
    pub fn text(&self) -> String {
        self.text_segments().collect::<Vec<_>>().join("\n")
    }

    /// String value of a metadata key, if present and a string
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        metadata_str(self.metadata.as_ref(), key)
    }
}

pub(crate) fn metadata_str<'a>(metadata: Option<&'a Metadata>, key: &str) -> Option<&'a str> {
    metadata?.get(key)?.as_str()
}

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Canceled,
    Failed,
    Unknown,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Submitted => "submitted",
            TaskState::Working => "working",
            TaskState::InputRequired => "input-required",
            TaskState::Completed => "completed",
            TaskState::Canceled => "canceled",
            TaskState::Failed => "failed",
            TaskState::Unknown => "unknown",
        }
    }

    /// States a turn may end in
    pub fn ends_turn(self) -> bool {
        !matches!(self, TaskState::Submitted | TaskState::Working)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time status of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    pub timestamp: String,
}

impl TaskStatus {
    pub fn now(state: TaskState, message: Option<Message>) -> Self {
        Self {
            state,
            message,
            timestamp: now_timestamp(),
        }
    }
}

/// One unit of requested work, belonging to exactly one context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default)]
    pub artifacts: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Task {
    /// Snapshot of a brand-new task seeded with its triggering message
    pub fn submitted(
        id: impl Into<String>,
        context_id: impl Into<String>,
        user_message: Message,
    ) -> Self {
        let metadata = user_message.metadata.clone();
        Self {
            id: id.into(),
            context_id: context_id.into(),
            status: TaskStatus::now(TaskState::Submitted, None),
            history: vec![user_message],
            artifacts: Vec::new(),
            metadata,
        }
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        metadata_str(self.metadata.as_ref(), key)
    }
}

/// Status change notification published to the event sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    pub task_id: String,
    pub context_id: String,
    pub status: TaskStatus,
    /// Marks the last event of the turn
    #[serde(rename = "final")]
    pub is_final: bool,
}

/// Everything the turn processor publishes to a sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AgentEvent {
    /// Full task snapshot, only at the start of a brand-new task
    Task(Task),
    StatusUpdate(TaskStatusUpdateEvent),
}

impl AgentEvent {
    pub fn is_final(&self) -> bool {
        match self {
            AgentEvent::Task(_) => false,
            AgentEvent::StatusUpdate(update) => update.is_final,
        }
    }

    pub fn task_id(&self) -> &str {
        match self {
            AgentEvent::Task(task) => &task.id,
            AgentEvent::StatusUpdate(update) => &update.task_id,
        }
    }

    pub fn state(&self) -> TaskState {
        match self {
            AgentEvent::Task(task) => task.status.state,
            AgentEvent::StatusUpdate(update) => update.status.state,
        }
    }
}
