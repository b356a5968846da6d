pub mod portal;

use std::{fmt, path::PathBuf};

use chrono::{DateTime, Local, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};

use portal::{
    Announcement, Child, ChildSchedule, ParentConversationSummary, PortalMessage,
    TeacherConversationSummary, UpcomingEvent,
};

pub const BOT_CONVERSATION_ID: &str = "bot";
pub const BOT_NAME: &str = "KinderCare Assistant";

/// Conversation identifier. The backend sends integers, the bot conversation
/// uses the reserved `"bot"` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn bot() -> Self {
        Self(BOT_CONVERSATION_ID.to_string())
    }

    pub fn is_bot(&self) -> bool {
        self.0 == BOT_CONVERSATION_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for ConversationId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for ConversationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(u64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(id) => Self::from(id),
            RawId::Text(id) => Self(id),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// Id assigned by the backend.
    Server(u64),
    /// Id of a message composed on this client (optimistic sends, bot replies).
    Local(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    Bot,
    Parent,
    Teacher,
    System,
}

impl SenderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderRole::Bot => "bot",
            SenderRole::Parent => "parent",
            SenderRole::Teacher => "teacher",
            SenderRole::System => "system",
        }
    }
}

/// The role of the signed-in user driving the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Parent,
    Teacher,
}

impl UserRole {
    pub fn sender(&self) -> SenderRole {
        match self {
            UserRole::Parent => SenderRole::Parent,
            UserRole::Teacher => SenderRole::Teacher,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Parent => write!(f, "parent"),
            UserRole::Teacher => write!(f, "teacher"),
        }
    }
}

/// Who sits on the other side of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantKind {
    Bot,
    Teacher,
    Parent,
}

impl ParticipantKind {
    pub fn avatar(&self) -> &'static str {
        match self {
            ParticipantKind::Bot => "🤖",
            ParticipantKind::Teacher => "👨‍🏫",
            ParticipantKind::Parent => "👤",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantKind::Bot => "bot",
            ParticipantKind::Teacher => "teacher",
            ParticipantKind::Parent => "parent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Video,
}

impl AttachmentKind {
    pub fn from_mime(mime: &str) -> Option<Self> {
        if mime.starts_with("image/") {
            Some(AttachmentKind::Image)
        } else if mime.starts_with("video/") {
            Some(AttachmentKind::Video)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub url: String,
    /// Local file backing a preview that has not been confirmed by the server.
    pub pending: Option<PathBuf>,
}

/// Inline affordance rendered below a message bubble.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    FaqMenu,
    TeacherPrompt,
    TeacherPicker,
    ChildPicker(Vec<Child>),
    Schedule(ChildSchedule),
    Announcements(Vec<Announcement>),
    Events(Vec<UpcomingEvent>),
    /// Placeholder shown while a bot reply is on its way.
    Typing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub sender: SenderRole,
    pub text: String,
    pub time: String,
    pub attachment: Option<Attachment>,
    pub inline: Option<Inline>,
}

impl Message {
    pub fn new(id: MessageId, sender: SenderRole, text: impl Into<String>) -> Self {
        Self {
            id,
            sender,
            text: text.into(),
            time: current_time(),
            attachment: None,
            inline: None,
        }
    }

    pub fn with_inline(mut self, inline: Inline) -> Self {
        self.inline = Some(inline);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn is_typing(&self) -> bool {
        matches!(self.inline, Some(Inline::Typing))
    }
}

impl From<PortalMessage> for Message {
    fn from(message: PortalMessage) -> Self {
        let attachment = message.attachment_url.and_then(|url| {
            let kind = message
                .attachment_type
                .as_deref()
                .and_then(AttachmentKind::from_mime)
                .unwrap_or(AttachmentKind::Image);
            (!url.is_empty()).then_some(Attachment {
                kind,
                url,
                pending: None,
            })
        });

        Self {
            id: MessageId::Server(message.id),
            sender: message.sender_role,
            text: message.message,
            time: display_time(&message.timestamp),
            attachment,
            inline: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: ConversationId,
    pub name: String,
    pub kind: ParticipantKind,
    /// Child the conversation is about, shown on teacher-side rows.
    pub child_name: Option<String>,
    /// Class section of the teacher, shown on parent-side rows.
    pub section: Option<String>,
    /// Backend id of the counterpart, used for profile lookups.
    pub counterpart_id: Option<u64>,
    pub unread: u32,
    pub last_message: String,
    pub last_time: String,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn bot(greeting: Message) -> Self {
        Self {
            id: ConversationId::bot(),
            name: BOT_NAME.to_string(),
            kind: ParticipantKind::Bot,
            child_name: None,
            section: None,
            counterpart_id: None,
            unread: 0,
            last_message: "Hello! How can I help you today?".to_string(),
            last_time: greeting.time.clone(),
            messages: vec![greeting],
        }
    }

    pub fn header_title(&self) -> String {
        match (self.kind, &self.section, &self.child_name) {
            (ParticipantKind::Teacher, Some(section), _) => format!("{} - {}", self.name, section),
            (ParticipantKind::Parent, _, Some(child)) => format!("{} ({})", self.name, child),
            _ => self.name.clone(),
        }
    }

    pub fn push(&mut self, message: Message) {
        if !message.is_typing() {
            if !message.text.is_empty() {
                self.last_message = message.text.clone();
            }
            self.last_time = message.time.clone();
        }
        self.messages.push(message);
    }

    pub fn remove_message(&mut self, id: MessageId) {
        self.messages.retain(|message| message.id != id);
    }

    pub fn remove_typing(&mut self) {
        self.messages.retain(|message| !message.is_typing());
    }

    pub fn is_typing(&self) -> bool {
        self.messages.iter().any(Message::is_typing)
    }
}

impl From<ParentConversationSummary> for Conversation {
    fn from(summary: ParentConversationSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.teacher_name,
            kind: ParticipantKind::Teacher,
            child_name: None,
            section: summary.section,
            counterpart_id: summary.teacher_id,
            unread: summary.unread_count.unwrap_or(0),
            last_message: summary
                .last_message
                .unwrap_or_else(|| "Start conversation".to_string()),
            last_time: summary
                .last_message_time
                .map(|time| display_time(&time))
                .unwrap_or_else(current_time),
            messages: Vec::new(),
        }
    }
}

impl From<TeacherConversationSummary> for Conversation {
    fn from(summary: TeacherConversationSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.parent_name,
            kind: ParticipantKind::Parent,
            child_name: summary.child_name,
            section: None,
            counterpart_id: summary.parent_id,
            unread: summary.unread_count.unwrap_or(0),
            last_message: summary
                .last_message
                .unwrap_or_else(|| "No messages".to_string()),
            last_time: summary
                .last_message_time
                .map(|time| display_time(&time))
                .unwrap_or_else(current_time),
            messages: Vec::new(),
        }
    }
}

pub fn current_time() -> String {
    Local::now().format("%I:%M %p").to_string()
}

/// Formats a backend ISO-8601 timestamp as a local wall-clock time, passing
/// through anything that does not parse.
pub fn display_time(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(time) => time.with_timezone(&Local).format("%I:%M %p").to_string(),
        Err(_) => timestamp.to_string(),
    }
}

pub fn display_date(date: &str) -> String {
    if let Ok(time) = DateTime::parse_from_rfc3339(date) {
        return time.with_timezone(&Local).format("%m/%d/%Y").to_string();
    }
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(day) => day.format("%m/%d/%Y").to_string(),
        Err(_) => date.to_string(),
    }
}
