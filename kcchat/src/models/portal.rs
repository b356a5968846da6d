use serde::{Deserialize, Serialize};

use super::{ConversationId, SenderRole};

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Child {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub grade_level: String,
    #[serde(default)]
    pub section: String,
}

impl Child {
    /// First name used on quick-reply buttons.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ChildSchedule {
    pub child_name: String,
    #[serde(default)]
    pub grade_level: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub schedule: Vec<ScheduleItem>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ScheduleItem {
    pub subject: String,
    pub teacher: String,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default = "default_room")]
    pub room: String,
}

fn default_room() -> String {
    "TBA".to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Announcement {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_important: bool,
    pub publish_date: String,
    #[serde(default)]
    pub teacher_name: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct UpcomingEvent {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub event_type: Option<String>,
    pub date: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ParentConversationSummary {
    pub id: ConversationId,
    pub teacher_name: String,
    #[serde(default)]
    pub teacher_id: Option<u64>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub unread_count: Option<u32>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_time: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TeacherConversationSummary {
    pub id: ConversationId,
    pub parent_name: String,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub child_name: Option<String>,
    #[serde(default)]
    pub unread_count: Option<u32>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub messages: Vec<PortalMessage>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PortalMessage {
    pub id: u64,
    pub sender_role: SenderRole,
    pub message: String,
    pub timestamp: String,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default)]
    pub attachment_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<PortalMessage>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CreateConversationRequest {
    pub teacher_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BotSearchRequest<'a> {
    pub query: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct BotSearchResponse {
    #[serde(default)]
    pub success: bool,
    pub response: BotAnswer,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BotAnswer {
    pub text: String,
    /// Set when no FAQ matched and the backend suggests talking to a teacher.
    #[serde(default)]
    pub suggest_chat: bool,
}

#[derive(Debug, Deserialize)]
pub struct TeachersResponse {
    #[serde(default)]
    pub teachers: Vec<Teacher>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Teacher {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub section: String,
}

#[derive(Debug, Deserialize)]
pub struct UnreadCount {
    pub count: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Profile {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FaqEntry {
    pub id: u64,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub category: String,
}
