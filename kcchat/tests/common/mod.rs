#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use kcchat::api::PortalApi;
use kcchat::attachment::SelectedFile;
use kcchat::models::portal::*;
use kcchat::models::{ConversationId, ParticipantKind, SenderRole, UserRole};
use kcchat::widget::{Widget, WidgetConfig};

/// A message posted through the fake backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub conversation: String,
    pub text: String,
    pub attachment: Option<String>,
}

#[derive(Default)]
pub struct FakeState {
    pub children: Vec<Child>,
    pub schedules: HashMap<u64, ChildSchedule>,
    pub parent_conversations: Vec<ParentConversationSummary>,
    pub teacher_conversations: Vec<TeacherConversationSummary>,
    pub messages: HashMap<String, Vec<PortalMessage>>,
    pub bot_answer: Option<BotAnswer>,
    pub teachers: Vec<Teacher>,
    /// Server FAQ catalog; `None` answers 404.
    pub faqs: Option<Vec<FaqEntry>>,
    pub unread: u32,
    pub next_conversation: u64,
    /// Names of endpoints that fail.
    pub failing: HashSet<&'static str>,
    pub calls: Vec<String>,
    pub sent: Vec<Sent>,
    pub created: Vec<CreateConversationRequest>,
}

#[derive(Default)]
pub struct FakePortal {
    inner: Mutex<FakeState>,
}

impl FakePortal {
    pub fn new() -> Arc<Self> {
        let portal = FakePortal::default();
        portal.state().next_conversation = 100;
        Arc::new(portal)
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.inner.lock().unwrap()
    }

    pub fn calls_to(&self, endpoint: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.as_str() == endpoint)
            .count()
    }

    fn call(&self, endpoint: &'static str) -> Result<MutexGuard<'_, FakeState>> {
        let mut state = self.state();
        state.calls.push(endpoint.to_string());
        if state.failing.contains(endpoint) {
            bail!("{endpoint} failed with status 500");
        }
        Ok(state)
    }
}

#[async_trait]
impl PortalApi for FakePortal {
    async fn list_children(&self) -> Result<Vec<Child>> {
        Ok(self.call("children")?.children.clone())
    }

    async fn child_schedule(&self, child_id: u64) -> Result<ChildSchedule> {
        self.call("schedule")?
            .schedules
            .get(&child_id)
            .cloned()
            .ok_or_else(|| anyhow!("schedule failed with status 404"))
    }

    async fn recent_announcements(&self) -> Result<Vec<Announcement>> {
        self.call("announcements")?;
        Ok(vec![Announcement {
            id: 1,
            title: "Field trip".to_string(),
            content: "Bring a packed lunch.".to_string(),
            is_important: true,
            publish_date: "2025-03-01".to_string(),
            teacher_name: Some("Ms. Reyes".to_string()),
        }])
    }

    async fn upcoming_events(&self) -> Result<Vec<UpcomingEvent>> {
        self.call("events")?;
        Ok(vec![UpcomingEvent {
            id: 1,
            title: "Sports day".to_string(),
            description: "Wear comfortable clothes.".to_string(),
            event_type: None,
            date: "2025-04-10".to_string(),
            start_time: Some("09:00".to_string()),
            end_time: None,
            location: Some("Gym".to_string()),
        }])
    }

    async fn parent_conversations(&self) -> Result<Vec<ParentConversationSummary>> {
        Ok(self.call("conversations")?.parent_conversations.clone())
    }

    async fn teacher_conversations(&self) -> Result<Vec<TeacherConversationSummary>> {
        Ok(self.call("teacher-conversations")?.teacher_conversations.clone())
    }

    async fn conversation_messages(&self, id: &ConversationId) -> Result<Vec<PortalMessage>> {
        let mut state = self.call("messages")?;
        state.calls.push(format!("messages:{id}"));
        Ok(state.messages.get(id.as_str()).cloned().unwrap_or_default())
    }

    async fn send_message(
        &self,
        id: &ConversationId,
        message: &str,
        attachment: Option<&SelectedFile>,
    ) -> Result<Option<PortalMessage>> {
        let mut state = self.call("send")?;
        state.sent.push(Sent {
            conversation: id.to_string(),
            text: message.to_string(),
            attachment: attachment.map(|file| file.file_name.clone()),
        });

        let stored = PortalMessage {
            id: state.sent.len() as u64 + 1000,
            sender_role: SenderRole::Parent,
            message: message.to_string(),
            timestamp: "2025-01-10T08:00:00+00:00".to_string(),
            attachment_url: None,
            attachment_type: None,
        };
        state
            .messages
            .entry(id.to_string())
            .or_default()
            .push(stored.clone());
        Ok(Some(stored))
    }

    async fn create_conversation(
        &self,
        request: &CreateConversationRequest,
    ) -> Result<ConversationId> {
        let mut state = self.call("create")?;
        state.created.push(request.clone());
        state.next_conversation += 1;
        Ok(ConversationId::from(state.next_conversation))
    }

    async fn close_conversation(&self, _id: &ConversationId) -> Result<()> {
        self.call("close")?;
        Ok(())
    }

    async fn bot_search(&self, _query: &str) -> Result<BotAnswer> {
        self.call("bot-search")?
            .bot_answer
            .clone()
            .ok_or_else(|| anyhow!("bot-search failed with status 500"))
    }

    async fn available_teachers(&self) -> Result<Vec<Teacher>> {
        Ok(self.call("teachers")?.teachers.clone())
    }

    async fn unread_count(&self) -> Result<u32> {
        Ok(self.call("unread")?.unread)
    }

    async fn profile(&self, kind: ParticipantKind, id: u64) -> Result<Profile> {
        self.call("profile")?;
        Ok(Profile {
            id,
            name: format!("{} {id}", kind.as_str()),
            role: kind.as_str().to_string(),
            email: Some("someone@school.example".to_string()),
            phone: None,
            section: None,
            children: Vec::new(),
        })
    }

    async fn faq_catalog(&self) -> Result<Vec<FaqEntry>> {
        self.call("faqs")?
            .faqs
            .clone()
            .ok_or_else(|| anyhow!("faqs failed with status 404"))
    }
}

pub fn child(id: u64, name: &str) -> Child {
    Child {
        id,
        name: name.to_string(),
        grade_level: "K1".to_string(),
        section: "K1-A".to_string(),
    }
}

pub fn teacher_summary(id: u64, name: &str, unread: u32) -> ParentConversationSummary {
    ParentConversationSummary {
        id: ConversationId::from(id),
        teacher_name: name.to_string(),
        teacher_id: Some(id + 50),
        section: Some("K1-A".to_string()),
        unread_count: Some(unread),
        last_message: Some("See you tomorrow".to_string()),
        last_message_time: None,
    }
}

pub fn portal_message(id: u64, sender_role: SenderRole, text: &str) -> PortalMessage {
    PortalMessage {
        id,
        sender_role,
        message: text.to_string(),
        timestamp: "2025-01-10T08:00:00+00:00".to_string(),
        attachment_url: None,
        attachment_type: None,
    }
}

/// Widget with the default bot delays and background timers far enough away
/// not to interfere with a test.
pub fn widget(api: Arc<FakePortal>, role: UserRole) -> Widget<FakePortal> {
    let config = WidgetConfig {
        role,
        user_name: "Maria".to_string(),
        list_refresh: Duration::from_secs(3600),
        unread_poll: Duration::from_secs(3600),
        ..WidgetConfig::default()
    };
    Widget::new(api, config)
}
