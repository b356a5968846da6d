use crate::attachment::SelectedFile;
use crate::bot;
use crate::faq;
use crate::models::portal::{Announcement, Child, FaqEntry, Profile, Teacher, UpcomingEvent};
use crate::models::{Conversation, ConversationId, Inline, Message, MessageId, SenderRole, UserRole};

/// Panel dimension of the widget. A closed widget cannot hold an active
/// conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Panel {
    Closed,
    List,
    Detail(ConversationId),
}

impl Panel {
    pub fn is_open(&self) -> bool {
        !matches!(self, Panel::Closed)
    }

    pub fn active(&self) -> Option<&ConversationId> {
        match self {
            Panel::Detail(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Messages,
    Announcements,
    Events,
}

/// Data loaded on demand from the portal.
#[derive(Debug, Clone, PartialEq)]
pub enum Feed<T> {
    NotLoaded,
    Loading,
    Loaded(Vec<T>),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub role: UserRole,
    pub user_name: String,
    pub panel: Panel,
    pub tab: Tab,
    /// Unique by id; the bot conversation comes first in parent sessions.
    pub conversations: Vec<Conversation>,
    pub faqs: Vec<FaqEntry>,
    pub children: Vec<Child>,
    pub teachers: Feed<Teacher>,
    pub announcements: Feed<Announcement>,
    pub events: Feed<UpcomingEvent>,
    pub badge: u32,
    pub alert: Option<String>,
    pub profile: Option<Profile>,
    pub selected_file: Option<SelectedFile>,
    next_local_id: u64,
}

impl SessionState {
    pub fn new(role: UserRole, user_name: impl Into<String>) -> Self {
        let mut state = Self {
            role,
            user_name: user_name.into(),
            panel: Panel::Closed,
            tab: Tab::Messages,
            conversations: Vec::new(),
            faqs: faq::builtin_catalog(),
            children: Vec::new(),
            teachers: Feed::NotLoaded,
            announcements: Feed::NotLoaded,
            events: Feed::NotLoaded,
            badge: 0,
            alert: None,
            profile: None,
            selected_file: None,
            next_local_id: 1,
        };

        if role == UserRole::Parent {
            let id = state.next_message_id();
            let greeting =
                Message::new(id, SenderRole::Bot, bot::GREETING).with_inline(Inline::FaqMenu);
            state.conversations.push(Conversation::bot(greeting));
        }

        state
    }

    pub fn next_message_id(&mut self) -> MessageId {
        let id = self.next_local_id;
        self.next_local_id += 1;
        MessageId::Local(id)
    }

    pub fn conversation(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|conversation| &conversation.id == id)
    }

    pub fn conversation_mut(&mut self, id: &ConversationId) -> Option<&mut Conversation> {
        self.conversations
            .iter_mut()
            .find(|conversation| &conversation.id == id)
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.panel.active().and_then(|id| self.conversation(id))
    }

    pub fn unread_total(&self) -> u32 {
        self.conversations
            .iter()
            .map(|conversation| conversation.unread)
            .sum()
    }

    /// Appends a locally composed message. Returns false when the
    /// conversation no longer exists.
    pub fn append(
        &mut self,
        id: &ConversationId,
        sender: SenderRole,
        text: impl Into<String>,
        inline: Option<Inline>,
    ) -> bool {
        let message_id = self.next_message_id();
        let mut message = Message::new(message_id, sender, text);
        message.inline = inline;
        self.push(id, message)
    }

    pub fn push(&mut self, id: &ConversationId, message: Message) -> bool {
        match self.conversation_mut(id) {
            Some(conversation) => {
                conversation.push(message);
                true
            }
            None => false,
        }
    }

    /// Replaces every non-bot conversation with `fetched`, keeping the bot
    /// conversation and its transcript in first position.
    pub fn replace_conversations(&mut self, fetched: Vec<Conversation>) {
        let mut conversations: Vec<Conversation> = self
            .conversations
            .drain(..)
            .filter(|conversation| conversation.id.is_bot())
            .collect();

        for conversation in fetched {
            if conversations.iter().any(|existing| existing.id == conversation.id) {
                continue;
            }
            conversations.push(conversation);
        }

        self.conversations = conversations;
    }

    pub fn find_teacher(&self, teacher_id: u64) -> Option<&Teacher> {
        match &self.teachers {
            Feed::Loaded(teachers) => teachers.iter().find(|teacher| teacher.id == teacher_id),
            _ => None,
        }
    }
}
