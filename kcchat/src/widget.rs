//! The chat widget controller.
//!
//! [`Widget`] owns the whole session state and is the only place it is
//! mutated. User events are `&mut self` methods; timers and delayed bot
//! replies run as spawned tasks that hand their results back through a
//! channel, applied by [`Widget::next_completion`] or
//! [`Widget::drain_completions`]. Every result started from a detail view
//! carries a [`Ticket`] and is discarded once that view is gone.

mod action;
mod state;
mod tasks;

pub use action::QuickAction;
pub use state::{Feed, Panel, SessionState, Tab};
pub use tasks::{Completion, Handled, Ticket};

use std::{path::Path, sync::Arc, time::Duration};

use log::{debug, info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::api::PortalApi;
use crate::attachment::{self, AttachmentError};
use crate::bot::{self, BotReply};
use crate::faq;
use crate::models::portal::CreateConversationRequest;
use crate::models::{
    Conversation, ConversationId, Inline, Message, MessageId, ParticipantKind, SenderRole,
    UserRole,
};
use crate::render;
use tasks::{Tasks, spawn_interval};

#[derive(Debug, Clone)]
pub struct WidgetConfig {
    pub role: UserRole,
    pub user_name: String,
    /// Silent refresh of the open teacher/parent conversation.
    pub conversation_refresh: Duration,
    /// Conversation list reload while the list is shown.
    pub list_refresh: Duration,
    pub unread_poll: Duration,
    /// Simulated latency before a bot reply.
    pub typing_delay: Duration,
    /// Simulated latency before the answer of a selected FAQ.
    pub faq_delay: Duration,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        WidgetConfig {
            role: UserRole::Parent,
            user_name: "User".to_string(),
            conversation_refresh: Duration::from_secs(10),
            list_refresh: Duration::from_secs(30),
            unread_poll: Duration::from_secs(5),
            typing_delay: Duration::from_millis(1000),
            faq_delay: Duration::from_millis(500),
        }
    }
}

pub struct Widget<A: PortalApi + 'static> {
    api: Arc<A>,
    config: WidgetConfig,
    state: SessionState,
    /// Bumped on every entry into and exit from a detail view.
    generation: u64,
    tasks: Tasks,
    tx: UnboundedSender<Completion>,
    rx: UnboundedReceiver<Completion>,
    view: String,
    renders: u64,
}

impl<A: PortalApi + 'static> Widget<A> {
    pub fn new(api: Arc<A>, config: WidgetConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = SessionState::new(config.role, config.user_name.clone());
        let view = render::widget(&state);

        Self {
            api,
            config,
            state,
            generation: 0,
            tasks: Tasks::default(),
            tx,
            rx,
            view,
            renders: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Markup produced by the latest render.
    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn render_count(&self) -> u64 {
        self.renders
    }

    pub fn refresh_timer_active(&self) -> bool {
        self.tasks.has_refresh()
    }

    pub fn current_ticket(&self) -> Option<Ticket> {
        self.state.panel.active().map(|id| Ticket {
            conversation: id.clone(),
            generation: self.generation,
        })
    }

    fn is_current(&self, ticket: &Ticket) -> bool {
        self.current_ticket().as_ref() == Some(ticket)
    }

    fn render(&mut self) {
        self.view = render::widget(&self.state);
        self.renders += 1;
    }

    /// Loads the FAQ catalog, children and conversations, then starts the
    /// list-refresh and unread-poll timers.
    pub async fn start(&mut self) {
        self.load_faqs().await;
        if self.state.role == UserRole::Parent {
            self.load_children().await;
        }
        self.reload_conversations().await;

        if !self.tasks.has_background() {
            let list = spawn_interval(self.config.list_refresh, self.tx.clone(), || {
                Completion::ListRefreshDue
            });
            let unread = spawn_interval(self.config.unread_poll, self.tx.clone(), || {
                Completion::UnreadPollDue
            });
            self.tasks.push_background(list);
            self.tasks.push_background(unread);
        }

        info!(
            "chat widget started for {} ({}), {} conversations",
            self.state.user_name,
            self.state.role,
            self.state.conversations.len()
        );
    }

    async fn load_faqs(&mut self) {
        match self.api.faq_catalog().await {
            Ok(faqs) if !faqs.is_empty() => self.state.faqs = faqs,
            Ok(_) => debug!("server FAQ catalog is empty, keeping the built-in one"),
            Err(e) => {
                warn!("could not load FAQ catalog, using the built-in one: {e:#}");
                self.state.faqs = faq::builtin_catalog();
            }
        }
    }

    async fn load_children(&mut self) {
        match self.api.list_children().await {
            Ok(children) => self.state.children = children,
            Err(e) => warn!("could not load children: {e:#}"),
        }
    }

    pub fn open(&mut self) {
        if self.state.panel.is_open() {
            return;
        }
        self.state.panel = Panel::List;
        self.render();
    }

    pub fn toggle(&mut self) {
        if self.state.panel.is_open() {
            self.close();
        } else {
            self.open();
        }
    }

    pub fn close(&mut self) {
        if matches!(self.state.panel, Panel::Detail(_)) {
            self.leave_detail();
        }
        self.state.panel = Panel::Closed;
        self.render();
    }

    /// Returns from a conversation to the list and reloads the list.
    pub async fn back(&mut self) {
        if !matches!(self.state.panel, Panel::Detail(_)) {
            return;
        }
        self.leave_detail();
        self.state.panel = Panel::List;
        self.render();
        self.reload_conversations().await;
    }

    fn leave_detail(&mut self) {
        self.tasks.cancel_conversation_tasks();
        self.generation += 1;
        for conversation in &mut self.state.conversations {
            conversation.remove_typing();
        }
        self.state.profile = None;
    }

    pub async fn select_conversation(&mut self, id: &ConversationId) {
        if !self.state.panel.is_open() {
            debug!("ignoring selection of {id} while the widget is closed");
            return;
        }

        let Some(conversation) = self.state.conversation_mut(id) else {
            warn!("unknown conversation {id}");
            return;
        };
        conversation.unread = 0;
        let is_bot = conversation.kind == ParticipantKind::Bot;
        let needs_messages = !is_bot && conversation.messages.is_empty();

        if matches!(self.state.panel, Panel::Detail(_)) {
            self.leave_detail();
        }

        self.state.badge = self.state.unread_total();
        self.generation += 1;
        self.state.panel = Panel::Detail(id.clone());
        self.state.tab = Tab::Messages;
        self.render();

        if !is_bot {
            if needs_messages {
                self.refresh_messages(false).await;
            }
            self.start_refresh_timer();
        }
    }

    fn start_refresh_timer(&mut self) {
        let Some(ticket) = self.current_ticket() else {
            return;
        };
        let handle = spawn_interval(self.config.conversation_refresh, self.tx.clone(), move || {
            Completion::RefreshDue(ticket.clone())
        });
        self.tasks.set_refresh(handle);
    }

    /// Re-fetches the open transcript. A silent refresh only re-renders when
    /// the number of messages changed.
    pub async fn refresh_messages(&mut self, silent: bool) {
        let Some(id) = self.state.panel.active().cloned() else {
            return;
        };
        if id.is_bot() {
            return;
        }

        match self.api.conversation_messages(&id).await {
            Ok(messages) => {
                let Some(conversation) = self.state.conversation_mut(&id) else {
                    return;
                };
                let changed = conversation.messages.len() != messages.len();
                conversation.messages = messages.into_iter().map(Message::from).collect();
                if let Some(last) = conversation.messages.last() {
                    conversation.last_message = last.text.clone();
                    conversation.last_time = last.time.clone();
                }

                if changed || !silent {
                    self.render();
                }
            }
            Err(e) => {
                warn!("could not load messages of {id}: {e:#}");
                if !silent {
                    self.state.alert =
                        Some("Could not load messages. Please try again later.".to_string());
                    self.render();
                }
            }
        }
    }

    /// Replaces the conversation list with the server's and recomputes the
    /// unread badge. A failed fetch keeps the previous list.
    pub async fn reload_conversations(&mut self) {
        let fetched = match self.state.role {
            UserRole::Parent => self
                .api
                .parent_conversations()
                .await
                .map(|list| list.into_iter().map(Conversation::from).collect::<Vec<_>>()),
            UserRole::Teacher => self
                .api
                .teacher_conversations()
                .await
                .map(|list| list.into_iter().map(Conversation::from).collect::<Vec<_>>()),
        };

        match fetched {
            Ok(conversations) => {
                debug!("loaded {} conversations", conversations.len());
                self.state.replace_conversations(conversations);
                self.state.badge = self.state.unread_total();
            }
            Err(e) => warn!("could not load conversations: {e:#}"),
        }

        self.render();
    }

    pub async fn poll_unread(&mut self) {
        match self.api.unread_count().await {
            Ok(count) if count != self.state.badge => {
                self.state.badge = count;
                self.render();
            }
            Ok(_) => {}
            Err(e) => debug!("could not poll unread count: {e:#}"),
        }
    }

    /// Sends `text` in the open conversation with an optimistic local append.
    pub async fn send(&mut self, text: &str) {
        let text = text.trim();
        let Some(ticket) = self.current_ticket() else {
            debug!("no open conversation to send to");
            return;
        };
        let is_bot = ticket.conversation.is_bot();

        if text.is_empty() && (is_bot || self.state.selected_file.is_none()) {
            return;
        }

        let attachment = if is_bot {
            None
        } else {
            self.state.selected_file.take()
        };

        let id = self.state.next_message_id();
        let mut message = Message::new(id, self.state.role.sender(), text);
        if let Some(file) = &attachment {
            message = message.with_attachment(file.preview());
        }
        self.state.push(&ticket.conversation, message);
        self.render();

        if is_bot {
            let placeholder = self.show_typing(&ticket.conversation);

            let api = Arc::clone(&self.api);
            let tx = self.tx.clone();
            let delay = self.config.typing_delay;
            let children = self.state.children.clone();
            let text = text.to_string();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let reply = bot::respond(api.as_ref(), &text, &children).await;
                let _ = tx.send(Completion::BotReply {
                    ticket,
                    placeholder: Some(placeholder),
                    reply,
                });
            });
            self.tasks.push_scoped(handle);
            return;
        }

        match self
            .api
            .send_message(&ticket.conversation, text, attachment.as_ref())
            .await
        {
            Ok(_) => debug!("message sent to {}", ticket.conversation),
            Err(e) => {
                warn!("could not send message to {}: {e:#}", ticket.conversation);
                self.state.alert = Some("Could not send your message. Please try again.".to_string());
                self.render();
            }
        }
    }

    pub async fn dispatch(&mut self, action: QuickAction) {
        let Some(ticket) = self.current_ticket() else {
            debug!("ignoring {action} without an open conversation");
            return;
        };

        match action {
            QuickAction::SelectFaq(faq_id) => self.select_faq(ticket, faq_id),
            QuickAction::AcceptTeacher => self.accept_teacher(&ticket).await,
            QuickAction::DeclineTeacher => {
                self.state.append(
                    &ticket.conversation,
                    SenderRole::Bot,
                    bot::DECLINE_REPLY,
                    Some(Inline::FaqMenu),
                );
                self.render();
            }
            QuickAction::SelectTeacher(teacher_id) => self.select_teacher(teacher_id).await,
            QuickAction::ShowSchedule(child_id) => {
                let placeholder = self.show_typing(&ticket.conversation);

                let api = Arc::clone(&self.api);
                let tx = self.tx.clone();
                let handle = tokio::spawn(async move {
                    let reply = bot::schedule_reply(api.as_ref(), child_id).await;
                    let _ = tx.send(Completion::BotReply {
                        ticket,
                        placeholder: Some(placeholder),
                        reply,
                    });
                });
                self.tasks.push_scoped(handle);
            }
        }
    }

    /// Adds a typing placeholder owned by one pending bot reply.
    fn show_typing(&mut self, id: &ConversationId) -> MessageId {
        let placeholder = self.state.next_message_id();
        let message = Message::new(placeholder, SenderRole::Bot, "").with_inline(Inline::Typing);
        self.state.push(id, message);
        self.render();
        placeholder
    }

    /// Echoes the stored question, then answers it after the simulated delay
    /// without asking the server.
    fn select_faq(&mut self, ticket: Ticket, faq_id: u64) {
        let Some(entry) = faq::find(&self.state.faqs, faq_id).cloned() else {
            warn!("unknown FAQ {faq_id}");
            return;
        };

        let sender = self.state.role.sender();
        self.state
            .append(&ticket.conversation, sender, entry.question, None);
        self.render();

        let answer = entry.answer;
        let tx = self.tx.clone();
        let delay = self.config.faq_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let reply = BotReply::with(answer, Inline::FaqMenu);
            let _ = tx.send(Completion::BotReply {
                ticket,
                placeholder: None,
                reply,
            });
        });
        self.tasks.push_scoped(handle);
    }

    async fn accept_teacher(&mut self, ticket: &Ticket) {
        self.state.append(
            &ticket.conversation,
            SenderRole::Bot,
            bot::TEACHER_PICKER_INTRO,
            Some(Inline::TeacherPicker),
        );
        self.state.teachers = Feed::Loading;
        self.render();

        self.state.teachers = match self.api.available_teachers().await {
            Ok(teachers) => Feed::Loaded(teachers),
            Err(e) => {
                warn!("could not load teachers: {e:#}");
                Feed::Failed("Could not load teachers. Please try again later.".to_string())
            }
        };
        self.render();
    }

    async fn select_teacher(&mut self, teacher_id: u64) {
        let Some(teacher) = self.state.find_teacher(teacher_id).cloned() else {
            warn!("teacher {teacher_id} is not in the picker");
            return;
        };

        let child_id = match self.state.children.as_slice() {
            [child] => Some(child.id),
            _ => None,
        };
        let request = CreateConversationRequest {
            teacher_id,
            child_id,
        };

        let id = match self.api.create_conversation(&request).await {
            Ok(id) => id,
            Err(e) => {
                warn!("could not create conversation with {}: {e:#}", teacher.name);
                self.state.alert = Some(format!(
                    "Could not start a conversation with {}. Please try again.",
                    teacher.name
                ));
                self.render();
                return;
            }
        };
        info!("started conversation {id} with {}", teacher.name);

        let message_id = self.state.next_message_id();
        let greeting = Message::new(
            message_id,
            SenderRole::System,
            bot::connected_message(&teacher.name),
        );
        // Reopened conversations load their history before the greeting.
        if self.state.conversation(&id).is_some() {
            self.select_conversation(&id).await;
            self.state.push(&id, greeting);
            self.render();
            return;
        }

        self.state.conversations.push(Conversation {
            id: id.clone(),
            name: teacher.name.clone(),
            kind: ParticipantKind::Teacher,
            child_name: None,
            section: (!teacher.section.is_empty()).then(|| teacher.section.clone()),
            counterpart_id: Some(teacher.id),
            unread: 0,
            last_message: "Conversation started".to_string(),
            last_time: greeting.time.clone(),
            messages: vec![greeting],
        });

        self.select_conversation(&id).await;
    }

    /// Validates a local file and keeps it for the next send. A rejected file
    /// clears any previous selection.
    pub async fn attach(&mut self, path: &Path) -> Result<(), AttachmentError> {
        match attachment::inspect(path).await {
            Ok(file) => {
                info!("attached {} ({} bytes)", file.file_name, file.size);
                self.state.selected_file = Some(file);
                self.render();
                Ok(())
            }
            Err(e) => {
                warn!("rejected attachment {}: {e}", path.display());
                self.state.selected_file = None;
                self.state.alert = Some(e.to_string());
                self.render();
                Err(e)
            }
        }
    }

    pub fn clear_attachment(&mut self) {
        if self.state.selected_file.take().is_some() {
            self.render();
        }
    }

    /// Ends the open live conversation on the server and returns to the list.
    pub async fn end_conversation(&mut self) {
        let Some(id) = self.state.panel.active().cloned() else {
            return;
        };
        if id.is_bot() {
            return;
        }

        match self.api.close_conversation(&id).await {
            Ok(()) => {
                info!("closed conversation {id}");
                self.back().await;
            }
            Err(e) => {
                warn!("could not close conversation {id}: {e:#}");
                self.state.alert =
                    Some("Could not end the conversation. Please try again.".to_string());
                self.render();
            }
        }
    }

    pub async fn show_tab(&mut self, tab: Tab) {
        self.state.tab = tab;
        match tab {
            Tab::Messages => self.render(),
            Tab::Announcements => {
                self.state.announcements = Feed::Loading;
                self.render();
                self.state.announcements = match self.api.recent_announcements().await {
                    Ok(items) => Feed::Loaded(items),
                    Err(e) => {
                        warn!("could not load announcements: {e:#}");
                        Feed::Failed("Error loading announcements.".to_string())
                    }
                };
                self.render();
            }
            Tab::Events => {
                self.state.events = Feed::Loading;
                self.render();
                self.state.events = match self.api.upcoming_events().await {
                    Ok(items) => Feed::Loaded(items),
                    Err(e) => {
                        warn!("could not load events: {e:#}");
                        Feed::Failed("Error loading events.".to_string())
                    }
                };
                self.render();
            }
        }
    }

    /// Shows the profile of the person on the other side of the open conversation.
    pub async fn show_profile(&mut self) {
        let Some((kind, counterpart)) = self
            .state
            .active_conversation()
            .and_then(|conversation| Some((conversation.kind, conversation.counterpart_id?)))
        else {
            return;
        };

        match self.api.profile(kind, counterpart).await {
            Ok(profile) => self.state.profile = Some(profile),
            Err(e) => {
                warn!("could not load profile {counterpart}: {e:#}");
                self.state.alert = Some("Could not load profile.".to_string());
            }
        }
        self.render();
    }

    pub fn dismiss_profile(&mut self) {
        if self.state.profile.take().is_some() {
            self.render();
        }
    }

    pub fn dismiss_alert(&mut self) {
        if self.state.alert.take().is_some() {
            self.render();
        }
    }

    /// Waits for the next timer or background result without applying it.
    /// Cancel safe, so it can be raced against user input.
    pub async fn recv_completion(&mut self) -> Option<Completion> {
        self.rx.recv().await
    }

    /// Waits for the next timer or background result and applies it.
    pub async fn next_completion(&mut self) -> Handled {
        match self.recv_completion().await {
            Some(completion) => self.apply(completion).await,
            None => Handled::Ignored,
        }
    }

    /// Applies every result that is already waiting. Returns how many were applied.
    pub async fn drain_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            if self.apply(completion).await == Handled::Applied {
                applied += 1;
            }
        }
        applied
    }

    pub async fn apply(&mut self, completion: Completion) -> Handled {
        match completion {
            Completion::BotReply {
                ticket,
                placeholder,
                reply,
            } => {
                if !self.is_current(&ticket) {
                    debug!("discarding stale reply for {}", ticket.conversation);
                    return Handled::Stale;
                }
                let Some(conversation) = self.state.conversation_mut(&ticket.conversation) else {
                    return Handled::Stale;
                };
                if let Some(placeholder) = placeholder {
                    conversation.remove_message(placeholder);
                }
                self.state
                    .append(&ticket.conversation, SenderRole::Bot, reply.text, reply.inline);
                self.render();
                Handled::Applied
            }
            Completion::RefreshDue(ticket) => {
                if !self.is_current(&ticket) {
                    return Handled::Stale;
                }
                self.refresh_messages(true).await;
                Handled::Applied
            }
            Completion::ListRefreshDue => {
                if self.state.panel != Panel::List {
                    return Handled::Ignored;
                }
                self.reload_conversations().await;
                Handled::Applied
            }
            Completion::UnreadPollDue => {
                self.poll_unread().await;
                Handled::Applied
            }
        }
    }
}
