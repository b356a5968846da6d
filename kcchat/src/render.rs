//! HTML rendering of the widget. Every function here is pure: it reads the
//! session state and returns markup.

use crate::models::portal::{Announcement, ChildSchedule, Profile, Teacher, UpcomingEvent};
use crate::models::{AttachmentKind, Conversation, Inline, Message, SenderRole, display_date};
use crate::widget::{Feed, Panel, SessionState, Tab};

const ANNOUNCEMENT_PREVIEW_CHARS: usize = 100;
const EVENT_PREVIEW_CHARS: usize = 80;

pub fn widget(state: &SessionState) -> String {
    let mut html = String::from("<div class=\"kc-chat-widget\">");
    html.push_str(&format!(
        "<button class=\"kc-chat-button\" data-action=\"toggle\">💬{}</button>",
        badge(state.badge)
    ));

    if state.panel.is_open() {
        html.push_str("<div class=\"kc-chat-window\">");
        html.push_str(&header(state));
        html.push_str(&tabs(state.tab));
        html.push_str(&body(state));
        html.push_str("</div>");
    }

    if let Some(text) = &state.alert {
        html.push_str(&alert(text));
    }
    if let Some(profile) = &state.profile {
        html.push_str(&profile_modal(profile));
    }

    html.push_str("</div>");
    html
}

/// Unread badge, omitted when nothing is unread.
pub fn badge(count: u32) -> String {
    if count == 0 {
        String::new()
    } else {
        format!("<span class=\"kc-unread-badge\">{count}</span>")
    }
}

pub fn header_title(state: &SessionState) -> String {
    match state.active_conversation() {
        Some(conversation) => conversation.header_title(),
        None => "Messages".to_string(),
    }
}

fn header(state: &SessionState) -> String {
    let back = if matches!(state.panel, Panel::Detail(_)) {
        "<button class=\"kc-back-btn\" data-action=\"back\">←</button>"
    } else {
        ""
    };
    let end = match state.active_conversation() {
        Some(conversation) if !conversation.id.is_bot() => {
            "<button class=\"kc-end-btn\" data-action=\"end\">End</button>"
        }
        _ => "",
    };

    format!(
        "<div class=\"kc-chat-header\"><div class=\"kc-chat-header-left\">{back}<span class=\"kc-chat-title\">{}</span></div>{end}<button class=\"kc-close-btn\" data-action=\"close\">×</button></div>",
        escape(&header_title(state))
    )
}

fn tabs(active: Tab) -> String {
    let mut html = String::from("<div class=\"kc-tabs\">");
    for (tab, token, label) in [
        (Tab::Messages, "messages", "Messages"),
        (Tab::Announcements, "announcements", "Announcements"),
        (Tab::Events, "events", "Events"),
    ] {
        let class = if tab == active { "kc-tab active" } else { "kc-tab" };
        html.push_str(&format!(
            "<button class=\"{class}\" data-action=\"tab:{token}\">{label}</button>"
        ));
    }
    html.push_str("</div>");
    html
}

fn body(state: &SessionState) -> String {
    match state.tab {
        Tab::Announcements => announcements(&state.announcements),
        Tab::Events => events(&state.events),
        Tab::Messages => match state.active_conversation() {
            Some(conversation) => transcript(conversation, state),
            None => conversation_list(state),
        },
    }
}

pub fn conversation_list(state: &SessionState) -> String {
    if state.conversations.is_empty() {
        return "<div class=\"kc-conversation-list\"><div class=\"kc-empty-state\">No conversations yet</div></div>".to_string();
    }

    let mut html = String::from("<div class=\"kc-conversation-list\">");
    for conversation in &state.conversations {
        html.push_str(&conversation_row(conversation));
    }
    html.push_str("</div>");
    html
}

fn conversation_row(conversation: &Conversation) -> String {
    let name = match &conversation.child_name {
        Some(child) => format!("{} ({})", conversation.name, child),
        None => conversation.name.clone(),
    };
    let unread = if conversation.unread > 0 {
        format!(
            "<span class=\"kc-conv-unread\">{}</span>",
            conversation.unread
        )
    } else {
        String::new()
    };

    format!(
        "<div class=\"kc-conversation-item\" data-action=\"select:{}\"><div class=\"kc-conv-avatar\">{}</div><div class=\"kc-conv-info\"><div class=\"kc-conv-name\">{}</div><div class=\"kc-conv-last-message\">{}</div></div><div class=\"kc-conv-time\">{}</div>{unread}</div>",
        escape(conversation.id.as_str()),
        conversation.kind.avatar(),
        escape(&name),
        escape(&conversation.last_message),
        escape(&conversation.last_time),
    )
}

pub fn transcript(conversation: &Conversation, state: &SessionState) -> String {
    let mut html = String::from("<div class=\"kc-messages-container\">");
    for message in &conversation.messages {
        html.push_str(&self::message(message, state));
    }
    html.push_str("</div>");
    html.push_str(&composer(state));
    html
}

fn composer(state: &SessionState) -> String {
    let preview = match &state.selected_file {
        Some(file) => format!(
            "<div class=\"kc-attachment-preview\">{}<button data-action=\"detach\">×</button></div>",
            escape(&file.file_name)
        ),
        None => String::new(),
    };

    format!(
        "{preview}<div class=\"kc-message-input-container\"><input class=\"kc-message-input\" placeholder=\"Type your message...\"><button class=\"kc-send-btn\" data-action=\"send\">Send</button></div>"
    )
}

pub fn message(message: &Message, state: &SessionState) -> String {
    if message.is_typing() {
        return "<div class=\"kc-message kc-bot\"><div class=\"kc-typing-indicator\"><span></span><span></span><span></span></div></div>".to_string();
    }

    let sender = message.sender.as_str();
    let mut bubble = escape(&message.text);
    if let Some(attachment) = &message.attachment {
        let url = escape(&attachment.url);
        bubble.push_str(&match attachment.kind {
            AttachmentKind::Image => {
                format!("<img class=\"kc-attachment\" src=\"{url}\" alt=\"attachment\">")
            }
            AttachmentKind::Video => {
                format!("<video class=\"kc-attachment\" src=\"{url}\" controls></video>")
            }
        });
    }

    let extra = match &message.inline {
        Some(affordance) => inline(affordance, state),
        None => String::new(),
    };

    format!(
        "<div class=\"kc-message kc-{sender}\"><div class=\"kc-message-sender kc-{sender}\">{}</div><div class=\"kc-message-bubble\">{bubble}</div><div class=\"kc-message-time\">{}</div>{extra}</div>",
        sender_label(message.sender, state),
        escape(&message.time),
    )
}

fn sender_label(sender: SenderRole, state: &SessionState) -> String {
    match sender {
        SenderRole::Bot => "KinderCare Assistant".to_string(),
        SenderRole::System => "System".to_string(),
        role if role == state.role.sender() => "You".to_string(),
        SenderRole::Parent => "Parent".to_string(),
        SenderRole::Teacher => "Teacher".to_string(),
    }
}

/// Quick replies and cards attached below a bot message. Buttons carry the
/// action token understood by `QuickAction`.
pub fn inline(affordance: &Inline, state: &SessionState) -> String {
    match affordance {
        Inline::FaqMenu => {
            let mut html = String::from("<div class=\"kc-faq-options\">");
            for entry in &state.faqs {
                html.push_str(&format!(
                    "<button class=\"kc-faq-button\" data-action=\"faq:{}\">{}</button>",
                    entry.id,
                    escape(&entry.question)
                ));
            }
            html.push_str("</div>");
            html
        }
        Inline::TeacherPrompt => "<div class=\"kc-teacher-prompt\"><div class=\"kc-teacher-prompt-buttons\"><button class=\"kc-btn-yes\" data-action=\"teacher-yes\">Yes</button><button class=\"kc-btn-no\" data-action=\"teacher-no\">No</button></div></div>".to_string(),
        Inline::TeacherPicker => teacher_picker(&state.teachers),
        Inline::ChildPicker(children) => {
            let mut html = String::from("<div class=\"kc-child-options\">");
            for child in children {
                html.push_str(&format!(
                    "<button class=\"kc-child-button\" data-action=\"schedule:{}\">{}</button>",
                    child.id,
                    escape(child.first_name())
                ));
            }
            html.push_str("</div>");
            html
        }
        Inline::Schedule(schedule) => self::schedule(schedule),
        Inline::Announcements(items) => announcement_cards(items),
        Inline::Events(items) => event_cards(items),
        Inline::Typing => String::new(),
    }
}

fn teacher_picker(teachers: &Feed<Teacher>) -> String {
    let options = match teachers {
        Feed::NotLoaded | Feed::Loading => {
            "<div class=\"kc-empty-state\">Loading teachers...</div>".to_string()
        }
        Feed::Failed(reason) => format!("<div class=\"kc-error\">{}</div>", escape(reason)),
        Feed::Loaded(list) if list.is_empty() => {
            "<div class=\"kc-empty-state\">No teachers available</div>".to_string()
        }
        Feed::Loaded(list) => list
            .iter()
            .map(|teacher| {
                format!(
                    "<button class=\"kc-teacher-option\" data-action=\"teacher:{}\"><span class=\"kc-teacher-name\">{}</span><span class=\"kc-teacher-section\">{}</span></button>",
                    teacher.id,
                    escape(&teacher.name),
                    escape(&teacher.section)
                )
            })
            .collect(),
    };

    format!("<div class=\"kc-teacher-select\">{options}</div>")
}

pub fn schedule(schedule: &ChildSchedule) -> String {
    let mut html = format!(
        "<div class=\"kc-schedule\"><div class=\"kc-schedule-title\">{} ({} - {})</div>",
        escape(&schedule.child_name),
        escape(&schedule.grade_level),
        escape(&schedule.section)
    );

    if schedule.schedule.is_empty() {
        html.push_str("<div class=\"kc-empty-state\">No classes scheduled.</div>");
    }
    for item in &schedule.schedule {
        html.push_str(&format!(
            "<div class=\"kc-schedule-item\"><strong>{}</strong><div>Teacher: {}</div><div>Time: {}</div><div>Room: {}</div></div>",
            escape(&item.subject),
            escape(&item.teacher),
            escape(item.schedule.as_deref().unwrap_or("TBA")),
            escape(&item.room)
        ));
    }

    html.push_str("</div>");
    html
}

pub fn announcements(feed: &Feed<Announcement>) -> String {
    match feed {
        Feed::NotLoaded | Feed::Loading => loading(),
        Feed::Failed(reason) => error_state(reason),
        Feed::Loaded(items) if items.is_empty() => {
            "<div class=\"kc-empty-state\">No announcements yet.</div>".to_string()
        }
        Feed::Loaded(items) => announcement_cards(items),
    }
}

fn announcement_cards(items: &[Announcement]) -> String {
    let mut html = String::from("<div class=\"kc-feed\">");
    for item in items {
        let important = if item.is_important {
            "<span class=\"kc-important\">Important</span>"
        } else {
            ""
        };
        let author = item
            .teacher_name
            .as_deref()
            .map(|name| format!(" · {}", escape(name)))
            .unwrap_or_default();
        html.push_str(&format!(
            "<div class=\"kc-feed-card\">{important}<div class=\"kc-feed-title\">{}</div><div class=\"kc-feed-body\">{}</div><div class=\"kc-feed-meta\">{}{author}</div></div>",
            escape(&item.title),
            escape(&truncate(&item.content, ANNOUNCEMENT_PREVIEW_CHARS)),
            escape(&display_date(&item.publish_date)),
        ));
    }
    html.push_str("</div>");
    html
}

pub fn events(feed: &Feed<UpcomingEvent>) -> String {
    match feed {
        Feed::NotLoaded | Feed::Loading => loading(),
        Feed::Failed(reason) => error_state(reason),
        Feed::Loaded(items) if items.is_empty() => {
            "<div class=\"kc-empty-state\">No upcoming events.</div>".to_string()
        }
        Feed::Loaded(items) => event_cards(items),
    }
}

fn event_cards(items: &[UpcomingEvent]) -> String {
    let mut html = String::from("<div class=\"kc-feed\">");
    for item in items {
        let time = match (&item.start_time, &item.end_time) {
            (Some(start), Some(end)) => format!(" {start} - {end}"),
            (Some(start), None) => format!(" {start}"),
            _ => String::new(),
        };
        let location = item
            .location
            .as_deref()
            .map(|place| format!("<div class=\"kc-feed-meta\">📍 {}</div>", escape(place)))
            .unwrap_or_default();
        html.push_str(&format!(
            "<div class=\"kc-feed-card\"><div class=\"kc-feed-title\">{}</div><div class=\"kc-feed-meta\">📅 {}{}</div>{location}<div class=\"kc-feed-body\">{}</div></div>",
            escape(&item.title),
            escape(&display_date(&item.date)),
            escape(&time),
            escape(&truncate(&item.description, EVENT_PREVIEW_CHARS)),
        ));
    }
    html.push_str("</div>");
    html
}

fn loading() -> String {
    "<div class=\"kc-empty-state\">Loading...</div>".to_string()
}

fn error_state(reason: &str) -> String {
    format!("<div class=\"kc-error\">{}</div>", escape(reason))
}

pub fn profile_modal(profile: &Profile) -> String {
    let mut rows = format!("<div class=\"kc-profile-role\">{}</div>", escape(&profile.role));
    for (label, value) in [
        ("Email", &profile.email),
        ("Phone", &profile.phone),
        ("Section", &profile.section),
    ] {
        if let Some(value) = value {
            rows.push_str(&format!(
                "<div class=\"kc-profile-row\"><span>{label}</span> {}</div>",
                escape(value)
            ));
        }
    }
    if !profile.children.is_empty() {
        rows.push_str(&format!(
            "<div class=\"kc-profile-row\"><span>Children</span> {}</div>",
            escape(&profile.children.join(", "))
        ));
    }

    format!(
        "<div class=\"kc-profile-modal\"><div class=\"kc-profile-name\">{}</div>{rows}<button data-action=\"dismiss-profile\">Close</button></div>",
        escape(&profile.name)
    )
}

pub fn alert(text: &str) -> String {
    format!(
        "<div class=\"kc-alert\" role=\"alert\">{}<button data-action=\"dismiss\">×</button></div>",
        escape(text)
    )
}

/// Shortens `text` to `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::portal::ScheduleItem;
    use crate::models::{ConversationId, UserRole};

    #[test]
    fn test_escape_markup() {
        assert_eq!(
            escape("<b>\"Tom & Jerry\"</b>"),
            "&lt;b&gt;&quot;Tom &amp; Jerry&quot;&lt;/b&gt;"
        );
        assert_eq!(escape("it's"), "it's");
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ñandú ñandú", 5), "ñandú...");
    }

    #[test]
    fn test_badge_hidden_when_zero() {
        assert_eq!(badge(0), "");
        assert!(badge(4).contains(">4<"));
    }

    #[test]
    fn test_closed_widget_renders_only_button() {
        let state = SessionState::new(UserRole::Parent, "Maria");
        let html = widget(&state);

        assert!(html.contains("kc-chat-button"));
        assert!(!html.contains("kc-chat-window"));
    }

    #[test]
    fn test_list_view_title_and_rows() {
        let mut state = SessionState::new(UserRole::Parent, "Maria");
        state.panel = Panel::List;
        let html = widget(&state);

        assert_eq!(header_title(&state), "Messages");
        assert!(html.contains("data-action=\"select:bot\""));
        assert!(html.contains("KinderCare Assistant"));
    }

    #[test]
    fn test_detail_view_renders_faq_buttons() {
        let mut state = SessionState::new(UserRole::Parent, "Maria");
        state.panel = Panel::Detail(ConversationId::bot());
        let html = widget(&state);

        assert!(html.contains("kc-back-btn"));
        assert!(html.contains("data-action=\"faq:1\""));
        assert!(!html.contains("kc-end-btn"));
    }

    #[test]
    fn test_schedule_lists_subjects_teachers_rooms() {
        let html = schedule(&ChildSchedule {
            child_name: "Ana".to_string(),
            grade_level: "K1".to_string(),
            section: "A".to_string(),
            schedule: vec![ScheduleItem {
                subject: "Math".to_string(),
                teacher: "Ms. Reyes".to_string(),
                schedule: Some("MWF 8:00".to_string()),
                room: "101".to_string(),
            }],
        });

        assert!(html.contains("Math"));
        assert!(html.contains("Teacher: Ms. Reyes"));
        assert!(html.contains("Room: 101"));
    }

    #[test]
    fn test_important_announcement_badge_and_truncation() {
        let html = announcements(&Feed::Loaded(vec![Announcement {
            id: 1,
            title: "Closure".to_string(),
            content: "x".repeat(150),
            is_important: true,
            publish_date: "2025-03-01".to_string(),
            teacher_name: None,
        }]));

        assert!(html.contains("Important"));
        assert!(html.contains(&format!("{}...", "x".repeat(100))));
        assert!(!html.contains(&"x".repeat(101)));
        assert!(html.contains("03/01/2025"));
    }

    #[test]
    fn test_feed_error_state() {
        let html = events(&Feed::Failed("Error loading events.".to_string()));
        assert!(html.contains("Error loading events."));
    }
}
