mod common;

use std::time::Duration;

use common::{FakePortal, portal_message, teacher_summary, widget};
use kcchat::models::portal::TeacherConversationSummary;
use kcchat::models::{ConversationId, SenderRole, UserRole};
use kcchat::widget::{Completion, Feed, Handled, Panel, Tab, Ticket};

fn setup_portal() -> std::sync::Arc<FakePortal> {
    let portal = FakePortal::new();
    {
        let mut state = portal.state();
        state.parent_conversations = vec![
            teacher_summary(7, "Ms. Reyes", 3),
            teacher_summary(8, "Mr. Santos", 1),
        ];
        state.messages.insert(
            "7".to_string(),
            vec![
                portal_message(1, SenderRole::Parent, "Hello"),
                portal_message(2, SenderRole::Teacher, "Hi! How can I help?"),
            ],
        );
        state.unread = 4;
    }
    portal
}

#[tokio::test(start_paused = true)]
async fn test_start_loads_list_and_badge() {
    let portal = setup_portal();
    let mut widget = widget(portal.clone(), UserRole::Parent);

    widget.start().await;

    let state = widget.state();
    assert_eq!(state.panel, Panel::Closed);
    assert_eq!(state.conversations.len(), 3);
    assert!(state.conversations[0].id.is_bot());
    assert_eq!(state.badge, 4);
    assert_eq!(state.faqs.len(), 10);
    assert!(widget.view().contains("kc-unread-badge"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_list_keeps_bot_conversation() {
    let portal = setup_portal();
    portal.state().failing.insert("conversations");
    let mut widget = widget(portal.clone(), UserRole::Parent);

    widget.start().await;

    assert_eq!(widget.state().conversations.len(), 1);
    assert!(widget.state().conversations[0].id.is_bot());
    assert_eq!(widget.state().badge, 0);
}

#[tokio::test(start_paused = true)]
async fn test_select_clears_unread_before_render() {
    let portal = setup_portal();
    let mut widget = widget(portal.clone(), UserRole::Parent);
    widget.start().await;
    widget.open();

    widget.select_conversation(&ConversationId::from(7)).await;

    let state = widget.state();
    assert_eq!(state.panel, Panel::Detail(ConversationId::from(7)));
    assert_eq!(state.conversation(&ConversationId::from(7)).unwrap().unread, 0);
    assert_eq!(state.badge, 1);
    assert_eq!(state.conversation(&ConversationId::from(7)).unwrap().messages.len(), 2);
    assert!(widget.view().contains("Ms. Reyes - K1-A"));
    assert!(widget.view().contains("Hi! How can I help?"));
    assert!(widget.refresh_timer_active());
}

#[tokio::test(start_paused = true)]
async fn test_select_is_ignored_while_closed_or_unknown() {
    let portal = setup_portal();
    let mut widget = widget(portal.clone(), UserRole::Parent);
    widget.start().await;

    widget.select_conversation(&ConversationId::from(7)).await;
    assert_eq!(widget.state().panel, Panel::Closed);

    widget.open();
    widget.select_conversation(&ConversationId::from(99)).await;
    assert_eq!(widget.state().panel, Panel::List);
    assert_eq!(portal.calls_to("messages"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_panel_never_detail_while_closed() {
    let portal = setup_portal();
    let mut widget = widget(portal.clone(), UserRole::Parent);
    widget.start().await;

    let teacher = ConversationId::from(7);
    widget.toggle();
    widget.select_conversation(&teacher).await;
    widget.close();
    assert_eq!(widget.state().panel, Panel::Closed);
    assert!(!widget.refresh_timer_active());

    widget.back().await;
    assert_eq!(widget.state().panel, Panel::Closed);

    widget.toggle();
    assert_eq!(widget.state().panel, Panel::List);
    widget.select_conversation(&teacher).await;
    widget.back().await;
    assert_eq!(widget.state().panel, Panel::List);
    assert!(!widget.refresh_timer_active());

    widget.select_conversation(&teacher).await;
    widget.toggle();
    assert_eq!(widget.state().panel, Panel::Closed);
    assert!(widget.current_ticket().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_only_the_open_conversation_refreshes() {
    let portal = setup_portal();
    let mut widget = widget(portal.clone(), UserRole::Parent);
    widget.start().await;
    widget.open();

    widget.select_conversation(&ConversationId::from(7)).await;
    widget.select_conversation(&ConversationId::from(8)).await;
    assert!(widget.refresh_timer_active());
    assert_eq!(portal.calls_to("messages:8"), 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(widget.next_completion().await, Handled::Applied);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(widget.drain_completions().await, 0);

    assert_eq!(portal.calls_to("messages:7"), 1);
    assert_eq!(portal.calls_to("messages:8"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_silent_refresh_renders_only_on_change() {
    let portal = setup_portal();
    let mut widget = widget(portal.clone(), UserRole::Parent);
    widget.start().await;
    widget.open();
    widget.select_conversation(&ConversationId::from(7)).await;

    let renders = widget.render_count();
    widget.refresh_messages(true).await;
    assert_eq!(widget.render_count(), renders);

    portal
        .state()
        .messages
        .get_mut("7")
        .unwrap()
        .push(portal_message(3, SenderRole::Teacher, "See you at pickup"));
    widget.refresh_messages(true).await;
    assert_eq!(widget.render_count(), renders + 1);
    assert!(widget.view().contains("See you at pickup"));

    widget.refresh_messages(false).await;
    assert_eq!(widget.render_count(), renders + 2);
}

#[tokio::test(start_paused = true)]
async fn test_stale_refresh_ticket_is_discarded() {
    let portal = setup_portal();
    let mut widget = widget(portal.clone(), UserRole::Parent);
    widget.start().await;
    widget.open();
    widget.select_conversation(&ConversationId::from(7)).await;
    let old = widget.current_ticket().unwrap();

    widget.back().await;
    widget.select_conversation(&ConversationId::from(7)).await;
    let fetches = portal.calls_to("messages");

    assert_eq!(widget.apply(Completion::RefreshDue(old)).await, Handled::Stale);
    let forged = Ticket {
        conversation: ConversationId::from(8),
        generation: widget.current_ticket().unwrap().generation,
    };
    assert_eq!(widget.apply(Completion::RefreshDue(forged)).await, Handled::Stale);
    assert_eq!(portal.calls_to("messages"), fetches);
}

#[tokio::test(start_paused = true)]
async fn test_list_refresh_only_applies_on_list() {
    let portal = setup_portal();
    let mut widget = widget(portal.clone(), UserRole::Parent);
    widget.start().await;

    assert_eq!(widget.apply(Completion::ListRefreshDue).await, Handled::Ignored);

    widget.open();
    portal.state().parent_conversations.push(teacher_summary(9, "Ms. Cruz", 2));
    assert_eq!(widget.apply(Completion::ListRefreshDue).await, Handled::Applied);
    assert_eq!(widget.state().conversations.len(), 4);
    assert_eq!(widget.state().badge, 6);
}

#[tokio::test(start_paused = true)]
async fn test_unread_poll_updates_badge() {
    let portal = setup_portal();
    let mut widget = widget(portal.clone(), UserRole::Parent);
    widget.start().await;

    portal.state().unread = 0;
    widget.poll_unread().await;

    assert_eq!(widget.state().badge, 0);
    assert!(!widget.view().contains("kc-unread-badge"));
}

#[tokio::test(start_paused = true)]
async fn test_send_failure_raises_alert() {
    let portal = setup_portal();
    portal.state().failing.insert("send");
    let mut widget = widget(portal.clone(), UserRole::Parent);
    widget.start().await;
    widget.open();
    widget.select_conversation(&ConversationId::from(7)).await;

    widget.send("  Is Ana feeling better?  ").await;

    let conversation = widget.state().conversation(&ConversationId::from(7)).unwrap();
    assert_eq!(conversation.messages.last().unwrap().text, "Is Ana feeling better?");
    assert!(widget.state().alert.is_some());
    assert!(widget.view().contains("kc-alert"));

    widget.dismiss_alert();
    assert!(widget.state().alert.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_end_conversation_returns_to_list() {
    let portal = setup_portal();
    let mut widget = widget(portal.clone(), UserRole::Parent);
    widget.start().await;
    widget.open();
    widget.select_conversation(&ConversationId::from(7)).await;

    widget.end_conversation().await;

    assert_eq!(portal.calls_to("close"), 1);
    assert_eq!(widget.state().panel, Panel::List);
    assert!(!widget.refresh_timer_active());
}

#[tokio::test(start_paused = true)]
async fn test_teacher_session_lists_parents() {
    let portal = FakePortal::new();
    portal.state().teacher_conversations = vec![TeacherConversationSummary {
        id: ConversationId::from(3),
        parent_name: "Maria Cruz".to_string(),
        parent_id: Some(11),
        child_name: Some("Ana".to_string()),
        unread_count: Some(2),
        last_message: None,
        last_message_time: None,
    }];
    let mut widget = widget(portal.clone(), UserRole::Teacher);

    widget.start().await;
    widget.open();

    assert_eq!(portal.calls_to("children"), 0);
    assert_eq!(widget.state().conversations.len(), 1);
    assert!(widget.view().contains("Maria Cruz (Ana)"));
    assert!(widget.view().contains("No messages"));

    widget.select_conversation(&ConversationId::from(3)).await;
    widget.show_profile().await;
    assert_eq!(widget.state().profile.as_ref().unwrap().id, 11);
    assert!(widget.view().contains("kc-profile-modal"));

    widget.back().await;
    assert!(widget.state().profile.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_feed_tabs_load_and_fail() {
    let portal = setup_portal();
    portal.state().failing.insert("events");
    let mut widget = widget(portal.clone(), UserRole::Parent);
    widget.start().await;
    widget.open();

    widget.show_tab(Tab::Announcements).await;
    assert!(matches!(widget.state().announcements, Feed::Loaded(ref items) if items.len() == 1));
    assert!(widget.view().contains("Important"));

    widget.show_tab(Tab::Events).await;
    assert_eq!(
        widget.state().events,
        Feed::Failed("Error loading events.".to_string())
    );
    assert!(widget.view().contains("Error loading events."));
}
