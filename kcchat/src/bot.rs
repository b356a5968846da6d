//! Replies of the built-in assistant conversation.
//!
//! A handful of keywords are answered on the client (schedules, feeds, asking
//! for a teacher); everything else goes to the backend's FAQ search.

use log::warn;

use crate::api::PortalApi;
use crate::models::Inline;
use crate::models::portal::Child;

pub const GREETING: &str = "Hello! 👋 Welcome to KinderCare. How can I assist you today?";
pub const NOT_FOUND_PROMPT: &str =
    "It looks like you have a different concern. Would you like to speak with one of our teachers?";
pub const TEACHER_PROMPT: &str = "Would you like to speak with one of our teachers?";
pub const TEACHER_PICKER_INTRO: &str = "Great! Please select a teacher to connect with:";
pub const DECLINE_REPLY: &str = "Sorry I couldn't help with that. Feel free to select any question below or type your message.";
pub const SEARCH_FAILED: &str =
    "Sorry, I'm having trouble answering right now. Please try again later.";
pub const NO_CHILDREN: &str =
    "No children found in your account. Please contact the school administrator.";
pub const WHICH_CHILD: &str = "Which child's schedule would you like to see?";
pub const SCHEDULE_FAILED: &str = "Sorry, I couldn't fetch the schedule. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Schedule,
    Announcements,
    Events,
    Teacher,
    Search,
}

/// Keywords match at the start of a word, so "events" and "asking" count
/// while "task" or "basket" do not.
pub fn classify(text: &str) -> Intent {
    let text = text.to_lowercase();
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();
    let mentions = |keyword: &str| words.iter().any(|word| word.starts_with(keyword));

    if mentions("schedule") || mentions("class") {
        Intent::Schedule
    } else if mentions("announcement") {
        Intent::Announcements
    } else if mentions("event") {
        Intent::Events
    } else if mentions("teacher") || mentions("ask") {
        Intent::Teacher
    } else {
        Intent::Search
    }
}

/// A bot message before it is placed in a transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct BotReply {
    pub text: String,
    pub inline: Option<Inline>,
}

impl BotReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            inline: None,
        }
    }

    pub fn with(text: impl Into<String>, inline: Inline) -> Self {
        Self {
            text: text.into(),
            inline: Some(inline),
        }
    }
}

pub fn connected_message(teacher_name: &str) -> String {
    format!("You are now connected with {teacher_name}. Feel free to ask your questions.")
}

pub async fn respond<A: PortalApi + ?Sized>(api: &A, text: &str, children: &[Child]) -> BotReply {
    match classify(text) {
        Intent::Schedule => match children {
            [] => BotReply::text(NO_CHILDREN),
            [child] => schedule_reply(api, child.id).await,
            _ => BotReply::with(WHICH_CHILD, Inline::ChildPicker(children.to_vec())),
        },
        Intent::Announcements => match api.recent_announcements().await {
            Ok(items) if items.is_empty() => BotReply::text("There are no announcements right now."),
            Ok(items) => BotReply::with(
                "Here are the latest announcements!",
                Inline::Announcements(items),
            ),
            Err(e) => {
                warn!("could not load announcements: {e:#}");
                BotReply::text("Sorry, I couldn't load the announcements. Please try again later.")
            }
        },
        Intent::Events => match api.upcoming_events().await {
            Ok(items) if items.is_empty() => BotReply::text("There are no upcoming events."),
            Ok(items) => BotReply::with("Here are the upcoming school events!", Inline::Events(items)),
            Err(e) => {
                warn!("could not load events: {e:#}");
                BotReply::text("Sorry, I couldn't load the events. Please try again later.")
            }
        },
        Intent::Teacher => BotReply::with(TEACHER_PROMPT, Inline::TeacherPrompt),
        Intent::Search => match api.bot_search(text).await {
            Ok(answer) if answer.suggest_chat => {
                BotReply::with(NOT_FOUND_PROMPT, Inline::TeacherPrompt)
            }
            Ok(answer) => BotReply::with(answer.text, Inline::FaqMenu),
            Err(e) => {
                warn!("bot search failed: {e:#}");
                BotReply::text(SEARCH_FAILED)
            }
        },
    }
}

pub async fn schedule_reply<A: PortalApi + ?Sized>(api: &A, child_id: u64) -> BotReply {
    match api.child_schedule(child_id).await {
        Ok(schedule) => BotReply::with(
            format!("{}'s Schedule", schedule.child_name),
            Inline::Schedule(schedule),
        ),
        Err(e) => {
            warn!("could not load schedule of child {child_id}: {e:#}");
            BotReply::text(SCHEDULE_FAILED)
        }
    }
}
