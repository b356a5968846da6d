use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};
use kcchat::api::{PortalApi, PortalClient};
use kcchat::faq;
use kcchat::models::portal::{Announcement, FaqEntry, Teacher, UpcomingEvent};
use kcchat::models::{
    Conversation, ConversationId, Inline, Message, MessageId, SenderRole, UserRole, display_date,
};
use kcchat::render::truncate;
use kcchat::widget::{Feed, Panel, QuickAction, Tab, Widget};
use log::{debug, info};
use owo_colors::OwoColorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::{Args, Command};
use crate::settings::{self, Settings};

pub async fn run(args: Args) -> Result<()> {
    let settings = match settings::default_config_path() {
        Some(path) => settings::load_settings(&path)?,
        None => Settings::default(),
    };
    let args = settings::merge_settings_with_args(&args, &settings);

    if args.portal_url.is_empty() {
        bail!("portal URL is not set, pass --portal-url or set KC_PORTAL_URL");
    }

    let client = PortalClient::new(&args.portal_url, &args.csrf_token, args.session_id.as_deref())?;
    let role = args.role.unwrap_or(UserRole::Parent);

    match args.command.unwrap_or(Command::Chat) {
        Command::Unread => {
            let count = client.unread_count().await?;
            println!("{count}");
        }
        Command::Conversations => print_conversations(&client, role).await?,
        Command::Faqs => {
            let faqs = match client.faq_catalog().await {
                Ok(faqs) if !faqs.is_empty() => faqs,
                Ok(_) => faq::builtin_catalog(),
                Err(e) => {
                    info!("using the built-in FAQ catalog: {e:#}");
                    faq::builtin_catalog()
                }
            };
            for entry in faqs {
                println!("{} {}", format!("[{}]", entry.id).cyan(), entry.question.bold());
                println!("    {}", entry.answer);
            }
        }
        Command::Chat => {
            let config = settings::widget_config(&args, &settings);
            chat(Widget::new(Arc::new(client), config)).await?;
        }
    }

    Ok(())
}

async fn print_conversations(client: &PortalClient, role: UserRole) -> Result<()> {
    let conversations: Vec<Conversation> = match role {
        UserRole::Parent => client
            .parent_conversations()
            .await?
            .into_iter()
            .map(Conversation::from)
            .collect(),
        UserRole::Teacher => client
            .teacher_conversations()
            .await?
            .into_iter()
            .map(Conversation::from)
            .collect(),
    };

    if conversations.is_empty() {
        println!("No conversations yet");
    }
    for conversation in &conversations {
        print_row(conversation);
    }
    Ok(())
}

const HELP: &str = "\
Commands:
  /open                 open the chat panel
  /close                close the chat panel
  /back                 return to the conversation list
  /select <id>          open a conversation
  /end                  end the open teacher conversation
  /attach <path>        attach an image or video to the next message
  /detach               drop the selected attachment
  /tab <name>           messages, announcements or events
  /profile              show the profile of the other participant
  /dismiss              dismiss the alert or profile
  /do <action>          press a quick reply, e.g. /do faq:3 or /do teacher-yes
  /help                 show this help
  /quit                 leave
Anything else is sent as a message.";

async fn chat<A: PortalApi + 'static>(mut widget: Widget<A>) -> Result<()> {
    widget.start().await;
    widget.open();

    let mut screen = Screen::default();
    screen.update(&widget);
    println!("{}", "Type /help for commands.".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if !handle_line(&mut widget, line.trim()).await {
                    break;
                }
            }
            completion = widget.recv_completion() => {
                let Some(completion) = completion else {
                    break;
                };
                let handled = widget.apply(completion).await;
                debug!("completion {handled:?}");
            }
        }

        screen.update(&widget);
    }

    Ok(())
}

/// Runs one line of user input. Returns false when the user quits.
async fn handle_line<A: PortalApi + 'static>(widget: &mut Widget<A>, line: &str) -> bool {
    let (command, rest) = match line.split_once(' ') {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "" => {}
        "/quit" | "/exit" => return false,
        "/help" => println!("{HELP}"),
        "/open" => widget.open(),
        "/close" => widget.close(),
        "/back" => widget.back().await,
        "/select" => widget.select_conversation(&ConversationId::new(rest)).await,
        "/end" => widget.end_conversation().await,
        "/attach" => {
            if let Err(e) = widget.attach(Path::new(rest)).await {
                debug!("attachment rejected: {e}");
            }
        }
        "/detach" => widget.clear_attachment(),
        "/tab" => match rest {
            "messages" => widget.show_tab(Tab::Messages).await,
            "announcements" => widget.show_tab(Tab::Announcements).await,
            "events" => widget.show_tab(Tab::Events).await,
            other => println!("{}", format!("unknown tab '{other}'").red()),
        },
        "/profile" => widget.show_profile().await,
        "/dismiss" => {
            widget.dismiss_alert();
            widget.dismiss_profile();
        }
        "/do" => match rest.parse::<QuickAction>() {
            Ok(action) => widget.dispatch(action).await,
            Err(e) => println!("{}", e.red()),
        },
        _ if command.starts_with('/') => {
            println!("{}", format!("unknown command {command}, try /help").red())
        }
        _ => {
            if widget.current_ticket().is_none() {
                println!("{}", "Open a conversation first with /select <id>.".yellow());
            } else {
                widget.send(line).await;
            }
        }
    }

    true
}

/// Terminal view of the widget. Prints only what changed since the last update.
#[derive(Default)]
struct Screen {
    renders: u64,
    panel: Option<Panel>,
    tab: Tab,
    printed: HashSet<MessageId>,
    list: Vec<(ConversationId, u32, String)>,
    alert: Option<String>,
    profile_shown: bool,
    feed_shown: bool,
}

impl Screen {
    fn update<A: PortalApi + 'static>(&mut self, widget: &Widget<A>) {
        if widget.render_count() == self.renders && self.panel.is_some() {
            return;
        }
        self.renders = widget.render_count();
        let state = widget.state();

        let panel_changed = self.panel.as_ref() != Some(&state.panel) || self.tab != state.tab;
        if panel_changed {
            self.panel = Some(state.panel.clone());
            self.tab = state.tab;
            self.printed.clear();
            self.list.clear();
            self.feed_shown = false;
        }

        match (&state.panel, state.tab) {
            (Panel::Closed, _) => {
                if panel_changed {
                    let badge = if state.badge > 0 {
                        format!(" ({} unread)", state.badge)
                    } else {
                        String::new()
                    };
                    println!("{}", format!("💬 chat closed{badge}, /open to open").dimmed());
                }
            }
            (_, Tab::Announcements) => self.print_announcements(&state.announcements),
            (_, Tab::Events) => self.print_events(&state.events),
            (Panel::List, Tab::Messages) => {
                let list: Vec<_> = state
                    .conversations
                    .iter()
                    .map(|c| (c.id.clone(), c.unread, c.last_message.clone()))
                    .collect();
                if list != self.list {
                    println!("\n{}", "Messages".bright_green().bold());
                    for conversation in &state.conversations {
                        print_row(conversation);
                    }
                    self.list = list;
                }
            }
            (Panel::Detail(id), Tab::Messages) => {
                let Some(conversation) = state.conversation(id) else {
                    return;
                };
                if panel_changed {
                    println!("\n{}", conversation.header_title().bright_green().bold());
                }
                for message in &conversation.messages {
                    if message.is_typing() || !self.printed.insert(message.id) {
                        continue;
                    }
                    print_message(message, state.role, &state.faqs, &state.teachers);
                }
                if conversation.is_typing() {
                    println!("{}", "…".dimmed());
                }
                if let Some(file) = &state.selected_file {
                    println!("{}", format!("📎 {} ready to send", file.file_name).dimmed());
                }
            }
        }

        if state.alert != self.alert {
            if let Some(alert) = &state.alert {
                println!("{}", format!("⚠ {alert}").red());
            }
            self.alert = state.alert.clone();
        }

        match (&state.profile, self.profile_shown) {
            (Some(profile), false) => {
                println!("\n{}", profile.name.bold());
                if !profile.role.is_empty() {
                    println!("  {}", profile.role);
                }
                for value in [&profile.email, &profile.phone, &profile.section]
                    .into_iter()
                    .flatten()
                {
                    println!("  {value}");
                }
                if !profile.children.is_empty() {
                    println!("  Children: {}", profile.children.join(", "));
                }
                self.profile_shown = true;
            }
            (None, true) => self.profile_shown = false,
            _ => {}
        }
    }

    fn print_announcements(&mut self, feed: &Feed<Announcement>) {
        match feed {
            Feed::Loaded(items) if !self.feed_shown => {
                println!("\n{}", "Announcements".bright_green().bold());
                if items.is_empty() {
                    println!("No announcements yet.");
                }
                print_announcement_items(items);
                self.feed_shown = true;
            }
            Feed::Failed(reason) if !self.feed_shown => {
                println!("{}", reason.red());
                self.feed_shown = true;
            }
            _ => {}
        }
    }

    fn print_events(&mut self, feed: &Feed<UpcomingEvent>) {
        match feed {
            Feed::Loaded(items) if !self.feed_shown => {
                println!("\n{}", "Events".bright_green().bold());
                if items.is_empty() {
                    println!("No upcoming events.");
                }
                print_event_items(items);
                self.feed_shown = true;
            }
            Feed::Failed(reason) if !self.feed_shown => {
                println!("{}", reason.red());
                self.feed_shown = true;
            }
            _ => {}
        }
    }
}

fn print_row(conversation: &Conversation) {
    let unread = if conversation.unread > 0 {
        format!(" ({})", conversation.unread).red().to_string()
    } else {
        String::new()
    };
    let name = match &conversation.child_name {
        Some(child) => format!("{} ({})", conversation.name, child),
        None => conversation.name.clone(),
    };
    println!(
        "{} {} {}{unread}  {}",
        format!("[{}]", conversation.id).cyan(),
        conversation.kind.avatar(),
        name.bold(),
        conversation.last_message.dimmed()
    );
}

fn print_message(
    message: &Message,
    role: UserRole,
    faqs: &[FaqEntry],
    teachers: &Feed<Teacher>,
) {
    let who = match message.sender {
        SenderRole::Bot => "Assistant".magenta().to_string(),
        SenderRole::System => "System".yellow().to_string(),
        sender if sender == role.sender() => "You".green().to_string(),
        sender => sender.as_str().blue().to_string(),
    };
    if !message.text.is_empty() {
        println!("{} {} {}", message.time.dimmed(), who, message.text);
    }
    if let Some(attachment) = &message.attachment {
        println!("    📎 {}", attachment.url.underline());
    }

    let Some(inline) = &message.inline else {
        return;
    };
    match inline {
        Inline::FaqMenu => {
            for entry in faqs {
                println!("    {} {}", format!("/do faq:{}", entry.id).cyan(), entry.question);
            }
        }
        Inline::TeacherPrompt => {
            println!("    {} / {}", "/do teacher-yes".cyan(), "/do teacher-no".cyan());
        }
        Inline::TeacherPicker => match teachers {
            Feed::Loaded(list) => {
                for teacher in list {
                    println!(
                        "    {} {} {}",
                        format!("/do teacher:{}", teacher.id).cyan(),
                        teacher.name,
                        teacher.section.dimmed()
                    );
                }
            }
            Feed::Failed(reason) => println!("    {}", reason.red()),
            _ => println!("    {}", "Loading teachers...".dimmed()),
        },
        Inline::ChildPicker(children) => {
            for child in children {
                println!(
                    "    {} {}",
                    format!("/do schedule:{}", child.id).cyan(),
                    child.first_name()
                );
            }
        }
        Inline::Schedule(schedule) => {
            for item in &schedule.schedule {
                println!(
                    "    {} with {} ({}) room {}",
                    item.subject.bold(),
                    item.teacher,
                    item.schedule.as_deref().unwrap_or("TBA"),
                    item.room
                );
            }
        }
        Inline::Announcements(items) => print_announcement_items(items),
        Inline::Events(items) => print_event_items(items),
        Inline::Typing => {}
    }
}

fn print_announcement_items(items: &[Announcement]) {
    for item in items {
        let important = if item.is_important {
            format!("{} ", "Important".red().bold())
        } else {
            String::new()
        };
        println!(
            "  {important}{} {}",
            item.title.bold(),
            display_date(&item.publish_date).dimmed()
        );
        println!("    {}", truncate(&item.content, 100));
    }
}

fn print_event_items(items: &[UpcomingEvent]) {
    for item in items {
        println!(
            "  {} {}",
            item.title.bold(),
            display_date(&item.date).dimmed()
        );
        if let Some(location) = &item.location {
            println!("    📍 {location}");
        }
        println!("    {}", truncate(&item.description, 80));
    }
}
