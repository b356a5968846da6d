use std::fmt;

use clap::{Parser, Subcommand, ValueEnum};
use kcchat::models::UserRole;
use log::LevelFilter;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// School portal base URL
    #[arg(long, env = "KC_PORTAL_URL", default_value = "")]
    pub portal_url: String,

    /// CSRF token sent with every request
    #[arg(long, env = "KC_CSRF_TOKEN", default_value = "")]
    pub csrf_token: String,

    /// Portal session cookie
    #[arg(long, env = "KC_SESSION_ID")]
    pub session_id: Option<String>,

    /// Role of the signed-in user
    #[arg(long, value_enum)]
    pub role: Option<UserRole>,

    /// Display name of the signed-in user
    #[arg(long)]
    pub user_name: Option<String>,

    /// Log verbosity
    #[arg(short, long, value_name = "LEVEL", default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Open the interactive chat (default)
    Chat,
    /// Print the number of unread messages
    Unread,
    /// List conversations with their unread counters
    Conversations,
    /// Print the FAQ catalog
    Faqs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Off => LevelFilter::Off,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Off => write!(f, "off"),
        }
    }
}
