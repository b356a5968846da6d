use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, File};
use kcchat::models::UserRole;
use kcchat::widget::WidgetConfig;
use log::debug;
use serde::Deserialize;

use crate::cli::Args;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    pub portal_url: Option<String>,
    pub csrf_token: Option<String>,
    pub session_id: Option<String>,
    pub role: Option<UserRole>,
    pub user_name: Option<String>,
    pub timing: Option<TimingSettings>,
}

/// `[timing]` table overriding the widget intervals.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TimingSettings {
    pub conversation_refresh_secs: Option<u64>,
    pub list_refresh_secs: Option<u64>,
    pub unread_poll_secs: Option<u64>,
    pub typing_delay_ms: Option<u64>,
    pub faq_delay_ms: Option<u64>,
}

const CONFIG_FILE_NAME: &str = env!("CARGO_PKG_NAME");

fn get_xdg_config_path() -> Option<PathBuf> {
    if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config));
    }

    if let Ok(home) = env::var("HOME") {
        return Some(PathBuf::from(home).join(".config"));
    }

    None
}

pub fn default_config_path() -> Option<PathBuf> {
    get_xdg_config_path().map(|dir| dir.join(CONFIG_FILE_NAME).join("config.toml"))
}

/// Reads the config file at `path`. A missing file yields empty settings.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    if !path.exists() {
        debug!("no config file at {}", path.display());
        return Ok(Settings::default());
    }

    Config::builder()
        .add_source(File::from(path.to_path_buf()).required(false))
        .build()?
        .try_deserialize()
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to deserialize config file {}: {}",
                path.display(),
                e
            )
        })
}

/// Fills every connection setting the command line left empty from the
/// config file.
pub fn merge_settings_with_args(args: &Args, settings: &Settings) -> Args {
    let mut new_args = args.clone();

    macro_rules! apply_if_empty {
        ($args:expr, $field:ident, $config:expr) => {
            if let Some(value) = &$config.$field {
                if $args.$field.is_empty() {
                    $args.$field = value.clone();
                }
            }
        };
    }

    apply_if_empty!(new_args, portal_url, settings);
    apply_if_empty!(new_args, csrf_token, settings);

    if new_args.session_id.is_none() {
        new_args.session_id = settings.session_id.clone();
    }
    if new_args.role.is_none() {
        new_args.role = settings.role;
    }
    if new_args.user_name.is_none() {
        new_args.user_name = settings.user_name.clone();
    }

    debug!("merged config: portal {} role {:?}", new_args.portal_url, new_args.role);

    new_args
}

pub fn widget_config(args: &Args, settings: &Settings) -> WidgetConfig {
    let mut config = WidgetConfig {
        role: args.role.unwrap_or(UserRole::Parent),
        user_name: args.user_name.clone().unwrap_or_else(|| "User".to_string()),
        ..WidgetConfig::default()
    };

    if let Some(timing) = &settings.timing {
        if let Some(secs) = timing.conversation_refresh_secs {
            config.conversation_refresh = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = timing.list_refresh_secs {
            config.list_refresh = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = timing.unread_poll_secs {
            config.unread_poll = Duration::from_secs(secs.max(1));
        }
        if let Some(ms) = timing.typing_delay_ms {
            config.typing_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = timing.faq_delay_ms {
            config.faq_delay = Duration::from_millis(ms);
        }
    }

    config
}
