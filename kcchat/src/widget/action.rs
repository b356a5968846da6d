use std::{fmt, str::FromStr};

use anyhow::{Result, anyhow};

/// Quick-reply buttons offered inline in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    SelectFaq(u64),
    AcceptTeacher,
    DeclineTeacher,
    SelectTeacher(u64),
    ShowSchedule(u64),
}

impl fmt::Display for QuickAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuickAction::SelectFaq(id) => write!(f, "faq:{id}"),
            QuickAction::AcceptTeacher => write!(f, "teacher-yes"),
            QuickAction::DeclineTeacher => write!(f, "teacher-no"),
            QuickAction::SelectTeacher(id) => write!(f, "teacher:{id}"),
            QuickAction::ShowSchedule(id) => write!(f, "schedule:{id}"),
        }
    }
}

impl FromStr for QuickAction {
    type Err = anyhow::Error;

    fn from_str(token: &str) -> Result<Self> {
        match token.trim() {
            "teacher-yes" => return Ok(QuickAction::AcceptTeacher),
            "teacher-no" => return Ok(QuickAction::DeclineTeacher),
            _ => {}
        }

        let (kind, id) = token
            .trim()
            .split_once(':')
            .ok_or_else(|| anyhow!("unknown action '{token}'"))?;
        let id: u64 = id
            .parse()
            .map_err(|_| anyhow!("action '{token}' needs a numeric id"))?;

        match kind {
            "faq" => Ok(QuickAction::SelectFaq(id)),
            "teacher" => Ok(QuickAction::SelectTeacher(id)),
            "schedule" => Ok(QuickAction::ShowSchedule(id)),
            _ => Err(anyhow!("unknown action '{token}'")),
        }
    }
}
