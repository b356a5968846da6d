use std::time::Duration;

use log::trace;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::bot::BotReply;
use crate::models::{ConversationId, MessageId};

/// Identifies the detail view a background result was started from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub conversation: ConversationId,
    pub generation: u64,
}

/// Result of a timer or background task, applied on the widget.
#[derive(Debug)]
pub enum Completion {
    BotReply {
        ticket: Ticket,
        /// Typing placeholder this reply replaces, if one was shown.
        placeholder: Option<MessageId>,
        reply: BotReply,
    },
    RefreshDue(Ticket),
    ListRefreshDue,
    UnreadPollDue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Applied,
    /// The result belonged to a detail view that is no longer shown.
    Stale,
    Ignored,
}

/// Spawned work owned by the widget. Everything is aborted on drop.
#[derive(Default)]
pub(crate) struct Tasks {
    refresh: Option<JoinHandle<()>>,
    scoped: Vec<JoinHandle<()>>,
    background: Vec<JoinHandle<()>>,
}

impl Tasks {
    pub(crate) fn set_refresh(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.refresh.replace(handle) {
            previous.abort();
        }
    }

    pub(crate) fn has_refresh(&self) -> bool {
        self.refresh.is_some()
    }

    /// Tracks a task that only makes sense while the current detail view is shown.
    pub(crate) fn push_scoped(&mut self, handle: JoinHandle<()>) {
        self.scoped.retain(|task| !task.is_finished());
        self.scoped.push(handle);
    }

    pub(crate) fn push_background(&mut self, handle: JoinHandle<()>) {
        self.background.push(handle);
    }

    pub(crate) fn has_background(&self) -> bool {
        !self.background.is_empty()
    }

    pub(crate) fn cancel_conversation_tasks(&mut self) {
        if let Some(refresh) = self.refresh.take() {
            refresh.abort();
        }
        for task in self.scoped.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Tasks {
    fn drop(&mut self) {
        self.cancel_conversation_tasks();
        for task in self.background.drain(..) {
            task.abort();
        }
    }
}

/// Sends `make()` every `period`, starting one period from now, until the
/// receiver is gone.
pub(crate) fn spawn_interval<F>(
    period: Duration,
    tx: UnboundedSender<Completion>,
    make: F,
) -> JoinHandle<()>
where
    F: Fn() -> Completion + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let completion = make();
            trace!("timer fired: {completion:?}");
            if tx.send(completion).is_err() {
                break;
            }
        }
    })
}
