use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response, header, multipart};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;

use crate::attachment::SelectedFile;
use crate::models::portal::*;
use crate::models::{ConversationId, ParticipantKind};

/// HTTP surface of the school portal consumed by the chat widget.
#[async_trait]
pub trait PortalApi: Send + Sync {
    async fn list_children(&self) -> Result<Vec<Child>>;
    async fn child_schedule(&self, child_id: u64) -> Result<ChildSchedule>;
    async fn recent_announcements(&self) -> Result<Vec<Announcement>>;
    async fn upcoming_events(&self) -> Result<Vec<UpcomingEvent>>;
    async fn parent_conversations(&self) -> Result<Vec<ParentConversationSummary>>;
    async fn teacher_conversations(&self) -> Result<Vec<TeacherConversationSummary>>;
    async fn conversation_messages(&self, id: &ConversationId) -> Result<Vec<PortalMessage>>;
    /// Posts a message, as multipart form data when an attachment is given.
    async fn send_message(
        &self,
        id: &ConversationId,
        message: &str,
        attachment: Option<&SelectedFile>,
    ) -> Result<Option<PortalMessage>>;
    async fn create_conversation(
        &self,
        request: &CreateConversationRequest,
    ) -> Result<ConversationId>;
    async fn close_conversation(&self, id: &ConversationId) -> Result<()>;
    async fn bot_search(&self, query: &str) -> Result<BotAnswer>;
    async fn available_teachers(&self) -> Result<Vec<Teacher>>;
    async fn unread_count(&self) -> Result<u32>;
    async fn profile(&self, kind: ParticipantKind, id: u64) -> Result<Profile>;
    async fn faq_catalog(&self) -> Result<Vec<FaqEntry>>;
}

pub struct PortalClient {
    client: Client,
    base_url: String,
}

impl PortalClient {
    /// Builds a client that echoes the host page's CSRF cookie in the
    /// `X-CSRFToken` header on every request.
    pub fn new(base_url: &str, csrf_token: &str, session_id: Option<&str>) -> Result<Self> {
        let mut cookie = format!("csrftoken={csrf_token}");
        if let Some(session_id) = session_id {
            cookie.push_str(&format!("; sessionid={session_id}"));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "X-CSRFToken",
            header::HeaderValue::from_str(csrf_token).context("Invalid CSRF token")?,
        );
        headers.insert(
            header::COOKIE,
            header::HeaderValue::from_str(&cookie).context("Invalid session cookie")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("GET {path}");
        let response = self.client.get(self.url(path)).send().await?;
        read_json(response, path).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!("POST {path}");
        let response = self.client.post(self.url(path)).json(body).send().await?;
        read_json(response, path).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, path: &str) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(anyhow!(
            "{path} failed with status {status}: {error_text}"
        ));
    }

    response
        .json()
        .await
        .with_context(|| format!("Unexpected response from {path}"))
}

#[async_trait]
impl PortalApi for PortalClient {
    async fn list_children(&self) -> Result<Vec<Child>> {
        self.get_json("/information/api/children/").await
    }

    async fn child_schedule(&self, child_id: u64) -> Result<ChildSchedule> {
        self.get_json(&format!("/information/api/children/{child_id}/schedule/"))
            .await
    }

    async fn recent_announcements(&self) -> Result<Vec<Announcement>> {
        self.get_json("/information/api/announcements/recent/").await
    }

    async fn upcoming_events(&self) -> Result<Vec<UpcomingEvent>> {
        self.get_json("/information/api/events/upcoming/").await
    }

    async fn parent_conversations(&self) -> Result<Vec<ParentConversationSummary>> {
        self.get_json("/api/chat/conversations/").await
    }

    async fn teacher_conversations(&self) -> Result<Vec<TeacherConversationSummary>> {
        self.get_json("/api/chat/teacher-conversations/").await
    }

    async fn conversation_messages(&self, id: &ConversationId) -> Result<Vec<PortalMessage>> {
        let response: MessagesResponse = self
            .get_json(&format!("/api/chat/conversation/{id}/messages/"))
            .await?;
        Ok(response.messages)
    }

    async fn send_message(
        &self,
        id: &ConversationId,
        message: &str,
        attachment: Option<&SelectedFile>,
    ) -> Result<Option<PortalMessage>> {
        let path = format!("/api/chat/conversation/{id}/send/");

        let response: SendMessageResponse = match attachment {
            None => self.post_json(&path, &SendMessageRequest { message }).await?,
            Some(file) => {
                debug!("POST {path} with attachment {}", file.file_name);
                let file_part = multipart::Part::file(&file.path)
                    .await
                    .with_context(|| format!("Cannot read attachment {}", file.path.display()))?
                    .file_name(file.file_name.clone())
                    .mime_str(&file.mime)?;

                let form = multipart::Form::new()
                    .text("message", message.to_string())
                    .part("attachment", file_part);

                let response = self
                    .client
                    .post(self.url(&path))
                    .multipart(form)
                    .send()
                    .await?;
                read_json(response, &path).await?
            }
        };

        if !response.success {
            bail!(
                "cannot send message: {}",
                response.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }

        Ok(response.message)
    }

    async fn create_conversation(
        &self,
        request: &CreateConversationRequest,
    ) -> Result<ConversationId> {
        let response: CreateConversationResponse = self
            .post_json("/api/chat/create-conversation/", request)
            .await?;

        match (response.success, response.conversation_id) {
            (true, Some(id)) => Ok(id),
            _ => Err(anyhow!(
                "cannot create conversation: {}",
                response
                    .error
                    .unwrap_or_else(|| "Failed to start conversation".to_string())
            )),
        }
    }

    async fn close_conversation(&self, id: &ConversationId) -> Result<()> {
        let response: StatusResponse = self
            .post_json(
                &format!("/api/chat/conversation/{id}/close/"),
                &serde_json::json!({}),
            )
            .await?;

        if !response.success {
            bail!(
                "cannot close conversation: {}",
                response.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }

        Ok(())
    }

    async fn bot_search(&self, query: &str) -> Result<BotAnswer> {
        let response: BotSearchResponse = self
            .post_json("/api/chat/bot-search/", &BotSearchRequest { query })
            .await?;

        if !response.success {
            bail!("bot search rejected the query");
        }

        Ok(response.response)
    }

    async fn available_teachers(&self) -> Result<Vec<Teacher>> {
        let response: TeachersResponse = self.get_json("/api/chat/available-teachers/").await?;
        Ok(response.teachers)
    }

    async fn unread_count(&self) -> Result<u32> {
        let response: UnreadCount = self.get_json("/api/chat/unread-count/").await?;
        Ok(response.count)
    }

    async fn profile(&self, kind: ParticipantKind, id: u64) -> Result<Profile> {
        if kind == ParticipantKind::Bot {
            bail!("the assistant has no profile");
        }
        self.get_json(&format!("/api/chat/profile/{}/{id}/", kind.as_str()))
            .await
    }

    async fn faq_catalog(&self) -> Result<Vec<FaqEntry>> {
        self.get_json("/api/chat/faqs/").await
    }
}
