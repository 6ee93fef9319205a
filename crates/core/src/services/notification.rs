//! Notification service and the outbox writer used by lifecycle transitions.

use std::sync::Arc;

use appraisal_common::{AppError, AppResult, Page, PageRequest};
use appraisal_db::{
    entities::{
        notification::{self, NotificationType},
        notification_outbox,
    },
    repositories::{NotificationRepository, OutboxRepository},
};
use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseConnection, Set};
use serde::Deserialize;
use tracing::warn;
use validator::Validate;

use super::dispatcher::NotificationDispatcher;
use crate::policy::Actor;

/// Something that happened, addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationIntent {
    pub user_id: i32,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}

impl NotificationIntent {
    /// Create an intent without a link.
    #[must_use]
    pub fn new(
        user_id: i32,
        kind: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            link: None,
        }
    }

    /// Attach a deep link to the entity.
    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// The same message for several recipients. Duplicates are dropped.
    #[must_use]
    pub fn fan_out(
        recipients: impl IntoIterator<Item = i32>,
        kind: NotificationType,
        title: &str,
        message: &str,
        link: &str,
    ) -> Vec<Self> {
        let mut ids: Vec<i32> = recipients.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();

        ids.into_iter()
            .map(|id| Self::new(id, kind, title, message).with_link(link))
            .collect()
    }

    pub(crate) fn into_outbox_row(self) -> notification_outbox::ActiveModel {
        notification_outbox::ActiveModel {
            user_id: Set(self.user_id),
            notification_type: Set(self.kind),
            title: Set(self.title),
            message: Set(self.message),
            link: Set(self.link),
            attempts: Set(0),
            created_at: Set(Utc::now().into()),
            dispatched_at: Set(None),
            ..Default::default()
        }
    }

    pub(crate) fn into_notification(self) -> notification::ActiveModel {
        notification::ActiveModel {
            user_id: Set(self.user_id),
            notification_type: Set(self.kind),
            title: Set(self.title),
            message: Set(self.message),
            link: Set(self.link),
            is_read: Set(false),
            read_at: Set(None),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
    }
}

/// Writes notification intents to the outbox and wakes the dispatcher.
#[derive(Clone)]
pub struct Notifier {
    db: Arc<DatabaseConnection>,
    outbox_repo: OutboxRepository,
    dispatcher: Option<NotificationDispatcher>,
}

impl Notifier {
    /// Create a notifier. Without a dispatcher, intents wait for the next drain.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>, outbox_repo: OutboxRepository) -> Self {
        Self {
            db,
            outbox_repo,
            dispatcher: None,
        }
    }

    /// Set the dispatcher woken after each commit.
    pub fn set_dispatcher(&mut self, dispatcher: NotificationDispatcher) {
        self.dispatcher = Some(dispatcher);
    }

    /// Append intents inside the caller's transaction.
    pub async fn enqueue<C: ConnectionTrait>(
        &self,
        conn: &C,
        intents: Vec<NotificationIntent>,
    ) -> AppResult<()> {
        let rows = intents
            .into_iter()
            .map(NotificationIntent::into_outbox_row)
            .collect();
        self.outbox_repo.enqueue(conn, rows).await
    }

    /// Append intents outside any transaction and dispatch them.
    ///
    /// For side effects of inserts, which have no status change to roll back.
    /// Failures are logged and swallowed.
    pub async fn enqueue_detached(&self, intents: Vec<NotificationIntent>) {
        if intents.is_empty() {
            return;
        }
        match self.enqueue(self.db.as_ref(), intents).await {
            Ok(()) => self.kick(),
            Err(e) => warn!(error = %e, "Failed to enqueue notifications"),
        }
    }

    /// Dispatch pending intents in the background.
    pub fn kick(&self) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.spawn();
        }
    }
}

/// Input for sending a general notification.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationInput {
    pub user_id: i32,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1, max = 2000))]
    pub message: String,

    #[validate(length(max = 500))]
    pub link: Option<String>,
}

/// Notification service: direct sends and the read side.
#[derive(Clone)]
pub struct NotificationService {
    db: Arc<DatabaseConnection>,
    notification_repo: NotificationRepository,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>, notification_repo: NotificationRepository) -> Self {
        Self {
            db,
            notification_repo,
        }
    }

    /// Record a notification. Never fails the caller.
    pub async fn notify(&self, intent: NotificationIntent) {
        let user_id = intent.user_id;
        if let Err(e) = self
            .notification_repo
            .create(self.db.as_ref(), intent.into_notification())
            .await
        {
            warn!(error = %e, user_id, "Failed to create notification");
        }
    }

    /// Send a general notification to a user (HR/Admin).
    pub async fn send(&self, actor: &Actor, input: SendNotificationInput) -> AppResult<()> {
        actor.require_elevated()?;
        input.validate()?;

        let mut intent = NotificationIntent::new(
            input.user_id,
            NotificationType::General,
            input.title,
            input.message,
        );
        intent.link = input.link;

        self.notify(intent).await;
        Ok(())
    }

    /// Page through the caller's notifications.
    pub async fn list(
        &self,
        actor: &Actor,
        unread_only: bool,
        kind: Option<NotificationType>,
        page: PageRequest,
    ) -> AppResult<Page<notification::Model>> {
        self.notification_repo
            .find_page(actor.id, unread_only, kind, page)
            .await
    }

    /// Count the caller's unread notifications.
    pub async fn unread_count(&self, actor: &Actor) -> AppResult<u64> {
        self.notification_repo.count_unread(actor.id).await
    }

    /// Mark one notification read. Re-marking keeps the first `read_at`.
    pub async fn mark_as_read(&self, actor: &Actor, id: i32) -> AppResult<notification::Model> {
        let existing = self
            .notification_repo
            .find_for_user(id, actor.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification {id}")))?;

        if existing.is_read {
            return Ok(existing);
        }

        self.notification_repo.mark_as_read(id, actor.id).await?;

        self.notification_repo
            .find_for_user(id, actor.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification {id}")))
    }

    /// Mark every unread notification of the caller read.
    pub async fn mark_all_as_read(&self, actor: &Actor) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(actor.id).await
    }
}
