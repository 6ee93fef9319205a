//! Appraisal meetings.

use appraisal_common::{AppError, AppResult, Page, PageRequest};
use appraisal_db::{
    entities::{
        meeting::{self, MeetingStatus},
        notification::NotificationType,
    },
    repositories::{AppraisalRepository, MeetingFilter, MeetingRepository},
};
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::notification::{NotificationIntent, Notifier};
use crate::lifecycle::{MeetingTransition, Transition};
use crate::policy::{self, Actor, AppraisalAction, Parties};

/// Input for scheduling a meeting.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingInput {
    pub appraisal_id: i32,
    pub scheduled_at: DateTime<FixedOffset>,

    #[validate(length(max = 256))]
    pub location: Option<String>,

    #[validate(url)]
    pub meeting_link: Option<String>,

    #[validate(length(max = 4000))]
    pub agenda: String,
}

/// Logistics of an open meeting.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeetingInput {
    #[validate(length(max = 256))]
    pub location: Option<String>,

    #[validate(url)]
    pub meeting_link: Option<String>,

    #[validate(length(max = 4000))]
    pub agenda: Option<String>,
}

/// Input for moving a meeting.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleMeetingInput {
    pub scheduled_at: DateTime<FixedOffset>,

    #[validate(length(max = 256))]
    pub location: Option<String>,
}

/// Input for closing a meeting.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteMeetingInput {
    #[validate(length(max = 8000))]
    pub notes: Option<String>,
}

/// Meeting service.
#[derive(Clone)]
pub struct MeetingService {
    appraisal_repo: AppraisalRepository,
    meeting_repo: MeetingRepository,
    notifier: Notifier,
}

impl MeetingService {
    /// Create a new meeting service.
    #[must_use]
    pub const fn new(
        appraisal_repo: AppraisalRepository,
        meeting_repo: MeetingRepository,
        notifier: Notifier,
    ) -> Self {
        Self {
            appraisal_repo,
            meeting_repo,
            notifier,
        }
    }

    async fn load(
        &self,
        actor: &Actor,
        id: i32,
        action: AppraisalAction,
    ) -> AppResult<meeting::Model> {
        let meeting = self
            .meeting_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Meeting {id}")))?;

        policy::authorize(actor, action, Parties::from(&meeting))
            .check(|| format!("Meeting {id}"))?;

        Ok(meeting)
    }

    /// Get a meeting visible to the caller.
    pub async fn get(&self, actor: &Actor, id: i32) -> AppResult<meeting::Model> {
        self.load(actor, id, AppraisalAction::View).await
    }

    /// Page through meetings, intersected with the caller's scope.
    pub async fn list(
        &self,
        actor: &Actor,
        filter: MeetingFilter,
        page: PageRequest,
    ) -> AppResult<Page<meeting::Model>> {
        match policy::scope_meetings(actor, filter) {
            Some(filter) => self.meeting_repo.find_page(&filter, page).await,
            None => Ok(Page::empty(page)),
        }
    }

    /// Schedule a meeting for an appraisal (its manager or HR/Admin).
    pub async fn create(&self, actor: &Actor, input: CreateMeetingInput) -> AppResult<meeting::Model> {
        input.validate()?;
        ensure_future(input.scheduled_at)?;

        let appraisal = self
            .appraisal_repo
            .find_by_id(input.appraisal_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Appraisal {}", input.appraisal_id)))?;
        policy::authorize(actor, AppraisalAction::ManageMeetings, Parties::from(&appraisal))
            .check(|| format!("Appraisal {}", appraisal.id))?;

        let now = Utc::now();
        let model = meeting::ActiveModel {
            appraisal_id: Set(appraisal.id),
            employee_id: Set(appraisal.employee_id),
            manager_id: Set(appraisal.manager_id),
            scheduled_at: Set(input.scheduled_at),
            location: Set(input.location),
            meeting_link: Set(input.meeting_link),
            agenda: Set(input.agenda),
            notes: Set(None),
            status: Set(MeetingStatus::Scheduled),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            completed_at: Set(None),
            ..Default::default()
        };

        let meeting = self.meeting_repo.create(model).await?;
        info!(meeting_id = meeting.id, appraisal_id = appraisal.id, "Meeting scheduled");

        self.notifier
            .enqueue_detached(scheduled(&meeting, "Meeting scheduled"))
            .await;

        Ok(meeting)
    }

    /// Change location, link or agenda of an open meeting.
    pub async fn update(
        &self,
        actor: &Actor,
        id: i32,
        input: UpdateMeetingInput,
    ) -> AppResult<meeting::Model> {
        input.validate()?;
        let meeting = self.load(actor, id, AppraisalAction::ManageMeetings).await?;

        let mut changes = meeting::ActiveModel {
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if let Some(location) = input.location {
            changes.location = Set(Some(location));
        }
        if let Some(link) = input.meeting_link {
            changes.meeting_link = Set(Some(link));
        }
        if let Some(agenda) = input.agenda {
            changes.agenda = Set(agenda);
        }

        self.write(&meeting, &MeetingTransition::OPEN, changes).await
    }

    /// Move an open meeting to a new future date.
    pub async fn reschedule(
        &self,
        actor: &Actor,
        id: i32,
        input: RescheduleMeetingInput,
    ) -> AppResult<meeting::Model> {
        input.validate()?;
        ensure_future(input.scheduled_at)?;
        let meeting = self.load(actor, id, AppraisalAction::ManageMeetings).await?;
        let action = MeetingTransition::Reschedule;

        let mut changes = meeting::ActiveModel {
            status: Set(action.apply(meeting.status)?),
            scheduled_at: Set(input.scheduled_at),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if let Some(location) = input.location {
            changes.location = Set(Some(location));
        }

        let updated = self.write(&meeting, action.sources(), changes).await?;
        info!(meeting_id = id, "Meeting rescheduled");

        self.notifier
            .enqueue_detached(scheduled(&updated, "Meeting rescheduled"))
            .await;

        Ok(updated)
    }

    /// Close an open meeting with optional notes.
    pub async fn complete(
        &self,
        actor: &Actor,
        id: i32,
        input: CompleteMeetingInput,
    ) -> AppResult<meeting::Model> {
        input.validate()?;
        let meeting = self.load(actor, id, AppraisalAction::ManageMeetings).await?;
        let action = MeetingTransition::Complete;

        let now = Utc::now();
        let changes = meeting::ActiveModel {
            status: Set(action.apply(meeting.status)?),
            notes: Set(input.notes),
            completed_at: Set(Some(now.into())),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let updated = self.write(&meeting, action.sources(), changes).await?;
        info!(meeting_id = id, "Meeting completed");

        self.notifier
            .enqueue_detached(NotificationIntent::fan_out(
                [updated.employee_id, updated.manager_id],
                NotificationType::MeetingCompleted,
                "Meeting completed",
                &format!("The appraisal meeting of {} was completed", updated.scheduled_at.date_naive()),
                &link(updated.id),
            ))
            .await;

        Ok(updated)
    }

    /// Cancel an open meeting.
    pub async fn cancel(&self, actor: &Actor, id: i32) -> AppResult<meeting::Model> {
        let meeting = self.load(actor, id, AppraisalAction::ManageMeetings).await?;
        let action = MeetingTransition::Cancel;

        let changes = meeting::ActiveModel {
            status: Set(action.apply(meeting.status)?),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let updated = self.write(&meeting, action.sources(), changes).await?;
        info!(meeting_id = id, "Meeting cancelled");

        self.notifier
            .enqueue_detached(NotificationIntent::fan_out(
                [updated.employee_id, updated.manager_id],
                NotificationType::MeetingCancelled,
                "Meeting cancelled",
                &format!("The appraisal meeting of {} was cancelled", updated.scheduled_at.date_naive()),
                &link(updated.id),
            ))
            .await;

        Ok(updated)
    }

    async fn write(
        &self,
        meeting: &meeting::Model,
        from: &[MeetingStatus],
        changes: meeting::ActiveModel,
    ) -> AppResult<meeting::Model> {
        if !from.contains(&meeting.status) {
            return Err(AppError::InvalidOperation(format!(
                "Meeting {} is {:?}",
                meeting.id, meeting.status
            )));
        }
        if !self
            .meeting_repo
            .update_if_status(meeting.id, from, changes)
            .await?
        {
            return Err(AppError::InvalidOperation(format!(
                "Meeting {} changed status concurrently",
                meeting.id
            )));
        }

        self.meeting_repo.get_by_id(meeting.id).await
    }
}

fn ensure_future(at: DateTime<FixedOffset>) -> AppResult<()> {
    if at > Utc::now() {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Meeting must be scheduled in the future".to_string(),
        ))
    }
}

fn link(id: i32) -> String {
    format!("/meetings/{id}")
}

fn scheduled(meeting: &meeting::Model, title: &str) -> Vec<NotificationIntent> {
    NotificationIntent::fan_out(
        [meeting.employee_id, meeting.manager_id],
        NotificationType::MeetingScheduled,
        title,
        &format!("Appraisal meeting on {}", meeting.scheduled_at.format("%Y-%m-%d %H:%M %:z")),
        &link(meeting.id),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use appraisal_db::entities::{appraisal::AppraisalStatus, user::UserRole};
    use appraisal_db::repositories::OutboxRepository;
    use appraisal_db::test_utils::fixtures;
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    const EMPLOYEE: i32 = 10;
    const MANAGER: i32 = 20;

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn service(db: MockDatabase) -> MeetingService {
        service_on(&Arc::new(db.into_connection()))
    }

    fn service_on(db: &Arc<DatabaseConnection>) -> MeetingService {
        MeetingService::new(
            AppraisalRepository::new(db.clone()),
            MeetingRepository::new(db.clone()),
            Notifier::new(db.clone(), OutboxRepository::new(db.clone())),
        )
    }

    fn manager() -> Actor {
        Actor::new(MANAGER, UserRole::Manager)
    }

    fn input(at: DateTime<FixedOffset>) -> CreateMeetingInput {
        CreateMeetingInput {
            appraisal_id: 5,
            scheduled_at: at,
            location: Some("Room 2".to_string()),
            meeting_link: None,
            agenda: "Discuss ratings".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_in_past_rejected() {
        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .create(&manager(), input((Utc::now() - Duration::hours(1)).into()))
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_copies_parties() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::appraisal(
                5,
                EMPLOYEE,
                MANAGER,
                AppraisalStatus::UnderReview,
            )]])
            .append_query_results([[fixtures::meeting(
                1,
                5,
                EMPLOYEE,
                MANAGER,
                MeetingStatus::Scheduled,
            )]])
            .append_exec_results([exec(2)]);

        let meeting = service(db)
            .create(&manager(), input((Utc::now() + Duration::days(2)).into()))
            .await
            .unwrap();

        assert_eq!(meeting.employee_id, EMPLOYEE);
        assert_eq!(meeting.manager_id, MANAGER);
        assert_eq!(meeting.status, MeetingStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_employee_cannot_schedule() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[
            fixtures::appraisal(5, EMPLOYEE, MANAGER, AppraisalStatus::Draft),
        ]]);

        let result = service(db)
            .create(
                &Actor::new(EMPLOYEE, UserRole::Employee),
                input((Utc::now() + Duration::days(2)).into()),
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_complete_sets_completed_at() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::meeting(
                1,
                5,
                EMPLOYEE,
                MANAGER,
                MeetingStatus::Rescheduled,
            )]])
            .append_query_results([[fixtures::meeting(
                1,
                5,
                EMPLOYEE,
                MANAGER,
                MeetingStatus::Completed,
            )]])
            .append_exec_results([exec(1), exec(2)]);

        let meeting = service(db)
            .complete(&manager(), 1, CompleteMeetingInput::default())
            .await
            .unwrap();

        assert_eq!(meeting.status, MeetingStatus::Completed);
        assert!(meeting.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_cancel_notifies_both_parties() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::meeting(
                    1,
                    5,
                    EMPLOYEE,
                    MANAGER,
                    MeetingStatus::Scheduled,
                )]])
                .append_query_results([[fixtures::meeting(
                    1,
                    5,
                    EMPLOYEE,
                    MANAGER,
                    MeetingStatus::Cancelled,
                )]])
                .append_exec_results([exec(1), exec(2)])
                .into_connection(),
        );

        let meeting = service_on(&db).cancel(&manager(), 1).await.unwrap();
        assert_eq!(meeting.status, MeetingStatus::Cancelled);

        let log = format!("{:?}", Arc::try_unwrap(db).unwrap().into_transaction_log());
        assert!(log.contains("notification_outbox"));
        assert!(log.contains("meetingCancelled"));
    }

    #[tokio::test]
    async fn test_completed_meeting_is_final() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[
            fixtures::meeting(1, 5, EMPLOYEE, MANAGER, MeetingStatus::Completed),
        ]]);

        let result = service(db).cancel(&manager(), 1).await;

        assert!(matches!(result, Err(AppError::InvalidOperation(_))));
    }

    #[tokio::test]
    async fn test_reschedule_lost_race() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::meeting(
                1,
                5,
                EMPLOYEE,
                MANAGER,
                MeetingStatus::Scheduled,
            )]])
            .append_exec_results([exec(0)]);

        let result = service(db)
            .reschedule(
                &manager(),
                1,
                RescheduleMeetingInput {
                    scheduled_at: (Utc::now() + Duration::days(3)).into(),
                    location: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::InvalidOperation(_))));
    }

    #[tokio::test]
    async fn test_outsider_cannot_see_meeting() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[
            fixtures::meeting(1, 5, EMPLOYEE, MANAGER, MeetingStatus::Scheduled),
        ]]);

        let result = service(db)
            .get(&Actor::new(77, UserRole::Manager), 1)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
