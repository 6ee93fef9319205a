//! Status transition tables.
//!
//! Each status-bearing entity has an action enum whose variants name the
//! states they may fire from and the state they lead to. Services validate
//! against the table, then persist with a compare-and-set on the same source
//! states, so a transition that lost a race is rejected the same way as an
//! illegal one.

use appraisal_common::{AppError, AppResult};
use appraisal_db::entities::{
    appeal::AppealStatus, appraisal::AppraisalStatus, goal::GoalStatus,
    mediation::MediationStatus, meeting::MeetingStatus, self_assessment::AssessmentStatus,
};
use chrono::{DateTime, Duration, FixedOffset};
use std::fmt::Debug;

/// A table of transitions over one status enum.
pub trait Transition: Copy + Debug {
    /// The status enum the table is over.
    type State: Copy + PartialEq + Debug + 'static;

    /// States the action may fire from.
    fn sources(self) -> &'static [Self::State];

    /// State the action leads to.
    fn target(self) -> Self::State;

    /// Validate the action against the current state.
    fn apply(self, current: Self::State) -> AppResult<Self::State> {
        if self.sources().contains(&current) {
            Ok(self.target())
        } else {
            Err(AppError::InvalidOperation(format!(
                "Cannot {self:?} from {current:?}"
            )))
        }
    }
}

/// Appraisal transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppraisalTransition {
    /// Both assessments submitted.
    BeginReview,
    Approve,
    Return,
    Unlock,
    Appeal,
    /// The last open appeal reached a final decision.
    CloseAppeal,
}

impl Transition for AppraisalTransition {
    type State = AppraisalStatus;

    fn sources(self) -> &'static [AppraisalStatus] {
        use AppraisalStatus::{Appealed, Completed, Draft, Submitted, UnderReview};
        match self {
            Self::BeginReview => &[Draft, Submitted],
            Self::Approve | Self::Return => &[UnderReview],
            Self::Unlock | Self::Appeal => &[Completed],
            Self::CloseAppeal => &[Appealed],
        }
    }

    fn target(self) -> AppraisalStatus {
        match self {
            Self::BeginReview | Self::Unlock => AppraisalStatus::UnderReview,
            Self::Approve | Self::CloseAppeal => AppraisalStatus::Completed,
            Self::Return => AppraisalStatus::Draft,
            Self::Appeal => AppraisalStatus::Appealed,
        }
    }
}

/// Self-assessment and manager review transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentTransition {
    Submit,
    /// The appraisal was returned to draft.
    Reopen,
}

impl Transition for AssessmentTransition {
    type State = AssessmentStatus;

    fn sources(self) -> &'static [AssessmentStatus] {
        match self {
            Self::Submit => &[AssessmentStatus::Draft],
            Self::Reopen => &[AssessmentStatus::Submitted],
        }
    }

    fn target(self) -> AssessmentStatus {
        match self {
            Self::Submit => AssessmentStatus::Submitted,
            Self::Reopen => AssessmentStatus::Draft,
        }
    }
}

/// Meeting transitions. Completed and cancelled meetings are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingTransition {
    Reschedule,
    Complete,
    Cancel,
}

impl MeetingTransition {
    /// States in which logistics may still change.
    pub const OPEN: [MeetingStatus; 2] = [MeetingStatus::Scheduled, MeetingStatus::Rescheduled];
}

impl Transition for MeetingTransition {
    type State = MeetingStatus;

    fn sources(self) -> &'static [MeetingStatus] {
        &Self::OPEN
    }

    fn target(self) -> MeetingStatus {
        match self {
            Self::Reschedule => MeetingStatus::Rescheduled,
            Self::Complete => MeetingStatus::Completed,
            Self::Cancel => MeetingStatus::Cancelled,
        }
    }
}

/// Outcome of an appeal review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum AppealDecision {
    Approved,
    Rejected,
    PendingMediation,
}

impl AppealDecision {
    /// The appeal status this decision records.
    #[must_use]
    pub const fn status(self) -> AppealStatus {
        match self {
            Self::Approved => AppealStatus::Approved,
            Self::Rejected => AppealStatus::Rejected,
            Self::PendingMediation => AppealStatus::PendingMediation,
        }
    }
}

/// Appeal transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppealTransition {
    Submit,
    StartReview,
    Decide(AppealDecision),
    /// Settle an appeal after mediation. Only final decisions are valid.
    Resolve(AppealDecision),
}

impl Transition for AppealTransition {
    type State = AppealStatus;

    fn sources(self) -> &'static [AppealStatus] {
        match self {
            Self::Submit => &[AppealStatus::Draft],
            Self::StartReview => &[AppealStatus::Submitted],
            Self::Decide(_) => &[AppealStatus::UnderReview],
            Self::Resolve(AppealDecision::PendingMediation) => &[],
            Self::Resolve(_) => &[AppealStatus::PendingMediation],
        }
    }

    fn target(self) -> AppealStatus {
        match self {
            Self::Submit => AppealStatus::Submitted,
            Self::StartReview => AppealStatus::UnderReview,
            Self::Decide(decision) | Self::Resolve(decision) => decision.status(),
        }
    }
}

/// Mediation transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediationTransition {
    Schedule,
    Start,
    Complete,
}

impl Transition for MediationTransition {
    type State = MediationStatus;

    fn sources(self) -> &'static [MediationStatus] {
        use MediationStatus::{InProgress, Pending, Scheduled};
        match self {
            Self::Schedule | Self::Start => &[Pending, Scheduled],
            Self::Complete => &[InProgress],
        }
    }

    fn target(self) -> MediationStatus {
        match self {
            Self::Schedule => MediationStatus::Scheduled,
            Self::Start => MediationStatus::InProgress,
            Self::Complete => MediationStatus::Completed,
        }
    }
}

/// Goal transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalTransition {
    Start,
    Complete,
    Cancel,
}

impl GoalTransition {
    /// Non-terminal goal states.
    pub const ACTIVE: [GoalStatus; 2] = [GoalStatus::NotStarted, GoalStatus::InProgress];
}

impl Transition for GoalTransition {
    type State = GoalStatus;

    fn sources(self) -> &'static [GoalStatus] {
        match self {
            Self::Start => &[GoalStatus::NotStarted],
            Self::Complete | Self::Cancel => &Self::ACTIVE,
        }
    }

    fn target(self) -> GoalStatus {
        match self {
            Self::Start => GoalStatus::InProgress,
            Self::Complete => GoalStatus::Completed,
            Self::Cancel => GoalStatus::Cancelled,
        }
    }
}

/// Apply a progress update: clamp to `[0, 100]`, complete at 100, start on
/// any progress. Terminal goals reject the update.
pub fn goal_progress(current: GoalStatus, progress: i32) -> AppResult<(i32, GoalStatus)> {
    if !GoalTransition::ACTIVE.contains(&current) {
        return Err(AppError::InvalidOperation(format!(
            "Cannot update progress of a {current:?} goal"
        )));
    }

    let progress = progress.clamp(0, 100);
    let status = if progress == 100 {
        GoalStatus::Completed
    } else if progress > 0 && current == GoalStatus::NotStarted {
        GoalStatus::InProgress
    } else {
        current
    };

    Ok((progress, status))
}

/// Filing on the last day of the window is allowed.
pub const APPEAL_WINDOW_END_INCLUSIVE: bool = true;

/// The last instant an appeal may be filed.
#[must_use]
pub fn appeal_deadline(
    completed_at: DateTime<FixedOffset>,
    window_days: i64,
) -> DateTime<FixedOffset> {
    completed_at + Duration::days(window_days)
}

/// Fail with `InvalidOperation` unless `now` falls within the appeal window.
pub fn ensure_appeal_window(
    completed_at: Option<DateTime<FixedOffset>>,
    now: DateTime<FixedOffset>,
    window_days: i64,
) -> AppResult<()> {
    let completed_at = completed_at.ok_or_else(|| {
        AppError::InvalidOperation("Appraisal has not been completed".to_string())
    })?;
    let deadline = appeal_deadline(completed_at, window_days);

    let open = if APPEAL_WINDOW_END_INCLUSIVE {
        now <= deadline
    } else {
        now < deadline
    };

    if open {
        Ok(())
    } else {
        Err(AppError::InvalidOperation("Appeal window closed".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_appraisal_table() {
        use AppraisalStatus::{Appealed, Completed, Draft, Submitted, UnderReview};

        assert_eq!(AppraisalTransition::BeginReview.apply(Draft).unwrap(), UnderReview);
        assert_eq!(AppraisalTransition::BeginReview.apply(Submitted).unwrap(), UnderReview);
        assert_eq!(AppraisalTransition::Approve.apply(UnderReview).unwrap(), Completed);
        assert_eq!(AppraisalTransition::Return.apply(UnderReview).unwrap(), Draft);
        assert_eq!(AppraisalTransition::Unlock.apply(Completed).unwrap(), UnderReview);
        assert_eq!(AppraisalTransition::Appeal.apply(Completed).unwrap(), Appealed);
        assert_eq!(AppraisalTransition::CloseAppeal.apply(Appealed).unwrap(), Completed);
    }

    #[test]
    fn test_illegal_appraisal_transitions() {
        use AppraisalStatus::{Appealed, Completed, Draft, UnderReview};

        for (action, from) in [
            (AppraisalTransition::Approve, Draft),
            (AppraisalTransition::Approve, Completed),
            (AppraisalTransition::Return, Completed),
            (AppraisalTransition::Unlock, Appealed),
            (AppraisalTransition::Appeal, UnderReview),
            (AppraisalTransition::BeginReview, Completed),
        ] {
            assert!(matches!(
                action.apply(from),
                Err(AppError::InvalidOperation(_))
            ));
        }
    }

    #[test]
    fn test_assessment_submit_is_one_way() {
        assert_eq!(
            AssessmentTransition::Submit.apply(AssessmentStatus::Draft).unwrap(),
            AssessmentStatus::Submitted
        );
        assert!(AssessmentTransition::Submit.apply(AssessmentStatus::Submitted).is_err());
    }

    #[test]
    fn test_meeting_terminal_states() {
        for terminal in [MeetingStatus::Completed, MeetingStatus::Cancelled] {
            for action in [
                MeetingTransition::Reschedule,
                MeetingTransition::Complete,
                MeetingTransition::Cancel,
            ] {
                assert!(action.apply(terminal).is_err());
            }
        }
        assert_eq!(
            MeetingTransition::Complete.apply(MeetingStatus::Rescheduled).unwrap(),
            MeetingStatus::Completed
        );
    }

    #[test]
    fn test_appeal_review_paths() {
        let decide = AppealTransition::Decide(AppealDecision::PendingMediation);
        assert_eq!(
            decide.apply(AppealStatus::UnderReview).unwrap(),
            AppealStatus::PendingMediation
        );
        assert!(decide.apply(AppealStatus::Submitted).is_err());

        let resolve = AppealTransition::Resolve(AppealDecision::Rejected);
        assert_eq!(
            resolve.apply(AppealStatus::PendingMediation).unwrap(),
            AppealStatus::Rejected
        );
        assert!(resolve.apply(AppealStatus::UnderReview).is_err());

        let resolve_to_mediation = AppealTransition::Resolve(AppealDecision::PendingMediation);
        assert!(resolve_to_mediation.apply(AppealStatus::PendingMediation).is_err());
    }

    #[test]
    fn test_mediation_table() {
        assert_eq!(
            MediationTransition::Schedule.apply(MediationStatus::Scheduled).unwrap(),
            MediationStatus::Scheduled
        );
        assert_eq!(
            MediationTransition::Start.apply(MediationStatus::Pending).unwrap(),
            MediationStatus::InProgress
        );
        assert!(MediationTransition::Complete.apply(MediationStatus::Scheduled).is_err());
        assert!(MediationTransition::Start.apply(MediationStatus::Completed).is_err());
    }

    #[test]
    fn test_goal_progress_clamps() {
        assert_eq!(
            goal_progress(GoalStatus::InProgress, 150).unwrap(),
            (100, GoalStatus::Completed)
        );
        assert_eq!(
            goal_progress(GoalStatus::InProgress, -5).unwrap(),
            (0, GoalStatus::InProgress)
        );
        assert_eq!(
            goal_progress(GoalStatus::NotStarted, 0).unwrap(),
            (0, GoalStatus::NotStarted)
        );
        assert_eq!(
            goal_progress(GoalStatus::NotStarted, 40).unwrap(),
            (40, GoalStatus::InProgress)
        );
    }

    #[test]
    fn test_goal_progress_rejected_when_terminal() {
        for status in [GoalStatus::Completed, GoalStatus::Cancelled] {
            assert!(matches!(
                goal_progress(status, 50),
                Err(AppError::InvalidOperation(_))
            ));
        }
    }

    #[test]
    fn test_appeal_window_boundaries() {
        let completed: DateTime<FixedOffset> = Utc::now().into();
        let window = 14;

        let last_day = completed + Duration::days(window);
        assert!(ensure_appeal_window(Some(completed), last_day, window).is_ok());

        let day_after = completed + Duration::days(window + 1);
        assert!(matches!(
            ensure_appeal_window(Some(completed), day_after, window),
            Err(AppError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_appeal_window_requires_completion() {
        let now: DateTime<FixedOffset> = Utc::now().into();
        assert!(ensure_appeal_window(None, now, 14).is_err());
    }
}
