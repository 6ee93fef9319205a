//! Authorization and visibility rules.
//!
//! Every decision is a pure function of the acting user and the target, so
//! the rules are tested without a database or HTTP stack. Reads of rows the
//! caller may not see report `NotFound`, never `Forbidden`, so the existence
//! of other people's records does not leak.

use appraisal_common::{AppError, AppResult};
use appraisal_db::entities::{appeal, appraisal, document, meeting, user, user::UserRole};
use appraisal_db::repositories::{
    AppealFilter, AppraisalFilter, GoalFilter, MeetingFilter, UserFilter,
};
use serde::{Deserialize, Serialize};

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i32,
    pub role: UserRole,
}

impl Actor {
    /// Create an actor.
    #[must_use]
    pub const fn new(id: i32, role: UserRole) -> Self {
        Self { id, role }
    }

    /// HR or Admin.
    #[must_use]
    pub const fn is_elevated(&self) -> bool {
        self.role.is_elevated()
    }

    /// Fail with `Forbidden` unless the actor is HR or Admin.
    pub fn require_elevated(&self) -> AppResult<()> {
        if self.is_elevated() {
            Ok(())
        } else {
            Err(AppError::Forbidden("HR or Admin role required".to_string()))
        }
    }
}

/// Outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// The actor can see the target but may not perform the action.
    Deny,
    /// The actor cannot see the target at all.
    Hidden,
}

impl Decision {
    /// Map the decision onto the error taxonomy.
    pub fn check(self, what: impl FnOnce() -> String) -> AppResult<()> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny => Err(AppError::Forbidden(format!("Not permitted on {}", what()))),
            Self::Hidden => Err(AppError::NotFound(what())),
        }
    }

    /// Whether the decision allows the action.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// The two parties of an appraisal. Meetings and appeals inherit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parties {
    pub employee_id: i32,
    pub manager_id: i32,
}

impl From<&appraisal::Model> for Parties {
    fn from(a: &appraisal::Model) -> Self {
        Self {
            employee_id: a.employee_id,
            manager_id: a.manager_id,
        }
    }
}

impl From<&meeting::Model> for Parties {
    fn from(m: &meeting::Model) -> Self {
        Self {
            employee_id: m.employee_id,
            manager_id: m.manager_id,
        }
    }
}

/// Actions on an appraisal and on the records hanging off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppraisalAction {
    View,
    /// Edit period, comments, rating; approve, return, unlock, delete.
    Administer,
    WriteSelfAssessment,
    WriteManagerReview,
    /// Create and change meetings.
    ManageMeetings,
    FileAppeal,
    ReviewAppeal,
}

/// Decide whether `actor` may perform `action` on an appraisal with `parties`.
#[must_use]
pub fn authorize(actor: &Actor, action: AppraisalAction, parties: Parties) -> Decision {
    let is_employee = actor.id == parties.employee_id;
    let is_manager = actor.id == parties.manager_id;
    let visible = is_employee || is_manager || actor.is_elevated();

    if !visible {
        return Decision::Hidden;
    }

    let allowed = match action {
        AppraisalAction::View => true,
        AppraisalAction::Administer => actor.is_elevated(),
        // Elevated roles read assessments but never author them.
        AppraisalAction::WriteSelfAssessment => is_employee,
        AppraisalAction::WriteManagerReview => is_manager,
        AppraisalAction::ManageMeetings | AppraisalAction::ReviewAppeal => {
            is_manager || actor.is_elevated()
        }
        AppraisalAction::FileAppeal => is_employee,
    };

    if allowed { Decision::Allow } else { Decision::Deny }
}

/// An employee sees a manager review only once it has been submitted.
#[must_use]
pub fn can_view_manager_review(actor: &Actor, parties: Parties, submitted: bool) -> bool {
    match authorize(actor, AppraisalAction::View, parties) {
        Decision::Allow => submitted || actor.id != parties.employee_id || actor.is_elevated(),
        _ => false,
    }
}

/// Self, the direct manager, or HR/Admin.
#[must_use]
pub fn can_view_user(actor: &Actor, target: &user::Model) -> bool {
    actor.id == target.id || target.manager_id == Some(actor.id) || actor.is_elevated()
}

/// Goals are visible to their owner, the owner's direct manager and HR/Admin.
#[must_use]
pub fn can_view_goal(actor: &Actor, owner: &user::Model) -> bool {
    can_view_user(actor, owner)
}

/// Who may delete a goal: the owner's manager, HR/Admin, or the owner while
/// nothing has started.
#[must_use]
pub fn can_delete_goal(actor: &Actor, owner: &user::Model, not_started: bool) -> bool {
    owner.manager_id == Some(actor.id)
        || actor.is_elevated()
        || (actor.id == owner.id && not_started)
}

/// Appeals follow their appraisal's parties.
#[must_use]
pub fn appeal_parties(appeal: &appeal::Model, appraisal: &appraisal::Model) -> Parties {
    Parties {
        employee_id: appeal.employee_id,
        manager_id: appraisal.manager_id,
    }
}

/// Unlinked documents belong to their uploader and HR/Admin.
#[must_use]
pub fn can_view_unlinked_document(actor: &Actor, doc: &document::Model) -> bool {
    actor.id == doc.uploaded_by_id || actor.is_elevated()
}

/// Intersect a requested appraisal filter with the actor's scope.
///
/// `None` means no row can match, so the caller returns an empty page
/// without querying.
#[must_use]
pub fn scope_appraisals(actor: &Actor, mut filter: AppraisalFilter) -> Option<AppraisalFilter> {
    match actor.role {
        UserRole::Employee => {
            filter.employee_id = Some(pin(filter.employee_id, actor.id)?);
        }
        UserRole::Manager => filter.participant_id = Some(actor.id),
        UserRole::Hr | UserRole::Admin => {}
    }
    Some(filter)
}

/// Intersect a requested meeting filter with the actor's scope.
#[must_use]
pub fn scope_meetings(actor: &Actor, mut filter: MeetingFilter) -> Option<MeetingFilter> {
    match actor.role {
        UserRole::Employee => {
            filter.employee_id = Some(pin(filter.employee_id, actor.id)?);
        }
        UserRole::Manager => filter.participant_id = Some(actor.id),
        UserRole::Hr | UserRole::Admin => {}
    }
    Some(filter)
}

/// Intersect a requested appeal filter with the actor's scope.
#[must_use]
pub fn scope_appeals(actor: &Actor, mut filter: AppealFilter) -> Option<AppealFilter> {
    match actor.role {
        UserRole::Employee => {
            filter.employee_id = Some(pin(filter.employee_id, actor.id)?);
        }
        UserRole::Manager => filter.participant_id = Some(actor.id),
        UserRole::Hr | UserRole::Admin => {}
    }
    Some(filter)
}

/// Intersect a requested goal filter with the actor's scope.
#[must_use]
pub fn scope_goals(actor: &Actor, mut filter: GoalFilter) -> Option<GoalFilter> {
    match actor.role {
        UserRole::Employee => {
            filter.employee_id = Some(pin(filter.employee_id, actor.id)?);
        }
        UserRole::Manager => filter.team_of = Some(actor.id),
        UserRole::Hr | UserRole::Admin => {}
    }
    Some(filter)
}

/// Intersect a requested user filter with the actor's scope.
///
/// Managers list their direct reports only.
#[must_use]
pub fn scope_users(actor: &Actor, mut filter: UserFilter) -> Option<UserFilter> {
    match actor.role {
        UserRole::Employee => {
            filter.id = Some(actor.id);
            filter.manager_id = None;
            filter.team_of = None;
        }
        UserRole::Manager => {
            filter.manager_id = Some(pin(filter.manager_id, actor.id)?);
            filter.team_of = None;
        }
        UserRole::Hr | UserRole::Admin => {}
    }
    Some(filter)
}

/// Pin a requested id to the actor's own; a different request matches nothing.
fn pin(requested: Option<i32>, own: i32) -> Option<i32> {
    match requested {
        Some(id) if id != own => None,
        _ => Some(own),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use appraisal_db::test_utils::fixtures;

    const EMPLOYEE: i32 = 10;
    const MANAGER: i32 = 20;

    fn parties() -> Parties {
        Parties {
            employee_id: EMPLOYEE,
            manager_id: MANAGER,
        }
    }

    #[test]
    fn test_outsiders_are_hidden() {
        let stranger = Actor::new(99, UserRole::Manager);

        for action in [
            AppraisalAction::View,
            AppraisalAction::Administer,
            AppraisalAction::WriteManagerReview,
        ] {
            assert_eq!(authorize(&stranger, action, parties()), Decision::Hidden);
        }
    }

    #[test]
    fn test_participants_view() {
        let employee = Actor::new(EMPLOYEE, UserRole::Employee);
        let manager = Actor::new(MANAGER, UserRole::Manager);
        let hr = Actor::new(1, UserRole::Hr);

        for actor in [employee, manager, hr] {
            assert!(authorize(&actor, AppraisalAction::View, parties()).is_allowed());
        }
    }

    #[test]
    fn test_elevated_cannot_author_assessments() {
        let admin = Actor::new(1, UserRole::Admin);

        assert_eq!(
            authorize(&admin, AppraisalAction::WriteSelfAssessment, parties()),
            Decision::Deny
        );
        assert_eq!(
            authorize(&admin, AppraisalAction::WriteManagerReview, parties()),
            Decision::Deny
        );
        assert!(authorize(&admin, AppraisalAction::Administer, parties()).is_allowed());
    }

    #[test]
    fn test_only_employee_files_appeals() {
        let employee = Actor::new(EMPLOYEE, UserRole::Employee);
        let manager = Actor::new(MANAGER, UserRole::Manager);

        assert!(authorize(&employee, AppraisalAction::FileAppeal, parties()).is_allowed());
        assert_eq!(
            authorize(&manager, AppraisalAction::FileAppeal, parties()),
            Decision::Deny
        );
        assert!(authorize(&manager, AppraisalAction::ReviewAppeal, parties()).is_allowed());
        assert_eq!(
            authorize(&employee, AppraisalAction::ReviewAppeal, parties()),
            Decision::Deny
        );
    }

    #[test]
    fn test_decision_maps_to_errors() {
        let what = || "Appraisal 3".to_string();
        assert!(Decision::Allow.check(what).is_ok());
        assert!(matches!(
            Decision::Deny.check(what),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            Decision::Hidden.check(what),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_employee_sees_manager_review_once_submitted() {
        let employee = Actor::new(EMPLOYEE, UserRole::Employee);
        let manager = Actor::new(MANAGER, UserRole::Manager);

        assert!(!can_view_manager_review(&employee, parties(), false));
        assert!(can_view_manager_review(&employee, parties(), true));
        assert!(can_view_manager_review(&manager, parties(), false));
    }

    #[test]
    fn test_employee_filter_for_someone_else_matches_nothing() {
        let employee = Actor::new(EMPLOYEE, UserRole::Employee);
        let filter = AppraisalFilter {
            employee_id: Some(11),
            ..Default::default()
        };

        assert!(scope_appraisals(&employee, filter).is_none());
    }

    #[test]
    fn test_employee_filter_is_pinned_to_self() {
        let employee = Actor::new(EMPLOYEE, UserRole::Employee);

        let scoped = scope_appraisals(&employee, AppraisalFilter::default()).unwrap();
        assert_eq!(scoped.employee_id, Some(EMPLOYEE));

        let scoped = scope_goals(&employee, GoalFilter::default()).unwrap();
        assert_eq!(scoped.employee_id, Some(EMPLOYEE));
    }

    #[test]
    fn test_manager_scope_is_participation() {
        let manager = Actor::new(MANAGER, UserRole::Manager);
        let filter = MeetingFilter {
            employee_id: Some(55),
            ..Default::default()
        };

        let scoped = scope_meetings(&manager, filter).unwrap();
        assert_eq!(scoped.participant_id, Some(MANAGER));
        assert_eq!(scoped.employee_id, Some(55));
    }

    #[test]
    fn test_elevated_scope_is_unchanged() {
        let hr = Actor::new(1, UserRole::Hr);
        let filter = AppealFilter {
            employee_id: Some(55),
            ..Default::default()
        };

        let scoped = scope_appeals(&hr, filter).unwrap();
        assert_eq!(scoped.employee_id, Some(55));
        assert_eq!(scoped.participant_id, None);
    }

    #[test]
    fn test_user_scope() {
        let employee = Actor::new(EMPLOYEE, UserRole::Employee);
        let manager = Actor::new(MANAGER, UserRole::Manager);

        let scoped = scope_users(&employee, UserFilter::default()).unwrap();
        assert_eq!(scoped.id, Some(EMPLOYEE));

        let scoped = scope_users(&manager, UserFilter::default()).unwrap();
        assert_eq!(scoped.manager_id, Some(MANAGER));

        let other = UserFilter {
            manager_id: Some(77),
            ..Default::default()
        };
        assert!(scope_users(&manager, other).is_none());
    }

    #[test]
    fn test_user_visibility() {
        let report = fixtures::user(EMPLOYEE, UserRole::Employee, Some(MANAGER));

        assert!(can_view_user(&Actor::new(EMPLOYEE, UserRole::Employee), &report));
        assert!(can_view_user(&Actor::new(MANAGER, UserRole::Manager), &report));
        assert!(can_view_user(&Actor::new(1, UserRole::Hr), &report));
        assert!(!can_view_user(&Actor::new(30, UserRole::Manager), &report));
    }

    #[test]
    fn test_goal_delete_rules() {
        let owner = fixtures::user(EMPLOYEE, UserRole::Employee, Some(MANAGER));
        let employee = Actor::new(EMPLOYEE, UserRole::Employee);

        assert!(can_delete_goal(&employee, &owner, true));
        assert!(!can_delete_goal(&employee, &owner, false));
        assert!(can_delete_goal(&Actor::new(MANAGER, UserRole::Manager), &owner, false));
    }

    #[test]
    fn test_unlinked_document_visibility() {
        let doc = fixtures::document(1, None, None, EMPLOYEE);

        assert!(can_view_unlinked_document(&Actor::new(EMPLOYEE, UserRole::Employee), &doc));
        assert!(can_view_unlinked_document(&Actor::new(2, UserRole::Admin), &doc));
        assert!(!can_view_unlinked_document(&Actor::new(MANAGER, UserRole::Manager), &doc));
    }
}
