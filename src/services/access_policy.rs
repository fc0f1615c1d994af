use serde::Serialize;

use crate::db::models::User;
use crate::db::types::UserRole;

/// Identity resolved once per request from the bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestContext {
    pub(crate) user_id: String,
    pub(crate) username: String,
    pub(crate) role: UserRole,
}

impl RequestContext {
    pub(crate) fn from_user(user: &User) -> Self {
        Self { user_id: user.id.clone(), username: user.username.clone(), role: user.role }
    }

    pub(crate) fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub(crate) fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub(crate) fn owns(&self, student_id: &str) -> bool {
        self.user_id == student_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Denied {
    NotOwner,
    StaffOnly,
    AdminOnly,
}

impl Denied {
    pub(crate) fn message(self) -> &'static str {
        match self {
            Denied::NotOwner => "You can only access your own quiz data",
            Denied::StaffOnly => "Tutor access required",
            Denied::AdminOnly => "Super tutor access required",
        }
    }
}

/// Student whose attempts a write operation targets. Attempts are always
/// written by their owner.
pub(crate) fn student_for_write(
    ctx: &RequestContext,
    requested: Option<&str>,
) -> Result<String, Denied> {
    match requested {
        Some(student_id) if !ctx.owns(student_id) => Err(Denied::NotOwner),
        _ => Ok(ctx.user_id.clone()),
    }
}

/// Student whose data a read operation targets. Staff may read anyone.
pub(crate) fn student_for_read(
    ctx: &RequestContext,
    requested: Option<&str>,
) -> Result<String, Denied> {
    match requested {
        None => Ok(ctx.user_id.clone()),
        Some(student_id) if ctx.owns(student_id) || ctx.is_staff() => Ok(student_id.to_string()),
        Some(_) => Err(Denied::NotOwner),
    }
}

pub(crate) fn can_read_attempt(ctx: &RequestContext, attempt_student_id: &str) -> bool {
    ctx.owns(attempt_student_id) || ctx.is_staff()
}

pub(crate) fn ensure_staff(ctx: &RequestContext) -> Result<(), Denied> {
    if ctx.is_staff() {
        Ok(())
    } else {
        Err(Denied::StaffOnly)
    }
}

pub(crate) fn ensure_admin(ctx: &RequestContext) -> Result<(), Denied> {
    if ctx.is_admin() {
        Ok(())
    } else {
        Err(Denied::AdminOnly)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Capability {
    TakeQuizzes,
    ViewOwnProgress,
    ReadFeedback,
    SendStudentFeedback,
    ReviewAttempts,
    ManageContent,
    SendFeedback,
    ResolveStudentFeedback,
    ManageUsers,
    DeleteFeedback,
}

/// Per-role view descriptor; clients switch on `view` instead of role strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub(crate) enum RoleView {
    Student { capabilities: Vec<Capability> },
    Tutor { capabilities: Vec<Capability> },
    SuperTutor { capabilities: Vec<Capability> },
}

impl RoleView {
    pub(crate) fn for_role(role: UserRole) -> Self {
        let capabilities = capabilities(role);
        match role {
            UserRole::Student => RoleView::Student { capabilities },
            UserRole::Tutor => RoleView::Tutor { capabilities },
            UserRole::SuperTutor => RoleView::SuperTutor { capabilities },
        }
    }
}

pub(crate) fn capabilities(role: UserRole) -> Vec<Capability> {
    use Capability::*;

    let staff = [ReviewAttempts, ManageContent, SendFeedback, ResolveStudentFeedback];
    match role {
        UserRole::Student => vec![TakeQuizzes, ViewOwnProgress, ReadFeedback, SendStudentFeedback],
        UserRole::Tutor => {
            let mut caps = vec![TakeQuizzes, ViewOwnProgress];
            caps.extend(staff);
            caps
        }
        UserRole::SuperTutor => {
            let mut caps = vec![TakeQuizzes, ViewOwnProgress];
            caps.extend(staff);
            caps.extend([ManageUsers, DeleteFeedback]);
            caps
        }
    }
}
