pub(crate) mod answers;
pub(crate) mod attempts;
pub(crate) mod categories;
pub(crate) mod difficulty_levels;
pub(crate) mod feedback;
pub(crate) mod health;
pub(crate) mod questions;
pub(crate) mod student_feedback;
pub(crate) mod users;
