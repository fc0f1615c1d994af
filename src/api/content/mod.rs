pub(crate) mod categories;
pub(crate) mod difficulty_levels;
pub(crate) mod questions;

use serde::Deserialize;

use crate::services::access_policy::RequestContext;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct VisibilityQuery {
    #[serde(default)]
    #[serde(alias = "includeInactive")]
    include_inactive: bool,
}

impl VisibilityQuery {
    /// Inactive rows are only ever visible to staff.
    pub(crate) fn include_inactive(&self, ctx: &RequestContext) -> bool {
        self.include_inactive && ctx.is_staff()
    }
}

#[cfg(test)]
mod tests;
