pub(crate) mod auth;
pub(crate) mod content;
pub(crate) mod errors;
pub(crate) mod feedback;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod pagination;
pub(crate) mod router;
pub(crate) mod rpc;
pub(crate) mod storage;
pub(crate) mod users;
pub(crate) mod validation;
