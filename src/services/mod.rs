pub(crate) mod access_policy;
pub(crate) mod grading;
pub(crate) mod question_rules;
pub(crate) mod quiz_attempts;
pub(crate) mod storage;
