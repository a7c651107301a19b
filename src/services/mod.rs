pub(crate) mod grading;
pub(crate) mod submission;
pub(crate) mod validation;
