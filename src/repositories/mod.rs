pub(crate) mod answers;
pub(crate) mod health;
pub(crate) mod options;
pub(crate) mod questions;
pub(crate) mod responses;
pub(crate) mod retakes;
pub(crate) mod surveys;
pub(crate) mod users;
