pub mod check;
pub mod compat;
pub mod query;
pub mod watch;
