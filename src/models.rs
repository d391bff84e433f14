pub mod dashboard;
pub mod session;
pub mod table;
pub mod vote;
