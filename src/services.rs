pub mod account;
pub mod mutations;
pub mod sorting;
pub mod votes;
