pub mod access;
pub mod drive;
pub mod invites;
pub mod vault;
