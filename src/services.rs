pub mod access;
pub mod auth;
pub mod directory;
pub mod notifications;
pub mod password;
pub mod requests;
pub mod session;
