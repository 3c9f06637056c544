//! Row models and DTOs, one module per table group.

pub mod auth_token;
pub mod customer;
pub mod decision;
pub mod designer;
pub mod guest_access;
pub mod login_event;
pub mod notification;
pub mod proof;
pub mod proof_version;
pub mod user;
