pub mod admin;
pub mod auth;
pub mod customer;
pub mod decisions;
pub mod guest;
pub mod proofs;
