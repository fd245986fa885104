// handlers/public/mod.rs - Public handlers (no session required)
//
// Token acquisition and service health. Every input is untrusted.

pub mod auth;
pub mod health;
