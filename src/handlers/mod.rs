// handlers/mod.rs - Handler tiers
//
// Public (no session) → Protected (session required, and for everything under
// /api/users/:user_id, the caller must be that user)

pub mod protected;
pub mod public;
