// handlers/mod.rs - route handlers
//
// Update routes authenticate per request through the X-Access-Token header
// inside the authorization pipeline; read routes are public.

pub mod preferences;

pub use preferences::{get_preferences, get_verified, update_preferences, update_staff_mode};
