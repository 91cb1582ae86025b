//! Herald HTTP API: the public notify endpoint plus the admin surface.

pub mod middleware;
pub mod routes;
pub mod state;
