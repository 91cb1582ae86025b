//! Herald dispatch engine.
//!
//! The core pipeline: validate/authorize a notify request (`intake`), fan the
//! formatted message out to every authorized chat (`dispatcher` over
//! `transport`), append one audit row per attempt (`recorder`), and reduce
//! the outcomes into a client-facing summary (`summary`). The registries and
//! `history` serve the admin surface on top of the same tables.

pub mod chats;
pub mod dispatcher;
pub mod history;
pub mod intake;
pub mod recorder;
pub mod services;
pub mod summary;
pub mod transport;
