//! HTTP surface and in-process scheduler for the digest dispatcher.
//!
//! Routes mirror the hosted deployment so an external cron service can keep
//! calling `GET /api/send-daily-email` unchanged.

pub mod handlers;
pub mod scheduler;
pub mod server;

pub use scheduler::{spawn_scheduler, DigestSchedule, ScheduleError};
pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
