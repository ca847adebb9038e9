//! HTTP route handlers grouped by resource domain.
//!
//! Each submodule corresponds to a logical area of the API (search,
//! bulk message operations, background jobs) and exposes typed Rocket
//! handlers annotated with `#[openapi]` so `rocket_okapi` can derive
//! an OpenAPI document automatically.

pub mod delete;
pub mod health;
pub mod jobs;
pub mod search;
