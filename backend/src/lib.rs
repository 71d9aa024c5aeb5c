//! Task tracking REST service.
//!
//! Requests flow `routes` → [`service::TaskService`] → [`rules`] →
//! [`store::TaskStore`].

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod rules;
pub mod service;
pub mod store;

pub use config::AppConfig;
pub use error::{TaskError, TaskResult};
pub use routes::{router, AppState};
pub use service::TaskService;
