//! # taskflow-task
//!
//! In-memory task registry, status notification hub and execution engine.
//!
//! ## Components
//!
//! - [`TaskRegistry`] - every task record, behind one lock
//! - [`NotificationHub`] - per-task status fan-out to any number of readers
//! - [`TaskManager`] - runs each task on its own tokio task through an
//!   injected [`Executor`], bounded by run slots and an admission limit
//! - [`TaskService`] - string-keyed operations used by clients
//!
//! ## Lifecycle
//!
//! ```text
//! QUEUED -> IN_PROGRESS -> COMPLETED
//!                       -> FAILED
//! ```
//!
//! Every transition is written to the registry before it is published, so a
//! poll never lags behind what a stream reader has already seen.

pub mod executor;
pub mod hub;
pub mod manager;
pub mod registry;
pub mod service;
pub mod state;
pub mod stats;
pub mod task;

pub use executor::{Executor, FnExecutor, SimulatedExecutor};
pub use hub::{NotificationHub, PublishReport, StatusSubscription};
pub use manager::TaskManager;
pub use registry::TaskRegistry;
pub use service::TaskService;
pub use state::{TaskStatus, UNKNOWN_TASK};
pub use stats::Statistics;
pub use task::{Task, TaskId};
