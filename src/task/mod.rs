// src/task/mod.rs

//! Task abstraction.
//!
//! - [`key`]: `"<Category>.<Name>"` instance identity.
//! - [`data`]: scalar job data that survives restarts.
//! - [`context`]: per-firing execution context with its cancellation token.
//! - [`descriptor`]: static job metadata handed to the scheduler.
//! - [`unit`]: the [`TaskUnit`] trait and the wrapper that applies the
//!   progress lifecycle and error policy around every task body.

pub mod context;
pub mod data;
pub mod descriptor;
pub mod key;
pub mod unit;

pub use context::JobContext;
pub use data::{JobData, JobValue};
pub use descriptor::{TaskDescriptor, TaskDescriptorBuilder};
pub use key::TaskInstanceKey;
pub use unit::{check_for_interrupt, job_key, run_task_unit, TaskExit, TaskFuture, TaskUnit};
