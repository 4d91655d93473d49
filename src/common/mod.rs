pub mod paths;
pub mod progress;
pub mod retry;

pub use retry::{RetryPolicy, Retryable};
