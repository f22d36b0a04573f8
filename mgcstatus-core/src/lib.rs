pub mod aggregate;
pub mod analyze;
pub mod error;
pub mod gateway;
pub mod model;
pub mod progress;
pub mod report;
pub mod retry;
