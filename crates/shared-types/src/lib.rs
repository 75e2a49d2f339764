pub mod config;
pub mod error;
pub mod report;
pub mod triage;

pub use config::*;
pub use error::*;
pub use report::*;
pub use triage::*;
