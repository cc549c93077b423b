mod process;
mod repo;

pub use process::run_with_timeout;
pub use repo::{GitRepo, LogOptions};
