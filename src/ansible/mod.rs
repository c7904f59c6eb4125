pub mod engine;
pub mod runner;

pub use engine::{AnsibleCli, AutomationEngine};
pub use runner::ExecutionRunner;
