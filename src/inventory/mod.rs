pub mod builder;
pub mod normalizer;

pub use builder::ExecutionInventory;
pub use normalizer::{FormatError, NormalizedInventory};
