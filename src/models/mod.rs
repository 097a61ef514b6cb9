// Re-export all model types for ease of use

pub mod inventory;
pub mod scan;

pub use inventory::*;
pub use scan::*;
