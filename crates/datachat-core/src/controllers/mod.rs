pub mod page_controller;

pub use crate::services::CycleError;
pub use page_controller::{CycleOutcome, PageController};
