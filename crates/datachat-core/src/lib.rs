pub mod config;
pub mod controllers;
pub mod dataset;
pub mod models;
pub mod services;
pub mod views;

pub use controllers::{CycleError, PageController};
pub use models::{ChatTurn, PngImage, Role, SessionState};
