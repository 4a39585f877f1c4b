//! Built-in controllers

pub mod install;
pub mod status;

pub use install::InstallController;
pub use status::StatusController;
