pub mod config;
pub mod core;
pub mod desktop;
pub mod phone;
pub mod status;
pub mod ui;
