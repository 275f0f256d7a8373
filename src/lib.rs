pub mod config;
pub mod dashboard;
pub mod data;
pub mod logging;
pub mod render;
pub mod views;
