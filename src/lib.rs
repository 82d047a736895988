pub mod app;
pub mod audio;
pub mod config;
pub mod library;
pub mod model;
pub mod session;
pub mod ui;
pub mod view;
