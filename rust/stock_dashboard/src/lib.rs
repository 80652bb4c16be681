// src/lib.rs

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod form;
pub mod loader;
pub mod models;
pub mod render;
pub mod ui;
