#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod converge;
pub mod error;
pub mod render;
pub mod resource;
pub mod secrets;
pub mod settings;
