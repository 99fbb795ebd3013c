pub mod agent;
pub mod definition;
pub mod helpers;
pub mod settings;
