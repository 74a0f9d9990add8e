pub mod config;
pub mod instrument;
pub mod inventory;
pub mod status;
pub mod student;
