pub mod analyser;
pub mod change_tracker;
pub mod config;
pub mod document;
pub mod error;
pub mod position_dict;
pub mod server;
