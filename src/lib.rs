pub mod calc;
pub mod config;
pub mod db;
pub mod families;
pub mod ipc;
pub mod logging;
pub mod model;
pub mod source;
