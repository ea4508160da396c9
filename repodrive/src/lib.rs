pub mod config;
pub mod logging;
pub mod shell;
pub mod storage;
pub mod sync;
