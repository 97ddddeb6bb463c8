pub mod config;
pub mod fetch;
pub mod links;
pub mod logging;
pub mod queue;
pub mod retry;
pub mod scheduler;
pub mod storage;
