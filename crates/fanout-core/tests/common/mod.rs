#![allow(dead_code)]

pub mod coordinator;
pub mod file_server;
