// src/acquisition/mod.rs
//! Sample acquisition and buffering components

pub mod sample_queue;
pub mod listener;
pub mod controller;
pub mod reader;

pub use sample_queue::*;
pub use listener::*;
pub use controller::*;
pub use reader::*;
