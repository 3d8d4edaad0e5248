// src/hal/mod.rs
//! Interface to the vendor event loop and the devices it drives

pub mod traits;
pub mod types;
pub mod simulator;

pub use traits::*;
pub use types::*;
