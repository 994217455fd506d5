//! Core functionality of the bridge

pub mod bluetooth;
