//! Discovery and control of networked projectors over their vendor HTTP
//! control interfaces.

pub mod cli;
pub mod config;
pub mod device_control;
pub mod error;
pub mod results;
pub mod scanner;

#[cfg(test)]
pub mod test_utils;
