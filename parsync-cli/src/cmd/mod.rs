pub mod config;
pub mod progress;
pub mod run;
pub mod strategies;
pub mod validate;
