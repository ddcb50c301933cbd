pub mod actions;
pub mod engine;
pub mod output;
pub mod prompt;
pub mod steplog;
pub mod trimmer;
