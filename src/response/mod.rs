pub mod directive;
pub mod extract;
pub mod repair;
