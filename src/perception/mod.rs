pub mod marker;
pub mod types;
