pub mod context;
pub mod definition;
pub mod mapping;
