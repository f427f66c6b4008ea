pub mod concert;
pub mod mapping;
