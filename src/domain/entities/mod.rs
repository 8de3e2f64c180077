pub mod file;
pub mod token;
