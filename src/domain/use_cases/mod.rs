pub mod extractors;
pub mod files;
