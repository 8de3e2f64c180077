pub mod entities;
pub mod use_cases;
pub mod file_metadata;
pub mod upload_policy;
