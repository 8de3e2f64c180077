pub mod file_names;
pub mod valid_uuid;
