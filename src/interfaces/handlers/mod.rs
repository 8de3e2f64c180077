pub mod files;
pub mod home;
pub mod json_error;
pub mod system;
