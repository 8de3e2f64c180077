pub mod variants;

pub use variants::{generate_variants, ImageVariants};
