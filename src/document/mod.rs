pub mod index;
pub mod loader;

pub use index::SpecIndex;
pub use loader::{load_document, parse_document, to_yaml_string, write_document};
