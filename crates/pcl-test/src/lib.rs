pub mod fs;

pub use fs::{create_dir, create_file, write_file};
pub use scopeguard::defer;
