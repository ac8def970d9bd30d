mod local_fs;

pub use local_fs::{create_destination, discard_destination, ensure_directory};
