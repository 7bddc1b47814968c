mod files;
mod health;

pub use files::{create_file, delete_file, download_file, file_exists, get_file_info, list_files};
pub use health::health;
