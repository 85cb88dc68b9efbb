//! Filesystem manipulation operations.

mod directory;
pub use directory::create_dir;
pub use directory::remove_dir;

mod create_dir_all;
pub use create_dir_all::DirBuilder;
pub use create_dir_all::create_dir_all;

mod file;
pub use file::File;
pub use file::remove_file;
pub use file::rename;

mod open_options;
pub use open_options::OpenOptions;

mod statx;
pub use statx::StatxBuilder;
pub use statx::is_dir_regfile;
pub use statx::statx;

mod symlink;
pub use symlink::symlink;
