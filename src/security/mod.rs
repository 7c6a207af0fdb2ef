mod wipe;

pub use wipe::{overwrite_and_remove, wipe_dir};
