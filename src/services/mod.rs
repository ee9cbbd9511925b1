pub mod board;

pub use board::{latest_run_dir, launch};
