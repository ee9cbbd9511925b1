//! protac-reinvent CLI
//!
//! `--run` selects the mode:
//! - `data`  - download and curate the TACK and synthetic datasets
//! - `tl`    - one transfer-learning run
//! - `rl`    - one reinforcement-learning run
//! - `both`  - TL synthetic -> TL TACK -> RL -> RL (second-stage scoring)
//! - `rl_s2` - one reinforcement-learning run with second-stage scoring
//! - `board` - TensorBoard on a run folder

pub mod runtime;

pub use runtime::Cli;
