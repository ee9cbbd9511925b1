pub mod layout;
pub mod run_mode;
pub mod smiles;

pub use layout::*;
pub use run_mode::*;
pub use smiles::*;
