//! Command implementations.

mod inspect;
mod run;
mod validate;

pub use inspect::run_inspect;
pub use run::run_drive;
pub use validate::run_validate;
