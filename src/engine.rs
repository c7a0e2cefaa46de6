pub mod modem;
pub mod primitives;
pub mod reduce;
pub mod subst;
pub mod types;
pub mod unparse;

#[cfg(test)]
mod tests;

pub use modem::*;
pub use reduce::*;
pub use subst::*;
pub use types::*;
pub use unparse::*;
