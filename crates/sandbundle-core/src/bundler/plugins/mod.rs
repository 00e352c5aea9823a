//! Built-in plugins.

mod define;
mod load;
mod resolve;

pub use define::DefinePlugin;
pub use load::LoadPlugin;
pub use resolve::ResolvePlugin;
