//! Request handlers for resource collections.

mod list;
mod resources;

pub use list::*;
pub use resources::*;
