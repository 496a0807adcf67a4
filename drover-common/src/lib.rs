pub mod events;
pub mod logging;

pub use tracing;
