//! Statistics derived from the loaded dataset and fetched price histories

pub mod fundamentals;
pub mod index_trend;
pub mod stock;

pub use fundamentals::*;
pub use index_trend::*;
pub use stock::*;
