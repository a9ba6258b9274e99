pub mod session;
pub mod telemetry;

pub use session::*;
pub use telemetry::*;
