pub mod clock;
pub mod ids;
pub mod resource;
pub mod telemetry;

pub use clock::*;
pub use ids::*;
pub use resource::*;
pub use telemetry::*;
