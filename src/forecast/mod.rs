pub mod baseline;
pub mod corrector;
pub mod engine;
pub mod features;
pub mod metrics;
pub mod orchestrator;
pub mod residual;

pub use baseline::*;
pub use corrector::*;
pub use engine::*;
pub use features::*;
pub use metrics::*;
pub use orchestrator::*;
pub use residual::*;
