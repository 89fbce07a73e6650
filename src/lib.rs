pub mod config;
pub mod io;
pub mod metrics;
pub mod pipeline;
pub mod preprocessors;

// Re-export public API
pub use config::*;
pub use io::*;
pub use metrics::*;
pub use pipeline::*;
pub use preprocessors::*;
pub use tabula_core::*;
pub use tabula_models::*;
