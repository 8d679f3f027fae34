pub mod artifact;
pub mod evaluation;
pub mod features;
pub mod models;
pub mod registry;
pub mod training;

pub use artifact::*;
pub use evaluation::*;
pub use features::*;
pub use models::*;
pub use registry::*;
pub use training::*;
