pub mod error;
pub mod features;
pub mod games;
pub mod predictions;
pub mod stats;
pub mod training;

pub use error::*;
pub use features::*;
pub use games::*;
pub use predictions::*;
pub use stats::*;
pub use training::*;
