pub mod error;
pub mod estimator;
pub mod extractor;
pub mod frame;
pub mod io;
pub mod signal;
pub mod window;

pub use error::*;
pub use estimator::*;
pub use extractor::*;
pub use frame::*;
pub use signal::*;
pub use window::*;
