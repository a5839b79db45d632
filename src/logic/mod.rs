pub mod merge;
pub mod route_ops;
pub mod validate;

pub use merge::*;
pub use route_ops::*;
pub use validate::*;
