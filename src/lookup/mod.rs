pub mod http;
pub mod store_lookup;
pub mod traits;

pub use http::*;
pub use store_lookup::*;
pub use traits::*;
