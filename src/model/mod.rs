pub mod api_doc;
pub mod common;
pub mod request;

pub use api_doc::*;
pub use common::*;
pub use request::*;
