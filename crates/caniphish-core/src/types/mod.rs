//! Request and response types for the supply-chain scan endpoint.

mod request;
mod result;

pub use request::*;
pub use result::*;
