pub mod constants;
pub mod error;
pub mod method;
pub mod request;
pub mod response;

pub use constants::*;
pub use error::*;
pub use method::*;
pub use request::*;
pub use response::*;
