pub mod platform;
pub mod properties;
pub mod request;

pub use platform::*;
pub use properties::*;
pub use request::*;
