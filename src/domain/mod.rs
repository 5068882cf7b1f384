pub mod id;
pub mod order;
pub mod status;

pub use id::*;
pub use order::*;
pub use status::*;
