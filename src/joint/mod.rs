pub mod id;
pub mod mask;
pub mod pose;
pub mod rest;
pub mod topology;

pub use id::*;
pub use mask::*;
pub use pose::*;
pub use rest::*;
pub use topology::*;
