mod feed;
mod model;
mod ops;

pub use feed::*;
pub use model::*;
pub use ops::*;
