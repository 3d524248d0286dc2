//! Traits the dispatcher drives.
//!
//! Implementations run on the serialized execution context, so none of the
//! returned futures need to be `Send`, and decodable images need not be
//! `Send` at all. The collaborators themselves are moved onto the context when
//! it starts and must be `Send`.

mod cache;
mod image;
mod stream;

pub use cache::*;
pub use image::*;
pub use stream::*;
