//! Foundation primitives shared by every layer.

mod checksum;
mod span;

pub use checksum::Checksum;
pub use span::Span;
