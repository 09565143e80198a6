mod double_buffered;
mod reservoir_buffers;

pub use self::double_buffered::*;
pub use self::reservoir_buffers::*;
