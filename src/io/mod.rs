//! I/O primitives shared by the TIFF reader and writer

pub mod traits;
pub mod byte_order;

pub use traits::{SeekableReader, SeekableWriter};
pub use byte_order::{ByteOrder, ByteOrderHandler};
