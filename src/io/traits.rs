//! Core I/O traits

use std::io::{Read, Seek, Write};

/// Readers that support both reading and seeking
///
/// Implemented for any type that implements [`Read`], [`Seek`], [`Send`]
/// and [`Sync`], so files, buffered files and in-memory cursors all qualify.
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}

/// Writers that can go back and patch bytes already written
///
/// The TIFF writer streams rows first and fixes up the header once the
/// directory offset is known.
pub trait SeekableWriter: Write + Seek {}

impl<T: Write + Seek> SeekableWriter for T {}
