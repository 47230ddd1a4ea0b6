#![allow(unknown_lints)] // non_local_definitions isn't in Rust 1.70
#![allow(non_local_definitions)]
//! Error types that can be emitted from this library

use std::borrow::Cow;
use displaydoc::Display;
use thiserror::Error;

use std::io;

/// Generic result type with ZipError as its error variant
pub type ZipResult<T> = Result<T, ZipError>;

/// Error type for Zip
#[derive(Debug, Display, Error)]
#[non_exhaustive]
pub enum ZipError {
    /// i/o error: {0}
    Io(#[from] io::Error),

    /// invalid Zip archive: {0}
    InvalidArchive(Cow<'static, str>),

    /// payload range {offset}+{len} is out of bounds for a buffer of {buf_len} bytes
    OutOfBounds {
        /// start of the requested range
        offset: usize,
        /// length of the requested range
        len: usize,
        /// length of the buffer
        buf_len: usize,
    },

    /// illegal writer state: {0}
    IllegalState(&'static str),
}

pub(crate) fn invalid_archive<T, M: Into<Cow<'static, str>>>(message: M) -> ZipResult<T> {
    Err(ZipError::InvalidArchive(message.into()))
}

impl From<ZipError> for io::Error {
    fn from(err: ZipError) -> io::Error {
        let kind = match &err {
            ZipError::Io(err) => err.kind(),
            ZipError::InvalidArchive(_) => io::ErrorKind::InvalidData,
            ZipError::OutOfBounds { .. } => io::ErrorKind::InvalidInput,
            ZipError::IllegalState(_) => io::ErrorKind::Other,
        };

        io::Error::new(kind, err)
    }
}
