//! `Read`/`Write` adapters over CLAP state streams.
//!
//! Two directions are needed: the host hands the bridge `clap_istream`/
//! `clap_ostream` pointers that the state codec consumes through
//! [`HostInputStream`] and [`HostOutputStream`], and the bridge hands the
//! managed side sub-streams backed by Rust readers and writers through
//! [`ReaderStream`] and [`WriterStream`].
//!
//! Hosts may transfer fewer bytes than requested per call; the `Read` and
//! `Write` impls are plain pass-throughs and leave looping to the callers
//! (`read_exact`/`write_all`), while transient `Interrupted` errors on the
//! Rust side are retried a bounded number of times.

use crate::util::{slice_from_external_parts, slice_from_external_parts_mut};
use clap_sys::stream::{clap_istream, clap_ostream};
use std::ffi::c_void;
use std::io::{ErrorKind, Read, Write};
use std::marker::PhantomData;

/// An error code returned by a CLAP stream callback.
#[derive(Copy, Clone, Debug)]
pub struct StreamError {
    code: i64,
}

impl StreamError {
    pub fn code(&self) -> i64 {
        self.code
    }
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CLAP stream error (code: {})", self.code)
    }
}

impl std::error::Error for StreamError {}

/// A host-provided stream the bridge reads state from.
pub struct HostInputStream<'a> {
    raw: &'a clap_istream,
}

impl<'a> HostInputStream<'a> {
    /// # Safety
    ///
    /// The pointer must be a valid `clap_istream` for the lifetime `'a`.
    pub unsafe fn from_raw(raw: *const clap_istream) -> Option<Self> {
        raw.as_ref().map(|raw| Self { raw })
    }
}

impl Read for HostInputStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let Some(read) = self.raw.read else {
            return Ok(0);
        };

        // SAFETY: the stream and its callback are valid per from_raw.
        let ret = unsafe { read(self.raw, buf.as_mut_ptr().cast(), buf.len() as u64) };
        match ret {
            i if i >= 0 => usize::try_from(i).map_err(std::io::Error::other),
            code => Err(std::io::Error::other(StreamError { code })),
        }
    }
}

/// A host-provided stream the bridge writes state to.
pub struct HostOutputStream<'a> {
    raw: &'a clap_ostream,
}

impl<'a> HostOutputStream<'a> {
    /// # Safety
    ///
    /// The pointer must be a valid `clap_ostream` for the lifetime `'a`.
    pub unsafe fn from_raw(raw: *const clap_ostream) -> Option<Self> {
        raw.as_ref().map(|raw| Self { raw })
    }
}

impl Write for HostOutputStream<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let Some(write) = self.raw.write else {
            return Ok(0);
        };

        // SAFETY: the stream and its callback are valid per from_raw.
        let ret = unsafe { write(self.raw, buf.as_ptr().cast(), buf.len() as u64) };
        match ret {
            i if i >= 0 => usize::try_from(i).map_err(std::io::Error::other),
            code => Err(std::io::Error::other(StreamError { code })),
        }
    }

    #[inline]
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Presents a Rust reader as a `clap_istream` for the managed side.
#[repr(C)]
pub struct ReaderStream<'a>(clap_istream, PhantomData<&'a mut ()>);

impl<'a> ReaderStream<'a> {
    pub fn new<R: Read + 'a>(reader: &'a mut R) -> Self {
        Self(
            clap_istream {
                ctx: (reader as *mut R).cast(),
                read: Some(read_thunk::<R>),
            },
            PhantomData,
        )
    }

    #[inline]
    pub fn as_raw(&self) -> *const clap_istream {
        &self.0
    }
}

/// Presents a Rust writer as a `clap_ostream` for the managed side.
#[repr(C)]
pub struct WriterStream<'a>(clap_ostream, PhantomData<&'a mut ()>);

impl<'a> WriterStream<'a> {
    pub fn new<W: Write + 'a>(writer: &'a mut W) -> Self {
        Self(
            clap_ostream {
                ctx: (writer as *mut W).cast(),
                write: Some(write_thunk::<W>),
            },
            PhantomData,
        )
    }

    #[inline]
    pub fn as_raw(&self) -> *const clap_ostream {
        &self.0
    }
}

unsafe extern "C" fn read_thunk<R: Read>(
    istream: *const clap_istream,
    buffer: *mut c_void,
    size: u64,
) -> i64 {
    // SAFETY: ctx was set from an exclusive &mut R in ReaderStream::new.
    let reader = &mut *((*istream).ctx as *mut R);
    let size = usize::try_from(size).unwrap_or(isize::MAX as usize);
    // SAFETY: the caller passes a buffer of at least `size` bytes.
    let buffer = slice_from_external_parts_mut(buffer.cast::<u8>(), size);

    match retry_interrupted(|| reader.read(buffer)) {
        Ok(read) => read as i64,
        Err(_) => -1,
    }
}

unsafe extern "C" fn write_thunk<W: Write>(
    ostream: *const clap_ostream,
    buffer: *const c_void,
    size: u64,
) -> i64 {
    // SAFETY: ctx was set from an exclusive &mut W in WriterStream::new.
    let writer = &mut *((*ostream).ctx as *mut W);
    let size = usize::try_from(size).unwrap_or(isize::MAX as usize);
    // SAFETY: the caller passes a buffer of at least `size` bytes.
    let buffer = slice_from_external_parts(buffer.cast::<u8>(), size);

    match retry_interrupted(|| writer.write(buffer)) {
        Ok(written) => written as i64,
        Err(_) => -1,
    }
}

fn retry_interrupted(
    mut operation: impl FnMut() -> std::io::Result<usize>,
) -> std::io::Result<usize> {
    const MAX_ATTEMPTS: u8 = 5;
    let mut attempts = 0u8;

    loop {
        match operation() {
            Err(e) if e.kind() == ErrorKind::Interrupted && attempts < MAX_ATTEMPTS => {
                attempts += 1
            }
            res => return res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reader_stream_feeds_the_raw_callback() {
        let mut cursor = Cursor::new(b"Hello".to_vec());
        let stream = ReaderStream::new(&mut cursor);

        let mut buf = [0u8; 5];
        // SAFETY: the stream was just built over a live reader.
        let read = unsafe {
            ((*stream.as_raw()).read.unwrap())(stream.as_raw(), buf.as_mut_ptr().cast(), 5)
        };
        assert_eq!(read, 5);
        assert_eq!(&buf, b"Hello");
    }

    #[test]
    fn writer_stream_collects_raw_writes() {
        let mut sink = Vec::new();
        let stream = WriterStream::new(&mut sink);

        // SAFETY: the stream was just built over a live writer.
        let written = unsafe {
            ((*stream.as_raw()).write.unwrap())(stream.as_raw(), b"state".as_ptr().cast(), 5)
        };
        assert_eq!(written, 5);
        drop(stream);
        assert_eq!(sink, b"state");
    }

    #[test]
    fn host_streams_round_trip_through_rust_io() {
        let mut source = Cursor::new(b"abcdef".to_vec());
        let istream = ReaderStream::new(&mut source);
        // SAFETY: the istream raw pointer is alive for this scope.
        let mut host_read = unsafe { HostInputStream::from_raw(istream.as_raw()) }.unwrap();

        let mut out = Vec::new();
        host_read.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcdef");
    }
}
