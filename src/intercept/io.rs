//! Blocking I/O wrapper
//!
//! [`Intercepted`] wraps any `Read`, `Write` or `Seek` implementation and
//! reports each call before forwarding it. Reads map to `read`, writes to
//! `write`, flushes to `fflush` and seeks to `lseek`.

use super::{intercepted_call, symbols};
use std::io::{self, IoSlice, IoSliceMut, Read, Seek, SeekFrom, Write};

#[derive(Debug, Default)]
pub struct Intercepted<T> {
    inner: T,
}

impl<T> Intercepted<T> {
    pub const fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> From<T> for Intercepted<T> {
    fn from(inner: T) -> Self {
        Self::new(inner)
    }
}

impl<T: Read> Read for Intercepted<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        intercepted_call(symbols::READ);
        self.inner.read(buf)
    }

    fn read_vectored(&mut self, bufs: &mut [IoSliceMut<'_>]) -> io::Result<usize> {
        intercepted_call(symbols::READ);
        self.inner.read_vectored(bufs)
    }
}

impl<T: Write> Write for Intercepted<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        intercepted_call(symbols::WRITE);
        self.inner.write(buf)
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        intercepted_call(symbols::WRITE);
        self.inner.write_vectored(bufs)
    }

    fn flush(&mut self) -> io::Result<()> {
        intercepted_call(symbols::FFLUSH);
        self.inner.flush()
    }
}

impl<T: Seek> Seek for Intercepted<T> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        intercepted_call(symbols::LSEEK);
        self.inner.seek(pos)
    }
}
