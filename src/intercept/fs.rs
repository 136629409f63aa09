//! Filesystem access

use super::io::Intercepted;
use super::{intercepted_call, symbols};
use std::io;
use std::path::Path;

/// A file whose reads, writes and seeks are intercepted
pub type File = Intercepted<std::fs::File>;

impl Intercepted<std::fs::File> {
    /// Open for reading (reported as `open`)
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        intercepted_call(symbols::OPEN);
        std::fs::File::open(path).map(Self::new)
    }

    /// Create or truncate for writing (reported as `open`)
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        intercepted_call(symbols::OPEN);
        std::fs::File::create(path).map(Self::new)
    }

    pub fn sync_all(&self) -> io::Result<()> {
        intercepted_call(symbols::FSYNC);
        self.get_ref().sync_all()
    }

    pub fn sync_data(&self) -> io::Result<()> {
        intercepted_call(symbols::FDATASYNC);
        self.get_ref().sync_data()
    }
}

pub fn read<P: AsRef<Path>>(path: P) -> io::Result<Vec<u8>> {
    intercepted_call(symbols::OPEN);
    std::fs::read(path)
}

pub fn read_to_string<P: AsRef<Path>>(path: P) -> io::Result<String> {
    intercepted_call(symbols::OPEN);
    std::fs::read_to_string(path)
}

pub fn write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> io::Result<()> {
    intercepted_call(symbols::OPEN);
    std::fs::write(path, contents)
}
