//! Open file handles and open modes.

use std::any::Any;
use std::fmt;
use std::io::{Read, Seek, Write};

bitflags::bitflags! {
    /// Mode bits for [`crate::Backend::open`].
    pub struct OpenMode: u32 {
        const READ = 0b001;
        const WRITE = 0b010;
        const APPEND = 0b100;
        const READ_WRITE = Self::READ.bits | Self::WRITE.bits;
    }
}

/// An open handle returned by a backend.
///
/// Handles close when dropped. Read-only handles report write attempts
/// through the usual `io::Error` channel rather than panicking.
pub trait VfsFile: fmt::Debug + Send + Read + Write + Seek + Upcastable {}

/// Trait needed to get downcasting from `VfsFile` to work.
pub trait Upcastable {
    fn upcast_any_ref(&self) -> &dyn Any;
    fn upcast_any_mut(&mut self) -> &mut dyn Any;
    fn upcast_any_box(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any + fmt::Debug + 'static> Upcastable for T {
    #[inline]
    fn upcast_any_ref(&self) -> &dyn Any {
        self
    }
    #[inline]
    fn upcast_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    #[inline]
    fn upcast_any_box(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl dyn VfsFile + 'static {
    #[inline]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.upcast_any_ref().downcast_ref::<T>()
    }
    #[inline]
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.upcast_any_mut().downcast_mut::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    #[derive(Debug)]
    struct CursorFile(Cursor<Vec<u8>>);

    impl Read for CursorFile {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.read(buf)
        }
    }

    impl Write for CursorFile {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            self.0.flush()
        }
    }

    impl Seek for CursorFile {
        fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
            self.0.seek(pos)
        }
    }

    impl VfsFile for CursorFile {}

    #[test]
    fn downcast_recovers_concrete_type() {
        let file: Box<dyn VfsFile> = Box::new(CursorFile(Cursor::new(b"x".to_vec())));
        assert!(file.downcast_ref::<CursorFile>().is_some());
        assert!(file.downcast_ref::<u32>().is_none());
    }

    #[test]
    fn mode_composition() {
        assert_eq!(OpenMode::READ | OpenMode::WRITE, OpenMode::READ_WRITE);
        assert!(OpenMode::READ_WRITE.contains(OpenMode::READ));
        assert!(!OpenMode::READ.contains(OpenMode::APPEND));
    }
}
