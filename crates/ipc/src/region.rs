//! Shared-memory region layout and POSIX mapping.

use std::ffi::CString;
use std::sync::atomic::{AtomicU32, AtomicU64};

use patchbay_common::error::{PatchbayError, PatchbayResult};

/// "PBAY" — stored last during writer initialization, so a reader that
/// sees it can trust the geometry fields.
pub(crate) const MAGIC: u32 = 0x5042_4159;

/// Slots per channel. Two publishes separate a slot's publication from
/// its reuse, which keeps a reader copying at normal speed off the slot
/// the writer is filling.
pub(crate) const SLOT_COUNT: u32 = 3;

/// `current` value before the first publish.
pub(crate) const INITIAL_SLOT: u32 = SLOT_COUNT - 1;

/// Channel-wide header at offset zero.
#[repr(C)]
pub(crate) struct ChannelHeader {
    pub magic: AtomicU32,
    pub width: AtomicU32,
    pub height: AtomicU32,
    pub channels: AtomicU32,
    /// Index of the most recently published slot. Release-stored after
    /// the slot contents are complete; acquire-loaded by readers.
    pub current: AtomicU32,
    _pad: u32,
}

/// Per-slot header preceding the pixel bytes.
#[repr(C)]
pub(crate) struct FrameHeader {
    /// Seqlock word: odd while the writer is inside the slot. Readers
    /// validate it around their copy to reject a torn frame when the
    /// writer has lapped them.
    pub seq: AtomicU64,
    /// Producer timestamp of the slot's frame; the reserved no-frame
    /// value until the slot is first written.
    pub timestamp: AtomicU64,
    pub flipped: AtomicU32,
    _pad: u32,
}

fn align8(value: usize) -> usize {
    (value + 7) & !7
}

/// Byte offset of slot `index` from the start of the region.
pub(crate) fn slot_offset(frame_bytes: usize, index: u32) -> usize {
    align8(std::mem::size_of::<ChannelHeader>()) + slot_stride(frame_bytes) * index as usize
}

/// Distance between consecutive slots, padded so every `FrameHeader`
/// stays 8-byte aligned.
pub(crate) fn slot_stride(frame_bytes: usize) -> usize {
    align8(std::mem::size_of::<FrameHeader>() + frame_bytes)
}

/// Total region size for the given frame geometry.
pub(crate) fn region_size(frame_bytes: usize) -> usize {
    slot_offset(frame_bytes, SLOT_COUNT)
}

/// Validate a channel name and derive the shm object path.
fn shm_path(name: &str) -> PatchbayResult<CString> {
    if name.is_empty() || name.len() > 240 {
        return Err(PatchbayError::ipc(format!(
            "channel name length must be 1..=240, got {}",
            name.len()
        )));
    }
    if name.contains('/') || name.contains('\0') {
        return Err(PatchbayError::ipc(format!(
            "channel name must not contain '/' or NUL: {name:?}"
        )));
    }
    CString::new(format!("/{name}"))
        .map_err(|_| PatchbayError::ipc(format!("channel name is not a valid path: {name:?}")))
}

/// A mapped POSIX shared-memory object.
///
/// The creating side owns the name and unlinks it on drop; attaching
/// sides only unmap.
pub(crate) struct ShmRegion {
    ptr: *mut u8,
    len: usize,
    path: CString,
    owns_name: bool,
}

// All access to the mapping goes through the atomics in the headers or
// seqlock-guarded byte copies; the raw pointer itself is never handed out.
unsafe impl Send for ShmRegion {}
unsafe impl Sync for ShmRegion {}

impl ShmRegion {
    /// Create a fresh region of exactly `len` bytes. Fails with
    /// `ChannelExists` if the name is already taken.
    pub fn create(name: &str, len: usize) -> PatchbayResult<Self> {
        let path = shm_path(name)?;
        let fd = unsafe {
            libc::shm_open(
                path.as_ptr(),
                libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
                0o600 as libc::mode_t,
            )
        };
        if fd < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EEXIST) {
                return Err(PatchbayError::ChannelExists {
                    name: name.to_string(),
                });
            }
            return Err(PatchbayError::ipc(format!(
                "shm_open({name:?}) failed: {err}"
            )));
        }

        if unsafe { libc::ftruncate(fd, len as libc::off_t) } != 0 {
            let err = std::io::Error::last_os_error();
            unsafe {
                libc::close(fd);
                libc::shm_unlink(path.as_ptr());
            }
            return Err(PatchbayError::ipc(format!(
                "ftruncate({name:?}, {len}) failed: {err}"
            )));
        }

        let ptr = Self::map(fd, len);
        unsafe { libc::close(fd) };
        match ptr {
            Ok(ptr) => Ok(Self {
                ptr,
                len,
                path,
                owns_name: true,
            }),
            Err(error) => {
                unsafe { libc::shm_unlink(path.as_ptr()) };
                Err(error)
            }
        }
    }

    /// Create, unlinking any stale region left behind by a crashed
    /// writer first.
    pub fn create_or_replace(name: &str, len: usize) -> PatchbayResult<Self> {
        let path = shm_path(name)?;
        unsafe { libc::shm_unlink(path.as_ptr()) };
        Self::create(name, len)
    }

    /// Attach to an existing region. Fails with `ChannelNotFound` if no
    /// writer has created the name.
    pub fn open(name: &str) -> PatchbayResult<Self> {
        let path = shm_path(name)?;
        let fd = unsafe { libc::shm_open(path.as_ptr(), libc::O_RDWR, 0) };
        if fd < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::ENOENT) {
                return Err(PatchbayError::ChannelNotFound {
                    name: name.to_string(),
                });
            }
            return Err(PatchbayError::ipc(format!(
                "shm_open({name:?}) failed: {err}"
            )));
        }

        let mut stat = std::mem::MaybeUninit::<libc::stat>::uninit();
        if unsafe { libc::fstat(fd, stat.as_mut_ptr()) } != 0 {
            let err = std::io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(PatchbayError::ipc(format!(
                "fstat({name:?}) failed: {err}"
            )));
        }
        let len = unsafe { stat.assume_init() }.st_size as usize;
        if len < align8(std::mem::size_of::<ChannelHeader>()) {
            unsafe { libc::close(fd) };
            return Err(PatchbayError::ipc(format!(
                "channel {name:?} region is too small ({len} bytes)"
            )));
        }

        let ptr = Self::map(fd, len);
        unsafe { libc::close(fd) };
        Ok(Self {
            ptr: ptr?,
            len,
            path,
            owns_name: false,
        })
    }

    fn map(fd: libc::c_int, len: usize) -> PatchbayResult<*mut u8> {
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(PatchbayError::ipc(format!(
                "mmap({len} bytes) failed: {}",
                std::io::Error::last_os_error()
            )));
        }
        Ok(ptr as *mut u8)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn header(&self) -> &ChannelHeader {
        unsafe { &*(self.ptr as *const ChannelHeader) }
    }

    pub fn slot_header(&self, frame_bytes: usize, index: u32) -> &FrameHeader {
        debug_assert!(index < SLOT_COUNT);
        unsafe {
            &*(self.ptr.add(slot_offset(frame_bytes, index)) as *const FrameHeader)
        }
    }

    /// Pointer to the pixel bytes of slot `index`.
    pub fn slot_pixels(&self, frame_bytes: usize, index: u32) -> *mut u8 {
        debug_assert!(index < SLOT_COUNT);
        unsafe {
            self.ptr
                .add(slot_offset(frame_bytes, index) + std::mem::size_of::<FrameHeader>())
        }
    }
}

impl Drop for ShmRegion {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.len);
            if self.owns_name {
                libc::shm_unlink(self.path.as_ptr());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_layout_keeps_headers_aligned() {
        // 5x5x3 = 75 bytes, not a multiple of 8
        let stride = slot_stride(75);
        assert_eq!(stride % 8, 0);
        for index in 0..SLOT_COUNT {
            assert_eq!(slot_offset(75, index) % 8, 0);
        }
        assert_eq!(region_size(75), slot_offset(75, SLOT_COUNT));
    }

    #[test]
    fn test_bad_channel_names_are_rejected() {
        assert!(shm_path("").is_err());
        assert!(shm_path("a/b").is_err());
        assert!(shm_path(&"x".repeat(300)).is_err());
        assert!(shm_path("fine-name").is_ok());
    }
}
