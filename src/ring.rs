//! Memory-mapped submission/completion ring, talking to the kernel
//! directly through the three `io_uring` syscalls and `mmap`. No
//! external `io_uring` crate is used here: the whole point of this
//! module is the acquire/release discipline across the shared-memory
//! boundary described in spec §§3–4.1.

use std::io;
use std::os::unix::io::RawFd;
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::constants::{enter_flag, mmap_offset, syscall};

/// Submission Queue Entry — kernel ABI, 64 bytes. Only the fields the
/// core loop fills are named individually; the rest of the union space
/// is zeroed on acquisition and never touched.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Sqe {
    pub opcode: u8,
    pub flags: u8,
    pub ioprio: u16,
    pub fd: i32,
    pub off: u64,
    pub addr: u64,
    pub len: u32,
    pub op_flags: u32,
    pub user_data: u64,
    pub buf_index: u16,
    pub personality: u16,
    pub splice_fd_in: i32,
    pub __pad2: [u64; 2],
}

impl Default for Sqe {
    fn default() -> Self {
        unsafe { std::mem::zeroed() }
    }
}

/// Completion Queue Entry — kernel ABI, 16 bytes.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Cqe {
    pub user_data: u64,
    pub res: i32,
    pub flags: u32,
}

#[repr(C)]
#[derive(Default)]
struct IoSqringOffsets {
    head: u32,
    tail: u32,
    ring_mask: u32,
    ring_entries: u32,
    flags: u32,
    dropped: u32,
    array: u32,
    resv1: u32,
    resv2: u64,
}

#[repr(C)]
#[derive(Default)]
struct IoCqringOffsets {
    head: u32,
    tail: u32,
    ring_mask: u32,
    ring_entries: u32,
    overflow: u32,
    cqes: u32,
    resv: [u64; 2],
}

#[repr(C)]
#[derive(Default)]
struct IoUringParams {
    sq_entries: u32,
    cq_entries: u32,
    flags: u32,
    sq_thread_cpu: u32,
    sq_thread_idle: u32,
    features: u32,
    wq_fd: u32,
    resv: [u32; 3],
    sq_off: IoSqringOffsets,
    cq_off: IoCqringOffsets,
}

unsafe fn io_uring_setup(entries: u32, params: *mut IoUringParams) -> io::Result<RawFd> {
    let ret = unsafe { libc::syscall(syscall::IO_URING_SETUP, entries, params) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ret as RawFd)
}

unsafe fn io_uring_enter(
    fd: RawFd,
    to_submit: u32,
    min_complete: u32,
    flags: u32,
) -> io::Result<u32> {
    let ret = unsafe {
        libc::syscall(
            syscall::IO_URING_ENTER,
            fd,
            to_submit,
            min_complete,
            flags,
            ptr::null_mut::<libc::sigset_t>(),
            0usize,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ret as u32)
}

fn mmap_region(fd: RawFd, len: usize, offset: i64) -> io::Result<*mut libc::c_void> {
    let ptr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED | libc::MAP_POPULATE,
            fd,
            offset,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(io::Error::last_os_error());
    }
    Ok(ptr)
}

unsafe fn field_ptr<T>(base: *mut libc::c_void, offset: u32) -> *mut T {
    unsafe { (base as *mut u8).add(offset as usize) as *mut T }
}

/// Error from [`Ring::get_sqe`]: the private submission backlog already
/// holds `sq_entries` unflushed SQEs. Non-fatal — see spec §7.
#[derive(Debug, Clone, Copy)]
pub struct QueueFull;

struct SqRing {
    head: *const AtomicU32,
    tail: *mut AtomicU32,
    mask: u32,
    entries: u32,
    array: *mut u32,
    sqes: *mut Sqe,
    sqe_head: u32,
    sqe_tail: u32,
    map_ptr: *mut libc::c_void,
    map_len: usize,
    sqes_ptr: *mut libc::c_void,
    sqes_len: usize,
}

struct CqRing {
    head: *mut AtomicU32,
    tail: *const AtomicU32,
    mask: u32,
    cqes: *const Cqe,
    map_ptr: *mut libc::c_void,
    map_len: usize,
}

/// Owns the three shared-memory regions of one `io_uring` instance and
/// the syscall protocol to drive it.
pub struct Ring {
    fd: RawFd,
    sq: SqRing,
    cq: CqRing,
}

impl Ring {
    /// Set up a ring with `entries` submission slots (rounded up to a
    /// power of two by the kernel) and `mmap` all three shared regions.
    pub fn new(entries: u32) -> io::Result<Self> {
        let mut params = IoUringParams::default();
        let fd = unsafe { io_uring_setup(entries, &mut params as *mut _)? };

        let setup_result = (|| -> io::Result<(SqRing, CqRing)> {
            let sq_ring_len = params.sq_off.array as usize
                + params.sq_entries as usize * std::mem::size_of::<u32>();
            let sq_map = mmap_region(fd, sq_ring_len, mmap_offset::SQ_RING)?;

            let sqes_len = params.sq_entries as usize * std::mem::size_of::<Sqe>();
            let sqes_map = match mmap_region(fd, sqes_len, mmap_offset::SQES) {
                Ok(p) => p,
                Err(e) => {
                    unsafe { libc::munmap(sq_map, sq_ring_len) };
                    return Err(e);
                }
            };

            let cq_ring_len = params.cq_off.cqes as usize
                + params.cq_entries as usize * std::mem::size_of::<Cqe>();
            let cq_map = match mmap_region(fd, cq_ring_len, mmap_offset::CQ_RING) {
                Ok(p) => p,
                Err(e) => {
                    unsafe {
                        libc::munmap(sq_map, sq_ring_len);
                        libc::munmap(sqes_map, sqes_len);
                    }
                    return Err(e);
                }
            };

            let sq = SqRing {
                head: unsafe { field_ptr(sq_map, params.sq_off.head) },
                tail: unsafe { field_ptr(sq_map, params.sq_off.tail) },
                mask: unsafe { *field_ptr::<u32>(sq_map, params.sq_off.ring_mask) },
                entries: unsafe { *field_ptr::<u32>(sq_map, params.sq_off.ring_entries) },
                array: unsafe { field_ptr(sq_map, params.sq_off.array) },
                sqes: sqes_map as *mut Sqe,
                sqe_head: 0,
                sqe_tail: 0,
                map_ptr: sq_map,
                map_len: sq_ring_len,
                sqes_ptr: sqes_map,
                sqes_len,
            };

            let cq = CqRing {
                head: unsafe { field_ptr(cq_map, params.cq_off.head) },
                tail: unsafe { field_ptr(cq_map, params.cq_off.tail) },
                mask: unsafe { *field_ptr::<u32>(cq_map, params.cq_off.ring_mask) },
                cqes: unsafe { field_ptr(cq_map, params.cq_off.cqes) },
                map_ptr: cq_map,
                map_len: cq_ring_len,
            };

            Ok((sq, cq))
        })();

        match setup_result {
            Ok((sq, cq)) => Ok(Self { fd, sq, cq }),
            Err(e) => {
                unsafe { libc::close(fd) };
                Err(e)
            }
        }
    }

    pub fn sq_entries(&self) -> u32 {
        self.sq.entries
    }

    /// Reserve the next private SQE slot. Returns `Err(QueueFull)` if
    /// the unflushed backlog already equals `sq_entries`. The caller
    /// fills every field it cares about; the rest are zero.
    pub fn get_sqe(&mut self) -> Result<&mut Sqe, QueueFull> {
        let head = unsafe { (*self.sq.head).load(Ordering::Acquire) };
        if self.sq.sqe_tail.wrapping_add(1).wrapping_sub(head) > self.sq.entries {
            return Err(QueueFull);
        }
        let slot = (self.sq.sqe_tail & self.sq.mask) as usize;
        let sqe = unsafe { &mut *self.sq.sqes.add(slot) };
        *sqe = Sqe::default();
        self.sq.sqe_tail = self.sq.sqe_tail.wrapping_add(1);
        Ok(sqe)
    }

    /// Publish every SQE filled since the last flush into the kernel's
    /// SQ array and bump `sq_tail` with release ordering. Returns the
    /// number of SQEs made visible.
    pub fn flush_sq(&mut self) -> u32 {
        let mask = self.sq.mask;
        let mut tail = unsafe { (*self.sq.tail).load(Ordering::Relaxed) };
        let to_submit = self.sq.sqe_tail.wrapping_sub(self.sq.sqe_head);
        for _ in 0..to_submit {
            let idx = self.sq.sqe_head & mask;
            unsafe {
                *self.sq.array.add((tail & mask) as usize) = idx;
            }
            tail = tail.wrapping_add(1);
            self.sq.sqe_head = self.sq.sqe_head.wrapping_add(1);
        }
        if to_submit > 0 {
            unsafe { (*self.sq.tail).store(tail, Ordering::Release) };
        }
        to_submit
    }

    /// Flush pending SQEs and call `io_uring_enter` without waiting for
    /// completions.
    pub fn submit(&mut self) -> io::Result<u32> {
        let to_submit = self.flush_sq();
        if to_submit == 0 {
            return Ok(0);
        }
        unsafe { io_uring_enter(self.fd, to_submit, 0, 0) }
    }

    /// Flush pending SQEs and call `io_uring_enter` asking the kernel to
    /// block until at least `wait_nr` completions are available.
    pub fn submit_and_wait(&mut self, wait_nr: u32) -> io::Result<u32> {
        let to_submit = self.flush_sq();
        unsafe { io_uring_enter(self.fd, to_submit, wait_nr, enter_flag::GETEVENTS) }
    }

    /// Snapshot the completion queue's kernel-visible head/tail, copy out
    /// every pending CQE, and publish the new `cq_head` with release
    /// ordering so the kernel can reclaim those slots. No new SQE should
    /// be submitted in between (spec §5 ordering rule: CQEs are
    /// processed in ring order within one iteration).
    pub fn drain_cqes(&mut self) -> Vec<Cqe> {
        let head = unsafe { (*self.cq.head).load(Ordering::Relaxed) };
        let tail = unsafe { (*self.cq.tail).load(Ordering::Acquire) };
        let mask = self.cq.mask;
        let count = tail.wrapping_sub(head);
        let mut out = Vec::with_capacity(count as usize);
        for i in 0..count {
            let idx = (head.wrapping_add(i) & mask) as usize;
            out.push(unsafe { *self.cq.cqes.add(idx) });
        }
        if count > 0 {
            unsafe { (*self.cq.head).store(tail, Ordering::Release) };
        }
        out
    }
}

impl Drop for Ring {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.sq.map_ptr, self.sq.map_len);
            libc::munmap(self.sq.sqes_ptr, self.sq.sqes_len);
            libc::munmap(self.cq.map_ptr, self.cq.map_len);
            libc::close(self.fd);
        }
    }
}

// The ring's shared memory is only ever touched from the single loop
// thread that owns the `Ring`; `Send` lets it be constructed and then
// moved into that thread.
unsafe impl Send for Ring {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "requires a kernel with io_uring support"]
    fn setup_and_teardown() {
        let ring = Ring::new(8).expect("io_uring_setup failed");
        assert!(ring.sq_entries() >= 8);
    }

    #[test]
    #[ignore = "requires a kernel with io_uring support"]
    fn nop_round_trip() {
        let mut ring = Ring::new(8).expect("io_uring_setup failed");
        {
            let sqe = ring.get_sqe().expect("queue full");
            sqe.opcode = crate::constants::opcode::NOP;
            sqe.user_data = 42;
        }
        ring.submit_and_wait(1).expect("submit_and_wait failed");
        let cqes = ring.drain_cqes();
        assert_eq!(cqes.len(), 1);
        assert_eq!(cqes[0].user_data, 42);
    }
}
