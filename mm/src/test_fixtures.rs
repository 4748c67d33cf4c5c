//! Synthetic physical memory and allocators for host-side tests.

use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use spin::Mutex;

use hestfix_abi::addr::PhysAddr;
use hestfix_abi::{AllocError, MemoryClass, PAGE_SIZE};

use crate::frame_alloc::FrameAllocator;
use crate::phys::PhysMemory;

struct Region {
    base: u64,
    bytes: Vec<u8>,
}

impl Region {
    fn span(&self, addr: u64, len: usize) -> Option<core::ops::Range<usize>> {
        let start = addr.checked_sub(self.base)? as usize;
        let end = start.checked_add(len)?;
        if end <= self.bytes.len() { Some(start..end) } else { None }
    }
}

/// Physical memory made of explicitly mapped regions.
///
/// Any access that is not fully contained in one mapped region panics, so a
/// walker that strays past the bytes a test laid out fails loudly instead of
/// reading garbage.
pub struct SparseMemory {
    regions: Mutex<Vec<Region>>,
    reads: AtomicUsize,
}

impl SparseMemory {
    pub fn new() -> Self {
        Self {
            regions: Mutex::new(Vec::new()),
            reads: AtomicUsize::new(0),
        }
    }

    /// Map `bytes` at `base`. Later mappings shadow earlier overlapping ones.
    pub fn map(&self, base: PhysAddr, bytes: &[u8]) {
        self.regions.lock().insert(
            0,
            Region {
                base: base.as_u64(),
                bytes: bytes.to_vec(),
            },
        );
    }

    /// Copy `len` bytes out without counting it as a read.
    pub fn snapshot(&self, base: PhysAddr, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        self.access(base, len, |bytes| out.copy_from_slice(bytes));
        out
    }

    /// Number of `read_bytes` calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    fn access(&self, addr: PhysAddr, len: usize, f: impl FnOnce(&mut [u8])) {
        let mut regions = self.regions.lock();
        for region in regions.iter_mut() {
            if let Some(range) = region.span(addr.as_u64(), len) {
                f(&mut region.bytes[range]);
                return;
            }
        }
        panic!("unmapped physical access at {:#x} (+{} bytes)", addr.as_u64(), len);
    }
}

impl Default for SparseMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysMemory for SparseMemory {
    fn read_bytes(&self, addr: PhysAddr, buf: &mut [u8]) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.access(addr, buf.len(), |bytes| buf.copy_from_slice(bytes));
    }

    fn write_bytes(&self, addr: PhysAddr, data: &[u8]) {
        self.access(addr, data.len(), |bytes| bytes.copy_from_slice(data));
    }
}

/// Bump allocator with scripted failures.
///
/// Successful calls hand out consecutive page-aligned addresses starting at
/// `base`. Calls whose zero-based index was registered with
/// [`ScriptedAllocator::failing_at`] return the scripted error instead and
/// do not consume address space.
pub struct ScriptedAllocator {
    next: u64,
    failures: Vec<(usize, AllocError)>,
    calls: Vec<(usize, MemoryClass)>,
}

impl ScriptedAllocator {
    pub fn new(base: PhysAddr) -> Self {
        Self {
            next: base.as_u64(),
            failures: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Make call number `call` (zero-based) fail with `OutOfResources`.
    pub fn failing_at(self, call: usize) -> Self {
        self.failing_with(call, AllocError::OutOfResources)
    }

    pub fn failing_with(mut self, call: usize, err: AllocError) -> Self {
        self.failures.push((call, err));
        self
    }

    /// Every request seen so far as `(pages, class)`, failed ones included.
    pub fn calls(&self) -> &[(usize, MemoryClass)] {
        &self.calls
    }
}

impl FrameAllocator for ScriptedAllocator {
    fn allocate_pages(&mut self, pages: usize, class: MemoryClass) -> Result<PhysAddr, AllocError> {
        let index = self.calls.len();
        self.calls.push((pages, class));

        if let Some(&(_, err)) = self.failures.iter().find(|(call, _)| *call == index) {
            return Err(err);
        }

        let addr = PhysAddr::new(self.next);
        self.next += pages as u64 * PAGE_SIZE;
        Ok(addr)
    }
}
