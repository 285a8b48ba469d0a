//! Aligned scratch buffer for the vector integrator.
//!
//! The step coordinator snapshots active particles into this buffer every
//! tick. It is grown monotonically (never shrinks) and freed when the
//! owning simulation drops. Alignment is fixed at the widest lane the
//! workspace supports (32 bytes for 256-bit AVX); narrower kernels are
//! satisfied by the same allocation.
//!
//! Allocation failure is reported as `ErrorKind::Memory` rather than
//! aborting, so the coordinator can fall back to in-place scalar
//! integration.

use core_error::{EngineError, Result};
use core_pool::Particle;
use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Natural alignment of the widest supported vector lane.
pub const SCRATCH_ALIGN: usize = 32;

#[derive(Debug)]
pub struct AlignedBuf {
    ptr: NonNull<Particle>,
    capacity: usize,
    len: usize,
}

// SAFETY: the buffer uniquely owns its allocation; there is no interior
// sharing. Moving it between threads moves ownership with it.
unsafe impl Send for AlignedBuf {}

impl AlignedBuf {
    pub const fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            capacity: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn layout_for(capacity: usize) -> Result<Layout> {
        Layout::from_size_align(capacity * size_of::<Particle>(), SCRATCH_ALIGN)
            .map_err(|_| EngineError::invalid_parameter("scratch capacity overflows a layout"))
    }

    /// Grow (never shrink) to hold at least `want` particles. Existing
    /// contents are preserved.
    pub fn ensure_capacity(&mut self, want: usize) -> Result<()> {
        if want <= self.capacity {
            return Ok(());
        }
        let new_capacity = want.next_power_of_two().max(64);
        let layout = Self::layout_for(new_capacity)?;
        // SAFETY: layout has non-zero size (new_capacity >= 64) and the
        // old region, if any, is copied before release.
        let raw = unsafe { alloc::alloc(layout) } as *mut Particle;
        let Some(ptr) = NonNull::new(raw) else {
            return Err(EngineError::memory("aligned scratch allocation failed"));
        };
        if self.capacity > 0 {
            // SAFETY: both regions are live, disjoint, and `len` fits in each.
            unsafe {
                std::ptr::copy_nonoverlapping(self.ptr.as_ptr(), ptr.as_ptr(), self.len);
                alloc::dealloc(
                    self.ptr.as_ptr() as *mut u8,
                    Self::layout_for(self.capacity).expect("existing layout was valid"),
                );
            }
        }
        self.ptr = ptr;
        self.capacity = new_capacity;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Append a particle. Capacity must have been ensured beforehand.
    pub fn push(&mut self, particle: Particle) {
        assert!(self.len < self.capacity, "scratch push past ensured capacity");
        // SAFETY: index is in bounds per the assertion above.
        unsafe {
            self.ptr.as_ptr().add(self.len).write(particle);
        }
        self.len += 1;
    }

    pub fn as_slice(&self) -> &[Particle] {
        // SAFETY: the first `len` slots are initialized.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        // SAFETY: as above, and we hold the unique reference.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Default for AlignedBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AlignedBuf {
    fn drop(&mut self) {
        if self.capacity > 0 {
            // SAFETY: allocated in ensure_capacity with this exact layout.
            unsafe {
                alloc::dealloc(
                    self.ptr.as_ptr() as *mut u8,
                    Self::layout_for(self.capacity).expect("existing layout was valid"),
                );
            }
        }
    }
}
