//! Typed access to memory-mapped UART registers.
//!
//! Access rights are part of the register type, so writing to a status
//! register declared read-only fails to compile:
//!
//! ```rust,compile_fail
//! # use serial_core::mmio::{MmioRegister, ReadOnly};
//! # use core::ptr::NonNull;
//! #
//! let mut value = 0_u32;
//! let reg = MmioRegister::<ReadOnly, u32>::new(NonNull::from(&mut value));
//! unsafe { reg.write(42) };
//! ```

use core::{marker::PhantomData, ptr::NonNull};

trait Sealed {}
#[expect(private_bounds, reason = "Forbid impl `Access`")]
pub trait Access: Sealed {}

pub trait ReadAccess: Access {}
pub trait WriteAccess: Access {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOnly;
impl Sealed for ReadOnly {}
impl Access for ReadOnly {}
impl ReadAccess for ReadOnly {}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOnly;
impl Sealed for WriteOnly {}
impl Access for WriteOnly {}
impl WriteAccess for WriteOnly {}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadWrite;
impl Sealed for ReadWrite {}
impl Access for ReadWrite {}
impl ReadAccess for ReadWrite {}
impl WriteAccess for ReadWrite {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A memory-mapped register.
///
/// Every access is a single volatile load or store of `T`. The wrapper does
/// not synchronize: callers serialize read-modify-write sequences.
pub struct MmioRegister<A: Access, T> {
    ptr: NonNull<T>,
    _access: PhantomData<A>,
}

// SAFETY: Device registers are not tied to the thread that mapped them.
// Accesses are unsafe and callers are responsible for ordering them.
unsafe impl<A: Access, T: Send> Send for MmioRegister<A, T> {}
unsafe impl<A: Access, T: Sync> Sync for MmioRegister<A, T> {}

impl<A: Access, T> MmioRegister<A, T> {
    #[must_use]
    #[inline]
    pub const fn new(ptr: NonNull<T>) -> Self {
        Self {
            ptr,
            _access: PhantomData,
        }
    }

    #[must_use]
    #[inline]
    pub const fn as_non_null(&self) -> NonNull<T> {
        self.ptr
    }

    #[must_use]
    #[inline]
    /// Returns the register `offset` bytes after this one.
    ///
    /// # Safety
    ///
    /// The resulting address must lie in the same mapping.
    /// See `core::ptr::byte_add`.
    pub const unsafe fn byte_add(&self, offset: usize) -> Self {
        Self {
            ptr: unsafe { self.ptr.byte_add(offset) },
            _access: PhantomData,
        }
    }

    #[must_use]
    #[inline]
    pub const fn cast<U>(&self) -> MmioRegister<A, U> {
        MmioRegister {
            ptr: self.ptr.cast(),
            _access: PhantomData,
        }
    }
}

impl<A: ReadAccess, T> MmioRegister<A, T> {
    #[must_use]
    #[inline]
    /// Reads the register.
    ///
    /// # Safety
    ///
    /// The register must be mapped and reading it must have no side effect
    /// the caller is not prepared for.
    pub unsafe fn read(&self) -> T {
        unsafe { self.ptr.read_volatile() }
    }
}

impl<A: WriteAccess, T> MmioRegister<A, T> {
    #[inline]
    /// Writes the register.
    ///
    /// # Safety
    ///
    /// The register must be mapped.
    pub unsafe fn write(&self, value: T) {
        unsafe { self.ptr.write_volatile(value) };
    }
}

impl<A: ReadAccess + WriteAccess, T> MmioRegister<A, T> {
    #[inline]
    /// Read-modify-write.
    ///
    /// # Safety
    ///
    /// Same as `read` and `write`. The sequence is not atomic.
    pub unsafe fn update<F: FnOnce(T) -> T>(&self, f: F) {
        unsafe { self.write(f(self.read())) };
    }

    #[must_use]
    #[inline]
    pub const fn lower_access<B: Access>(&self) -> MmioRegister<B, T> {
        MmioRegister {
            ptr: self.ptr,
            _access: PhantomData,
        }
    }
}
