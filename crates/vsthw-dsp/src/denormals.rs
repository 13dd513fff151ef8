//! Flush-to-zero / denormals-are-zero handling for the audio callback.

#[cfg(all(feature = "simd", target_arch = "x86_64"))]
const DAZ_FTZ: u32 = 0x8040;

/// Sets the FTZ and DAZ flags for the lifetime of the guard and restores the
/// previous MXCSR value on drop. A no-op on targets without SSE control.
#[derive(Debug)]
pub struct NoDenormalsGuard {
    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    prev: u32,
}

impl NoDenormalsGuard {
    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    #[inline]
    #[allow(deprecated)]
    pub fn new() -> Self {
        use core::arch::x86_64::{_mm_getcsr, _mm_setcsr};
        // SAFETY: reading and writing MXCSR only changes float rounding
        // behaviour of the current thread.
        let prev = unsafe { _mm_getcsr() };
        unsafe { _mm_setcsr(prev | DAZ_FTZ) };
        Self { prev }
    }

    #[cfg(not(all(feature = "simd", target_arch = "x86_64")))]
    #[inline]
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for NoDenormalsGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(feature = "simd", target_arch = "x86_64"))]
impl Drop for NoDenormalsGuard {
    #[allow(deprecated)]
    fn drop(&mut self) {
        use core::arch::x86_64::_mm_setcsr;
        // SAFETY: restores the value captured in `new`.
        unsafe { _mm_setcsr(self.prev) };
    }
}
