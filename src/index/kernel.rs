//! Bulk decay kernels for the predecessor table
//!
//! Every step of both passes lowers every table entry to at most the current
//! LCP. That is a data-parallel `min` over a contiguous `u16` slice, so the
//! kernel is vectorized where the CPU allows it:
//!
//! - x86_64: AVX2 (16 lanes) or SSE4.1 (8 lanes), `min_epu16`
//! - aarch64: NEON (8 lanes), `vminq_u16`
//! - anything else: scalar loop
//!
//! All kernels produce identical results; `tests` checks each one that the
//! running CPU supports against the scalar loop.

#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

#[cfg(target_arch = "aarch64")]
use core::arch::aarch64::*;

/// Implementation of `values[i] = min(values[i], bound)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayKernel {
    Scalar,
    Sse41,
    Avx2,
    Neon,
}

impl DecayKernel {
    /// Fastest kernel supported by the running CPU
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("avx2") {
                return Self::Avx2;
            }
            if is_x86_feature_detected!("sse4.1") {
                return Self::Sse41;
            }
        }
        #[cfg(target_arch = "aarch64")]
        {
            if std::arch::is_aarch64_feature_detected!("neon") {
                return Self::Neon;
            }
        }
        Self::Scalar
    }

    /// Whether the running CPU can execute this kernel
    pub fn is_supported(self) -> bool {
        match self {
            Self::Scalar => true,
            #[cfg(target_arch = "x86_64")]
            Self::Sse41 => is_x86_feature_detected!("sse4.1"),
            #[cfg(target_arch = "x86_64")]
            Self::Avx2 => is_x86_feature_detected!("avx2"),
            #[cfg(target_arch = "aarch64")]
            Self::Neon => std::arch::is_aarch64_feature_detected!("neon"),
            #[allow(unreachable_patterns)]
            _ => false,
        }
    }

    /// All kernels the running CPU supports
    pub fn available() -> Vec<Self> {
        [Self::Scalar, Self::Sse41, Self::Avx2, Self::Neon]
            .into_iter()
            .filter(|k| k.is_supported())
            .collect()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Sse41 => "sse4.1",
            Self::Avx2 => "avx2",
            Self::Neon => "neon",
        }
    }

    /// Lower every value to at most `bound`. Kernels the CPU lacks fall back
    /// to the scalar loop.
    #[inline]
    pub fn apply(self, values: &mut [u16], bound: u16) {
        match self {
            #[cfg(target_arch = "x86_64")]
            Self::Avx2 if self.is_supported() => unsafe { decay_avx2(values, bound) },
            #[cfg(target_arch = "x86_64")]
            Self::Sse41 if self.is_supported() => unsafe { decay_sse41(values, bound) },
            #[cfg(target_arch = "aarch64")]
            Self::Neon if self.is_supported() => unsafe { decay_neon(values, bound) },
            _ => decay_scalar(values, bound),
        }
    }
}

#[inline]
pub fn decay_scalar(values: &mut [u16], bound: u16) {
    for value in values.iter_mut() {
        *value = (*value).min(bound);
    }
}

/// Caller must check `is_x86_feature_detected!("avx2")`.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn decay_avx2(values: &mut [u16], bound: u16) {
    let mut chunks = values.chunks_exact_mut(16);
    unsafe {
        let limit = _mm256_set1_epi16(bound as i16);
        for chunk in &mut chunks {
            let ptr = chunk.as_mut_ptr() as *mut __m256i;
            let lanes = _mm256_loadu_si256(ptr);
            _mm256_storeu_si256(ptr, _mm256_min_epu16(lanes, limit));
        }
    }
    decay_scalar(chunks.into_remainder(), bound);
}

/// Caller must check `is_x86_feature_detected!("sse4.1")`.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.1")]
unsafe fn decay_sse41(values: &mut [u16], bound: u16) {
    let mut chunks = values.chunks_exact_mut(8);
    unsafe {
        let limit = _mm_set1_epi16(bound as i16);
        for chunk in &mut chunks {
            let ptr = chunk.as_mut_ptr() as *mut __m128i;
            let lanes = _mm_loadu_si128(ptr);
            _mm_storeu_si128(ptr, _mm_min_epu16(lanes, limit));
        }
    }
    decay_scalar(chunks.into_remainder(), bound);
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn decay_neon(values: &mut [u16], bound: u16) {
    let mut chunks = values.chunks_exact_mut(8);
    unsafe {
        let limit = vdupq_n_u16(bound);
        for chunk in &mut chunks {
            let ptr = chunk.as_mut_ptr();
            vst1q_u16(ptr, vminq_u16(vld1q_u16(ptr), limit));
        }
    }
    decay_scalar(chunks.into_remainder(), bound);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pseudo_random(len: usize, seed: u64) -> Vec<u16> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (state >> 48) as u16
            })
            .collect()
    }

    #[test]
    fn test_kernels_match_scalar() {
        // Lengths straddle every lane width so the remainders are exercised
        for len in [0, 1, 7, 8, 9, 15, 16, 17, 33, 256 * 3 + 5] {
            for bound in [0, 1, 300, 32768, u16::MAX] {
                let input = pseudo_random(len, len as u64 * 31 + bound as u64);
                let mut expected = input.clone();
                decay_scalar(&mut expected, bound);

                for kernel in DecayKernel::available() {
                    let mut actual = input.clone();
                    kernel.apply(&mut actual, bound);
                    assert_eq!(actual, expected, "{} len={} bound={}", kernel.name(), len, bound);
                }
            }
        }
    }

    #[test]
    fn test_values_above_i16_range() {
        // min_epu16 must compare unsigned, not signed
        let mut values = vec![40_000u16; 32];
        values[3] = 10;
        DecayKernel::detect().apply(&mut values, 35_000);
        assert_eq!(values[0], 35_000);
        assert_eq!(values[3], 10);
    }

    #[test]
    fn test_detect_is_supported() {
        let kernel = DecayKernel::detect();
        assert!(kernel.is_supported());
        assert!(DecayKernel::available().contains(&DecayKernel::Scalar));
    }
}
