//! 2D sample patterns for baking and rendering.
//!
//! Every mode except `Random` is a pure function of `(index, sqrt_count, pattern)`,
//! so a bake can be restarted and will see the exact same sample positions.

use kiln_core::settings::{JitterMode, SampleMode};
use kiln_math::{Vec2, ONE_MINUS_EPSILON};
use rand::RngCore;

/// Uniform float in `[0, 1)` from 24 random bits.
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    (rng.next_u32() >> 8) as f32 * (1.0 / (1u32 << 24) as f32)
}

#[inline]
fn clamp_unit(v: Vec2) -> Vec2 {
    v.clamp(Vec2::ZERO, Vec2::splat(ONE_MINUS_EPSILON))
}

/// Sample `index` of an `sqrt_count x sqrt_count` pattern.
///
/// `index` wraps around the pattern size. `pattern` decorrelates patterns used
/// by different texels or pixels.
pub fn generate(index: u32, sqrt_count: u32, pattern: u32, mode: SampleMode, rng: &mut dyn RngCore) -> Vec2 {
    let n = sqrt_count.max(1);
    let count = n.saturating_mul(n);
    let index = index % count;
    let sample = match mode {
        SampleMode::Random => Vec2::new(gen_f32(rng), gen_f32(rng)),
        SampleMode::Stratified => {
            let (x, y) = (index % n, index / n);
            let jitter = Vec2::new(
                randfloat(index, pattern.wrapping_mul(0x51633e2d)),
                randfloat(index, pattern.wrapping_mul(0x68bc21eb)),
            );
            (Vec2::new(x as f32, y as f32) + jitter) / n as f32
        }
        SampleMode::Hammersley => hammersley(index, count),
        SampleMode::UniformGrid => {
            let (x, y) = (index % n, index / n);
            Vec2::new((x as f32 + 0.5) / n as f32, (y as f32 + 0.5) / n as f32)
        }
        SampleMode::Cmj => cmj(index, n, n, pattern),
    };
    clamp_unit(sample)
}

/// Van der Corput sequence in base 2.
#[inline]
pub fn radical_inverse_base2(index: u32) -> f32 {
    let v = index.reverse_bits() as f64 * (1.0 / 4_294_967_296.0);
    (v as f32).min(ONE_MINUS_EPSILON)
}

/// Point `index` of an `count` point Hammersley set.
pub fn hammersley(index: u32, count: u32) -> Vec2 {
    let count = count.max(1);
    Vec2::new(index as f32 / count as f32, radical_inverse_base2(index))
}

/// Kensler's hashed permutation of `i` in `[0, l)`.
fn permute(mut i: u32, l: u32, p: u32) -> u32 {
    if l <= 1 {
        return 0;
    }
    let mut w = l - 1;
    w |= w >> 1;
    w |= w >> 2;
    w |= w >> 4;
    w |= w >> 8;
    w |= w >> 16;
    loop {
        i ^= p;
        i = i.wrapping_mul(0xe170893d);
        i ^= p >> 16;
        i ^= (i & w) >> 4;
        i ^= p >> 8;
        i = i.wrapping_mul(0x0929eb3f);
        i ^= p >> 23;
        i ^= (i & w) >> 1;
        i = i.wrapping_mul(1 | p >> 27);
        i = i.wrapping_mul(0x6935fa69);
        i ^= (i & w) >> 11;
        i = i.wrapping_mul(0x74dcb303);
        i ^= (i & w) >> 2;
        i = i.wrapping_mul(0x9e501cc3);
        i ^= (i & w) >> 2;
        i = i.wrapping_mul(0xc860a3df);
        i &= w;
        i ^= i >> 5;
        if i < l {
            break;
        }
    }
    (i.wrapping_add(p)) % l
}

/// Hashed float in `[0, 1)`.
fn randfloat(mut i: u32, p: u32) -> f32 {
    i ^= p;
    i ^= i >> 17;
    i ^= i >> 10;
    i = i.wrapping_mul(0xb36534e5);
    i ^= i >> 12;
    i ^= i >> 21;
    i = i.wrapping_mul(0x93fc4795);
    i ^= 0xdf6e307f;
    i ^= i >> 17;
    i = i.wrapping_mul(1 | p >> 18);
    (i as f64 * (1.0 / 4_294_967_808.0)) as f32
}

/// Correlated multi-jittered sample `s` of an `m x n` pattern.
pub fn cmj(s: u32, m: u32, n: u32, p: u32) -> Vec2 {
    let (m, n) = (m.max(1), n.max(1));
    let s = s % (m * n);
    let sx = permute(s % m, m, p.wrapping_mul(0xa511e9b3));
    let sy = permute(s / m, n, p.wrapping_mul(0x63d83595));
    let jx = randfloat(s, p.wrapping_mul(0xa399d265));
    let jy = randfloat(s, p.wrapping_mul(0x711ad6a5));
    clamp_unit(Vec2::new(
        ((s % m) as f32 + (sy as f32 + jx) / n as f32) / m as f32,
        ((s / m) as f32 + (sx as f32 + jy) / m as f32) / n as f32,
    ))
}

/// Sub-pixel offset in `[-scale, scale]^2` for temporal accumulation.
pub fn taa_jitter(mode: JitterMode, frame: u64, scale: f32) -> Vec2 {
    let hammersley_offset = |count: u64| {
        let idx = (frame % count) as u32;
        hammersley(idx, count as u32) * 2.0 - Vec2::ONE
    };
    let jitter = match mode {
        JitterMode::None => Vec2::ZERO,
        JitterMode::Uniform2x => Vec2::splat(if frame % 2 == 0 { -0.5 } else { 0.5 }),
        JitterMode::Hammersley4x => hammersley_offset(4),
        JitterMode::Hammersley8x => hammersley_offset(8),
        JitterMode::Hammersley16x => hammersley_offset(16),
    };
    jitter * scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DETERMINISTIC: [SampleMode; 4] = [
        SampleMode::Stratified,
        SampleMode::Hammersley,
        SampleMode::UniformGrid,
        SampleMode::Cmj,
    ];

    #[test]
    fn test_deterministic_modes_repeat() {
        let mut rng_a = StdRng::seed_from_u64(1);
        let mut rng_b = StdRng::seed_from_u64(99);
        for mode in DETERMINISTIC {
            for i in 0..64 {
                let a = generate(i, 8, 17, mode, &mut rng_a);
                let b = generate(i, 8, 17, mode, &mut rng_b);
                assert_eq!(a, b, "{:?} sample {}", mode, i);
            }
        }
    }

    #[test]
    fn test_all_modes_in_unit_square() {
        let mut rng = StdRng::seed_from_u64(5);
        for &mode in SampleMode::ALL {
            for sqrt in [1, 2, 7, 16] {
                for i in 0..sqrt * sqrt {
                    let s = generate(i, sqrt, i * 31 + 3, mode, &mut rng);
                    assert!(s.x >= 0.0 && s.x < 1.0, "{:?} {:?}", mode, s);
                    assert!(s.y >= 0.0 && s.y < 1.0, "{:?} {:?}", mode, s);
                }
            }
        }
    }

    #[test]
    fn test_stratified_modes_cover_every_cell() {
        let mut rng = StdRng::seed_from_u64(0);
        let n = 6;
        for mode in [SampleMode::Stratified, SampleMode::UniformGrid, SampleMode::Cmj] {
            let mut cells = vec![false; (n * n) as usize];
            for i in 0..n * n {
                let s = generate(i, n, 11, mode, &mut rng);
                let (x, y) = ((s.x * n as f32) as u32, (s.y * n as f32) as u32);
                cells[(y * n + x) as usize] = true;
            }
            assert!(cells.iter().all(|&c| c), "{:?}", mode);
        }
    }

    #[test]
    fn test_cmj_is_latin_hypercube() {
        let n = 8u32;
        let count = (n * n) as usize;
        let mut cols = vec![false; count];
        let mut rows = vec![false; count];
        for s in 0..n * n {
            let p = cmj(s, n, n, 1234);
            cols[((p.x * count as f32) as usize).min(count - 1)] = true;
            rows[((p.y * count as f32) as usize).min(count - 1)] = true;
        }
        assert!(cols.iter().all(|&c| c));
        assert!(rows.iter().all(|&r| r));
    }

    #[test]
    fn test_index_wraps() {
        let mut rng = StdRng::seed_from_u64(0);
        let a = generate(3, 4, 9, SampleMode::Cmj, &mut rng);
        let b = generate(3 + 16, 4, 9, SampleMode::Cmj, &mut rng);
        assert_eq!(a, b);
    }

    #[test]
    fn test_hammersley() {
        assert_eq!(hammersley(0, 4), Vec2::new(0.0, 0.0));
        assert_eq!(hammersley(1, 4), Vec2::new(0.25, 0.5));
        assert_eq!(hammersley(2, 4), Vec2::new(0.5, 0.25));
        assert_eq!(radical_inverse_base2(3), 0.75);
    }

    #[test]
    fn test_taa_jitter() {
        assert_eq!(taa_jitter(JitterMode::None, 3, 1.0), Vec2::ZERO);
        assert_eq!(taa_jitter(JitterMode::Uniform2x, 0, 1.0), Vec2::splat(-0.5));
        assert_eq!(taa_jitter(JitterMode::Uniform2x, 1, 2.0), Vec2::splat(1.0));
        assert_eq!(taa_jitter(JitterMode::Hammersley4x, 1, 1.0), Vec2::new(-0.5, 0.0));
        // sequence repeats
        assert_eq!(
            taa_jitter(JitterMode::Hammersley8x, 3, 1.0),
            taa_jitter(JitterMode::Hammersley8x, 11, 1.0)
        );
    }
}
