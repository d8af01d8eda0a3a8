use num_complex::Complex64;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Real and imaginary parts of random amplitudes are drawn from this box.
pub const AMP_BOX: (f64, f64) = (-1.0, 1.0);

/// Reproducible generator for statevector initialisation.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

// uniform decimal in [min, max]
pub fn random_decimal<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    rng.gen_range(min..=max)
}

// each part drawn independently from its own bounds
pub fn random_complex<R: Rng + ?Sized>(rng: &mut R, min: Complex64, max: Complex64) -> Complex64 {
    Complex64::new(
        random_decimal(rng, min.re, max.re),
        random_decimal(rng, min.im, max.im),
    )
}
