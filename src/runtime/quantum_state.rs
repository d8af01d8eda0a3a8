use std::fmt;

use num_complex::Complex64;
use rand::Rng;
use rayon::prelude::*; // import rayon for parallel reductions
use serde::{Deserialize, Serialize};

use crate::bits::pow2;
use crate::error::{QuantumError, Result};
use crate::qft::{self, QftMethod};
use crate::random::{random_complex, seeded_rng, AMP_BOX};
use crate::runtime::Execution;
use crate::vectorization;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// Reserves `2^num_qubits` slots of `fill`, reporting failure instead of
/// aborting when the buffer cannot be had.
pub fn allocate_amplitudes<T: Clone>(num_qubits: usize, fill: T) -> Result<Vec<T>> {
    if num_qubits >= usize::BITS as usize {
        return Err(QuantumError::TooManyQubits { num_qubits });
    }
    let len = pow2(num_qubits);
    let bytes = len
        .checked_mul(std::mem::size_of::<T>())
        .filter(|&b| b <= isize::MAX as usize)
        .ok_or(QuantumError::TooManyQubits { num_qubits })?;

    let mut amps = Vec::new();
    amps.try_reserve_exact(len)
        .map_err(|_| QuantumError::Allocation { num_qubits, bytes })?;
    amps.resize(len, fill);

    log::debug!("allocated {} amplitudes ({} bytes)", len, bytes);
    Ok(amps)
}

/// Dense statevector of `2^n` amplitudes, owned by whoever created it.
///
/// Kernels mutate the buffer in place and never resize it. Deserialised
/// states go through the same length check as [`QuantumState::from_amplitudes`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(try_from = "RawState")]
pub struct QuantumState {
    n: usize,
    amps: Vec<Complex64>,
}

// unchecked wire form
#[derive(Deserialize)]
struct RawState {
    n: usize,
    amps: Vec<Complex64>,
}

impl TryFrom<RawState> for QuantumState {
    type Error = QuantumError;

    fn try_from(raw: RawState) -> Result<Self> {
        let len = raw.amps.len();
        let state = QuantumState::from_amplitudes(raw.amps)?;
        if state.n != raw.n {
            return Err(QuantumError::QubitCountMismatch {
                num_qubits: raw.n,
                len,
            });
        }
        Ok(state)
    }
}

impl QuantumState {
    /// Allocates `2^num_qubits` amplitudes. The contents are zero until one
    /// of the `init_*` methods runs.
    pub fn create(num_qubits: usize) -> Result<Self> {
        let amps = allocate_amplitudes(num_qubits, ZERO)?;
        Ok(QuantumState { n: num_qubits, amps })
    }

    /// |0...0>
    pub fn new(num_qubits: usize) -> Result<Self> {
        let mut state = Self::create(num_qubits)?;
        state.init_zero();
        Ok(state)
    }

    pub fn from_amplitudes(amps: Vec<Complex64>) -> Result<Self> {
        let n = crate::runtime::qubits_for_len(amps.len())?;
        Ok(QuantumState { n, amps })
    }

    pub fn num_qubits(&self) -> usize {
        self.n
    }

    pub fn len(&self) -> usize {
        self.amps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amps.is_empty()
    }

    pub fn amps(&self) -> &[Complex64] {
        &self.amps
    }

    pub fn amps_mut(&mut self) -> &mut [Complex64] {
        &mut self.amps
    }

    pub fn into_amplitudes(self) -> Vec<Complex64> {
        self.amps
    }

    pub fn get(&self, index: usize) -> Option<&Complex64> {
        self.amps.get(index)
    }

    pub fn init_zero(&mut self) {
        self.amps.par_iter_mut().for_each(|amp| *amp = ZERO);
        self.amps[0] = ONE;
    }

    // not normalised, only for micro benchmarks where the norm is irrelevant
    pub fn init_ones(&mut self) {
        self.amps.par_iter_mut().for_each(|amp| *amp = ONE);
    }

    /// Fills every amplitude from the `[-1, 1] + i[-1, 1]` box and rescales
    /// so the squared magnitudes sum to one.
    pub fn init_random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let lo = Complex64::new(AMP_BOX.0, AMP_BOX.0);
        let hi = Complex64::new(AMP_BOX.1, AMP_BOX.1);

        // first pass: fill and accumulate
        let mut mag = 0.0;
        for amp in self.amps.iter_mut() {
            *amp = random_complex(rng, lo, hi);
            mag += amp.norm_sqr();
        }

        // second pass: rescale
        if mag > 0.0 {
            let norm = mag.sqrt();
            self.amps.iter_mut().for_each(|amp| *amp /= norm);
        } else {
            log::warn!("random statevector had zero norm, resetting to |0...0>");
            self.init_zero();
        }
    }

    pub fn init_random_seeded(&mut self, seed: u64) {
        let mut rng = seeded_rng(seed);
        self.init_random(&mut rng);
    }

    pub fn norm_sqr_sum(&self) -> f64 {
        self.amps.par_iter().map(|a| a.norm_sqr()).sum()
    }

    pub fn normalize(&mut self) {
        let norm_sqr = self.norm_sqr_sum();
        if norm_sqr > 1e-12 {
            let norm = norm_sqr.sqrt();
            self.amps.par_iter_mut().for_each(|amp| *amp /= norm);
        } else {
            log::warn!("state has (near) zero norm, resetting to |0...0>");
            self.init_zero();
        }
    }

    // probabilities without measuring
    pub fn get_probabilities(&self) -> Vec<f64> {
        self.amps.par_iter().map(|a| a.norm_sqr()).collect()
    }

    // checks for nan/inf and normalisation within 1e-9
    pub fn validate_state(&self) -> std::result::Result<(), String> {
        if self.amps.par_iter().any(|a| a.re.is_nan() || a.im.is_nan()) {
            return Err("quantum state contains NaN values.".to_string());
        }
        if self.amps.par_iter().any(|a| a.re.is_infinite() || a.im.is_infinite()) {
            return Err("quantum state contains infinite values.".to_string());
        }
        let norm_sqr_sum = self.norm_sqr_sum();
        if (norm_sqr_sum - 1.0).abs() > 1e-9 {
            return Err(format!(
                "quantum state is not normalized. norm squared: {}",
                norm_sqr_sum
            ));
        }
        Ok(())
    }

    pub fn apply_h(&mut self, target: usize, exec: Execution) -> Result<()> {
        vectorization::apply_hadamard(&mut self.amps, target, exec)
    }

    pub fn apply_controlled_phase(
        &mut self,
        control: usize,
        target: usize,
        theta: f64,
        exec: Execution,
    ) -> Result<()> {
        vectorization::apply_controlled_phase(&mut self.amps, control, target, theta, exec)
    }

    pub fn apply_swap(&mut self, q1: usize, q2: usize, exec: Execution) -> Result<()> {
        vectorization::apply_swap(&mut self.amps, q1, q2, exec)
    }

    pub fn apply_qft(&mut self, method: QftMethod, exec: Execution) -> Result<()> {
        qft::apply_qft(&mut self.amps, method, exec)
    }

    /// `{re + I(im), ...}` list readable by Mathematica.
    pub fn to_mma_list(&self) -> String {
        let body: Vec<String> = self
            .amps
            .iter()
            .map(|a| format!("{:.10} + I({:.10})", a.re, a.im))
            .collect();
        format!("{{{}}}", body.join(", "))
    }
}

// prints nonzero amplitudes with their basis states
impl fmt::Display for QuantumState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "quantum state ({} qubits):", self.n)?;
        for (i, amp) in self.amps.iter().enumerate() {
            if amp.norm_sqr() > 1e-8 {
                writeln!(
                    f,
                    "psi[{:0width$b}] = {:.6} + i({:.6})",
                    i,
                    amp.re,
                    amp.im,
                    width = self.n.max(1)
                )?;
            }
        }
        Ok(())
    }
}
