//! Quantum Fourier Transform, composed two ways.
//!
//! Both walk the target qubit from `n-1` down to `0`, apply a Hadamard, then
//! the phases controlled by that qubit, and finish with the bit-reversal swaps.
//! The explicit circuit applies `n(n-1)/2` controlled-phase gates. The merged
//! form folds all phases sharing a control into one diagonal pass, since they
//! commute: `theta(index) = pi / 2^t * (index & (2^t - 1))`.

use std::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::bits::{flip_bit, get_zero_bit_from_affix, pow2};
use crate::error::{QuantumError, Result};
use crate::runtime::{check_qubit, qubits_for_len, AmpView, Execution};
use crate::vectorization::{apply_controlled_phase, apply_hadamard, apply_swap, exp_i};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QftMethod {
    /// one controlled-phase gate per qubit pair
    Circuit,
    /// one merged diagonal per target qubit
    MergedPhases,
}

impl QftMethod {
    pub const ALL: [QftMethod; 2] = [QftMethod::Circuit, QftMethod::MergedPhases];

    pub fn label(self) -> &'static str {
        match self {
            QftMethod::Circuit => "circuit",
            QftMethod::MergedPhases => "merged",
        }
    }
}

/// Controlled phases from `t_max` onto every lower qubit, with
/// `theta = 2*pi / 2^m` and `m` starting at 2 for the nearest neighbour.
pub fn apply_multiple_phases(amps: &mut [Complex64], t_max: usize, exec: Execution) -> Result<()> {
    let n = qubits_for_len(amps.len())?;
    check_qubit(t_max, n)?;

    for (m, t) in (0..t_max).rev().enumerate() {
        let theta = 2.0 * PI / pow2(m + 2) as f64;
        apply_controlled_phase(amps, t_max, t, theta, exec)?;
    }
    Ok(())
}

/// Single pass equivalent of [`apply_multiple_phases`]: every index with bit
/// `t_max` set picks up `e^(i * pi/2^t_max * (index & (2^t_max - 1)))`.
pub fn apply_merged_phases(amps: &mut [Complex64], t_max: usize, exec: Execution) -> Result<()> {
    let n = qubits_for_len(amps.len())?;
    check_qubit(t_max, n)?;

    let k_num = pow2(t_max);
    let k_mask = k_num - 1;
    let fac = PI / k_num as f64;
    let view = AmpView::new(amps);

    // |j>|1>|k>
    exec.sweep2(n - (t_max + 1), t_max, |j, k| {
        let j1k = flip_bit(get_zero_bit_from_affix(j, k, t_max), t_max);
        let theta = fac * (j1k & k_mask) as f64;
        // SAFETY: (j, k) -> j1k is injective
        unsafe { view.update(j1k, |a| a * exp_i(theta)) };
    });
    Ok(())
}

// bit reversal of the whole register
fn apply_reversal_swaps(amps: &mut [Complex64], n: usize, exec: Execution) -> Result<()> {
    for t in 0..n / 2 {
        apply_swap(amps, t, n - t - 1, exec)?;
    }
    Ok(())
}

pub fn apply_qft_circuit(amps: &mut [Complex64], exec: Execution) -> Result<()> {
    let n = qubits_for_len(amps.len())?;
    if n == 0 {
        return Err(QuantumError::EmptyState);
    }

    for t in (1..n).rev() {
        apply_hadamard(amps, t, exec)?;
        apply_multiple_phases(amps, t, exec)?;
    }
    apply_hadamard(amps, 0, exec)?;
    apply_reversal_swaps(amps, n, exec)
}

pub fn apply_qft_algorithm(amps: &mut [Complex64], exec: Execution) -> Result<()> {
    let n = qubits_for_len(amps.len())?;
    if n == 0 {
        return Err(QuantumError::EmptyState);
    }

    for t in (1..n).rev() {
        apply_hadamard(amps, t, exec)?;
        apply_merged_phases(amps, t, exec)?;
    }
    apply_hadamard(amps, 0, exec)?;
    apply_reversal_swaps(amps, n, exec)
}

pub fn apply_qft(amps: &mut [Complex64], method: QftMethod, exec: Execution) -> Result<()> {
    match method {
        QftMethod::Circuit => apply_qft_circuit(amps, exec),
        QftMethod::MergedPhases => apply_qft_algorithm(amps, exec),
    }
}
