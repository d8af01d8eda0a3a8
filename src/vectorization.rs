/*
    gate kernels over a flat amplitude buffer.

    each kernel only walks the spectator bits: the loop counters are the affix
    segments around the acted-on qubits, and the touched indices are rebuilt in
    closed form. no test-and-skip, no scratch buffer, nothing outside 2^n.
*/

use std::f64::consts::FRAC_1_SQRT_2;

use num_complex::Complex64;

use crate::bits::{flip_bit, get_zero_bit_from_affix, get_zero_bits_from_affixes};
use crate::error::Result;
use crate::runtime::{check_distinct, check_qubit, qubits_for_len, AmpView, Execution};

/// e^(i*phase) = cos(phase) + i*sin(phase)
#[inline(always)]
pub fn exp_i(phase: f64) -> Complex64 {
    Complex64::new(phase.cos(), phase.sin())
}

/// Hadamard on `target`: `(a0, a1) -> ((a0 + a1)/sqrt2, (a0 - a1)/sqrt2)` for
/// every pair of indices differing only in bit `target`.
pub fn apply_hadamard(amps: &mut [Complex64], target: usize, exec: Execution) -> Result<()> {
    let n = qubits_for_len(amps.len())?;
    check_qubit(target, n)?;

    let fac = FRAC_1_SQRT_2;
    let view = AmpView::new(amps);

    // |j>|0>|k> and |j>|1>|k>
    exec.sweep2(n - (target + 1), target, |j, k| {
        let j0k = get_zero_bit_from_affix(j, k, target);
        let j1k = flip_bit(j0k, target);

        // SAFETY: (j, k) -> j0k is injective and j1k only differs at `target`,
        // so this pair belongs to exactly one iteration. both are < 2^n.
        unsafe {
            let a0 = view.read(j0k);
            let a1 = view.read(j1k);
            view.write(j0k, a0 * fac + a1 * fac);
            view.write(j1k, a0 * fac - a1 * fac);
        }
    });
    Ok(())
}

/// Multiplies every amplitude with both `control` and `target` set by
/// `e^(i*theta)`. The gate is symmetric in its two qubits.
pub fn apply_controlled_phase(
    amps: &mut [Complex64],
    control: usize,
    target: usize,
    theta: f64,
    exec: Execution,
) -> Result<()> {
    let n = qubits_for_len(amps.len())?;
    check_qubit(control, n)?;
    check_qubit(target, n)?;
    check_distinct(control, target)?;

    let t1 = control.min(target);
    let t2 = control.max(target);
    let fac = exp_i(theta);
    let view = AmpView::new(amps);

    // phase shift |j>|1>|k>|1>|l>
    exec.sweep3(n - (t2 + 1), t2 - (t1 + 1), t1, |j, k, l| {
        let j0k0l = get_zero_bits_from_affixes(j, k, l, t2, t1);
        let j1k1l = flip_bit(flip_bit(j0k0l, t2), t1);

        // SAFETY: one index per (j, k, l), distinct across iterations
        unsafe { view.update(j1k1l, |a| a * fac) };
    });
    Ok(())
}

/// Exchanges every `|q1=0, q2=1>` amplitude with its `|q1=1, q2=0>` partner.
pub fn apply_swap(amps: &mut [Complex64], q1: usize, q2: usize, exec: Execution) -> Result<()> {
    let n = qubits_for_len(amps.len())?;
    check_qubit(q1, n)?;
    check_qubit(q2, n)?;
    check_distinct(q1, q2)?;

    let t1 = q1.min(q2);
    let t2 = q1.max(q2);
    let view = AmpView::new(amps);

    // |j>|0>|k>|1>|l> <-> |j>|1>|k>|0>|l>
    exec.sweep3(n - (t2 + 1), t2 - (t1 + 1), t1, |j, k, l| {
        let j0k0l = get_zero_bits_from_affixes(j, k, l, t2, t1);
        let j0k1l = flip_bit(j0k0l, t1);
        let j1k0l = flip_bit(j0k0l, t2);

        // SAFETY: both partners are owned by this iteration alone
        unsafe {
            let tmp = view.read(j0k1l);
            view.write(j0k1l, view.read(j1k0l));
            view.write(j1k0l, tmp);
        }
    });
    Ok(())
}
