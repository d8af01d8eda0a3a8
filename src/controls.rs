// alternative ways of applying an elementwise transform only where every
// control qubit is 1. all strategies mutate the same amplitude set and must
// agree exactly; they differ in how that set is addressed.
//
// A  scan everything, branch on the control test
// B  scan everything, blend old/new with the test result as 0/1
// C  enumerate the controlled indices directly via affix reconstruction
// D  enumerate the controlled indices via bit insertion

use std::fmt;
use std::ops::{Add, Mul};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bits::{
    bits_are_all_one, flip_bit, get_bit, get_bit_mask, get_zero_bit_from_affix, insert_zero_bit,
    pow2, SegmentedAffix,
};
use crate::error::{QuantumError, Result};
use crate::runtime::{check_qubit, qubits_for_len, AmpView, Execution};

/// Anything a controlled update can act on: real or complex amplitudes.
/// The `Mul<f64>` bound is what the branchless blend needs.
pub trait Amplitude: Copy + Send + Sync + Add<Output = Self> + Mul<f64, Output = Self> {}

impl<T> Amplitude for T where T: Copy + Send + Sync + Add<Output = T> + Mul<f64, Output = T> {}

/// Stand-in transform for benchmarks: `1.5 * (x - 0.1)^2`.
#[inline(always)]
pub fn stand_in(amp: f64) -> f64 {
    1.5 * (amp - 0.1).powi(2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SingleStrategy {
    BranchTest,
    BranchlessBlend,
    AffixEnumeration,
    BitInsertion,
}

impl SingleStrategy {
    pub const ALL: [SingleStrategy; 4] = [
        SingleStrategy::BranchTest,
        SingleStrategy::BranchlessBlend,
        SingleStrategy::AffixEnumeration,
        SingleStrategy::BitInsertion,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SingleStrategy::BranchTest => "A",
            SingleStrategy::BranchlessBlend => "B",
            SingleStrategy::AffixEnumeration => "C",
            SingleStrategy::BitInsertion => "D",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SingleStrategy::BranchTest => "full scan, branch on control bit",
            SingleStrategy::BranchlessBlend => "full scan, branchless blend",
            SingleStrategy::AffixEnumeration => "direct enumeration via prefix/suffix",
            SingleStrategy::BitInsertion => "direct enumeration via zero-bit insertion",
        }
    }

    pub fn apply<T, F>(self, amps: &mut [T], control: usize, f: F, exec: Execution) -> Result<()>
    where
        T: Amplitude,
        F: Fn(T) -> T + Sync + Send,
    {
        match self {
            SingleStrategy::BranchTest => single_branch_test(amps, control, f, exec),
            SingleStrategy::BranchlessBlend => single_branchless(amps, control, f, exec),
            SingleStrategy::AffixEnumeration => single_affix(amps, control, f, exec),
            SingleStrategy::BitInsertion => single_bit_insertion(amps, control, f, exec),
        }
    }
}

impl fmt::Display for SingleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.description())
    }
}

/// Multi-control family. `SegmentedAffix` is the many-segment analogue of
/// the single-control affix enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MultiStrategy {
    BranchTest,
    BranchlessBlend,
    SegmentedAffix,
    BitInsertion,
}

impl MultiStrategy {
    pub const ALL: [MultiStrategy; 4] = [
        MultiStrategy::BranchTest,
        MultiStrategy::BranchlessBlend,
        MultiStrategy::SegmentedAffix,
        MultiStrategy::BitInsertion,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MultiStrategy::BranchTest => "A",
            MultiStrategy::BranchlessBlend => "B",
            MultiStrategy::SegmentedAffix => "C",
            MultiStrategy::BitInsertion => "D",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            MultiStrategy::BranchTest => "full scan, branch on control mask",
            MultiStrategy::BranchlessBlend => "full scan, branchless blend",
            MultiStrategy::SegmentedAffix => "direct enumeration via segmented affixes",
            MultiStrategy::BitInsertion => "direct enumeration via iterated bit insertion",
        }
    }

    /// `controls` must be strictly increasing.
    pub fn apply<T, F>(self, amps: &mut [T], controls: &[usize], f: F, exec: Execution) -> Result<()>
    where
        T: Amplitude,
        F: Fn(T) -> T + Sync + Send,
    {
        match self {
            MultiStrategy::BranchTest => multi_branch_test(amps, controls, f, exec),
            MultiStrategy::BranchlessBlend => multi_branchless(amps, controls, f, exec),
            MultiStrategy::SegmentedAffix => multi_segmented_affix(amps, controls, f, exec),
            MultiStrategy::BitInsertion => multi_bit_insertion(amps, controls, f, exec),
        }
    }
}

impl fmt::Display for MultiStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.description())
    }
}

// full scan in index order, shared by the A and B strategies
fn scan<T, B>(amps: &mut [T], exec: Execution, body: B)
where
    T: Send,
    B: Fn(usize, &mut T) + Sync + Send,
{
    match exec {
        Execution::Serial => amps.iter_mut().enumerate().for_each(|(i, amp)| body(i, amp)),
        Execution::Parallel => {
            let chunk = amps.len().div_ceil(rayon::current_num_threads().max(1)).max(1);
            amps.par_iter_mut()
                .with_min_len(chunk)
                .enumerate()
                .for_each(|(i, amp)| body(i, amp));
        }
    }
}

#[inline(always)]
fn blend<T: Amplitude>(old: T, new: T, b: f64) -> T {
    old * (1.0 - b) + new * b
}

fn validate_controls(controls: &[usize], num_qubits: usize) -> Result<()> {
    if controls.len() > num_qubits {
        return Err(QuantumError::TooManyControls {
            count: controls.len(),
            num_qubits,
        });
    }
    for &c in controls {
        check_qubit(c, num_qubits)?;
    }
    if controls.windows(2).any(|w| w[0] >= w[1]) {
        return Err(QuantumError::UnsortedControls {
            controls: controls.to_vec(),
        });
    }
    Ok(())
}

/// Strategy A, single control: O(2^n) iterations with a data dependent branch.
pub fn single_branch_test<T, F>(amps: &mut [T], control: usize, f: F, exec: Execution) -> Result<()>
where
    T: Amplitude,
    F: Fn(T) -> T + Sync + Send,
{
    let n = qubits_for_len(amps.len())?;
    check_qubit(control, n)?;

    scan(amps, exec, |i, amp| {
        if get_bit(i, control) == 1 {
            *amp = f(*amp);
        }
    });
    Ok(())
}

/// Strategy B, single control: writes every element, `(1-b)*old + b*f(old)`.
pub fn single_branchless<T, F>(amps: &mut [T], control: usize, f: F, exec: Execution) -> Result<()>
where
    T: Amplitude,
    F: Fn(T) -> T + Sync + Send,
{
    let n = qubits_for_len(amps.len())?;
    check_qubit(control, n)?;

    scan(amps, exec, |i, amp| {
        let b = get_bit(i, control) as f64;
        *amp = blend(*amp, f(*amp), b);
    });
    Ok(())
}

/// Strategy C, single control: 2^(n-1) iterations over `|j>|i>`, the
/// controlled index is `|j>|1>|i>`.
pub fn single_affix<T, F>(amps: &mut [T], control: usize, f: F, exec: Execution) -> Result<()>
where
    T: Amplitude,
    F: Fn(T) -> T + Sync + Send,
{
    let n = qubits_for_len(amps.len())?;
    check_qubit(control, n)?;

    let view = AmpView::new(amps);
    exec.sweep2(n - (control + 1), control, |j, i| {
        let j1i = flip_bit(get_zero_bit_from_affix(j, i, control), control);
        // SAFETY: (j, i) -> j1i is injective and below 2^n
        unsafe { view.update(j1i, &f) };
    });
    Ok(())
}

/// Strategy D, single control: flat reduced index, one zero-bit insertion.
pub fn single_bit_insertion<T, F>(amps: &mut [T], control: usize, f: F, exec: Execution) -> Result<()>
where
    T: Amplitude,
    F: Fn(T) -> T + Sync + Send,
{
    let n = qubits_for_len(amps.len())?;
    check_qubit(control, n)?;

    let view = AmpView::new(amps);
    exec.for_each(pow2(n - 1), |m| {
        let i = flip_bit(insert_zero_bit(m, control), control);
        // SAFETY: insertion is injective on 0..2^(n-1)
        unsafe { view.update(i, &f) };
    });
    Ok(())
}

/// Strategy A, many controls.
pub fn multi_branch_test<T, F>(amps: &mut [T], controls: &[usize], f: F, exec: Execution) -> Result<()>
where
    T: Amplitude,
    F: Fn(T) -> T + Sync + Send,
{
    let n = qubits_for_len(amps.len())?;
    validate_controls(controls, n)?;

    let mask = get_bit_mask(controls);
    scan(amps, exec, |i, amp| {
        if bits_are_all_one(i, mask) {
            *amp = f(*amp);
        }
    });
    Ok(())
}

/// Strategy B, many controls.
pub fn multi_branchless<T, F>(amps: &mut [T], controls: &[usize], f: F, exec: Execution) -> Result<()>
where
    T: Amplitude,
    F: Fn(T) -> T + Sync + Send,
{
    let n = qubits_for_len(amps.len())?;
    validate_controls(controls, n)?;

    let mask = get_bit_mask(controls);
    scan(amps, exec, |i, amp| {
        let b = bits_are_all_one(i, mask) as u8 as f64;
        *amp = blend(*amp, f(*amp), b);
    });
    Ok(())
}

/// Strategy C, many controls: each of the k+1 free segments of the reduced
/// index is shifted into place in one pass, then the control bits are set.
pub fn multi_segmented_affix<T, F>(
    amps: &mut [T],
    controls: &[usize],
    f: F,
    exec: Execution,
) -> Result<()>
where
    T: Amplitude,
    F: Fn(T) -> T + Sync + Send,
{
    let n = qubits_for_len(amps.len())?;
    validate_controls(controls, n)?;

    let affix = SegmentedAffix::new(controls, n);
    let view = AmpView::new(amps);
    exec.for_each(pow2(n - controls.len()), |l| {
        let j = affix.expand(l);
        // SAFETY: segments partition the free bits, so expand is injective
        unsafe { view.update(j, &f) };
    });
    Ok(())
}

/// Strategy D, many controls: insert-then-flip once per control, lowest
/// control first. Only correct for increasing `controls`, which is checked.
pub fn multi_bit_insertion<T, F>(
    amps: &mut [T],
    controls: &[usize],
    f: F,
    exec: Execution,
) -> Result<()>
where
    T: Amplitude,
    F: Fn(T) -> T + Sync + Send,
{
    let n = qubits_for_len(amps.len())?;
    validate_controls(controls, n)?;

    let view = AmpView::new(amps);
    exec.for_each(pow2(n - controls.len()), |l| {
        let j = controls
            .iter()
            .fold(l, |j, &c| flip_bit(insert_zero_bit(j, c), c));
        // SAFETY: every insertion step is injective, so the chain is too
        unsafe { view.update(j, &f) };
    });
    Ok(())
}
