/*
    RUNTIME: EXECUTION POLICY AND SHARED-NOTHING SWEEPS OVER THE REDUCED INDEX SPACE

    every kernel in this crate is a loop nest over the bits it does NOT act on.
    the sweeps below run those nests either on the calling thread or on the
    rayon pool. parallel runs split the flattened iteration space into equal
    contiguous chunks since every iteration costs the same.
*/

pub mod quantum_state;

use std::marker::PhantomData;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bits::{pow2, truncate_bits};
use crate::error::{QuantumError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Execution {
    #[default]
    Serial,
    Parallel,
}

impl Execution {
    pub fn label(self) -> &'static str {
        match self {
            Execution::Serial => "serial",
            Execution::Parallel => "parallel",
        }
    }

    /// Runs `body(m)` for every `m` in `0..count`.
    #[inline]
    pub fn for_each<F>(self, count: usize, body: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        match self {
            Execution::Serial => (0..count).for_each(body),
            Execution::Parallel => (0..count)
                .into_par_iter()
                .with_min_len(static_chunk_len(count))
                .for_each(body),
        }
    }

    /// Two level nest `|j>|k>` with `j` over `outer_bits` and `k` over `inner_bits`.
    #[inline]
    pub fn sweep2<F>(self, outer_bits: usize, inner_bits: usize, body: F)
    where
        F: Fn(usize, usize) + Sync + Send,
    {
        match self {
            Execution::Serial => {
                for j in 0..pow2(outer_bits) {
                    for k in 0..pow2(inner_bits) {
                        body(j, k);
                    }
                }
            }
            // collapsed, so a single outer iteration still spreads over the pool
            Execution::Parallel => self.for_each(pow2(outer_bits + inner_bits), |m| {
                body(m >> inner_bits, truncate_bits(m, inner_bits))
            }),
        }
    }

    /// Three level nest `|j>|k>|l>`.
    #[inline]
    pub fn sweep3<F>(self, outer_bits: usize, mid_bits: usize, inner_bits: usize, body: F)
    where
        F: Fn(usize, usize, usize) + Sync + Send,
    {
        match self {
            Execution::Serial => {
                for j in 0..pow2(outer_bits) {
                    for k in 0..pow2(mid_bits) {
                        for l in 0..pow2(inner_bits) {
                            body(j, k, l);
                        }
                    }
                }
            }
            Execution::Parallel => {
                let low_bits = mid_bits + inner_bits;
                self.for_each(pow2(outer_bits + low_bits), |m| {
                    let low = truncate_bits(m, low_bits);
                    body(m >> low_bits, low >> inner_bits, truncate_bits(low, inner_bits))
                })
            }
        }
    }
}

// static schedule: one contiguous chunk per worker
fn static_chunk_len(count: usize) -> usize {
    let threads = rayon::current_num_threads().max(1);
    count.div_ceil(threads).max(1)
}

/// Shared view of an amplitude buffer that several workers write through.
///
/// Kernels only hand out indices produced by an injective reconstruction of
/// their loop counters, so no two iterations of one call ever touch the same
/// slot, and a pair kernel reads its partner index inside the same iteration.
pub(crate) struct AmpView<'a, T> {
    ptr: *mut T,
    len: usize,
    _borrow: PhantomData<&'a mut [T]>,
}

unsafe impl<T: Send> Send for AmpView<'_, T> {}
unsafe impl<T: Send> Sync for AmpView<'_, T> {}

impl<'a, T: Copy> AmpView<'a, T> {
    pub(crate) fn new(amps: &'a mut [T]) -> Self {
        AmpView {
            ptr: amps.as_mut_ptr(),
            len: amps.len(),
            _borrow: PhantomData,
        }
    }

    /// # Safety
    /// `i < len` and no other iteration writes `i` during this call.
    #[inline(always)]
    pub(crate) unsafe fn read(&self, i: usize) -> T {
        debug_assert!(i < self.len, "index {} past {}", i, self.len);
        *self.ptr.add(i)
    }

    /// # Safety
    /// `i < len` and this iteration is the only one touching `i`.
    #[inline(always)]
    pub(crate) unsafe fn write(&self, i: usize, val: T) {
        debug_assert!(i < self.len, "index {} past {}", i, self.len);
        *self.ptr.add(i) = val;
    }

    /// # Safety
    /// same contract as [`AmpView::write`].
    #[inline(always)]
    pub(crate) unsafe fn update<F: Fn(T) -> T>(&self, i: usize, f: F) {
        self.write(i, f(self.read(i)));
    }
}

/// Number of qubits addressed by a buffer of `len` amplitudes.
pub fn qubits_for_len(len: usize) -> Result<usize> {
    if !len.is_power_of_two() {
        return Err(QuantumError::InvalidLength { len });
    }
    Ok(len.trailing_zeros() as usize)
}

pub(crate) fn check_qubit(qubit: usize, num_qubits: usize) -> Result<()> {
    if qubit < num_qubits {
        Ok(())
    } else {
        Err(QuantumError::QubitOutOfRange { qubit, num_qubits })
    }
}

pub(crate) fn check_distinct(a: usize, b: usize) -> Result<()> {
    if a == b {
        return Err(QuantumError::DuplicateQubit { qubit: a });
    }
    Ok(())
}

// configures the global rayon pool once. returns the worker count.
pub fn configure_thread_pool(threads: Option<usize>) -> Result<usize> {
    let compute_cores = threads.unwrap_or_else(|| {
        // physical cores, keeping one back for the system on larger machines
        let physical = num_cpus::get_physical();
        if physical > 4 {
            physical - 1
        } else {
            physical
        }
    });

    rayon::ThreadPoolBuilder::new()
        .num_threads(compute_cores.max(1))
        .stack_size(8 * 1024 * 1024)
        .thread_name(|i| format!("compute-{}", i))
        .build_global()
        .map_err(|e| QuantumError::ThreadPool(e.to_string()))?;

    log::info!("rayon pool configured with {} workers", compute_cores.max(1));
    Ok(compute_cores.max(1))
}
