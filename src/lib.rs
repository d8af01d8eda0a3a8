pub mod assoc; // mathematica association export
pub mod bench; // timing harness and reports
pub mod bits; // index algebra
pub mod controls; // controlled-update strategies
pub mod error; // error type
pub mod qft; // quantum fourier transform
pub mod random; // seeded amplitudes
pub mod runtime; // execution policy and statevector
pub mod stats; // mean / variance
pub mod vectorization; // gate kernels

pub use error::{QuantumError, Result};
pub use runtime::quantum_state::QuantumState;
pub use runtime::Execution;
