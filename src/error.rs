//! Error types shared by the statevector, kernels and benchmark output.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuantumError {
    /// The amplitude buffer for the requested register could not be reserved.
    #[error("failed to allocate {bytes} bytes for a {num_qubits}-qubit statevector")]
    Allocation { num_qubits: usize, bytes: usize },

    /// 2^n amplitudes (or their byte size) do not fit in the address space.
    #[error("{num_qubits} qubits cannot be addressed on this platform")]
    TooManyQubits { num_qubits: usize },

    #[error("qubit index {qubit} out of range for {num_qubits}-qubit state")]
    QubitOutOfRange { qubit: usize, num_qubits: usize },

    #[error("qubit {qubit} appears more than once in a gate")]
    DuplicateQubit { qubit: usize },

    /// Chained bit insertion silently enumerates the wrong index set otherwise.
    #[error("control qubits must be strictly increasing, got {controls:?}")]
    UnsortedControls { controls: Vec<usize> },

    #[error("{count} controls requested on a {num_qubits}-qubit state")]
    TooManyControls { count: usize, num_qubits: usize },

    /// Amplitude slices must hold exactly 2^n entries.
    #[error("amplitude buffer of length {len} is not a power of two")]
    InvalidLength { len: usize },

    #[error("{num_qubits} qubits do not match {len} amplitudes")]
    QubitCountMismatch { num_qubits: usize, len: usize },

    #[error("operation requires at least one qubit")]
    EmptyState,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

pub type Result<T> = std::result::Result<T, QuantumError>;
