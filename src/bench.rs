// benchmark harness: times every strategy over every configuration and
// exports the summaries as a Mathematica association (and optionally json).

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use num_complex::Complex64;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};
use serde_json::to_writer_pretty;

use crate::assoc::AssocWriter;
use crate::controls::{stand_in, MultiStrategy, SingleStrategy};
use crate::error::{QuantumError, Result};
use crate::qft::{apply_merged_phases, apply_multiple_phases, apply_qft, QftMethod};
use crate::random::seeded_rng;
use crate::runtime::quantum_state::{allocate_amplitudes, QuantumState};
use crate::runtime::Execution;
use crate::stats::Summary;

// controls for the smoke run, must be increasing
const SMOKE_CONTROLS: [usize; 10] = [0, 2, 4, 6, 7, 15, 16, 20, 21, 22];
const SMOKE_SINGLE_CONTROL: usize = 2;
const SMOKE_QFT_QUBITS: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub num_qubits: usize,
    pub num_reps: usize,
    /// digits after the decimal point in exported numbers
    pub precision: usize,
    pub seed: u64,
    pub execution: Execution,
    /// also sweep the multi-control strategies over control counts 1..=n
    pub multi: bool,
    pub progress: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            num_qubits: 20,
            num_reps: 10,
            precision: 5,
            seed: 0x5eed,
            execution: Execution::Parallel,
            multi: false,
            progress: true,
        }
    }
}

impl BenchConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_qubits == 0 {
            return Err(QuantumError::EmptyState);
        }
        if self.num_qubits >= usize::BITS as usize {
            return Err(QuantumError::TooManyQubits {
                num_qubits: self.num_qubits,
            });
        }
        Ok(())
    }
}

/// Timings of one strategy, one summary per configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyTimings {
    pub label: String,
    pub description: String,
    pub summaries: Vec<Summary>,
}

impl StrategyTimings {
    pub fn means(&self) -> Vec<f64> {
        self.summaries.iter().map(|s| s.mean).collect()
    }

    pub fn variances(&self) -> Vec<f64> {
        self.summaries.iter().map(|s| s.variance).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiControlReport {
    pub control_sets: Vec<Vec<usize>>,
    pub strategies: Vec<StrategyTimings>,
}

/// Single-control timings are indexed by control position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlsReport {
    pub config: BenchConfig,
    pub single: Vec<StrategyTimings>,
    pub multi: Option<MultiControlReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QftReport {
    pub config: BenchConfig,
    /// contiguous phases onto the top qubit, as n-1 gates
    pub phases_multiple: Summary,
    /// the same phases as one merged diagonal
    pub phases_merged: Summary,
    pub qft_circuit: Summary,
    pub qft_merged: Summary,
    /// largest per-amplitude difference between the two QFT outputs
    pub max_deviation: f64,
}

/// Times `reps` calls of `body` on `state`. `reset` runs untimed before each
/// call so repeated non-unitary updates cannot overflow.
pub fn time_reps<S, R, B>(reps: usize, state: &mut S, mut reset: R, mut body: B) -> Result<Summary>
where
    S: ?Sized,
    R: FnMut(&mut S),
    B: FnMut(&mut S) -> Result<()>,
{
    let reps = reps.max(1);
    let mut durations: Vec<Duration> = Vec::with_capacity(reps);
    for _ in 0..reps {
        reset(state);
        let start = Instant::now();
        body(state)?;
        durations.push(start.elapsed());
    }
    Summary::from_durations(&durations).ok_or(QuantumError::EmptyState)
}

fn progress_bar(enabled: bool, len: usize, message: &'static str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template("{msg:>12} [{bar:40}] {pos}/{len} ({elapsed})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar.set_message(message);
    bar
}

fn reset_ones(amps: &mut [f64]) {
    amps.iter_mut().for_each(|a| *a = 1.0);
}

// evenly drawn, sorted control sets of every size 1..=n
pub fn random_control_sets(num_qubits: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut rng = seeded_rng(seed);
    (1..=num_qubits)
        .map(|k| {
            let mut set = sample(&mut rng, num_qubits, k).into_vec();
            set.sort_unstable();
            set
        })
        .collect()
}

pub fn run_controls(config: &BenchConfig) -> Result<ControlsReport> {
    config.validate()?;
    let n = config.num_qubits;
    let exec = config.execution;
    log::info!(
        "controls benchmark: {} qubits, {} reps, {} execution",
        n,
        config.num_reps,
        exec.label()
    );

    // touch every page before timing anything
    let mut amps = allocate_amplitudes(n, 1.0f64)?;

    let bar = progress_bar(config.progress, SingleStrategy::ALL.len() * n, "single");
    let mut single = Vec::with_capacity(SingleStrategy::ALL.len());
    for strategy in SingleStrategy::ALL {
        let mut summaries = Vec::with_capacity(n);
        for c in 0..n {
            let summary = time_reps(config.num_reps, amps.as_mut_slice(), reset_ones, |a| {
                strategy.apply(a, c, stand_in, exec)
            })?;
            log::debug!("single {} c={} mean={:.3e}s", strategy.label(), c, summary.mean);
            summaries.push(summary);
            bar.inc(1);
        }
        single.push(StrategyTimings {
            label: strategy.label().to_string(),
            description: strategy.description().to_string(),
            summaries,
        });
    }
    bar.finish_and_clear();

    let multi = if config.multi {
        Some(run_multi_controls(config, &mut amps)?)
    } else {
        None
    };

    Ok(ControlsReport {
        config: config.clone(),
        single,
        multi,
    })
}

fn run_multi_controls(config: &BenchConfig, amps: &mut [f64]) -> Result<MultiControlReport> {
    let n = config.num_qubits;
    let exec = config.execution;
    let control_sets = random_control_sets(n, config.seed);

    let bar = progress_bar(config.progress, MultiStrategy::ALL.len() * n, "multi");
    let mut strategies = Vec::with_capacity(MultiStrategy::ALL.len());
    for strategy in MultiStrategy::ALL {
        let mut summaries = Vec::with_capacity(control_sets.len());
        for controls in &control_sets {
            let summary = time_reps(config.num_reps, &mut *amps, reset_ones, |a| {
                strategy.apply(a, controls, stand_in, exec)
            })?;
            log::debug!(
                "multi {} k={} mean={:.3e}s",
                strategy.label(),
                controls.len(),
                summary.mean
            );
            summaries.push(summary);
            bar.inc(1);
        }
        strategies.push(StrategyTimings {
            label: strategy.label().to_string(),
            description: strategy.description().to_string(),
            summaries,
        });
    }
    bar.finish_and_clear();

    Ok(MultiControlReport {
        control_sets,
        strategies,
    })
}

pub fn run_qft(config: &BenchConfig) -> Result<QftReport> {
    config.validate()?;
    let n = config.num_qubits;
    let exec = config.execution;
    log::info!("qft benchmark: {} qubits, {} reps", n, config.num_reps);

    let mut state = QuantumState::create(n)?;
    state.init_random_seeded(config.seed);

    // all four operations are unitary, so the state is reused across reps
    let top = n - 1;
    let reps = config.num_reps;
    let amps = state.amps_mut();
    let phases_multiple = time_reps(reps, amps, |_| {}, |a| apply_multiple_phases(a, top, exec))?;
    let phases_merged = time_reps(reps, amps, |_| {}, |a| apply_merged_phases(a, top, exec))?;
    let qft_circuit = time_reps(reps, amps, |_| {}, |a| apply_qft(a, QftMethod::Circuit, exec))?;
    let qft_merged = time_reps(reps, amps, |_| {}, |a| {
        apply_qft(a, QftMethod::MergedPhases, exec)
    })?;

    let max_deviation = qft_deviation(n.min(SMOKE_QFT_QUBITS), config.seed, exec)?;
    log::info!("qft methods differ by at most {:.3e}", max_deviation);

    Ok(QftReport {
        config: config.clone(),
        phases_multiple,
        phases_merged,
        qft_circuit,
        qft_merged,
        max_deviation,
    })
}

/// Runs both QFT compositions on the same seeded random state.
pub fn qft_deviation(num_qubits: usize, seed: u64, exec: Execution) -> Result<f64> {
    let mut circuit = QuantumState::create(num_qubits)?;
    circuit.init_random_seeded(seed);
    let mut merged = circuit.clone();

    circuit.apply_qft(QftMethod::Circuit, exec)?;
    merged.apply_qft(QftMethod::MergedPhases, exec)?;
    Ok(max_abs_difference(circuit.amps(), merged.amps()))
}

pub fn max_abs_difference(a: &[Complex64], b: &[Complex64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "compared states differ in length");
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).norm())
        .fold(0.0, f64::max)
}

fn open_assoc(path: &Path, append: bool) -> Result<AssocWriter<BufWriter<File>>> {
    if append && path.exists() {
        AssocWriter::append(path)
    } else {
        AssocWriter::create(path)
    }
}

fn write_header(assoc: &mut AssocWriter<BufWriter<File>>, config: &BenchConfig) -> Result<()> {
    assoc.write_string("note", "timings are already per-rep")?;
    assoc.write_int("numQubits", config.num_qubits as i64)?;
    assoc.write_int("numReps", config.num_reps as i64)?;
    assoc.write_int("outPrec", config.precision as i64)?;
    assoc.write_string("execution", config.execution.label())
}

pub fn write_controls_assoc(report: &ControlsReport, path: &Path, append: bool) -> Result<()> {
    let prec = report.config.precision;
    let mut assoc = open_assoc(path, append)?;
    write_header(&mut assoc, &report.config)?;

    for timings in &report.single {
        assoc.write_double_array(&format!("dur_{}", timings.label), &timings.means(), prec)?;
        assoc.write_double_array(&format!("var_{}", timings.label), &timings.variances(), prec)?;
    }

    if let Some(multi) = &report.multi {
        let counts: Vec<i64> = multi.control_sets.iter().map(|s| s.len() as i64).collect();
        let sets: Vec<Vec<i64>> = multi
            .control_sets
            .iter()
            .map(|s| s.iter().map(|&c| c as i64).collect())
            .collect();
        assoc.write_int_array("ctrlCounts", &counts)?;
        assoc.write_ragged_int_array("ctrlSets", &sets)?;
        for timings in &multi.strategies {
            assoc.write_double_array(&format!("mdur_{}", timings.label), &timings.means(), prec)?;
            assoc.write_double_array(&format!("mvar_{}", timings.label), &timings.variances(), prec)?;
        }
    }

    assoc.close()?;
    log::info!("wrote {}", path.display());
    Ok(())
}

pub fn write_qft_assoc(report: &QftReport, path: &Path, append: bool) -> Result<()> {
    let prec = report.config.precision;
    let mut assoc = open_assoc(path, append)?;
    write_header(&mut assoc, &report.config)?;

    let rows = [
        ("phases_multiple", &report.phases_multiple),
        ("phases_merged", &report.phases_merged),
        ("circuit", &report.qft_circuit),
        ("merged", &report.qft_merged),
    ];
    for (name, summary) in rows {
        assoc.write_double(&format!("qft_dur_{}", name), summary.mean, prec)?;
        assoc.write_double(&format!("qft_var_{}", name), summary.variance, prec)?;
    }
    assoc.write_double("qft_maxDeviation", report.max_deviation, prec)?;

    assoc.close()?;
    log::info!("wrote {}", path.display());
    Ok(())
}

pub fn write_json<T: Serialize, P: AsRef<Path>>(report: &T, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    to_writer_pretty(BufWriter::new(file), report)?;
    log::info!("wrote {}", path.as_ref().display());
    Ok(())
}

/// One line of the interactive smoke run.
#[derive(Debug, Clone, Serialize)]
pub struct SmokeLine {
    pub section: &'static str,
    pub label: &'static str,
    pub seconds: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SmokeReport {
    pub num_qubits: usize,
    pub control: usize,
    pub controls: Vec<usize>,
    pub lines: Vec<SmokeLine>,
    /// every single-control strategy produced the same array
    pub single_agree: bool,
    /// every multi-control strategy produced the same array
    pub multi_agree: bool,
    pub qft_deviation: f64,
}

/// Times each strategy once on an all-ones array and checks they agree.
pub fn run_smoke(num_qubits: usize, exec: Execution) -> Result<SmokeReport> {
    if num_qubits == 0 {
        return Err(QuantumError::EmptyState);
    }
    let control = SMOKE_SINGLE_CONTROL.min(num_qubits - 1);
    let controls: Vec<usize> = SMOKE_CONTROLS
        .iter()
        .copied()
        .filter(|&c| c < num_qubits)
        .collect();

    let mut lines = Vec::new();
    let mut amps = allocate_amplitudes(num_qubits, 1.0f64)?;

    let mut reference: Option<Vec<f64>> = None;
    let mut single_agree = true;
    for strategy in SingleStrategy::ALL {
        reset_ones(&mut amps);
        let start = Instant::now();
        strategy.apply(&mut amps, control, stand_in, exec)?;
        lines.push(SmokeLine {
            section: "single control",
            label: strategy.label(),
            seconds: start.elapsed().as_secs_f64(),
        });
        match &reference {
            Some(expected) => single_agree &= *expected == amps,
            None => reference = Some(amps.clone()),
        }
    }

    reference = None;
    let mut multi_agree = true;
    for strategy in MultiStrategy::ALL {
        reset_ones(&mut amps);
        let start = Instant::now();
        strategy.apply(&mut amps, &controls, stand_in, exec)?;
        lines.push(SmokeLine {
            section: "multiple controls",
            label: strategy.label(),
            seconds: start.elapsed().as_secs_f64(),
        });
        match &reference {
            Some(expected) => multi_agree &= *expected == amps,
            None => reference = Some(amps.clone()),
        }
    }

    if !single_agree || !multi_agree {
        log::warn!("strategies disagree (single: {}, multi: {})", single_agree, multi_agree);
    }

    let deviation = qft_deviation(num_qubits.min(SMOKE_QFT_QUBITS), 0x5eed, exec)?;

    Ok(SmokeReport {
        num_qubits,
        control,
        controls,
        lines,
        single_agree,
        multi_agree,
        qft_deviation: deviation,
    })
}
