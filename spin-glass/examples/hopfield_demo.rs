use std::sync::atomic::AtomicBool;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spin_glass::{Lattice, Mpf, MpfConfig, SpinGlassError, SquareGrid, State, SwendsenWang};

const DIM: usize = 4;
const N_SAMPLES: usize = 2_000;
const SAMPLE_TEMP: f64 = 1.0;

fn stripes(dim: usize, vertical: bool) -> State {
    let grid = SquareGrid::new(dim);
    let bits: Vec<bool> = (0..grid.n_sites())
        .map(|site| {
            let (row, col) = grid.coords(site);
            if vertical {
                col % 2 == 0
            } else {
                row % 2 == 0
            }
        })
        .collect();
    State::from_bools(&bits)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .init();

    let patterns = [stripes(DIM, false), stripes(DIM, true)];
    let mut lattice = Lattice::interacting(DIM * DIM).with_seed(7);

    println!("Lattice: {DIM}x{DIM} Hopfield  |  Patterns: {}", patterns.len());
    println!("{}", "-".repeat(60));

    let mpf = Mpf::new(MpfConfig {
        max_iterations: 500,
        tolerance: 1e-3,
        sequential: false,
        ..MpfConfig::default()
    })?;
    let t0 = Instant::now();
    match mpf.fit(&patterns, &mut lattice) {
        Ok(report) => println!(
            "MPF converged after {} updates (|g| = {:.2e})",
            report.iterations, report.magnitude
        ),
        Err(SpinGlassError::NotConverged {
            iterations,
            magnitude,
        }) => println!("MPF stopped after {iterations} updates (|g| = {magnitude:.2e})"),
        Err(e) => return Err(e.into()),
    }
    println!("fit: {:.3} s", t0.elapsed().as_secs_f64());

    for pattern in &patterns {
        let corrupted = pattern.flipped(0).flipped(DIM + 1).flipped(2 * DIM + 2);
        lattice.set_spins(&corrupted)?;
        lattice.set_temperature(0.5)?;
        let report = lattice.converge()?;
        lattice.reset_temperature();
        println!(
            "{corrupted} -> {}  recalled: {}  ({} anneal steps, {} passes)",
            lattice.state(),
            lattice.state() == *pattern,
            report.anneal_steps,
            report.passes
        );
    }

    lattice.set_temperature(SAMPLE_TEMP)?;
    let mut sampler = SwendsenWang::new(&lattice, 42)?;

    let pb = ProgressBar::new(N_SAMPLES as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n{bar:40.cyan/blue} {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );
    pb.set_message(format!("Swendsen-Wang at T = {SAMPLE_TEMP}"));

    let interrupted = AtomicBool::new(false);
    let chain = sampler.run_chain(N_SAMPLES, &patterns[0], &interrupted, &|| pb.inc(1))?;
    pb.finish_and_clear();

    let n_spins = lattice.lattice_size() as f64;
    let mean_active = chain
        .iter()
        .map(|s| s.count_active() as f64 / n_spins)
        .sum::<f64>()
        / chain.len().max(1) as f64;
    let hits = chain.iter().filter(|s| patterns.contains(s)).count();
    println!(
        "accepted {}/{N_SAMPLES}  |  mean active fraction {mean_active:.3}  |  stored-pattern visits {hits}",
        chain.len()
    );
    Ok(())
}
