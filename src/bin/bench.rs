//! `nipsi-bench`: CLI harness that drives each scheme through
//! `setup → encrypt → eval`, timing every stage across a list of
//! scenario sizes and emitting a CSV per scheme.
//!
//! This binary is the only place in the crate allowed to do file I/O or
//! install a global `tracing` subscriber; the library itself stays free
//! of both.

use std::collections::HashSet;
use std::fs::File;
use std::io::Write as _;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use rand_core::OsRng;

use nipsi::scheme::{
    MultiClientCardinality, MultiClientCardinalityEfficient, TwoClientCardinality,
    TwoClientIntersection, TwoClientThreshold,
};
use nipsi::BloomFilter;

const TWO_CLIENT_SCENARIOS: &[usize] = &[
    10, 20, 30, 40, 50, 100, 150, 200, 250, 500, 1000, 5000, 10000, 50000, 100000,
];
const MULTI_CLIENT_SCENARIOS: &[usize] = &[10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120, 130, 140, 150, 160, 170, 180, 190, 200, 210, 220, 230, 240, 250];

#[derive(Copy, Clone, Eq, PartialEq, ValueEnum)]
enum Scheme {
    TwoClientCardinality,
    TwoClientIntersection,
    TwoClientThreshold,
    MultiClientCardinality,
    MultiClientCardinalityEfficient,
}

/// Benchmarks the NI-PSI scheme family across a list of scenario sizes.
#[derive(Parser)]
#[command(name = "nipsi-bench")]
struct Cli {
    /// Scheme to benchmark. Omit to run all five.
    #[arg(long, value_enum)]
    scheme: Option<Scheme>,

    /// Scenario size (set cardinality). Repeatable; defaults to the
    /// original evaluation harness's scenario list for the scheme kind.
    #[arg(long = "scenario")]
    scenarios: Vec<usize>,

    /// Repetitions per scenario.
    #[arg(long)]
    repeat: Option<usize>,

    /// Fraction of each scenario forced into the intersection.
    #[arg(long, default_value_t = 0.1)]
    scenario_shared: f64,

    /// Directory to write `<scheme>.csv` files into.
    #[arg(long, default_value = ".")]
    output: PathBuf,
}

struct Stats {
    mean: f64,
    var: f64,
}

fn stats(samples: &[f64]) -> Stats {
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    Stats { mean, var }
}

fn make_sets(n: usize, shared_frac: f64, count: usize) -> Vec<HashSet<Vec<u8>>> {
    let shared_n = ((n as f64) * shared_frac).round() as usize;
    let shared: Vec<Vec<u8>> = (0..shared_n).map(|i| format!("shared-{i}").into_bytes()).collect();
    (0..count)
        .map(|c| {
            let mut s: HashSet<Vec<u8>> = shared.iter().cloned().collect();
            for i in 0..n.saturating_sub(shared_n) {
                s.insert(format!("c{c}-only-{i}").into_bytes());
            }
            s
        })
        .collect()
}

fn gid_for(scenario: usize) -> [u8; 16] {
    let mut gid = [0u8; 16];
    gid[12..].copy_from_slice(&(scenario as u32).to_be_bytes());
    gid
}

fn write_csv(path: &std::path::Path, rows: &[(usize, Stats, Stats, Stats)]) -> std::io::Result<()> {
    let mut f = File::create(path)?;
    writeln!(f, "scenario;encrypt_mean;encrypt_var;eval_mean;eval_var;setup_mean;setup_var")?;
    for (scenario, setup, encrypt, eval) in rows {
        writeln!(
            f,
            "{scenario};{};{};{};{};{};{}",
            encrypt.mean, encrypt.var, eval.mean, eval.var, setup.mean, setup.var
        )?;
    }
    Ok(())
}

fn bench_two_client_cardinality(scenarios: &[usize], repeat: usize, shared_frac: f64) -> Vec<(usize, Stats, Stats, Stats)> {
    let scheme = TwoClientCardinality;
    scenarios
        .iter()
        .map(|&n| {
            let mut setup_t = vec![];
            let mut enc_t = vec![];
            let mut eval_t = vec![];
            for _ in 0..repeat {
                let gid = gid_for(n);
                let sets = make_sets(n, shared_frac, 2);

                let t0 = Instant::now();
                let (usk0, usk1) = scheme.setup(128).unwrap();
                setup_t.push(t0.elapsed().as_secs_f64());

                let t1 = Instant::now();
                let c0 = scheme.encrypt(&usk0, &gid, &sets[0]);
                let c1 = scheme.encrypt(&usk1, &gid, &sets[1]);
                enc_t.push(t1.elapsed().as_secs_f64());

                let t2 = Instant::now();
                let _ = scheme.eval(&[c0, c1]);
                eval_t.push(t2.elapsed().as_secs_f64());
            }
            (n, stats(&setup_t), stats(&enc_t), stats(&eval_t))
        })
        .collect()
}

fn bench_two_client_intersection(scenarios: &[usize], repeat: usize, shared_frac: f64) -> Vec<(usize, Stats, Stats, Stats)> {
    let scheme = TwoClientIntersection::default();
    scenarios
        .iter()
        .map(|&n| {
            let mut setup_t = vec![];
            let mut enc_t = vec![];
            let mut eval_t = vec![];
            for _ in 0..repeat {
                let gid = gid_for(n);
                let sets = make_sets(n, shared_frac, 2);

                let t0 = Instant::now();
                let (usk0, usk1) = scheme.setup(128).unwrap();
                setup_t.push(t0.elapsed().as_secs_f64());

                let t1 = Instant::now();
                let c0 = scheme.encrypt(&usk0, &gid, &sets[0]);
                let c1 = scheme.encrypt(&usk1, &gid, &sets[1]);
                enc_t.push(t1.elapsed().as_secs_f64());

                let t2 = Instant::now();
                let _ = scheme.eval(&[c0, c1]);
                eval_t.push(t2.elapsed().as_secs_f64());
            }
            (n, stats(&setup_t), stats(&enc_t), stats(&eval_t))
        })
        .collect()
}

fn bench_two_client_threshold(scenarios: &[usize], repeat: usize, shared_frac: f64) -> Vec<(usize, Stats, Stats, Stats)> {
    let scheme = TwoClientThreshold::default();
    let t = 2;
    scenarios
        .iter()
        .map(|&n| {
            let mut setup_t = vec![];
            let mut enc_t = vec![];
            let mut eval_t = vec![];
            for _ in 0..repeat {
                let gid = gid_for(n);
                let sets = make_sets(n, shared_frac, 2);

                let t0 = Instant::now();
                let (usk0, usk1) = scheme.setup(128, t).unwrap();
                setup_t.push(t0.elapsed().as_secs_f64());

                let t1 = Instant::now();
                let c0 = scheme.encrypt(&usk0, &gid, t, &sets[0]);
                let c1 = scheme.encrypt(&usk1, &gid, t, &sets[1]);
                enc_t.push(t1.elapsed().as_secs_f64());

                let t2 = Instant::now();
                let _ = scheme.eval(&[c0, c1], t);
                eval_t.push(t2.elapsed().as_secs_f64());
            }
            (n, stats(&setup_t), stats(&enc_t), stats(&eval_t))
        })
        .collect()
}

fn bench_multi_client_cardinality(scenarios: &[usize], repeat: usize, shared_frac: f64) -> Vec<(usize, Stats, Stats, Stats)> {
    let scheme = MultiClientCardinality::default();
    const N_CLIENTS: usize = 3;
    scenarios
        .iter()
        .map(|&n| {
            let mut setup_t = vec![];
            let mut enc_t = vec![];
            let mut eval_t = vec![];
            for _ in 0..repeat {
                let gid = gid_for(n);
                let sets = make_sets(n, shared_frac, N_CLIENTS);

                let t0 = Instant::now();
                let usks = scheme.setup(N_CLIENTS, &mut OsRng).unwrap();
                setup_t.push(t0.elapsed().as_secs_f64());

                let t1 = Instant::now();
                let cts: Vec<_> = usks
                    .iter()
                    .zip(&sets)
                    .map(|(u, s)| scheme.encrypt(u, &gid, s))
                    .collect();
                enc_t.push(t1.elapsed().as_secs_f64());

                let t2 = Instant::now();
                let _ = scheme.eval(&cts);
                eval_t.push(t2.elapsed().as_secs_f64());
            }
            (n, stats(&setup_t), stats(&enc_t), stats(&eval_t))
        })
        .collect()
}

fn bench_multi_client_cardinality_efficient(scenarios: &[usize], repeat: usize, shared_frac: f64) -> Vec<(usize, Stats, Stats, Stats)> {
    let scheme = MultiClientCardinalityEfficient::default();
    const N_CLIENTS: usize = 3;
    scenarios
        .iter()
        .map(|&n| {
            let (m, k) = BloomFilter::determine_parameters(n.max(1), 0.001);
            let mut setup_t = vec![];
            let mut enc_t = vec![];
            let mut eval_t = vec![];
            for _ in 0..repeat {
                let gid = gid_for(n);
                let sets = make_sets(n, shared_frac, N_CLIENTS);

                let t0 = Instant::now();
                let usks = scheme.setup(128, N_CLIENTS, &mut OsRng).unwrap();
                setup_t.push(t0.elapsed().as_secs_f64());

                let t1 = Instant::now();
                let cts: Vec<_> = usks
                    .iter()
                    .zip(&sets)
                    .map(|(u, s)| scheme.encrypt(u, &gid, s, m, k, &mut OsRng))
                    .collect();
                enc_t.push(t1.elapsed().as_secs_f64());

                let t2 = Instant::now();
                let _ = scheme.eval(&cts, m, k);
                eval_t.push(t2.elapsed().as_secs_f64());
            }
            (n, stats(&setup_t), stats(&enc_t), stats(&eval_t))
        })
        .collect()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let schemes = match cli.scheme {
        Some(s) => vec![s],
        None => vec![
            Scheme::TwoClientCardinality,
            Scheme::TwoClientIntersection,
            Scheme::TwoClientThreshold,
            Scheme::MultiClientCardinality,
            Scheme::MultiClientCardinalityEfficient,
        ],
    };

    for scheme in schemes {
        let (name, is_two_client) = match scheme {
            Scheme::TwoClientCardinality => ("two_client_cardinality", true),
            Scheme::TwoClientIntersection => ("two_client_intersection", true),
            Scheme::TwoClientThreshold => ("two_client_threshold", true),
            Scheme::MultiClientCardinality => ("multi_client_cardinality", false),
            Scheme::MultiClientCardinalityEfficient => ("multi_client_cardinality_efficient", false),
        };

        let default_scenarios = if is_two_client { TWO_CLIENT_SCENARIOS } else { MULTI_CLIENT_SCENARIOS };
        let scenarios: &[usize] = if cli.scenarios.is_empty() { default_scenarios } else { &cli.scenarios };
        let repeat = cli.repeat.unwrap_or(if is_two_client { 5 } else { 3 });

        let rows = match scheme {
            Scheme::TwoClientCardinality => bench_two_client_cardinality(scenarios, repeat, cli.scenario_shared),
            Scheme::TwoClientIntersection => bench_two_client_intersection(scenarios, repeat, cli.scenario_shared),
            Scheme::TwoClientThreshold => bench_two_client_threshold(scenarios, repeat, cli.scenario_shared),
            Scheme::MultiClientCardinality => bench_multi_client_cardinality(scenarios, repeat, cli.scenario_shared),
            Scheme::MultiClientCardinalityEfficient => {
                bench_multi_client_cardinality_efficient(scenarios, repeat, cli.scenario_shared)
            }
        };

        let path = cli.output.join(format!("{name}.csv"));
        write_csv(&path, &rows).expect("writing benchmark CSV output");
        tracing::info!(scheme = name, path = %path.display(), "wrote benchmark results");
    }
}
