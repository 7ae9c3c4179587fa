use std::process::ExitCode;

use clap::{Parser, Subcommand};
use half::f16;
use normcheck_core::{DType, HostArray, Runtime, Shape};
use normcheck_harness::{Harness, HarnessConfig, Precision, TestCase, default_cases};
use tracing::Level;

#[derive(Parser)]
#[command(name = "normcheck")]
#[command(about = "Softmax conformance checks for the normcheck runtime")]
struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the built-in case list.
    Suite {
        #[arg(long)]
        seed: Option<u64>,
        /// Block on every run instead of waiting in `stop()`.
        #[arg(long)]
        sync: bool,
        /// Print the suite report as JSON instead of report lines.
        #[arg(long)]
        json: bool,
        /// Run only the first N built-in cases.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Run a single case.
    Case {
        batch: usize,
        rows: usize,
        cols: usize,
        #[arg(long, default_value = "single")]
        precision: String,
        #[arg(long, default_value_t = 1)]
        iters: usize,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        sync: bool,
    },
    /// Run a quick demo of the runtime ops.
    Smoke,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match args.cmd {
        Cmd::Suite {
            seed,
            sync,
            json,
            limit,
        } => suite(config(seed, sync).with_print_reports(!json), json, limit),
        Cmd::Case {
            batch,
            rows,
            cols,
            precision,
            iters,
            seed,
            sync,
        } => case(config(seed, sync), batch, rows, cols, &precision, iters),
        Cmd::Smoke => smoke(),
    }
}

/// Environment defaults with command-line overrides on top.
fn config(seed: Option<u64>, sync: bool) -> HarnessConfig {
    let mut cfg = HarnessConfig::from_env();
    if let Some(seed) = seed {
        cfg = cfg.with_seed(seed);
    }
    if sync {
        cfg = cfg.with_async_run(false);
    }
    cfg
}

fn suite(cfg: HarnessConfig, json: bool, limit: Option<usize>) -> ExitCode {
    let mut harness = Harness::cpu(cfg);
    let report = match limit {
        Some(n) => {
            let cases = default_cases();
            harness.run_cases(&cases[..n.min(cases.len())])
        }
        None => harness.run_suite(),
    };

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("error: failed to serialize report: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let total = report.outcomes.len();
    eprintln!(
        "{}/{} cases passed on {}",
        report.passed_count(),
        total,
        report.backend
    );
    for failure in report.failures() {
        eprintln!(
            "FAILED {}: {}",
            failure.case,
            failure.error.as_deref().unwrap_or("unknown error")
        );
    }

    if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn case(
    cfg: HarnessConfig,
    batch: usize,
    rows: usize,
    cols: usize,
    precision: &str,
    iters: usize,
) -> ExitCode {
    let precision = match precision.parse::<Precision>() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let case = TestCase::new(batch, rows, cols, precision).with_iterations(iters);
    match Harness::cpu(cfg).run_one_case(&case) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn smoke() -> ExitCode {
    match run_smoke() {
        Ok(()) => {
            println!("\nAll smoke tests passed.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_smoke() -> normcheck_core::Result<()> {
    let rt = Runtime::cpu();
    println!("Backend: {}", rt.backend_name());
    println!("Runtime: lazy graph, launch/run/stop\n");

    let x = rt.tensor(Shape::new(vec![2, 3]), DType::F32)?;
    let sm = x.softmax(-1)?;
    let sums = sm.reduce_sum(-1, false)?;
    let h = rt.tensor(Shape::new(vec![1, 4]), DType::F16)?;
    let h_sm = h.softmax(-1)?;
    let clamped = x.reduce_sum(0, true)?;

    rt.launch()?;
    x.load_from_host(&HostArray::from_f32(
        Shape::new(vec![2, 3]),
        vec![1.0, 2.0, 3.0, -1.0, -2.0, -3.0],
    )?)?;
    h.load_from_host(&HostArray::from_f16(
        Shape::new(vec![1, 4]),
        [0.0f32, 0.5, 1.0, 1.5].map(f16::from_f32).to_vec(),
    )?)?;

    rt.run(1, false)?;
    let elapsed = rt.stop()?;

    println!(
        "softmax [[1,2,3],[-1,-2,-3]] = {:?}",
        sm.copy_to_host()?.to_f32_vec()
    );
    println!("row sums = {:?}", sums.copy_to_host()?.to_f32_vec());
    println!(
        "softmax f16 [0,0.5,1,1.5] = {:?}",
        h_sm.copy_to_host()?.to_f32_vec()
    );
    println!(
        "relu(sum over axis 0) = {:?}",
        clamped.copy_to_host()?.to_f32_vec()
    );
    println!("elapsed {:.5} ms", elapsed.as_secs_f64() * 1e3);
    Ok(())
}
