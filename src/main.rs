use anyhow::{bail, Context};
use pcbkit::{init_logging, run_job, CancelToken, Config, Job, BUILD_DATE, VERSION};
use std::fs;
use std::path::PathBuf;
use tracing::info;

const USAGE: &str = "Usage: pcbkit <job.json> [--config <file>] [--out <dir>]";

struct Args {
    job: PathBuf,
    config: Option<PathBuf>,
    out: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut job: Option<PathBuf> = None;
    let mut config: Option<PathBuf> = None;
    let mut out: Option<PathBuf> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => config = Some(args.next().context(USAGE)?.into()),
            "--out" | "-o" => out = Some(args.next().context(USAGE)?.into()),
            "--version" | "-V" => {
                println!("pcbkit {} ({})", VERSION, BUILD_DATE);
                std::process::exit(0);
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            _ if job.is_none() && !arg.starts_with('-') => job = Some(arg.into()),
            _ => bail!("Unexpected argument '{}'\n{}", arg, USAGE),
        }
    }

    Ok(Args {
        job: job.context(USAGE)?,
        config,
        out,
    })
}

fn main() -> anyhow::Result<()> {
    init_logging()?;
    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()?)?,
    };

    let text = fs::read_to_string(&args.job)
        .with_context(|| format!("Failed to read job {}", args.job.display()))?;
    let job = Job::from_json(&text)?;

    let output = run_job(&job, &config, &CancelToken::new())?;

    match &args.out {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            for program in &output.programs {
                let path = dir.join(format!("{}.gcode", program.name));
                fs::write(&path, &program.gcode)?;
                info!("Wrote {}", path.display());
            }
        }
        None => {
            for program in &output.programs {
                println!("; ---- {} ----", program.name);
                print!("{}", program.gcode);
            }
        }
    }

    for failure in &output.failures {
        eprintln!("Operation {} failed: {}", failure.operation, failure.message);
    }
    if !output.failures.is_empty() && output.programs.is_empty() {
        bail!("Every operation failed");
    }
    Ok(())
}
