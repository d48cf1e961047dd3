//! LambdaFS - compress a file or directory tree next to itself

use anyhow::{bail, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use lambdafs_core::{Codec, Coordinator, Flavor, PipelineSettings, ProgressEvent, ProgressFn, Throughput};
use log::info;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

mod cli;
mod progress;
use cli::Cli;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = err.to_string();
            let message = message.trim();
            if !message.is_empty() {
                eprintln!("ERROR: {message}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let Some(path) = cli.path else {
        bail!("You must specify a path to compress.");
    };
    let input = std::path::absolute(&path)?;
    if !input.exists() {
        bail!("The provided path doesn't exist.");
    }

    let coordinator = Coordinator::new(PipelineSettings::cli());
    coordinator.require(Codec::Brotli)?;
    let output = coordinator.plan_deflate(&input, Flavor::Cli)?.output;
    info!(
        "compressing {} to {} ({} KiB chunks)",
        input.display(),
        output.display(),
        coordinator.settings().read_chunk_size / 1024
    );

    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
    pb.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));

    let throughput = Arc::new(Mutex::new(Throughput::default()));
    pb.set_message(progress::status(&input, &output, &Throughput::default(), false));

    let pb_clone = pb.clone();
    let totals = throughput.clone();
    let (status_input, status_output) = (input.clone(), output.clone());
    let progress_fn: Arc<ProgressFn> = Arc::new(move |event: &ProgressEvent| {
        if let Ok(mut totals) = totals.lock() {
            totals.observe(event);
            pb_clone.set_message(progress::status(&status_input, &status_output, &totals, false));
        }
    });

    let result = coordinator.with_progress(progress_fn).compress(&input);
    match result {
        Ok(written) => {
            let totals = throughput.lock().map(|totals| *totals).unwrap_or_default();
            pb.finish_and_clear();
            // Always on stdout, even when the spinner is hidden.
            println!("{}", progress::status(&input, &written, &totals, true));
            Ok(())
        }
        Err(err) => {
            pb.finish_and_clear();
            Err(err.into())
        }
    }
}
