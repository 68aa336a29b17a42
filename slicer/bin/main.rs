use std::{
    io::{stdout, Write},
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

use args::Args;
use common::{config::BuildProfile, misc::human_duration};
use slicer::{
    repair::load_and_repair,
    slicer::{SliceConfig, Slicer},
};

mod args;

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };
    let filter = filter::Targets::new()
        .with_default(LevelFilter::OFF)
        .with_target("slicer", level)
        .with_target("mesh_format", level)
        .with_target("common", level);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let profile = BuildProfile::load(&args.profile)
        .with_context(|| format!("Loading profile `{}`", args.profile.display()))?;
    let (mesh, report) = load_and_repair(&args.mesh).context("Loading mesh")?;
    if report.holes_unfilled > 0 {
        warn!("Mesh is still open, some layers may be incomplete");
    }

    let (min, max) = mesh.bounds();
    let size = max - min;
    if size.x > profile.platform_size.x
        || size.y > profile.platform_size.y
        || size.z > profile.platform_size.z
    {
        warn!("Model extends outside of the print volume and will be cut off");
    }

    let slicer = Slicer::new(
        SliceConfig {
            profile,
            layer_height: args.layer_mm,
            anti_alias: args.aa,
            filter: args.filter,
            threads: args.threads,
            output_dir: args.out.clone(),
        },
        &mesh,
    )?;
    let progress = slicer.progress();

    // Actually slice it on another thread (the slicing is multithreaded)
    let handle = thread::spawn(move || slicer.slice());

    let total = progress.total();
    while !handle.is_finished() {
        let completed = progress.wait(Duration::from_millis(100));
        print!(
            "\rLayer: {}/{}, {:.1}%",
            completed,
            total,
            progress.progress() * 100.0
        );
        stdout().flush()?;
    }

    let report = match handle.join() {
        Ok(report) => report.with_context(|| format!("Slicing into `{}`", args.out.display()))?,
        Err(_) => anyhow::bail!("Slicing thread panicked"),
    };

    println!(
        "\nDone. Wrote {} of {} layers to `{}` in {}.",
        report.written,
        report.layers,
        args.out.display(),
        human_duration(report.elapsed)
    );
    if report.empty > 0 {
        println!(" \\ {} layer(s) had no cross-section.", report.empty);
    }
    if report.degenerate_chains > 0 {
        println!(
            " \\ {} open contour(s) were dropped across {} layer(s).",
            report.degenerate_chains, report.degenerate_layers
        );
    }

    Ok(())
}
