mod app_dir;
mod cli;
mod error;
mod preferences;
mod session;

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use brotzoom_core::RasterSize;
use brotzoom_render::{export_png, ExportMetadata};

use cli::Cli;
use error::Result;
use preferences::Preferences;
use session::ExplorerSession;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting brotzoom");

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut prefs = Preferences::load();
    cli.apply_to(&mut prefs);

    if cli.save_preferences {
        let path = prefs.save()?;
        info!("Saved preferences to {}", path.display());
    }

    let out_dir = prefs.output_directory();
    if !cli.no_export {
        fs::create_dir_all(&out_dir)?;
    }
    let palette_name = prefs.palette().name;

    let mut session = ExplorerSession::from_preferences(&prefs)?;
    match cli.device_pixel_ratio {
        Some(dpr) => {
            let raster = RasterSize::from_device_pixels(
                prefs.raster_width as f64,
                prefs.raster_height as f64,
                dpr,
            )?;
            session.resize(raster)?;
        }
        None => {
            session.render()?;
        }
    }

    let frames = cli.zooms.len() + 1;
    for frame in 0..frames {
        if frame > 0 {
            let selection = &cli.zooms[frame - 1];
            if let Err(e) = session.finalize_selection(selection) {
                warn!("Skipping zoom {frame}: {e}");
                continue;
            }
        }
        let Some(summary) = session.wait() else {
            warn!("Frame {frame} did not complete");
            continue;
        };
        if summary.tiles_failed > 0 && session.retry_failed() > 0 {
            session.wait();
        }
        let failed = session.failures().len();
        if failed > 0 {
            warn!("Frame {frame}: {failed} tile(s) left blank");
        }

        let raster = session.raster();
        println!(
            "frame {frame} ({}x{})\n{}\n",
            raster.width,
            raster.height,
            session.readout()
        );

        if !cli.no_export {
            export_frame(&session, &out_dir.join(format!("frame_{frame:03}.png")), palette_name)?;
        }
    }

    let stats = session.stats();
    info!(
        batches = stats.batches_submitted,
        tiles = stats.tiles_rendered,
        failed = stats.tiles_failed,
        stale = stats.stale_results_dropped,
        "Done"
    );
    Ok(())
}

fn export_frame(session: &ExplorerSession, path: &Path, palette_name: &str) -> Result<()> {
    let buffer = session.buffer();
    let metadata = ExportMetadata::new(
        session.viewport(),
        &buffer,
        session.params().max_iterations,
        palette_name,
    );
    export_png(&buffer, path, &metadata)?;
    info!("Exported {}", path.display());
    Ok(())
}
