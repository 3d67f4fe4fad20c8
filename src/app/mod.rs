//! Application module: command line, settings resolution and the frame loop.

mod headless;

use std::path::PathBuf;

use clap::Parser;
use cullrender::render::culling::CullingMode;
use cullrender::utils::{CullSettings, load_settings, save_settings};
use cullrender::{DEFAULT_TARGET_HEIGHT, DEFAULT_TARGET_WIDTH, Result};

use headless::HeadlessApp;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Culling path: auto picks GPU when the adapter supports compute
    #[arg(long, value_enum)]
    mode: Option<CullingMode>,

    /// Number of frames to render before exiting
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// TOML settings file; missing values use defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective settings to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Cross-check every GPU cull against the CPU path
    #[arg(long, default_value_t = false)]
    validate: bool,

    /// Offscreen target width
    #[arg(long, default_value_t = DEFAULT_TARGET_WIDTH)]
    width: u32,

    /// Offscreen target height
    #[arg(long, default_value_t = DEFAULT_TARGET_HEIGHT)]
    height: u32,
}

impl Args {
    fn settings(&self) -> Result<CullSettings> {
        let mut settings = match &self.config {
            Some(path) => load_settings(path)?,
            None => CullSettings::default(),
        };
        if let Some(mode) = self.mode {
            settings.culling.mode = mode;
        }
        if self.validate {
            settings.debug.validate = true;
        }
        settings.check()?;
        Ok(settings)
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let settings = args.settings()?;

    if let Some(path) = &args.write_config {
        save_settings(path, &settings)?;
        tracing::info!("Wrote settings to {}", path.display());
        return Ok(());
    }

    let mut app = HeadlessApp::new(settings, args.width, args.height)?;
    app.run(args.frames)
}
