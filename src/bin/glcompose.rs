use std::{fs, path::PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use glcompose::{
    HeadlessDriver, HeadlessOpts, RecordingHost, Surface, SurfaceConfig, probe,
};

#[derive(Parser, Debug)]
#[command(name = "glcompose", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the capabilities of a headless driver profile.
    Probe(ProbeArgs),
    /// Run frames on a headless surface and print compositing statistics.
    Frames(FramesArgs),
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    #[arg(long, value_enum, default_value_t = Profile::Full)]
    profile: Profile,
}

#[derive(Parser, Debug)]
struct FramesArgs {
    /// Surface configuration JSON. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Number of frames to run.
    #[arg(long, default_value_t = 1)]
    frames: u32,

    #[arg(long, value_enum, default_value_t = Profile::Full)]
    profile: Profile,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Profile {
    /// Extended profile with multisampling and every extension.
    Full,
    /// No extensions, single-sampled only.
    Minimal,
}

impl Profile {
    fn opts(self) -> HeadlessOpts {
        match self {
            Profile::Full => HeadlessOpts::default(),
            Profile::Minimal => HeadlessOpts::minimal(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Probe(args) => cmd_probe(args),
        Command::Frames(args) => cmd_frames(args),
    }
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let driver = HeadlessDriver::new(args.profile.opts());
    let caps = probe(&driver);
    let out = serde_json::json!({
        "extended_profile": caps.extended_profile,
        "multisample_supported": caps.multisample_supported,
        "packed_depth_stencil_supported": caps.packed_depth_stencil_supported,
        "non_power_of_two_supported": caps.non_power_of_two_supported,
        "max_samples": caps.max_samples,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_frames(args: FramesArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("read config '{}'", path.display()))?;
            SurfaceConfig::from_json_str(&text).with_context(|| "parse surface config")?
        }
        None => SurfaceConfig::default(),
    };

    let mut surface = Surface::new(HeadlessDriver::new(args.profile.opts()), config)?;
    let mut host = RecordingHost::new();
    let request = surface.initialize(&mut host)?;
    let ctx = surface.driver().context();
    surface.on_context_created(ctx);
    surface.on_resized(args.width, args.height);

    for _ in 0..args.frames {
        surface.frame(|_| ())?;
    }

    let blits = surface.blit_stats();
    let driver = surface.driver().stats();
    let out = serde_json::json!({
        "request": request,
        "offscreen": surface.is_fbo_backed(),
        "fbo_size": [surface.fbo_width(), surface.fbo_height()],
        "resolves": blits.resolves,
        "presents": blits.presents,
        "skipped_draws": blits.skipped_draws,
        "buffer_allocations": driver.buffer_allocations(),
        "program_links": driver.program_links,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
