use clap::Parser;
use kbd_layout_parser::cfg;
use miette::{IntoDiagnostic, Result, miette};
use simplelog::*;

mod main_lib;

use main_lib::args::{Args, OutputFormat};


/// Parse CLI arguments and initialize logging.
fn cli_init() -> Result<Args> {
    let args = Args::parse();

    let log_lvl = match (args.quiet, args.debug, args.trace) {
        (true, _, _) => LevelFilter::Error,
        (false, _, true) => LevelFilter::Trace,
        (false, true, false) => LevelFilter::Debug,
        (false, false, false) => LevelFilter::Info,
    };

    let mut log_cfg = ConfigBuilder::new();
    if let Err(e) = log_cfg.set_time_offset_to_local() {
        eprintln!("WARNING: could not set log TZ to local: {e:?}");
    };
    log_cfg.set_time_format_rfc3339();
    // Stdout carries the layout, so every log line goes to stderr.
    CombinedLogger::init(vec![TermLogger::new(
        log_lvl,
        log_cfg.build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )])
    .into_diagnostic()?;
    log::debug!("kbd-layout-dump v{} starting", env!("CARGO_PKG_VERSION"));

    if !args.cfg.exists() {
        return Err(miette!(
            "Could not find the config file ({})\nFor more info, pass the `-h` or `--help` flags.",
            args.cfg.display()
        ));
    }
    Ok(args)
}

fn main_impl() -> Result<()> {
    let args = cli_init()?;
    let layout = cfg::new_from_file(&args.cfg, &args.parse_options())?;
    for warning in &layout.warnings {
        log::warn!("{warning}");
    }
    log::info!(
        "read {} key(s) in {} row(s) with {} layer(s)",
        layout.keys.len(),
        layout.rows,
        layout.layers.len()
    );

    if args.check {
        log::info!("validating config only and exiting");
        return Ok(());
    }

    let text = main_lib::render(&layout, args.format).map_err(|e| miette!("{e:#}"))?;
    match args.output_path() {
        Some(path) => main_lib::write_output(&path, &text).map_err(|e| miette!("{e:#}"))?,
        None => {
            if args.format == OutputFormat::Kle {
                log::info!("paste the following into the Raw data tab of keyboard-layout-editor.com");
            }
            println!("{text}");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let ret = main_impl();
    if let Err(ref e) = ret {
        log::error!("{e}");
    }
    ret
}
