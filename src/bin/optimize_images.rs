use clap::Parser;
use color_eyre::{
	Result,
	eyre::{WrapErr as _, bail},
};
use comic_cover::{AppConfig, optimize};
use tracing_subscriber::EnvFilter;
use v_utils::utils::eyre::exit_on_error;

#[derive(Debug, Parser)]
#[command(name = "optimize_images")]
#[command(about = "Downscale and recompress a comic's cover and page images, keeping the originals in a backup directory")]
struct Args {
	/// Comic identifier, e.g. `001`. Read from `<content_dir>/<id>.md`.
	comic_id: String,
	/// Report what would be backed up and optimized without touching any file.
	#[arg(long)]
	dry_run: bool,
}

fn main() {
	let args = match Args::try_parse() {
		Ok(args) => args,
		Err(e) => {
			let _ = e.print();
			std::process::exit(if e.use_stderr() { 1 } else { 0 });
		}
	};
	exit_on_error(run(&args));
}

fn run(args: &Args) -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with_writer(std::io::stderr)
		.init();

	let config = AppConfig::read(None).wrap_err("Config file does not exist or is invalid")?;
	let dry = if args.dry_run { " (dry run)" } else { "" };
	println!("Optimizing images for comic {}{dry}...", args.comic_id);

	let report = optimize::optimize_comic(&config, &args.comic_id, args.dry_run).wrap_err_with(|| format!("Failed to optimize images for comic {}", args.comic_id))?;

	println!("Processed: {}", report.processed);
	if report.skipped > 0 {
		println!("Skipped (not found): {}", report.skipped);
	}
	if report.failed > 0 {
		bail!("{} image(s) of comic {} could not be optimized", report.failed, args.comic_id);
	}
	if args.dry_run {
		println!("This was a dry run. Run without --dry-run to apply changes.");
	}
	Ok(())
}
