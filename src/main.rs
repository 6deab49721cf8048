use clap::Parser;
use color_eyre::{Result, eyre::WrapErr as _};
use comic_cover::AppConfig;
use tracing_subscriber::EnvFilter;
use v_utils::utils::eyre::exit_on_error;

#[derive(Debug, Parser)]
#[command(name = "comic_cover")]
#[command(about = "Composite a comic's pages and credits into its cover image")]
struct Args {
	/// Comic identifier, e.g. `001`. Read from `<content_dir>/<id>.md`.
	comic_id: String,
}

fn main() {
	// usage errors exit with 1, like every other failure
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
	println!("Generating cover for comic {}...", args.comic_id);

	let output = comic_cover::generate_cover(&config, &args.comic_id).wrap_err_with(|| format!("Failed to generate cover for comic {}", args.comic_id))?;

	println!("Cover written to: {}", output.display());
	Ok(())
}
