//! Run a batch of readings through the IEC 104 <-> Pivot filter.
//!
//! Readings are read as a JSON array of `{"asset_code": .., "reading": {..}}`
//! objects and the converted batch is printed as JSON on stdout.
//!
//! ```text
//! iec104-pivot --config exchanged_data.json --input readings.json
//! ```

use std::{
	cell::RefCell,
	fs,
	io::{self, Write as _},
	path::PathBuf,
	rc::Rc,
};

use clap::Parser;
use iec104_pivot::{
	Reading,
	plugin::{self, DEFAULT_CONFIG},
};
use snafu::{ResultExt as _, Whatever};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
	EnvFilter, Layer as _, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

#[derive(Debug, Parser)]
#[command(version, about = "IEC 104 <-> Pivot conversion filter")]
struct Args {
	/// Configuration category holding the `exchanged_data` item. The built-in
	/// default configuration is used when omitted.
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// JSON array of readings to convert.
	#[arg(short, long)]
	input: PathBuf,

	/// Log filter, overridden by `RUST_LOG`.
	#[arg(long, default_value = "info")]
	log: String,
}

fn main() -> Result<(), Whatever> {
	let args = Args::parse();

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log));
	let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_filter(filter);
	tracing_subscriber::registry()
		.with(layer)
		.with(ErrorLayer::default().with_filter(EnvFilter::from("debug")))
		.init();

	let config = match &args.config {
		Some(path) => fs::read_to_string(path)
			.with_whatever_context(|_| format!("Failed to read {}", path.display()))?,
		None => DEFAULT_CONFIG.to_owned(),
	};
	let input = fs::read_to_string(&args.input)
		.with_whatever_context(|_| format!("Failed to read {}", args.input.display()))?;
	let readings: Vec<Reading> =
		serde_json::from_str(&input).whatever_context("Failed to parse the readings")?;

	let converted = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&converted);
	let mut handle = plugin::plugin_init(Some(&config), move |readings: Vec<Reading>| {
		sink.borrow_mut().extend(readings);
	});
	plugin::plugin_ingest(&mut handle, readings);
	plugin::plugin_shutdown(handle);

	let output = serde_json::to_string_pretty(&*converted.borrow())
		.whatever_context("Failed to encode the readings")?;
	writeln!(io::stdout().lock(), "{output}").whatever_context("Failed to write the readings")?;

	Ok(())
}
