//! IEC 60870-5-104 <-> Pivot conversion filter.
//!
//! The filter sits in a data pipeline between IEC 104 plugins and consumers
//! of the Pivot model (an IEC 61850 inspired representation). Readings coming
//! from IEC 104 are rewritten as Pivot trees, Pivot trees going to IEC 104
//! are rewritten as IEC 104 data objects, and commands are converted in both
//! directions. Which points are converted, and how, is driven by the
//! exchanged data configuration.
//!
//! ```no_run
//! use iec104_pivot::{Iec104PivotFilter, Reading};
//!
//! # fn run(config: &str, readings: Vec<Reading>) -> Result<(), iec104_pivot::ConfigError> {
//! let mut filter = Iec104PivotFilter::new(config)?;
//! let converted = filter.ingest(readings);
//! # Ok(())
//! # }
//! ```

use std::fmt;

use tracing_error::SpanTrace;

pub mod config;
pub mod datapoint;
pub mod filter;
pub mod iec104;
pub mod pivot;
pub mod plugin;

pub use config::{ConfigError, ExchangeConfig, ExchangePoint};
pub use datapoint::{Datapoint, DatapointValue, Reading};
pub use filter::Iec104PivotFilter;
pub use pivot::{PivotDataObject, PivotOperationObject, PivotTimestamp};

/// Span trace captured where an error is created.
#[derive(Debug, Clone)]
pub struct SpanTraceWrapper(SpanTrace);

impl snafu::GenerateImplicitData for Box<SpanTraceWrapper> {
	fn generate() -> Self {
		Box::new(SpanTraceWrapper(SpanTrace::capture()))
	}
}

impl fmt::Display for SpanTraceWrapper {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.0.status() == tracing_error::SpanTraceStatus::CAPTURED {
			write!(f, "\nAt:\n")?;
			self.0.fmt(f)?;
		}
		Ok(())
	}
}
