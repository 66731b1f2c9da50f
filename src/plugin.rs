//! Host pipeline entry points.
//!
//! The host creates one [`FilterHandle`] per filter instance with
//! [`plugin_init`], pushes batches through [`plugin_ingest`] and receives the
//! converted batches through the [`OutputHandler`] it registered.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use snafu::{OptionExt as _, ResultExt as _, Snafu};
use tracing::{error, info, instrument};

use crate::{
	SpanTraceWrapper,
	config::{ConfigError, ExchangeConfig},
	datapoint::Reading,
	filter::Iec104PivotFilter,
};

pub const PLUGIN_NAME: &str = "iec104_pivot_filter";
pub const PLUGIN_VERSION: &str = "1.0.0";
pub const PLUGIN_TYPE: &str = "filter";
pub const INTERFACE_VERSION: &str = "1.0.0";

/// Default configuration category of the filter.
pub const DEFAULT_CONFIG: &str = r#"{
	"plugin": {
		"description": "IEC 104 to pivot filter plugin",
		"type": "string",
		"default": "iec104_pivot_filter",
		"readonly": "true"
	},
	"exchanged_data": {
		"description": "exchanged data list",
		"type": "JSON",
		"displayName": "Exchanged data list",
		"order": "1",
		"default": {
			"exchanged_data": {
				"name": "iec104pivot",
				"version": "1.0",
				"datapoints": [
					{
						"label": "TS1",
						"pivot_id": "ID-45-672",
						"pivot_type": "SpsTyp",
						"protocols": [{"name": "iec104", "address": "45-672", "typeid": "M_SP_NA_1"}]
					},
					{
						"label": "TS2",
						"pivot_id": "ID-45-872",
						"pivot_type": "SpsTyp",
						"protocols": [{"name": "iec104", "address": "45-872", "typeid": "M_SP_TB_1"}]
					},
					{
						"label": "TS3",
						"pivot_id": "ID-45-890",
						"pivot_type": "DpsTyp",
						"protocols": [{"name": "iec104", "address": "45-890", "typeid": "M_DP_TB_1"}]
					},
					{
						"label": "TM1",
						"pivot_id": "ID-45-984",
						"pivot_type": "MvTyp",
						"protocols": [{"name": "iec104", "address": "45-984", "typeid": "M_ME_NA_1"}]
					}
				]
			}
		}
	}
}"#;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub), context(suffix(false)))]
pub enum PluginError {
	#[snafu(display("Invalid configuration category: {source}"))]
	InvalidCategory {
		source: serde_json::Error,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Configuration has no exchanged_data item"))]
	MissingExchangedData {
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("{source}"))]
	ExchangedData {
		source: ConfigError,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},
}

/// Static description of the plugin returned to the host.
#[derive(Debug, Clone, Serialize)]
pub struct PluginInformation {
	pub name: &'static str,
	pub version: &'static str,
	pub options: u32,
	#[serde(rename = "type")]
	pub plugin_type: &'static str,
	pub interface: &'static str,
	pub config: &'static str,
}

#[must_use]
pub const fn plugin_info() -> PluginInformation {
	PluginInformation {
		name: PLUGIN_NAME,
		version: PLUGIN_VERSION,
		options: 0,
		plugin_type: PLUGIN_TYPE,
		interface: INTERFACE_VERSION,
		config: DEFAULT_CONFIG,
	}
}

/// Receives the converted readings of every ingested batch.
pub trait OutputHandler {
	fn output(&mut self, readings: Vec<Reading>);
}

impl<F: FnMut(Vec<Reading>)> OutputHandler for F {
	fn output(&mut self, readings: Vec<Reading>) {
		self(readings);
	}
}

/// One filter instance and where its output goes.
pub struct FilterHandle {
	filter: Iec104PivotFilter,
	output: Box<dyn OutputHandler>,
}

impl fmt::Debug for FilterHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FilterHandle").field("filter", &self.filter).finish_non_exhaustive()
	}
}

impl FilterHandle {
	#[must_use]
	pub const fn filter(&self) -> &Iec104PivotFilter {
		&self.filter
	}
}

/// Build the exchanged data index out of a configuration category.
///
/// The `exchanged_data` item is either the document itself, the document as
/// a JSON string, or a category item whose `value` (or `default`) holds it.
pub fn exchanged_data_from_category(category: &str) -> Result<ExchangeConfig, PluginError> {
	let category: Value = serde_json::from_str(category).context(InvalidCategory)?;
	let item = category.get("exchanged_data").context(MissingExchangedData)?;
	exchanged_data_from_item(item)
}

fn exchanged_data_from_item(item: &Value) -> Result<ExchangeConfig, PluginError> {
	match item {
		Value::String(document) => ExchangeConfig::import(document).context(ExchangedData),
		Value::Object(fields) => match fields.get("value").or_else(|| fields.get("default")) {
			Some(inner) => exchanged_data_from_item(inner),
			None => ExchangeConfig::from_json(item).context(ExchangedData),
		},
		_ => ExchangeConfig::from_json(item).context(ExchangedData),
	}
}

/// Create a filter instance.
///
/// Without a usable configuration the filter starts with no exchanged data,
/// every reading is then forwarded untouched.
#[instrument(skip_all)]
pub fn plugin_init(config: Option<&str>, output: impl OutputHandler + 'static) -> FilterHandle {
	info!("Initializing the plugin");

	let filter = match config.map(exchanged_data_from_category) {
		Some(Ok(config)) => Iec104PivotFilter::with_config(config),
		Some(Err(err)) => {
			error!("Starting without exchanged data: {err}");
			Iec104PivotFilter::default()
		}
		None => Iec104PivotFilter::default(),
	};

	FilterHandle { filter, output: Box::new(output) }
}

/// Convert a batch and hand it to the output handler.
pub fn plugin_ingest(handle: &mut FilterHandle, readings: Vec<Reading>) {
	let converted = handle.filter.ingest(readings);
	handle.output.output(converted);
}

/// Apply a new configuration category. On error the filter keeps its
/// current exchanged data.
#[instrument(skip_all)]
pub fn plugin_reconfigure(handle: &mut FilterHandle, config: &str) -> Result<(), PluginError> {
	match exchanged_data_from_category(config) {
		Ok(exchanged_data) => {
			info!("Reconfigured with {} exchanged data points", exchanged_data.len());
			handle.filter.set_config(exchanged_data);
			Ok(())
		}
		Err(err) => {
			error!("Keeping the previous exchanged data: {err}");
			Err(err)
		}
	}
}

pub fn plugin_shutdown(handle: FilterHandle) {
	info!("Shutting down the plugin");
	drop(handle);
}

#[cfg(test)]
mod tests {
	use std::{cell::RefCell, rc::Rc};

	use tracing_test::traced_test;

	use super::*;
	use crate::datapoint::Datapoint;

	fn collector() -> (Rc<RefCell<Vec<Vec<Reading>>>>, impl OutputHandler + 'static) {
		let batches = Rc::new(RefCell::new(Vec::new()));
		let sink = Rc::clone(&batches);
		(batches, move |readings: Vec<Reading>| sink.borrow_mut().push(readings))
	}

	fn single_point(label: &str) -> Reading {
		Reading::new(
			label,
			vec![Datapoint::dict(
				"data_object",
				vec![
					Datapoint::new("do_type", "M_SP_NA_1"),
					Datapoint::new("do_ca", 45),
					Datapoint::new("do_ioa", 672),
					Datapoint::new("do_cot", 3),
					Datapoint::new("do_value", 1),
				],
			)],
		)
	}

	#[test]
	fn test_plugin_info() -> Result<(), serde_json::Error> {
		let info = plugin_info();
		assert_eq!(info.name, "iec104_pivot_filter");
		assert_eq!(info.version, "1.0.0");
		assert_eq!(info.plugin_type, "filter");
		assert_eq!(info.interface, "1.0.0");

		let config: Value = serde_json::from_str(info.config)?;
		assert!(config.get("plugin").is_some());
		assert!(config.get("exchanged_data").is_some());
		Ok(())
	}

	#[test]
	fn test_default_config() -> Result<(), PluginError> {
		let config = exchanged_data_from_category(DEFAULT_CONFIG)?;
		assert_eq!(config.len(), 4);
		for label in ["TS1", "TS2", "TS3", "TM1"] {
			assert!(config.by_label(label).is_some(), "{label}");
		}
		Ok(())
	}

	#[test]
	fn test_exchanged_data_item_forms() -> Result<(), PluginError> {
		let document = r#"{"exchanged_data": {"datapoints": [
			{"label": "TS1", "pivot_id": "ID-45-672", "pivot_type": "SpsTyp",
			 "protocols": [{"name": "iec104", "address": "45-672", "typeid": "M_SP_NA_1"}]}
		]}}"#;
		let as_object = format!(r#"{{"exchanged_data": {document}}}"#);
		let as_string = serde_json::json!({ "exchanged_data": document }).to_string();
		let as_item = format!(r#"{{"exchanged_data": {{"type": "JSON", "value": {document}}}}}"#);

		for category in [as_object, as_string, as_item] {
			assert!(exchanged_data_from_category(&category)?.by_label("TS1").is_some());
		}

		assert!(matches!(
			exchanged_data_from_category("{}"),
			Err(PluginError::MissingExchangedData { .. })
		));
		assert!(matches!(
			exchanged_data_from_category("{"),
			Err(PluginError::InvalidCategory { .. })
		));
		Ok(())
	}

	#[test]
	fn test_ingest_forwards_converted_readings() {
		let (batches, output) = collector();
		let mut handle = plugin_init(Some(DEFAULT_CONFIG), output);

		plugin_ingest(&mut handle, vec![single_point("TS1")]);

		let batches = batches.borrow();
		assert_eq!(batches.len(), 1);
		assert_eq!(batches[0].len(), 1);
		assert!(batches[0][0].datapoints()[0].find(&["GTIS", "SpsTyp", "stVal"]).is_some());
	}

	#[test]
	#[traced_test]
	fn test_init_without_config_passes_through() {
		let (batches, output) = collector();
		let mut handle = plugin_init(None, output);
		assert!(handle.filter().config().is_empty());

		let reading = single_point("TS1");
		plugin_ingest(&mut handle, vec![reading.clone()]);
		assert_eq!(batches.borrow()[0], vec![reading]);

		let _handle = plugin_init(Some("not json"), |_: Vec<Reading>| {});
		assert!(logs_contain("Starting without exchanged data"));
	}

	#[test]
	#[traced_test]
	fn test_reconfigure_keeps_previous_on_error() {
		let (_batches, output) = collector();
		let mut handle = plugin_init(Some(DEFAULT_CONFIG), output);

		assert!(plugin_reconfigure(&mut handle, r#"{"exchanged_data": "not json"}"#).is_err());
		assert!(handle.filter().config().by_label("TS3").is_some());
		assert!(logs_contain("Keeping the previous exchanged data"));

		let result = plugin_reconfigure(
			&mut handle,
			r#"{"exchanged_data": {"exchanged_data": {"datapoints": []}}}"#,
		);
		assert!(result.is_ok());
		assert!(handle.filter().config().is_empty());

		plugin_shutdown(handle);
	}
}
