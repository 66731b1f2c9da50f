//! The conversion filter.
//!
//! Readings are classified by asset name:
//!
//! - `IEC104Command`: a command from an IEC 104 north plugin, converted to a
//!   Pivot operation and renamed `PivotCommand`.
//! - `PivotCommand`: a Pivot operation, converted to IEC 104 command fields
//!   and renamed `IEC104Command`.
//! - anything else is a label of the exchanged data. `data_object` children
//!   are converted to Pivot, `PIVOT` children to IEC 104 and every other
//!   child is kept as is.

use std::sync::Arc;

use snafu::Snafu;
use tracing::{debug, error, instrument, warn};

use crate::{
	SpanTraceWrapper,
	config::{ConfigError, ExchangeConfig},
	datapoint::{Datapoint, Reading},
	iec104::{AsduError, DataObject},
	pivot::{PIVOT_ROOT, PivotObjectError},
};

pub mod to_iec104;
pub mod to_pivot;

/// Asset name of commands coming from IEC 104.
pub const IEC104_COMMAND: &str = "IEC104Command";
/// Asset name of commands coming from Pivot consumers.
pub const PIVOT_COMMAND: &str = "PivotCommand";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub), context(suffix(false)))]
pub enum ConversionError {
	#[snafu(display("Missing field '{field}'"))]
	MissingField {
		field: &'static str,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Received type {received} does not match the configured type {configured}"))]
	TypeMismatch {
		configured: String,
		received: String,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("{type_id} is not a command type"))]
	NotACommand {
		type_id: String,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Record is coming from '{coming_from}', not from iec104"))]
	NotFromIec104 {
		coming_from: String,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Command {type_id} requires a timestamp but has no co_ts"))]
	MissingTimestamp {
		type_id: String,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Invalid timestamp: {source}"))]
	InvalidTimestamp {
		source: PivotObjectError,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("No exchanged data with address {address}"))]
	UnknownAddress {
		address: String,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("No exchanged data with pivot id {pivot_id}"))]
	UnknownPivotId {
		pivot_id: String,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Invalid Pivot object: {source}"))]
	PivotParse {
		source: PivotObjectError,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("{source}"))]
	AsduConversion {
		source: AsduError,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},
}

impl ConversionError {
	/// Records rejected on purpose, as opposed to malformed ones.
	#[must_use]
	pub const fn is_rejection(&self) -> bool {
		matches!(
			self,
			Self::TypeMismatch { .. } | Self::NotFromIec104 { .. } | Self::UnknownPivotId { .. }
		)
	}

	fn log(&self, what: &str) {
		if self.is_rejection() {
			warn!("Dropping {what}: {self}");
		} else {
			error!("Dropping {what}: {self}");
		}
	}
}

/// Bidirectional IEC 104 <-> Pivot filter.
#[derive(Debug, Clone, Default)]
pub struct Iec104PivotFilter {
	config: Arc<ExchangeConfig>,
}

impl Iec104PivotFilter {
	/// Create a filter from an exchanged data JSON document.
	pub fn new(config: &str) -> Result<Self, ConfigError> {
		Ok(Self::with_config(ExchangeConfig::import(config)?))
	}

	#[must_use]
	pub fn with_config(config: ExchangeConfig) -> Self {
		Self { config: Arc::new(config) }
	}

	#[must_use]
	pub fn config(&self) -> &ExchangeConfig {
		&self.config
	}

	/// Replace the exchanged data. On error the current configuration is kept.
	#[instrument(skip_all)]
	pub fn reconfigure(&mut self, config: &str) -> Result<(), ConfigError> {
		match ExchangeConfig::import(config) {
			Ok(config) => {
				debug!("Installing {} exchanged data points", config.len());
				self.config = Arc::new(config);
				Ok(())
			}
			Err(err) => {
				error!("Keeping the previous exchanged data: {err}");
				Err(err)
			}
		}
	}

	/// Replace the exchanged data with an already built index.
	pub fn set_config(&mut self, config: ExchangeConfig) {
		self.config = Arc::new(config);
	}

	/// Convert a batch of readings. Readings left without datapoints are removed.
	#[instrument(skip_all, fields(readings = readings.len()))]
	pub fn ingest(&mut self, readings: Vec<Reading>) -> Vec<Reading> {
		let config = Arc::clone(&self.config);
		readings.into_iter().filter_map(|reading| convert_reading(&config, reading)).collect()
	}
}

fn convert_reading(config: &ExchangeConfig, mut reading: Reading) -> Option<Reading> {
	let asset_name = reading.asset_name().to_owned();
	match asset_name.as_str() {
		IEC104_COMMAND => {
			match to_pivot::convert_operation_object_to_pivot(config, reading.datapoints()) {
				Ok(operation) => {
					reading.set_asset_name(PIVOT_COMMAND);
					reading.set_datapoints(vec![operation.to_datapoint()]);
				}
				Err(err) => {
					err.log("IEC 104 command");
					return None;
				}
			}
		}
		PIVOT_COMMAND => {
			let mut commands = reading.datapoints().iter().filter(|dp| dp.name() == PIVOT_ROOT);
			let (Some(command), None) = (commands.next(), commands.next()) else {
				warn!("Dropping Pivot command: expected exactly one {PIVOT_ROOT} datapoint");
				return None;
			};
			match to_iec104::convert_operation_object_to_iec104(config, command) {
				Ok(fields) => {
					reading.set_asset_name(IEC104_COMMAND);
					reading.set_datapoints(fields);
				}
				Err(err) => {
					err.log("Pivot command");
					return None;
				}
			}
		}
		label => {
			let Some(point) = config.by_label(label) else {
				debug!("'{label}' is not exchanged data, forwarding as is");
				return Some(reading);
			};

			let datapoints = reading
				.take_datapoints()
				.into_iter()
				.filter_map(|dp| match dp.name() {
					DataObject::NAME => to_pivot::convert_data_object_to_pivot(point, &dp)
						.map(|pivot| pivot.to_datapoint())
						.map_err(|err| err.log("IEC 104 data object"))
						.ok(),
					PIVOT_ROOT => match to_iec104::convert_data_object_to_iec104(config, &dp) {
						Ok(object) => Some(object),
						Err(err @ ConversionError::UnknownPivotId { .. }) => {
							warn!("{err}, forwarding as is");
							Some(dp)
						}
						Err(err) => {
							err.log("Pivot data object");
							None
						}
					},
					_ => Some(dp),
				})
				.collect::<Vec<Datapoint>>();
			reading.set_datapoints(datapoints);
		}
	}

	if reading.datapoints().is_empty() {
		debug!("Dropping reading '{}' without datapoints", reading.asset_name());
		return None;
	}
	Some(reading)
}

#[cfg(test)]
mod tests {
	use tracing_test::traced_test;

	use super::*;
	use crate::{
		datapoint::DatapointValue,
		iec104::QualityDescriptor,
		pivot::{
			CdcType, LogicalNode, PivotDataObject, PivotOperationObject, PivotTimestamp, TimeOrigin,
			Validity,
		},
	};

	const CONFIG: &str = r#"{"exchanged_data": {"datapoints": [
		{"label": "TS1", "pivot_id": "ID-45-672", "pivot_type": "SpsTyp",
		 "protocols": [{"name": "iec104", "address": "45-672", "typeid": "M_SP_NA_1"}]},
		{"label": "TS2", "pivot_id": "ID-45-872", "pivot_type": "DpsTyp",
		 "protocols": [{"name": "iec104", "address": "45-872", "typeid": "M_DP_NA_1"}]},
		{"label": "TS3", "pivot_id": "ID-45-890", "pivot_type": "DpsTyp",
		 "protocols": [{"name": "iec104", "address": "45-890", "typeid": "M_DP_TB_1"}]},
		{"label": "TM1", "pivot_id": "ID-45-984", "pivot_type": "MvTyp",
		 "protocols": [{"name": "iec104", "address": "45-984", "typeid": "M_ME_NC_1"}]},
		{"label": "TC1", "pivot_id": "ID-45-1000", "pivot_type": "SpcTyp",
		 "protocols": [{"name": "iec104", "address": "45-1000", "typeid": "C_SC_TA_1"}]},
		{"label": "TC2", "pivot_id": "ID-45-1001", "pivot_type": "BscTyp",
		 "protocols": [{"name": "iec104", "address": "45-1001", "typeid": "C_RC_NA_1"}]}
	]}}"#;

	fn filter() -> Iec104PivotFilter {
		Iec104PivotFilter::new(CONFIG).unwrap_or_default()
	}

	fn data_object(fields: Vec<Datapoint>) -> Datapoint {
		Datapoint::dict(DataObject::NAME, fields)
	}

	fn value_at<'a>(reading: &'a Reading, path: &[&str]) -> Option<&'a DatapointValue> {
		reading.datapoints().first()?.find(path).map(Datapoint::value)
	}

	#[test]
	fn test_single_point_to_pivot() {
		let reading = Reading::new(
			"TS1",
			vec![data_object(vec![
				Datapoint::new("do_type", "M_SP_NA_1"),
				Datapoint::new("do_ca", 45),
				Datapoint::new("do_ioa", 672),
				Datapoint::new("do_cot", 3),
				Datapoint::new("do_value", 1),
				Datapoint::new("do_quality_iv", 0),
				Datapoint::new("do_quality_bl", 0),
				Datapoint::new("do_quality_ov", 0),
				Datapoint::new("do_quality_sb", 0),
				Datapoint::new("do_quality_nt", 0),
				Datapoint::new("do_test", 0),
				Datapoint::new("do_comingfrom", "iec104"),
			])],
		);

		let output = filter().ingest(vec![reading]);
		assert_eq!(output.len(), 1);
		let reading = &output[0];
		assert_eq!(reading.asset_name(), "TS1");
		assert_eq!(reading.datapoints().len(), 1);
		assert_eq!(reading.datapoints()[0].name(), PIVOT_ROOT);

		assert_eq!(value_at(reading, &["GTIS", "Identifier"]), Some(&"ID-45-672".into()));
		assert_eq!(value_at(reading, &["GTIS", "ComingFrom"]), Some(&"iec104".into()));
		assert_eq!(value_at(reading, &["GTIS", "Cause", "stVal"]), Some(&3.into()));
		assert_eq!(value_at(reading, &["GTIS", "SpsTyp", "stVal"]), Some(&1.into()));
		assert_eq!(value_at(reading, &["GTIS", "SpsTyp", "q", "Validity"]), Some(&"good".into()));
		assert_eq!(value_at(reading, &["GTIS", "SpsTyp", "q", "Source"]), Some(&"process".into()));
		assert_eq!(value_at(reading, &["GTIS", "TmOrg", "stVal"]), Some(&"substituted".into()));
		assert!(value_at(reading, &["GTIS", "SpsTyp", "t", "SecondSinceEpoch"]).is_some());
		assert!(value_at(reading, &["GTIS", "Confirmation"]).is_none());
	}

	#[test]
	fn test_double_point_intermediate_state() {
		let reading = Reading::new(
			"TS2",
			vec![data_object(vec![
				Datapoint::new("do_type", "M_DP_NA_1"),
				Datapoint::new("do_ca", 45),
				Datapoint::new("do_ioa", 872),
				Datapoint::new("do_cot", 3),
				Datapoint::new("do_value", 0),
			])],
		);

		let output = filter().ingest(vec![reading]);
		assert_eq!(
			value_at(&output[0], &["GTIS", "DpsTyp", "stVal"]),
			Some(&"intermediate-state".into())
		);
	}

	#[test]
	#[traced_test]
	fn test_type_mismatch_is_dropped() {
		let reading = Reading::new(
			"TS3",
			vec![data_object(vec![
				Datapoint::new("do_type", "M_SP_TB_1"),
				Datapoint::new("do_ca", 45),
				Datapoint::new("do_ioa", 890),
				Datapoint::new("do_cot", 3),
				Datapoint::new("do_value", 1),
				Datapoint::new("do_ts", 1_700_000_000_000_i64),
			])],
		);

		assert!(filter().ingest(vec![reading]).is_empty());
		assert!(logs_contain("does not match the configured type M_DP_TB_1"));
	}

	#[test]
	#[traced_test]
	fn test_not_from_iec104_is_dropped() {
		let reading = Reading::new(
			"TS1",
			vec![data_object(vec![
				Datapoint::new("do_type", "M_SP_NA_1"),
				Datapoint::new("do_value", 1),
				Datapoint::new("do_comingfrom", "iec61850"),
			])],
		);
		assert!(filter().ingest(vec![reading]).is_empty());
		assert!(logs_contain("not from iec104"));
	}

	#[test]
	fn test_timestamp_forwarded() {
		let reading = Reading::new(
			"TS3",
			vec![data_object(vec![
				Datapoint::new("do_type", "M_DP_TB_1"),
				Datapoint::new("do_cot", 3),
				Datapoint::new("do_value", 2),
				Datapoint::new("do_ts", 1_700_000_000_250_i64),
				Datapoint::new("do_ts_iv", 1),
				Datapoint::new("do_ts_sub", 0),
			])],
		);

		let output = filter().ingest(vec![reading]);
		let pivot = output.first().and_then(|reading| reading.datapoints().first());
		let parsed = pivot.map(PivotDataObject::try_from);
		let Some(Ok(parsed)) = parsed else { panic!("expected a Pivot object") };
		assert_eq!(parsed.timestamp().map(PivotTimestamp::time_in_ms), Some(1_700_000_000_250));
		assert!(parsed.timestamp().is_some_and(PivotTimestamp::clock_failure));
		assert_eq!(parsed.tm_org(), Some(TimeOrigin::Genuine));
		assert_eq!(parsed.tm_validity(), Some(Validity::Invalid));
	}

	#[test]
	#[traced_test]
	fn test_missing_timestamp_on_timestamped_type() {
		let reading = Reading::new(
			"TS3",
			vec![data_object(vec![
				Datapoint::new("do_type", "M_DP_TB_1"),
				Datapoint::new("do_cot", 3),
				Datapoint::new("do_value", 1),
			])],
		);

		let output = filter().ingest(vec![reading]);
		assert_eq!(output.len(), 1);
		assert_eq!(value_at(&output[0], &["GTIS", "TmOrg", "stVal"]), Some(&"substituted".into()));
		assert!(logs_contain("has no do_ts"));
	}

	#[test]
	#[traced_test]
	fn test_out_of_range_still_emitted() {
		let reading = Reading::new(
			"TS1",
			vec![data_object(vec![
				Datapoint::new("do_type", "M_SP_NA_1"),
				Datapoint::new("do_cot", 3),
				Datapoint::new("do_value", 5),
			])],
		);

		let output = filter().ingest(vec![reading]);
		assert_eq!(value_at(&output[0], &["GTIS", "SpsTyp", "stVal"]), Some(&1.into()));
		assert!(logs_contain("out of range"));
	}

	#[test]
	fn test_acknowledgement() {
		let reading = Reading::new(
			"TC1",
			vec![data_object(vec![
				Datapoint::new("do_type", "C_SC_TA_1"),
				Datapoint::new("do_cot", 7),
				Datapoint::new("do_negative", 0),
				Datapoint::new("do_ts", 1_700_000_000_000_i64),
			])],
		);

		let output = filter().ingest(vec![reading]);
		assert_eq!(value_at(&output[0], &["GTIC", "Confirmation", "stVal"]), Some(&1.into()));
		assert!(value_at(&output[0], &["GTIC", "SpcTyp", "ctlVal"]).is_none());
		assert!(value_at(&output[0], &["GTIC", "SpcTyp", "q"]).is_none());
	}

	#[test]
	fn test_pivot_to_iec104() {
		let mut pivot = PivotDataObject::new(LogicalNode::Gtis, CdcType::Sps);
		pivot.set_identifier("ID-45-672");
		pivot.set_cause(3);
		pivot.set_st_val(true);
		pivot.add_quality(QualityDescriptor::default(), false);

		let output = filter().ingest(vec![Reading::new("TS1", vec![pivot.to_datapoint()])]);
		assert_eq!(output.len(), 1);
		assert_eq!(value_at(&output[0], &["do_value"]), Some(&1.into()));
		assert_eq!(value_at(&output[0], &["do_cot"]), Some(&3.into()));
		assert_eq!(value_at(&output[0], &["do_type"]), Some(&"M_SP_NA_1".into()));
		assert_eq!(value_at(&output[0], &["do_ca"]), Some(&45.into()));
		assert_eq!(value_at(&output[0], &["do_ioa"]), Some(&672.into()));
	}

	#[test]
	fn test_round_trip_measurement() {
		let reading = Reading::new(
			"TM1",
			vec![data_object(vec![
				Datapoint::new("do_type", "M_ME_NC_1"),
				Datapoint::new("do_ca", 45),
				Datapoint::new("do_ioa", 984),
				Datapoint::new("do_cot", 1),
				Datapoint::new("do_value", 12.5),
				Datapoint::new("do_quality_ov", 1),
			])],
		);

		let mut filter = filter();
		let pivot = filter.ingest(vec![reading]);
		assert_eq!(value_at(&pivot[0], &["GTIM", "MvTyp", "mag", "f"]), Some(&12.5.into()));
		assert_eq!(
			value_at(&pivot[0], &["GTIM", "MvTyp", "q", "Validity"]),
			Some(&"questionable".into())
		);

		let back = filter.ingest(pivot);
		assert_eq!(value_at(&back[0], &["do_type"]), Some(&"M_ME_NC_1".into()));
		assert_eq!(value_at(&back[0], &["do_value"]), Some(&12.5.into()));
		assert_eq!(value_at(&back[0], &["do_cot"]), Some(&1.into()));
		assert_eq!(value_at(&back[0], &["do_quality_ov"]), Some(&1.into()));
		assert_eq!(value_at(&back[0], &["do_quality_iv"]), Some(&0.into()));
	}

	#[test]
	#[traced_test]
	fn test_unknown_pivot_id_is_forwarded() {
		let mut pivot = PivotDataObject::new(LogicalNode::Gtis, CdcType::Sps);
		pivot.set_identifier("ID-UNKNOWN");
		pivot.set_st_val(false);
		let tree = pivot.to_datapoint();

		let output = filter().ingest(vec![Reading::new("TS1", vec![tree.clone()])]);
		assert_eq!(output[0].datapoints(), &[tree]);
		assert!(logs_contain("No exchanged data with pivot id ID-UNKNOWN"));
	}

	#[test]
	fn test_unmapped_label_and_other_children_pass_through() {
		let other = Reading::new("weather", vec![Datapoint::new("temperature", 21.5)]);
		let mixed = Reading::new(
			"TS1",
			vec![
				Datapoint::new("comment", "kept"),
				data_object(vec![
					Datapoint::new("do_type", "M_SP_NA_1"),
					Datapoint::new("do_value", 0),
				]),
			],
		);

		let output = filter().ingest(vec![other.clone(), mixed]);
		assert_eq!(output.len(), 2);
		assert_eq!(output[0], other);
		assert_eq!(output[1].datapoints()[0], Datapoint::new("comment", "kept"));
		assert_eq!(output[1].datapoints()[1].name(), PIVOT_ROOT);
	}

	#[test]
	fn test_iec104_command_to_pivot() {
		let reading = Reading::new(
			IEC104_COMMAND,
			vec![
				Datapoint::new("co_type", "C_SC_TA_1"),
				Datapoint::new("co_ca", "45"),
				Datapoint::new("co_ioa", "1000"),
				Datapoint::new("co_cot", 6),
				Datapoint::new("co_se", 1),
				Datapoint::new("co_test", 0),
				Datapoint::new("co_value", 1),
				Datapoint::new("co_ts", "1700000000000"),
			],
		);

		let output = filter().ingest(vec![reading]);
		assert_eq!(output.len(), 1);
		assert_eq!(output[0].asset_name(), PIVOT_COMMAND);
		assert_eq!(value_at(&output[0], &["GTIC", "Identifier"]), Some(&"ID-45-1000".into()));
		assert_eq!(value_at(&output[0], &["GTIC", "SpcTyp", "ctlVal"]), Some(&1.into()));
		assert_eq!(value_at(&output[0], &["GTIC", "Select", "stVal"]), Some(&1.into()));
		assert_eq!(value_at(&output[0], &["GTIC", "Test", "stVal"]), Some(&0.into()));
		assert_eq!(value_at(&output[0], &["GTIC", "Cause", "stVal"]), Some(&6.into()));
		assert!(value_at(&output[0], &["GTIC", "SpcTyp", "t"]).is_some());
	}

	#[test]
	#[traced_test]
	fn test_command_errors_drop_the_reading() {
		let command = |fields: Vec<Datapoint>| Reading::new(IEC104_COMMAND, fields);
		let mut filter = filter();

		// Unknown address.
		let unknown = command(vec![
			Datapoint::new("co_type", "C_SC_NA_1"),
			Datapoint::new("co_ca", 1),
			Datapoint::new("co_ioa", 1),
			Datapoint::new("co_value", 1),
		]);
		// Timestamped type without co_ts.
		let no_ts = command(vec![
			Datapoint::new("co_type", "C_SC_TA_1"),
			Datapoint::new("co_ca", 45),
			Datapoint::new("co_ioa", 1000),
			Datapoint::new("co_cot", 6),
			Datapoint::new("co_value", 1),
		]);
		// Missing value.
		let no_value = command(vec![
			Datapoint::new("co_type", "C_SC_TA_1"),
			Datapoint::new("co_ca", 45),
			Datapoint::new("co_ioa", 1000),
			Datapoint::new("co_ts", 1_700_000_000_000_i64),
		]);

		assert!(filter.ingest(vec![unknown, no_ts, no_value]).is_empty());
		assert!(logs_contain("No exchanged data with address 1-1"));
		assert!(logs_contain("requires a timestamp"));
		assert!(logs_contain("Missing field 'co_value'"));
	}

	#[test]
	fn test_pivot_command_to_iec104() {
		let mut command = PivotOperationObject::new(CdcType::Bsc);
		command.set_identifier("ID-45-1001");
		command.set_cause(6);
		command.set_ctl_val_str("lower");
		command.set_select(false);
		command.set_test(false);

		let output = filter().ingest(vec![Reading::new(PIVOT_COMMAND, vec![command.to_datapoint()])]);
		assert_eq!(output.len(), 1);
		let reading = &output[0];
		assert_eq!(reading.asset_name(), IEC104_COMMAND);
		assert_eq!(reading.datapoint("co_type").map(Datapoint::value), Some(&"C_RC_NA_1".into()));
		assert_eq!(reading.datapoint("co_value").map(Datapoint::value), Some(&1.into()));
		assert_eq!(reading.datapoint("co_ioa").map(Datapoint::value), Some(&1001.into()));
		assert_eq!(reading.datapoint("co_se").map(Datapoint::value), Some(&0.into()));
	}

	#[test]
	#[traced_test]
	fn test_pivot_command_needs_a_single_tree() {
		let command = |id: &str| {
			let mut command = PivotOperationObject::new(CdcType::Bsc);
			command.set_identifier(id);
			command.set_ctl_val_str("higher");
			command.to_datapoint()
		};

		let two = Reading::new(PIVOT_COMMAND, vec![command("ID-45-1001"), command("ID-45-1001")]);
		let none = Reading::new(PIVOT_COMMAND, vec![Datapoint::new("comment", "no command")]);
		assert!(filter().ingest(vec![two, none]).is_empty());
		assert!(logs_contain("expected exactly one PIVOT datapoint"));

		let one = Reading::new(
			PIVOT_COMMAND,
			vec![Datapoint::new("comment", "kept out"), command("ID-45-1001")],
		);
		let output = filter().ingest(vec![one]);
		assert_eq!(output.len(), 1);
		assert_eq!(
			output[0].datapoints().iter().filter(|dp| dp.name() == "co_type").count(),
			1
		);
		assert!(output[0].datapoint("comment").is_none());
	}

	#[test]
	#[traced_test]
	fn test_pivot_command_unknown_id_is_dropped() {
		let mut command = PivotOperationObject::new(CdcType::Spc);
		command.set_identifier("ID-UNKNOWN");
		command.set_ctl_val_bool(true);
		let output = filter().ingest(vec![Reading::new(PIVOT_COMMAND, vec![command.to_datapoint()])]);
		assert!(output.is_empty());
		assert!(logs_contain("Dropping Pivot command"));
	}

	#[test]
	#[traced_test]
	fn test_reconfigure() {
		let mut filter = filter();
		assert!(filter.config().by_label("TS1").is_some());

		assert!(filter.reconfigure("{\"exchanged_data\": 1}").is_err());
		assert!(filter.config().by_label("TS1").is_some());
		assert!(filter.config().by_pivot_id("ID-45-672").is_some());
		assert!(filter.config().by_address(45, 672).is_some());
		assert!(logs_contain("Keeping the previous exchanged data"));

		let result = filter.reconfigure(
			r#"{"exchanged_data": {"datapoints": [
				{"label": "TS9", "pivot_id": "ID-9", "pivot_type": "SpsTyp",
				 "protocols": [{"name": "iec104", "address": "9-9", "typeid": "M_SP_NA_1"}]}
			]}}"#,
		);
		assert!(result.is_ok());
		assert!(filter.config().by_label("TS1").is_none());
		assert!(filter.config().by_pivot_id("ID-45-672").is_none());
		assert!(filter.config().by_address(45, 672).is_none());
		assert_eq!(filter.config().by_address(9, 9).map(|p| p.label.as_str()), Some("TS9"));
	}
}
