//! IEC 104 -> Pivot conversion.

use snafu::{OptionExt as _, ResultExt as _, ensure};
use tracing::{instrument, warn};

use crate::{
	config::{ExchangeConfig, ExchangePoint, address_key},
	datapoint::Datapoint,
	filter::{
		AsduConversion, ConversionError, InvalidTimestamp, MissingField, MissingTimestamp,
		NotACommand, NotFromIec104, TypeMismatch, UnknownAddress,
	},
	iec104::{AsduType, CommandObject, DataObject, PROTOCOL_NAME},
	pivot::{PivotDataObject, PivotOperationObject, PivotTimestamp},
};

/// Highest cause of transmission.
const MAX_COT: i64 = 63;

/// Check the received type against the configured one, both must be
/// supported and of the same family.
fn check_type(point: &ExchangePoint, received: &str) -> Result<&'static AsduType, ConversionError> {
	let configured = AsduType::get(&point.type_id).context(AsduConversion)?;
	let received_type = AsduType::get(received).context(AsduConversion)?;
	ensure!(
		configured.same_family(received_type),
		TypeMismatch { configured: point.type_id.as_str(), received }
	);
	Ok(received_type)
}

/// Records are accepted when produced by an IEC 104 plugin. No origin counts as IEC 104.
fn check_coming_from(coming_from: Option<&str>) -> Result<(), ConversionError> {
	match coming_from {
		Some(coming_from) if coming_from != PROTOCOL_NAME => NotFromIec104 { coming_from }.fail(),
		_ => Ok(()),
	}
}

/// Convert a `data_object` of the exchanged data `point` to a Pivot object.
#[instrument(skip_all, fields(label = %point.label))]
pub fn convert_data_object_to_pivot(
	point: &ExchangePoint,
	dp: &Datapoint,
) -> Result<PivotDataObject, ConversionError> {
	let object = DataObject::from_datapoint(dp);
	let type_id = object.type_id.as_deref().context(MissingField { field: "do_type" })?;
	let asdu = check_type(point, type_id)?;
	check_coming_from(object.coming_from.as_deref())?;

	let family = asdu.family;
	let mut pivot = PivotDataObject::new(family.logical_node(), family.cdc());
	pivot.set_identifier(point.pivot_id.as_str());

	match object.cot {
		Some(cot) => pivot.set_cause(cot),
		None => warn!("{}: data object has no do_cot", point.label),
	}

	match &object.value {
		Some(value) => {
			if let Err(err) = family.check_range(value) {
				warn!("{}: {err}", point.label);
			}
			pivot.set_cdc_value(family.decode(value).context(AsduConversion)?);

			pivot.add_quality(object.quality(), object.test.unwrap_or_default());
			if let Some(negative) = object.negative {
				pivot.set_confirmation(!negative);
			}
		}
		// No value: acknowledgement of a command.
		None => {
			pivot.set_confirmation(!object.negative.unwrap_or_default());
			pivot.set_test(object.test.unwrap_or_default());
		}
	}

	let forwarded = match object.ts {
		Some(ts) => {
			let invalid = object.ts_iv.unwrap_or_default();
			match pivot.add_timestamp(ts, invalid) {
				Ok(()) => {
					pivot.add_tm_validity(invalid);
					pivot.add_tm_org(object.ts_sub.unwrap_or_default());
					true
				}
				Err(err) => {
					warn!("{}: {err}, using the current time", point.label);
					false
				}
			}
		}
		None => {
			if asdu.is_timestamped() {
				warn!("{}: {type_id} has no do_ts, using the current time", point.label);
			}
			false
		}
	};
	if !forwarded {
		pivot.add_timestamp(PivotTimestamp::now_ms(), false).context(InvalidTimestamp)?;
		pivot.add_tm_validity(false);
		pivot.add_tm_org(true);
	}

	Ok(pivot)
}

/// Convert the `co_*` fields of an `IEC104Command` reading to a Pivot operation.
///
/// The exchanged data is found by address before anything else is looked at.
#[instrument(skip_all)]
pub fn convert_operation_object_to_pivot(
	config: &ExchangeConfig,
	datapoints: &[Datapoint],
) -> Result<PivotOperationObject, ConversionError> {
	let command = CommandObject::from_datapoints(datapoints);

	let ca = command.ca.context(MissingField { field: "co_ca" })?;
	let ioa = command.ioa.context(MissingField { field: "co_ioa" })?;
	let point = config
		.by_address(ca, ioa)
		.context(UnknownAddress { address: address_key(ca, ioa) })?;

	let type_id = command.type_id.as_deref().context(MissingField { field: "co_type" })?;
	let asdu = check_type(point, type_id)?;
	ensure!(asdu.family.is_command(), NotACommand { type_id });
	check_coming_from(command.coming_from.as_deref())?;

	let mut pivot = PivotOperationObject::new(asdu.family.cdc());
	pivot.set_identifier(point.pivot_id.as_str());

	match command.cot {
		Some(cot) => {
			if !(0..=MAX_COT).contains(&cot) {
				warn!("{}: cause of transmission {cot} out of range [0, {MAX_COT}]", point.label);
			}
			pivot.set_cause(cot);
		}
		None => warn!("{}: command has no co_cot", point.label),
	}

	if let Some(select) = command.select {
		pivot.set_select(select);
	}

	match command.test {
		Some(test) => pivot.set_test(test),
		None => {
			warn!("{}: command has no co_test", point.label);
			pivot.set_test(false);
		}
	}

	let value = command.value.as_ref().context(MissingField { field: "co_value" })?;
	if let Err(err) = asdu.family.check_range(value) {
		warn!("{}: {err}", point.label);
	}
	pivot.set_cdc_value(asdu.family.decode(value).context(AsduConversion)?);

	if let Some(negative) = command.negative {
		pivot.set_confirmation(!negative);
	}

	match command.ts {
		Some(ts) => pivot.add_timestamp(ts, false).context(InvalidTimestamp)?,
		None => ensure!(!asdu.is_timestamped(), MissingTimestamp { type_id }),
	}

	Ok(pivot)
}
