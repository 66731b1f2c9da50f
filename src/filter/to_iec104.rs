//! Pivot -> IEC 104 conversion.

use snafu::{OptionExt as _, ResultExt as _};
use tracing::instrument;

use crate::{
	config::ExchangeConfig,
	datapoint::Datapoint,
	filter::{AsduConversion, ConversionError, MissingField, PivotParse, UnknownPivotId},
	pivot::{PivotDataObject, PivotOperationObject},
};

/// Convert a `PIVOT` tree to the `data_object` of its exchanged data.
#[instrument(skip_all)]
pub fn convert_data_object_to_iec104(
	config: &ExchangeConfig,
	dp: &Datapoint,
) -> Result<Datapoint, ConversionError> {
	let pivot = PivotDataObject::try_from(dp).context(PivotParse)?;
	let pivot_id = pivot.identifier().context(MissingField { field: "Identifier" })?;
	let point = config.by_pivot_id(pivot_id).context(UnknownPivotId { pivot_id })?;

	let object = pivot.to_iec104_data_object(point).context(AsduConversion)?;
	Ok(object.to_datapoint())
}

/// Convert a `PIVOT` command to the `co_*` datapoints of an `IEC104Command`.
#[instrument(skip_all)]
pub fn convert_operation_object_to_iec104(
	config: &ExchangeConfig,
	dp: &Datapoint,
) -> Result<Vec<Datapoint>, ConversionError> {
	let pivot = PivotOperationObject::try_from(dp).context(PivotParse)?;
	let pivot_id = pivot.identifier().context(MissingField { field: "Identifier" })?;
	let point = config.by_pivot_id(pivot_id).context(UnknownPivotId { pivot_id })?;

	let command = pivot.to_iec104_operation_object(point).context(AsduConversion)?;
	Ok(command.to_datapoints())
}
