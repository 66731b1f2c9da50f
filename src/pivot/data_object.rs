//! Pivot objects carrying status, measurements and command feedback.

use std::ops::{Deref, DerefMut};

use crate::{
	config::ExchangePoint,
	datapoint::Datapoint,
	iec104::{AsduError, AsduType, DataObject, PROTOCOL_NAME, asdu::CdcMismatch},
	pivot::{CdcType, LogicalNode, PivotObject, PivotObjectError, TimeOrigin, Validity},
};

/// A Pivot object under GTIS, GTIM or GTIC received or sent as data.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotDataObject(PivotObject);

impl PivotDataObject {
	#[must_use]
	pub fn new(logical_node: LogicalNode, cdc: CdcType) -> Self {
		Self(PivotObject::new(logical_node, cdc))
	}

	#[must_use]
	pub fn into_inner(self) -> PivotObject {
		self.0
	}

	/// Build the IEC 104 `data_object` of `point` from this object.
	///
	/// The type, common address and IOA come from the configuration. The
	/// Pivot CDC must be the one of the configured ASDU type.
	pub fn to_iec104_data_object(&self, point: &ExchangePoint) -> Result<DataObject, AsduError> {
		let family = AsduType::get(&point.type_id)?.family;
		if family.cdc() != self.cdc() {
			return CdcMismatch { family, cdc: self.cdc() }.fail();
		}

		let mut object = DataObject {
			type_id: Some(point.type_id.clone()),
			ca: Some(point.common_address),
			ioa: Some(point.ioa),
			cot: self.cause(),
			value: self.cdc_value().map(|value| family.encode(value)).transpose()?,
			test: self.quality().map(|quality| quality.test).or_else(|| self.test()),
			negative: self.confirmation().map(|confirmation| !confirmation),
			coming_from: Some(PROTOCOL_NAME.to_owned()),
			..DataObject::default()
		};

		if let Some(quality) = self.quality() {
			object.set_quality(quality.to_iec104());
		}

		if let Some(timestamp) = self.timestamp() {
			let invalid = self
				.tm_validity()
				.map_or(timestamp.clock_failure(), |validity| validity == Validity::Invalid);
			object.ts = Some(timestamp.time_in_ms());
			object.ts_iv = Some(invalid);
			object.ts_su = Some(false);
			object.ts_sub = Some(self.tm_org() == Some(TimeOrigin::Substituted));
		}

		Ok(object)
	}
}

impl Deref for PivotDataObject {
	type Target = PivotObject;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl DerefMut for PivotDataObject {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.0
	}
}

impl TryFrom<&Datapoint> for PivotDataObject {
	type Error = PivotObjectError;

	fn try_from(dp: &Datapoint) -> Result<Self, Self::Error> {
		PivotObject::try_from(dp).map(Self)
	}
}
