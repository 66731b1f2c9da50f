//! Pivot command objects (`GTIC`).

use std::ops::{Deref, DerefMut};

use crate::{
	config::ExchangePoint,
	datapoint::Datapoint,
	iec104::{AsduError, AsduType, CommandObject, PROTOCOL_NAME, asdu::CdcMismatch},
	pivot::{CdcType, LogicalNode, PivotObject, PivotObjectError, UnknownLogicalNode},
};

/// A command travelling between the Pivot and IEC 104 sides.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotOperationObject(PivotObject);

impl PivotOperationObject {
	#[must_use]
	pub fn new(cdc: CdcType) -> Self {
		Self(PivotObject::new(LogicalNode::Gtic, cdc))
	}

	#[must_use]
	pub fn into_inner(self) -> PivotObject {
		self.0
	}

	/// Build the `co_*` fields of `point` from this command.
	///
	/// Step commands are sent as their integer code, not as a string.
	pub fn to_iec104_operation_object(
		&self,
		point: &ExchangePoint,
	) -> Result<CommandObject, AsduError> {
		let family = AsduType::get(&point.type_id)?.family;
		if family.cdc() != self.cdc() {
			return CdcMismatch { family, cdc: self.cdc() }.fail();
		}

		Ok(CommandObject {
			type_id: Some(point.type_id.clone()),
			ca: Some(point.common_address),
			ioa: Some(point.ioa),
			cot: self.cause(),
			value: self.cdc_value().map(|value| family.encode(value)).transpose()?,
			ts: self.timestamp().map(|timestamp| timestamp.time_in_ms()),
			select: self.select(),
			test: self.test(),
			negative: self.confirmation().map(|confirmation| !confirmation),
			coming_from: Some(PROTOCOL_NAME.to_owned()),
		})
	}
}

impl Deref for PivotOperationObject {
	type Target = PivotObject;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl DerefMut for PivotOperationObject {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.0
	}
}

impl TryFrom<&Datapoint> for PivotOperationObject {
	type Error = PivotObjectError;

	/// Only `GTIC` trees are operations.
	fn try_from(dp: &Datapoint) -> Result<Self, Self::Error> {
		let object = PivotObject::try_from(dp)?;
		if object.logical_node() != LogicalNode::Gtic {
			return UnknownLogicalNode.fail();
		}
		Ok(Self(object))
	}
}
