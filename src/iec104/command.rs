//! Command readings of the IEC 104 north plugin.
//!
//! A command is a flat list of `co_*` datapoints directly in the reading.
//! Integer fields may be sent as decimal strings.

use crate::{
	datapoint::Datapoint,
	iec104::{
		Iec104Value, push_field, read_field, read_flag_field, read_integer_field, read_value_field,
	},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandObject {
	pub type_id: Option<String>,
	pub ca: Option<i64>,
	pub ioa: Option<i64>,
	pub cot: Option<i64>,
	pub value: Option<Iec104Value>,
	pub ts: Option<i64>,
	/// Select (true) or execute (false).
	pub select: Option<bool>,
	pub test: Option<bool>,
	pub negative: Option<bool>,
	pub coming_from: Option<String>,
}

impl CommandObject {
	#[must_use]
	pub fn from_datapoints(datapoints: &[Datapoint]) -> Self {
		let mut command = Self::default();

		for dp in datapoints {
			match dp.name() {
				"co_type" => read_field(dp, &mut command.type_id),
				"co_ca" => read_integer_field(dp, &mut command.ca),
				"co_ioa" => read_integer_field(dp, &mut command.ioa),
				"co_cot" => read_integer_field(dp, &mut command.cot),
				"co_value" => {
					let mut value = None;
					read_value_field(dp, &mut value);
					if let Some(value) = value {
						command.value = Some(value.into_numeric());
					}
				}
				"co_ts" => read_integer_field(dp, &mut command.ts),
				"co_se" => read_flag_field(dp, &mut command.select),
				"co_test" => read_flag_field(dp, &mut command.test),
				"co_negative" => read_flag_field(dp, &mut command.negative),
				"co_comingfrom" => read_field(dp, &mut command.coming_from),
				other => tracing::debug!("Ignoring unknown command field '{other}'"),
			}
		}

		command
	}

	#[must_use]
	pub fn to_datapoints(&self) -> Vec<Datapoint> {
		let mut datapoints = Vec::new();
		let flag = |flag: Option<bool>| flag.map(i64::from);

		push_field(&mut datapoints, "co_type", self.type_id.clone());
		push_field(&mut datapoints, "co_ca", self.ca);
		push_field(&mut datapoints, "co_ioa", self.ioa);
		push_field(&mut datapoints, "co_cot", self.cot);
		push_field(&mut datapoints, "co_negative", flag(self.negative));
		push_field(&mut datapoints, "co_se", flag(self.select));
		push_field(&mut datapoints, "co_test", flag(self.test));
		push_field(&mut datapoints, "co_ts", self.ts);
		push_field(&mut datapoints, "co_value", self.value.clone());
		push_field(&mut datapoints, "co_comingfrom", self.coming_from.clone());

		datapoints
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_string_encoded_fields() {
		let datapoints = vec![
			Datapoint::new("co_type", "C_SC_NA_1"),
			Datapoint::new("co_ca", "45"),
			Datapoint::new("co_ioa", "1000"),
			Datapoint::new("co_cot", 6),
			Datapoint::new("co_se", "0"),
			Datapoint::new("co_test", 0),
			Datapoint::new("co_value", "1"),
		];

		let command = CommandObject::from_datapoints(&datapoints);
		assert_eq!(command.type_id.as_deref(), Some("C_SC_NA_1"));
		assert_eq!(command.ca, Some(45));
		assert_eq!(command.ioa, Some(1000));
		assert_eq!(command.cot, Some(6));
		assert_eq!(command.select, Some(false));
		assert_eq!(command.test, Some(false));
		assert_eq!(command.value, Some(Iec104Value::Integer(1)));
		assert_eq!(command.ts, None);
	}

	#[test]
	fn test_unknown_and_ill_typed_fields() {
		let command = CommandObject::from_datapoints(&[
			Datapoint::new("do_type", "M_SP_NA_1"),
			Datapoint::new("co_ioa", "abc"),
			Datapoint::new("co_ts", 1.5),
		]);
		assert_eq!(command, CommandObject::default());
	}

	#[test]
	fn test_to_datapoints_round_trip() {
		let command = CommandObject {
			type_id: Some("C_SE_NC_1".to_owned()),
			ca: Some(45),
			ioa: Some(2000),
			cot: Some(7),
			value: Some(Iec104Value::Float(0.25)),
			select: Some(true),
			negative: Some(false),
			..Default::default()
		};
		let datapoints = command.to_datapoints();
		assert_eq!(datapoints.len(), 7);
		assert_eq!(CommandObject::from_datapoints(&datapoints), command);
	}
}
