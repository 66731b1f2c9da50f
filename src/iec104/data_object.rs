//! The `data_object` datapoint produced and consumed by the IEC 104 plugins.

use crate::{
	datapoint::Datapoint,
	iec104::{
		Iec104Value, QualityDescriptor, push_field, read_field, read_flag_field, read_value_field,
	},
};

/// Flat view of a `data_object` datapoint. Absent or ill typed fields are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataObject {
	pub type_id: Option<String>,
	pub ca: Option<i64>,
	pub ioa: Option<i64>,
	pub cot: Option<i64>,
	pub value: Option<Iec104Value>,
	pub quality_iv: Option<bool>,
	pub quality_bl: Option<bool>,
	pub quality_ov: Option<bool>,
	pub quality_sb: Option<bool>,
	pub quality_nt: Option<bool>,
	pub ts: Option<i64>,
	pub ts_iv: Option<bool>,
	pub ts_su: Option<bool>,
	pub ts_sub: Option<bool>,
	pub test: Option<bool>,
	pub negative: Option<bool>,
	pub coming_from: Option<String>,
}

impl DataObject {
	pub const NAME: &'static str = "data_object";

	#[must_use]
	pub fn from_datapoint(dp: &Datapoint) -> Self {
		let mut object = Self::default();

		for child in dp.children() {
			match child.name() {
				"do_type" => read_field(child, &mut object.type_id),
				"do_ca" => read_field(child, &mut object.ca),
				"do_oa" => {}
				"do_ioa" => read_field(child, &mut object.ioa),
				"do_cot" => read_field(child, &mut object.cot),
				"do_value" => read_value_field(child, &mut object.value),
				"do_quality_iv" => read_flag_field(child, &mut object.quality_iv),
				"do_quality_bl" => read_flag_field(child, &mut object.quality_bl),
				"do_quality_ov" => read_flag_field(child, &mut object.quality_ov),
				"do_quality_sb" => read_flag_field(child, &mut object.quality_sb),
				"do_quality_nt" => read_flag_field(child, &mut object.quality_nt),
				"do_ts" => read_field(child, &mut object.ts),
				"do_ts_iv" => read_flag_field(child, &mut object.ts_iv),
				"do_ts_su" => read_flag_field(child, &mut object.ts_su),
				"do_ts_sub" => read_flag_field(child, &mut object.ts_sub),
				"do_test" => read_flag_field(child, &mut object.test),
				"do_negative" => read_flag_field(child, &mut object.negative),
				"do_comingfrom" => read_field(child, &mut object.coming_from),
				other => tracing::debug!("Ignoring unknown data object field '{other}'"),
			}
		}

		object
	}

	/// Quality bits, absent ones are cleared.
	#[must_use]
	pub fn quality(&self) -> QualityDescriptor {
		QualityDescriptor {
			invalid: self.quality_iv.unwrap_or_default(),
			blocked: self.quality_bl.unwrap_or_default(),
			overflow: self.quality_ov.unwrap_or_default(),
			substituted: self.quality_sb.unwrap_or_default(),
			not_topical: self.quality_nt.unwrap_or_default(),
		}
	}

	pub fn set_quality(&mut self, quality: QualityDescriptor) {
		self.quality_iv = Some(quality.invalid);
		self.quality_bl = Some(quality.blocked);
		self.quality_ov = Some(quality.overflow);
		self.quality_sb = Some(quality.substituted);
		self.quality_nt = Some(quality.not_topical);
	}

	#[must_use]
	pub fn to_datapoint(&self) -> Datapoint {
		let mut children = Vec::new();
		let flag = |flag: Option<bool>| flag.map(i64::from);

		push_field(&mut children, "do_type", self.type_id.clone());
		push_field(&mut children, "do_ca", self.ca);
		push_field(&mut children, "do_ioa", self.ioa);
		push_field(&mut children, "do_cot", self.cot);
		push_field(&mut children, "do_value", self.value.clone());
		push_field(&mut children, "do_quality_iv", flag(self.quality_iv));
		push_field(&mut children, "do_quality_bl", flag(self.quality_bl));
		push_field(&mut children, "do_quality_ov", flag(self.quality_ov));
		push_field(&mut children, "do_quality_sb", flag(self.quality_sb));
		push_field(&mut children, "do_quality_nt", flag(self.quality_nt));
		push_field(&mut children, "do_ts", self.ts);
		push_field(&mut children, "do_ts_iv", flag(self.ts_iv));
		push_field(&mut children, "do_ts_su", flag(self.ts_su));
		push_field(&mut children, "do_ts_sub", flag(self.ts_sub));
		push_field(&mut children, "do_test", flag(self.test));
		push_field(&mut children, "do_negative", flag(self.negative));
		push_field(&mut children, "do_comingfrom", self.coming_from.clone());

		Datapoint::dict(Self::NAME, children)
	}
}
