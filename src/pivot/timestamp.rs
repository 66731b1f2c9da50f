//! CP56Time2a style timestamp used by the Pivot `t` attribute.
//!
//! The time is kept packed in 7 bytes: a big endian 32 bit second counter
//! followed by a 24 bit fraction of second in units of 1/16777216 s.

use snafu::{OptionExt as _, ResultExt as _, ensure};
use time::OffsetDateTime;

use crate::{
	datapoint::Datapoint,
	pivot::{InvalidField, PivotObjectError, TimeOutOfRange, ValueOutOfRange},
};

const MILLISECONDS_PER_SECOND: i64 = 1000;
const FRACTION_PER_MILLISECOND: u32 = 16777;
const TIME_ACCURACY_MASK: u8 = 0x1F;
/// One second in fraction of second units.
const FRACTION_LIMIT: u32 = 1 << 24;
/// Accuracy reported for timestamps produced by this crate (10 bits, ~1 ms).
pub const DEFAULT_TIME_ACCURACY: u8 = 10;

/// Time quality flags according to IEC 61850-7-2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeQuality {
	pub leap_second_known: bool,
	pub clock_failure: bool,
	pub clock_not_synchronized: bool,
	/// 5 bits (0-31).
	pub time_accuracy: u8,
}

impl TimeQuality {
	#[must_use]
	pub const fn from_byte(byte: u8) -> Self {
		Self {
			leap_second_known: (byte & 0x80) != 0,
			clock_failure: (byte & 0x40) != 0,
			clock_not_synchronized: (byte & 0x20) != 0,
			time_accuracy: byte & TIME_ACCURACY_MASK,
		}
	}

	#[must_use]
	pub const fn to_byte(&self) -> u8 {
		let mut byte = self.time_accuracy & TIME_ACCURACY_MASK;
		if self.leap_second_known {
			byte |= 0x80;
		}
		if self.clock_failure {
			byte |= 0x40;
		}
		if self.clock_not_synchronized {
			byte |= 0x20;
		}
		byte
	}
}

/// A point in time with its synchronisation quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PivotTimestamp {
	value: [u8; 7],
	quality: TimeQuality,
}

impl PivotTimestamp {
	/// Encode a millisecond epoch value. The seconds must fit in 32 bits.
	pub fn from_ms(ms: i64) -> Result<Self, PivotObjectError> {
		let mut timestamp = Self::default();
		timestamp.set_time_in_ms(ms)?;
		Ok(timestamp)
	}

	/// Decode the 7 byte layout.
	#[must_use]
	pub const fn from_bytes(value: [u8; 7], quality: TimeQuality) -> Self {
		Self { value, quality }
	}

	#[must_use]
	pub const fn to_bytes(&self) -> [u8; 7] {
		self.value
	}

	/// Current time in milliseconds since the unix epoch.
	#[must_use]
	pub fn now_ms() -> i64 {
		(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
	}

	/// Set the time from milliseconds since the unix epoch.
	///
	/// Times before the epoch or past the 32 bit second counter are rejected
	/// and leave the timestamp unchanged.
	pub fn set_time_in_ms(&mut self, ms: i64) -> Result<(), PivotObjectError> {
		let seconds = u32::try_from(ms.div_euclid(MILLISECONDS_PER_SECOND))
			.ok()
			.context(TimeOutOfRange { ms })?;
		let remainder = u32::try_from(ms.rem_euclid(MILLISECONDS_PER_SECOND))
			.ok()
			.context(TimeOutOfRange { ms })?;
		let fraction = remainder * FRACTION_PER_MILLISECOND + (remainder * 216) / 1000;

		self.value[..4].copy_from_slice(&seconds.to_be_bytes());
		self.value[4..].copy_from_slice(&fraction.to_be_bytes()[1..]);
		Ok(())
	}

	#[must_use]
	pub const fn second_since_epoch(&self) -> u32 {
		u32::from_be_bytes([self.value[0], self.value[1], self.value[2], self.value[3]])
	}

	#[must_use]
	pub const fn fraction_of_second(&self) -> u32 {
		u32::from_be_bytes([0, self.value[4], self.value[5], self.value[6]])
	}

	/// Milliseconds since the unix epoch. Sub millisecond precision is lost.
	#[must_use]
	pub const fn time_in_ms(&self) -> i64 {
		self.second_since_epoch() as i64 * MILLISECONDS_PER_SECOND
			+ (self.fraction_of_second() / FRACTION_PER_MILLISECOND) as i64
	}

	#[must_use]
	pub const fn quality(&self) -> &TimeQuality {
		&self.quality
	}

	pub const fn quality_mut(&mut self) -> &mut TimeQuality {
		&mut self.quality
	}

	#[must_use]
	pub const fn clock_failure(&self) -> bool {
		self.quality.clock_failure
	}

	#[must_use]
	pub const fn clock_not_synchronized(&self) -> bool {
		self.quality.clock_not_synchronized
	}

	#[must_use]
	pub const fn leap_second_known(&self) -> bool {
		self.quality.leap_second_known
	}

	#[must_use]
	pub const fn time_accuracy(&self) -> u8 {
		self.quality.time_accuracy
	}

	/// The timestamp as a date, `None` when out of the representable range.
	#[must_use]
	pub fn to_offset_date_time(&self) -> Option<OffsetDateTime> {
		OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.time_in_ms()) * 1_000_000).ok()
	}

	/// Render as the Pivot `t` attribute.
	#[must_use]
	pub fn to_datapoint(&self) -> Datapoint {
		Datapoint::dict(
			"t",
			vec![
				Datapoint::new("SecondSinceEpoch", i64::from(self.second_since_epoch())),
				Datapoint::new("FractionOfSecond", i64::from(self.fraction_of_second())),
				Datapoint::dict(
					"TimeQuality",
					vec![
						Datapoint::new("clockFailure", self.quality.clock_failure),
						Datapoint::new("clockNotSynchronized", self.quality.clock_not_synchronized),
						Datapoint::new("leapSecondKnown", self.quality.leap_second_known),
						Datapoint::new("timeAccuracy", i64::from(self.quality.time_accuracy)),
					],
				),
			],
		)
	}
}

impl TryFrom<&Datapoint> for PivotTimestamp {
	type Error = PivotObjectError;

	/// Parse a Pivot `t` attribute. Missing elements are left at zero.
	fn try_from(dp: &Datapoint) -> Result<Self, Self::Error> {
		let mut seconds = 0u32;
		let mut fraction = 0u32;
		let mut quality = TimeQuality::default();

		for child in dp.children() {
			match child.name() {
				"SecondSinceEpoch" => seconds = read_u32(child, "t.SecondSinceEpoch")?,
				"FractionOfSecond" => {
					fraction = read_u32(child, "t.FractionOfSecond")?;
					ensure!(
						fraction < FRACTION_LIMIT,
						ValueOutOfRange { field: "t.FractionOfSecond", value: i64::from(fraction) }
					);
				}
				"TimeQuality" => {
					for flag in child.children() {
						match flag.name() {
							"clockFailure" => {
								quality.clock_failure = read_flag(flag, "TimeQuality.clockFailure")?;
							}
							"clockNotSynchronized" => {
								quality.clock_not_synchronized =
									read_flag(flag, "TimeQuality.clockNotSynchronized")?;
							}
							"leapSecondKnown" => {
								quality.leap_second_known =
									read_flag(flag, "TimeQuality.leapSecondKnown")?;
							}
							"timeAccuracy" => {
								quality.time_accuracy = (read_u32(flag, "TimeQuality.timeAccuracy")?
									& u32::from(TIME_ACCURACY_MASK)) as u8;
							}
							_ => {}
						}
					}
				}
				_ => {}
			}
		}

		let mut value = [0u8; 7];
		value[..4].copy_from_slice(&seconds.to_be_bytes());
		value[4..].copy_from_slice(&fraction.to_be_bytes()[1..]);
		Ok(Self { value, quality })
	}
}

fn read_u32(dp: &Datapoint, field: &str) -> Result<u32, PivotObjectError> {
	let value = i64::try_from(dp.value()).context(InvalidField { field })?;
	u32::try_from(value).ok().context(ValueOutOfRange { field, value })
}

fn read_flag(dp: &Datapoint, field: &str) -> Result<bool, PivotObjectError> {
	bool::try_from(dp.value()).context(InvalidField { field })
}

#[cfg(test)]
mod tests {
	use time::format_description::well_known::Rfc3339;

	use super::*;

	#[test]
	fn test_encode_seconds_and_fraction() -> Result<(), PivotObjectError> {
		let timestamp = PivotTimestamp::from_ms(1_668_631_513_250)?;
		assert_eq!(timestamp.second_since_epoch(), 1_668_631_513);
		assert_eq!(timestamp.fraction_of_second(), 250 * 16777 + (250 * 216) / 1000);
		assert_eq!(&timestamp.to_bytes()[..4], &1_668_631_513u32.to_be_bytes());
		Ok(())
	}

	#[test]
	fn test_millisecond_round_trip() -> Result<(), PivotObjectError> {
		let last = i64::from(u32::MAX) * 1000 + 999;
		for ms in [0, 1, 999, 1000, 1_668_631_513_250, 1_700_000_000_999, last] {
			assert_eq!(PivotTimestamp::from_ms(ms)?.time_in_ms(), ms);
		}
		Ok(())
	}

	#[test]
	fn test_out_of_range_time() -> Result<(), PivotObjectError> {
		for ms in [-1, -1000, i64::from(u32::MAX) * 1000 + 1000, i64::MAX, i64::MIN] {
			assert!(
				matches!(PivotTimestamp::from_ms(ms), Err(PivotObjectError::TimeOutOfRange { .. })),
				"{ms}"
			);
		}

		let mut timestamp = PivotTimestamp::from_ms(1_700_000_000_500)?;
		assert!(timestamp.set_time_in_ms(-1).is_err());
		assert_eq!(timestamp.time_in_ms(), 1_700_000_000_500);
		Ok(())
	}

	#[test]
	fn test_fraction_upper_bound() -> Result<(), PivotObjectError> {
		// 999 ms must stay below one full second of fraction.
		let timestamp = PivotTimestamp::from_ms(999)?;
		assert!(timestamp.fraction_of_second() < FRACTION_LIMIT);
		Ok(())
	}

	#[test]
	fn test_time_quality_byte() {
		let quality = TimeQuality::from_byte(0xEA);
		assert!(quality.leap_second_known);
		assert!(quality.clock_failure);
		assert!(quality.clock_not_synchronized);
		assert_eq!(quality.time_accuracy, 10);
		assert_eq!(quality.to_byte(), 0xEA);
	}

	#[test]
	fn test_datapoint_round_trip() -> Result<(), PivotObjectError> {
		let mut timestamp = PivotTimestamp::from_ms(1_705_329_045_123)?;
		timestamp.quality_mut().clock_failure = true;
		timestamp.quality_mut().time_accuracy = DEFAULT_TIME_ACCURACY;

		let parsed = PivotTimestamp::try_from(&timestamp.to_datapoint())?;
		assert_eq!(parsed, timestamp);
		assert_eq!(parsed.time_in_ms(), 1_705_329_045_123);
		Ok(())
	}

	#[test]
	fn test_partial_datapoint() -> Result<(), PivotObjectError> {
		let dp = Datapoint::dict("t", vec![Datapoint::new("SecondSinceEpoch", 10)]);
		let parsed = PivotTimestamp::try_from(&dp)?;
		assert_eq!(parsed.time_in_ms(), 10_000);
		assert!(!parsed.clock_failure());

		let dp = Datapoint::dict("t", vec![Datapoint::new("SecondSinceEpoch", "10")]);
		assert!(PivotTimestamp::try_from(&dp).is_err());
		Ok(())
	}

	#[test]
	fn test_out_of_range_datapoint() {
		let too_large = [
			Datapoint::new("SecondSinceEpoch", -1),
			Datapoint::new("SecondSinceEpoch", i64::from(u32::MAX) + 1),
			Datapoint::new("FractionOfSecond", i64::from(FRACTION_LIMIT)),
		];
		for element in too_large {
			let dp = Datapoint::dict("t", vec![element]);
			assert!(
				matches!(
					PivotTimestamp::try_from(&dp),
					Err(PivotObjectError::ValueOutOfRange { .. })
				),
				"{dp}"
			);
		}
	}

	#[test]
	fn test_to_offset_date_time() -> Result<(), PivotObjectError> {
		let timestamp = PivotTimestamp::from_ms(1_705_329_045_123)?;
		assert_eq!(
			timestamp.to_offset_date_time(),
			OffsetDateTime::parse("2024-01-15T14:30:45.123Z", &Rfc3339).ok()
		);
		Ok(())
	}

	#[test]
	fn test_now_is_encodable() -> Result<(), PivotObjectError> {
		let now = PivotTimestamp::now_ms();
		assert!(now > 1_700_000_000_000);
		assert_eq!(PivotTimestamp::from_ms(now)?.time_in_ms(), now);
		Ok(())
	}
}
