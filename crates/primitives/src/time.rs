use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Source of wall-clock time for deadline and window computations.
pub trait Clock: Send + Sync + 'static {
	fn now(&self) -> DateTime<Utc>;

	/// Time remaining until `deadline`, saturating at zero.
	fn until(&self, deadline: DateTime<Utc>) -> Duration {
		(deadline - self.now()).to_std().unwrap_or(Duration::ZERO)
	}
}

/// Reads the operating system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// Wall clock that starts at a fixed origin and advances with tokio's clock.
///
/// Under a paused tokio runtime the reported time moves only when tokio time
/// advances, which keeps wall-clock reads consistent with `tokio::time::sleep`.
#[derive(Debug, Clone, Copy)]
pub struct AnchoredClock {
	origin: DateTime<Utc>,
	started: tokio::time::Instant,
}

impl AnchoredClock {
	pub fn new(origin: DateTime<Utc>) -> Self {
		Self {
			origin,
			started: tokio::time::Instant::now(),
		}
	}
}

impl Clock for AnchoredClock {
	fn now(&self) -> DateTime<Utc> {
		let elapsed = TimeDelta::from_std(self.started.elapsed()).unwrap_or(TimeDelta::MAX);
		self.origin + elapsed
	}
}

/// Codec for timestamps stored in documents.
///
/// Accepts RFC 3339 strings, integer epoch milliseconds, or `{ seconds, nanoseconds }`
/// objects. Always writes RFC 3339 with millisecond precision.
pub mod timestamp {
	use chrono::{DateTime, SecondsFormat, Utc};
	use serde::{Deserialize, Deserializer, Serializer};
	use serde_json::Value;

	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Wire {
		Text(String),
		Millis(i64),
		Parts {
			seconds: i64,
			#[serde(default)]
			nanoseconds: u32,
		},
	}

	impl Wire {
		fn into_datetime(self) -> Option<DateTime<Utc>> {
			match self {
				Self::Text(text) => DateTime::parse_from_rfc3339(&text).ok().map(|at| at.with_timezone(&Utc)),
				Self::Millis(ms) => DateTime::from_timestamp_millis(ms),
				Self::Parts { seconds, nanoseconds } => DateTime::from_timestamp(seconds, nanoseconds),
			}
		}
	}

	/// Decodes a loosely typed document value. `null` and unrecognized shapes yield `None`.
	pub fn decode(value: &Value) -> Option<DateTime<Utc>> {
		Wire::deserialize(value).ok().and_then(Wire::into_datetime)
	}

	pub fn encode(at: DateTime<Utc>) -> Value {
		Value::String(format(at))
	}

	pub fn format(at: DateTime<Utc>) -> String {
		at.to_rfc3339_opts(SecondsFormat::Millis, true)
	}

	pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&format(*at))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
		Wire::deserialize(deserializer)?
			.into_datetime()
			.ok_or_else(|| serde::de::Error::custom("timestamp out of range or malformed"))
	}

	/// Same codec for optional fields; `null` and a missing field both decode to `None`.
	pub mod option {
		use chrono::{DateTime, Utc};
		use serde::{Deserialize, Deserializer, Serializer};

		use super::Wire;

		pub fn serialize<S: Serializer>(at: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
			match at {
				Some(at) => super::serialize(at, serializer),
				None => serializer.serialize_none(),
			}
		}

		pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
			match Option::<Wire>::deserialize(deserializer)? {
				Some(wire) => wire
					.into_datetime()
					.map(Some)
					.ok_or_else(|| serde::de::Error::custom("timestamp out of range or malformed")),
				None => Ok(None),
			}
		}
	}
}

#[cfg(test)]
mod tests;
