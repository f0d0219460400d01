use serde::{Serialize, Deserialize, Serializer, Deserializer};
use std::time::Duration;

/// Serializes Duration as seconds
pub fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    duration.as_secs_f64().serialize(serializer)
}

/// Deserializes Duration from seconds
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

/// Serializes an optional Duration as seconds or null
pub fn serialize_opt_duration<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    duration.map(|d| d.as_secs_f64()).serialize(serializer)
}

/// Deserializes an optional Duration from seconds or null
pub fn deserialize_opt_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = Option::<f64>::deserialize(deserializer)?;
    secs.map(Duration::try_from_secs_f64)
        .transpose()
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json;

    #[derive(Serialize, Deserialize)]
    struct Timing {
        #[serde(serialize_with = "serialize_duration")]
        #[serde(deserialize_with = "deserialize_duration")]
        timeout: Duration,
        #[serde(serialize_with = "serialize_opt_duration")]
        #[serde(deserialize_with = "deserialize_opt_duration")]
        wait: Option<Duration>,
    }

    #[test]
    fn test_duration_serialization() {
        let original = Timing {
            timeout: Duration::from_millis(1500),
            wait: None,
        };

        let serialized = serde_json::to_string(&original).unwrap();
        assert_eq!(serialized, r#"{"timeout":1.5,"wait":null}"#);

        let deserialized: Timing = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized.timeout, original.timeout);
        assert_eq!(deserialized.wait, None);
    }

    #[test]
    fn test_negative_duration_rejected() {
        let parsed = serde_json::from_str::<Timing>(r#"{"timeout":-1.0,"wait":0.5}"#);
        assert!(parsed.is_err());

        let parsed: Timing = serde_json::from_str(r#"{"timeout":0.25,"wait":0.5}"#).unwrap();
        assert_eq!(parsed.wait, Some(Duration::from_millis(500)));
    }
}
