use super::error::MixpanelError;
use super::properties::{self, Properties, Reserved};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// A single tracked occurrence.
///
/// The optional attributes are not serialized as fields of their own; they are
/// folded into `properties` under Mixpanel's reserved keys when the event is
/// encoded. See [`properties::merge`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Wire")]
pub struct Event {
    pub title: String,
    pub properties: Properties,
    pub distinct_id: Option<String>,
    /// Unix seconds. Zero is treated as unset.
    pub time: Option<u64>,
    pub ip: Option<String>,
    pub insert_id: Option<String>,
    pub group_key: Option<String>,
    pub group_id: Option<String>,
    pub token: Option<String>,
}

#[derive(Serialize)]
struct WireRef<'a> {
    event: &'a str,
    properties: Properties,
}

#[derive(Deserialize)]
struct Wire {
    event: String,
    #[serde(default)]
    properties: Properties,
}

impl Event {
    pub fn new(title: impl Into<String>, properties: Properties) -> Self {
        Self {
            title: title.into(),
            properties,
            ..Self::default()
        }
    }

    /// Sets `time` from a timestamp. Timestamps before the epoch leave it unset.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.time = u64::try_from(timestamp.timestamp()).ok();
        self
    }

    fn reserved<'a>(&'a self, token: Option<&'a str>) -> Reserved<'a> {
        Reserved {
            token,
            distinct_id: self.distinct_id.as_deref(),
            time: self.time,
            ip: self.ip.as_deref(),
            insert_id: self.insert_id.as_deref(),
            group_key: self.group_key.as_deref(),
            group_id: self.group_id.as_deref(),
        }
    }

    /// The property map as it goes over the wire, reserved attributes included.
    #[must_use]
    pub fn merged_properties(&self) -> Properties {
        properties::merge(&self.properties, &self.reserved(self.token.as_deref()))
    }

    /// # Errors
    ///
    /// `MixpanelError::SerdeJson` if a property value fails to serialize.
    pub fn to_json(&self) -> Result<String, MixpanelError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encodes the event with `token` in place of the event's own token.
    pub(crate) fn to_json_with_token(&self, token: &str) -> Result<String, MixpanelError> {
        let wire = WireRef {
            event: &self.title,
            properties: properties::merge(&self.properties, &self.reserved(Some(token))),
        };
        Ok(serde_json::to_string(&wire)?)
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireRef {
            event: &self.title,
            properties: self.merged_properties(),
        }
        .serialize(serializer)
    }
}

impl From<Wire> for Event {
    fn from(wire: Wire) -> Self {
        let mut properties = wire.properties;
        let token = take_string(&mut properties, properties::TOKEN);
        let distinct_id = take_string(&mut properties, properties::DISTINCT_ID);
        let time = match properties.get(properties::TIME).and_then(Value::as_u64) {
            Some(time) => {
                properties.remove(properties::TIME);
                Some(time)
            }
            None => None,
        };
        let ip = take_string(&mut properties, properties::IP);
        let insert_id = take_string(&mut properties, properties::INSERT_ID);
        let group_key = take_string(&mut properties, properties::GROUP_KEY);
        let group_id = take_string(&mut properties, properties::GROUP_ID);

        Self {
            title: wire.event,
            properties,
            distinct_id,
            time,
            ip,
            insert_id,
            group_key,
            group_id,
            token,
        }
    }
}

// Reserved keys holding a non-string value stay in the property map.
fn take_string(properties: &mut Properties, key: &str) -> Option<String> {
    match properties.remove(key) {
        Some(Value::String(value)) => Some(value),
        Some(other) => {
            properties.insert(key.to_owned(), other);
            None
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_strategy::proptest;

    fn go_test() -> Event {
        let mut props = Properties::new();
        props.insert("test".to_owned(), json!("testing"));
        Event::new("go-test", props)
    }

    fn parse(encoded: &str) -> Value {
        serde_json::from_str(encoded).unwrap()
    }

    #[test]
    fn plain_event() {
        let mut event = go_test();
        event.distinct_id = Some("1".to_owned());

        assert_eq!(
            parse(&event.to_json().unwrap()),
            json!({"event": "go-test", "properties": {"test": "testing", "distinct_id": "1"}})
        );
    }

    #[test]
    fn only_event_and_properties_at_top_level() {
        let mut event = go_test();
        event.distinct_id = Some("2".to_owned());
        event.ip = Some("8.8.8.8".to_owned());
        event.token = Some("T".to_owned());

        let encoded = parse(&event.to_json().unwrap());
        let keys: Vec<&String> = encoded.as_object().unwrap().keys().collect();

        assert_eq!(keys.len(), 2);
        assert!(encoded.get("event").is_some());
        assert!(encoded.get("properties").is_some());
    }

    #[test]
    fn rich_event() {
        let mut event = go_test().with_timestamp(Utc.timestamp_opt(1_684_518_293, 0).unwrap());
        event.distinct_id = Some("2".to_owned());
        event.ip = Some("8.8.8.8".to_owned());
        event.group_key = Some("MPGO".to_owned());
        event.group_id = Some("MPGOTEST".to_owned());

        assert_eq!(
            parse(&event.to_json().unwrap()),
            json!({
                "event": "go-test",
                "properties": {
                    "test": "testing",
                    "distinct_id": "2",
                    "time": 1_684_518_293,
                    "ip": "8.8.8.8",
                    "$group_key": "MPGO",
                    "$group_id": "MPGOTEST",
                }
            })
        );
    }

    #[test]
    fn injected_token_replaces_own_token() {
        let mut event = go_test();
        event.token = Some("stale".to_owned());

        let encoded = parse(&event.to_json_with_token("fresh").unwrap());

        assert_eq!(encoded["properties"]["token"], json!("fresh"));
        assert_eq!(event.token.as_deref(), Some("stale"));
        assert!(!event.properties.contains_key("token"));
    }

    #[test]
    fn pre_epoch_timestamp_is_unset() {
        let event = go_test().with_timestamp(Utc.timestamp_opt(-5, 0).unwrap());
        assert_eq!(event.time, None);
    }

    #[test]
    fn decode_lifts_reserved_keys() {
        let mut event = go_test().with_timestamp(Utc.timestamp_opt(1_684_518_293, 0).unwrap());
        event.distinct_id = Some("2".to_owned());
        event.insert_id = Some("abc".to_owned());

        let decoded: Event =
            serde_json::from_str(&event.to_json_with_token("T").unwrap()).unwrap();

        assert_eq!(decoded.token.as_deref(), Some("T"));
        assert_eq!(Event { token: None, ..decoded }, event);
    }

    #[test]
    fn decode_keeps_mistyped_reserved_key() {
        let decoded: Event = serde_json::from_value(json!({
            "event": "e",
            "properties": {"time": "yesterday", "ip": 7}
        }))
        .unwrap();

        assert_eq!(decoded.time, None);
        assert_eq!(decoded.ip, None);
        assert_eq!(decoded.properties.get("time"), Some(&json!("yesterday")));
        assert_eq!(decoded.properties.get("ip"), Some(&json!(7)));
    }

    #[proptest]
    fn serializing_twice_is_identical(
        #[strategy("[a-z]{1,12}")] title: String,
        #[strategy("[a-z0-9]{0,12}")] distinct_id: String,
        time: u64,
    ) {
        let mut event = Event::new(title, Properties::new());
        event.distinct_id = Some(distinct_id);
        event.time = Some(time);

        assert_eq!(event.to_json().unwrap(), event.to_json().unwrap());
    }
}
