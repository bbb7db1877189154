//! Reserved event properties and the rule for folding them into user properties.

use serde_json::{Map, Value};

/// Free-form event or profile properties.
pub type Properties = Map<String, Value>;

pub const TOKEN: &str = "token";
pub const DISTINCT_ID: &str = "distinct_id";
pub const TIME: &str = "time";
pub const IP: &str = "ip";
pub const INSERT_ID: &str = "$insert_id";
pub const GROUP_KEY: &str = "$group_key";
pub const GROUP_ID: &str = "$group_id";

/// Every key `merge` may write, in the order it writes them.
pub const RESERVED_KEYS: [&str; 7] = [TOKEN, DISTINCT_ID, TIME, IP, INSERT_ID, GROUP_KEY, GROUP_ID];

/// Well-known event attributes that Mixpanel reads out of the property map.
///
/// Empty strings and a zero `time` count as unset and are never written.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Reserved<'a> {
    pub token: Option<&'a str>,
    pub distinct_id: Option<&'a str>,
    pub time: Option<u64>,
    pub ip: Option<&'a str>,
    pub insert_id: Option<&'a str>,
    pub group_key: Option<&'a str>,
    pub group_id: Option<&'a str>,
}

/// Returns a copy of `properties` with every set reserved attribute written in.
///
/// Reserved values overwrite user keys of the same name. Colliding user keys
/// are not rejected.
#[must_use]
pub fn merge(properties: &Properties, reserved: &Reserved<'_>) -> Properties {
    let mut merged = properties.clone();
    put_str(&mut merged, TOKEN, reserved.token);
    put_str(&mut merged, DISTINCT_ID, reserved.distinct_id);
    if let Some(time) = reserved.time.filter(|time| *time != 0) {
        merged.insert(TIME.to_owned(), Value::from(time));
    }
    put_str(&mut merged, IP, reserved.ip);
    put_str(&mut merged, INSERT_ID, reserved.insert_id);
    put_str(&mut merged, GROUP_KEY, reserved.group_key);
    put_str(&mut merged, GROUP_ID, reserved.group_id);
    merged
}

fn put_str(properties: &mut Properties, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|value| !value.is_empty()) {
        properties.insert(key.to_owned(), Value::from(value));
    }
}
