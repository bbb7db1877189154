//! Profile update operations sent to the engage endpoint.

use super::error::MixpanelError;
use super::properties::Properties;
use derive_more::Display;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

const TOKEN: &str = "$token";
const DISTINCT_ID: &str = "$distinct_id";
const IP: &str = "$ip";
const TIME: &str = "$time";
const IGNORE_TIME: &str = "$ignore_time";
const IGNORE_ALIAS: &str = "$ignore_alias";

/// Wire name of a profile update. Its `Display` is the JSON key of the payload.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Display)]
pub enum Verb {
    #[display(fmt = "$set")]
    Set,
    #[display(fmt = "$set_once")]
    SetOnce,
    #[display(fmt = "$add")]
    Add,
    #[display(fmt = "$append")]
    Append,
    #[display(fmt = "$unset")]
    Unset,
    #[display(fmt = "$remove")]
    Remove,
    #[display(fmt = "$union")]
    Union,
    #[display(fmt = "$delete")]
    Delete,
}

impl Verb {
    pub const ALL: [Self; 8] = [
        Self::Set,
        Self::SetOnce,
        Self::Add,
        Self::Append,
        Self::Unset,
        Self::Remove,
        Self::Union,
        Self::Delete,
    ];
}

impl FromStr for Verb {
    type Err = MixpanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|verb| verb.to_string() == s)
            .ok_or_else(|| malformed(format!("unknown operation {s:?}")))
    }
}

/// The verb of an update together with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Set(Properties),
    SetOnce(Properties),
    Add(Properties),
    Append(Properties),
    /// Names of the properties to drop.
    Unset(Vec<String>),
    Remove(Properties),
    Union(BTreeMap<String, Vec<Value>>),
    /// Deletes the whole profile. Serialized as `"$delete": ""`.
    Delete,
}

impl Action {
    #[must_use]
    pub const fn verb(&self) -> Verb {
        match self {
            Self::Set(_) => Verb::Set,
            Self::SetOnce(_) => Verb::SetOnce,
            Self::Add(_) => Verb::Add,
            Self::Append(_) => Verb::Append,
            Self::Unset(_) => Verb::Unset,
            Self::Remove(_) => Verb::Remove,
            Self::Union(_) => Verb::Union,
            Self::Delete => Verb::Delete,
        }
    }

    fn from_wire(verb: Verb, payload: Value) -> Result<Self, MixpanelError> {
        Ok(match verb {
            Verb::Set => Self::Set(serde_json::from_value(payload)?),
            Verb::SetOnce => Self::SetOnce(serde_json::from_value(payload)?),
            Verb::Add => Self::Add(serde_json::from_value(payload)?),
            Verb::Append => Self::Append(serde_json::from_value(payload)?),
            Verb::Unset => Self::Unset(serde_json::from_value(payload)?),
            Verb::Remove => Self::Remove(serde_json::from_value(payload)?),
            Verb::Union => Self::Union(serde_json::from_value(payload)?),
            Verb::Delete => Self::Delete,
        })
    }
}

/// A mutation of one stored profile.
///
/// Encodes as a flat object: `$token`, `$distinct_id`, then `$ip`, `$time`,
/// `$ignore_time` and `$ignore_alias` when they hold a non-default value, and
/// last the single key named by the action's [`Verb`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Properties")]
pub struct UpdateOperation {
    pub token: Option<String>,
    pub distinct_id: String,
    pub ip: Option<String>,
    /// Unix seconds. Zero is treated as unset.
    pub time: Option<u64>,
    pub ignore_time: bool,
    pub ignore_alias: bool,
    pub action: Action,
}

impl UpdateOperation {
    pub fn new(distinct_id: impl Into<String>, action: Action) -> Self {
        Self {
            token: None,
            distinct_id: distinct_id.into(),
            ip: None,
            time: None,
            ignore_time: false,
            ignore_alias: false,
            action,
        }
    }

    pub fn set(distinct_id: impl Into<String>, properties: Properties) -> Self {
        Self::new(distinct_id, Action::Set(properties))
    }

    pub fn set_once(distinct_id: impl Into<String>, properties: Properties) -> Self {
        Self::new(distinct_id, Action::SetOnce(properties))
    }

    pub fn add(distinct_id: impl Into<String>, properties: Properties) -> Self {
        Self::new(distinct_id, Action::Add(properties))
    }

    pub fn append(distinct_id: impl Into<String>, properties: Properties) -> Self {
        Self::new(distinct_id, Action::Append(properties))
    }

    pub fn unset<I, S>(distinct_id: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            distinct_id,
            Action::Unset(names.into_iter().map(Into::into).collect()),
        )
    }

    pub fn remove(distinct_id: impl Into<String>, properties: Properties) -> Self {
        Self::new(distinct_id, Action::Remove(properties))
    }

    pub fn union(distinct_id: impl Into<String>, properties: BTreeMap<String, Vec<Value>>) -> Self {
        Self::new(distinct_id, Action::Union(properties))
    }

    pub fn delete(distinct_id: impl Into<String>) -> Self {
        Self::new(distinct_id, Action::Delete)
    }

    #[must_use]
    pub const fn verb(&self) -> Verb {
        self.action.verb()
    }

    /// # Errors
    ///
    /// `MixpanelError::SerdeJson` if a payload value fails to serialize.
    pub fn to_json(&self) -> Result<String, MixpanelError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encodes the operation with `token` in place of the operation's own token.
    pub(crate) fn to_json_with_token(&self, token: &str) -> Result<String, MixpanelError> {
        Ok(serde_json::to_string(&WithToken {
            operation: self,
            token,
        })?)
    }

    fn serialize_with_token<S: Serializer>(
        &self,
        token: &str,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(TOKEN, token)?;
        map.serialize_entry(DISTINCT_ID, &self.distinct_id)?;
        if let Some(ip) = self.ip.as_deref().filter(|ip| !ip.is_empty()) {
            map.serialize_entry(IP, ip)?;
        }
        if let Some(time) = self.time.filter(|time| *time != 0) {
            map.serialize_entry(TIME, &time)?;
        }
        if self.ignore_time {
            map.serialize_entry(IGNORE_TIME, &true)?;
        }
        if self.ignore_alias {
            map.serialize_entry(IGNORE_ALIAS, &true)?;
        }

        let key = self.verb().to_string();
        match &self.action {
            Action::Set(properties)
            | Action::SetOnce(properties)
            | Action::Add(properties)
            | Action::Append(properties)
            | Action::Remove(properties) => map.serialize_entry(&key, properties)?,
            Action::Unset(names) => map.serialize_entry(&key, names)?,
            Action::Union(properties) => map.serialize_entry(&key, properties)?,
            Action::Delete => map.serialize_entry(&key, "")?,
        }
        map.end()
    }
}

impl Serialize for UpdateOperation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.serialize_with_token(self.token.as_deref().unwrap_or_default(), serializer)
    }
}

struct WithToken<'a> {
    operation: &'a UpdateOperation,
    token: &'a str,
}

impl Serialize for WithToken<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.operation.serialize_with_token(self.token, serializer)
    }
}

impl TryFrom<Properties> for UpdateOperation {
    type Error = MixpanelError;

    fn try_from(mut wire: Properties) -> Result<Self, Self::Error> {
        let token = take_str(&mut wire, TOKEN)?;
        let distinct_id = match wire.remove(DISTINCT_ID) {
            Some(Value::String(distinct_id)) => distinct_id,
            _ => return Err(malformed(format!("{DISTINCT_ID} must be a string"))),
        };
        let ip = take_str(&mut wire, IP)?;
        let time = match wire.remove(TIME) {
            Some(time) => Some(
                time.as_u64()
                    .ok_or_else(|| malformed(format!("{TIME} must be unix seconds")))?,
            )
            .filter(|time| *time != 0),
            None => None,
        };
        let ignore_time = take_bool(&mut wire, IGNORE_TIME)?;
        let ignore_alias = take_bool(&mut wire, IGNORE_ALIAS)?;

        let mut remaining = wire.into_iter();
        let (key, payload) = remaining
            .next()
            .ok_or_else(|| malformed("no operation".to_owned()))?;
        if let Some((extra, _)) = remaining.next() {
            return Err(malformed(format!(
                "expected exactly one operation, found {key:?} and {extra:?}"
            )));
        }
        let action = Action::from_wire(key.parse()?, payload)?;

        Ok(Self {
            token,
            distinct_id,
            ip,
            time,
            ignore_time,
            ignore_alias,
            action,
        })
    }
}

fn take_str(wire: &mut Properties, key: &str) -> Result<Option<String>, MixpanelError> {
    match wire.remove(key) {
        Some(Value::String(value)) => Ok(Some(value).filter(|value| !value.is_empty())),
        Some(_) => Err(malformed(format!("{key} must be a string"))),
        None => Ok(None),
    }
}

fn take_bool(wire: &mut Properties, key: &str) -> Result<bool, MixpanelError> {
    match wire.remove(key) {
        Some(Value::Bool(value)) => Ok(value),
        Some(_) => Err(malformed(format!("{key} must be a boolean"))),
        None => Ok(false),
    }
}

fn malformed(reason: String) -> MixpanelError {
    MixpanelError::Malformed { reason }
}
