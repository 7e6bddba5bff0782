//! Container snapshot model and the decoders for its sub-resources

use std::fmt::Display;
use std::str::FromStr;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::RemoteError;

/// Path of the container collection, below the API prefix
pub const CONTAINERS_PATH: &str = "/org/containers";

/// Sub-resource holding a container's region
pub const REGION_ATTRIBUTE: &str = "region";
/// Sub-resource holding a container's object-lock configuration
pub const OBJECT_LOCK_ATTRIBUTE: &str = "object-lock";
/// Sub-resource holding a container's access policy
pub const POLICY_ATTRIBUTE: &str = "policy";

/// Bytes escaped when a container name is placed in a request path
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// The name of an object-storage container
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerName(String);

impl ContainerName {
    /// Create a new container name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the name as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that the name can address a container of its own.
    ///
    /// Empty names and the dot segments `.` and `..` would resolve to the
    /// collection or one of its parents, so requests for them are refused.
    pub fn validate(&self) -> Result<(), RemoteError> {
        let reason = match self.0.as_str() {
            "" => "name is empty",
            "." | ".." => "name is a dot segment",
            _ => return Ok(()),
        };
        Err(RemoteError::InvalidName {
            container: self.clone(),
            reason,
        })
    }

    /// Path of the container itself, with the name percent-encoded as a
    /// single segment
    pub fn path(&self) -> String {
        format!("{}/{}", CONTAINERS_PATH, self.segment())
    }

    /// Path of one of the container's sub-resources
    pub fn attribute_path(&self, attribute: &str) -> String {
        format!("{}/{}/{}", CONTAINERS_PATH, self.segment(), attribute)
    }

    fn segment(&self) -> impl Display + '_ {
        utf8_percent_encode(&self.0, PATH_SEGMENT)
    }
}

impl Display for ContainerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for ContainerName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for ContainerName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// The state of a container as assembled from its sub-resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSnapshot {
    /// Name of the container
    pub name: ContainerName,
    /// Region the container lives in
    pub region: String,
    /// Object-lock configuration, when object lock is enabled
    pub object_lock: Option<ObjectLockConfig>,
}

/// Default retention applied to objects in a container with object lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectLockConfig {
    /// Retention mode
    pub mode: RetentionMode,
    /// Default retention period
    pub retention: RetentionPeriod,
}

impl ObjectLockConfig {
    /// Create a new object-lock configuration
    pub fn new(mode: RetentionMode, retention: RetentionPeriod) -> Self {
        Self { mode, retention }
    }
}

/// Object-lock retention mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionMode {
    /// Retention cannot be shortened by anyone
    Compliance,
    /// Retention can be shortened by privileged users
    Governance,
}

impl RetentionMode {
    /// The wire name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionMode::Compliance => "compliance",
            RetentionMode::Governance => "governance",
        }
    }
}

impl Display for RetentionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetentionMode {
    type Err = String;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "compliance" => Ok(RetentionMode::Compliance),
            "governance" => Ok(RetentionMode::Governance),
            other => Err(format!("unknown retention mode '{other}'")),
        }
    }
}

/// Default retention period; never zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetentionPeriod {
    /// Retain for this many days
    Days(u32),
    /// Retain for this many years
    Years(u32),
}

#[derive(Deserialize)]
struct Data<T> {
    data: T,
}

#[derive(Deserialize)]
struct RegionBody {
    region: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectLockBody {
    enabled: bool,
    #[serde(default)]
    default_retention_setting: Option<RetentionBody>,
}

#[derive(Deserialize)]
struct RetentionBody {
    mode: String,
    #[serde(default)]
    days: Option<Value>,
    #[serde(default)]
    years: Option<Value>,
}

#[derive(Deserialize)]
struct CreatedBody {
    name: String,
}

fn decode_error(
    container: &ContainerName,
    attribute: &'static str,
    reason: impl ToString,
) -> RemoteError {
    RemoteError::Decode {
        container: container.clone(),
        attribute,
        reason: reason.to_string(),
    }
}

/// Decode a `{"data": {"region": ...}}` body
pub fn decode_region(container: &ContainerName, body: &[u8]) -> Result<String, RemoteError> {
    let body: Data<RegionBody> = serde_json::from_slice(body)
        .map_err(|error| decode_error(container, REGION_ATTRIBUTE, error))?;
    Ok(body.data.region)
}

/// Decode a `{"data": {"enabled": ..., "defaultRetentionSetting": ...}}` body.
///
/// A disabled object lock yields `None` whatever the retention fields hold.
/// Retention values may arrive as numeric strings or numbers; an absent, empty
/// or zero value counts as unset, and exactly one of days and years must be
/// set when object lock is enabled.
pub fn decode_object_lock(
    container: &ContainerName,
    body: &[u8],
) -> Result<Option<ObjectLockConfig>, RemoteError> {
    let body: Data<ObjectLockBody> = serde_json::from_slice(body)
        .map_err(|error| decode_error(container, OBJECT_LOCK_ATTRIBUTE, error))?;

    if !body.data.enabled {
        return Ok(None);
    }

    let retention = body.data.default_retention_setting.ok_or_else(|| {
        decode_error(
            container,
            OBJECT_LOCK_ATTRIBUTE,
            "object lock is enabled without a default retention setting",
        )
    })?;

    let mode = retention
        .mode
        .parse::<RetentionMode>()
        .map_err(|reason| decode_error(container, OBJECT_LOCK_ATTRIBUTE, reason))?;

    let days = parse_retention(retention.days.as_ref()).map_err(|reason| {
        decode_error(container, OBJECT_LOCK_ATTRIBUTE, format!("days: {reason}"))
    })?;
    let years = parse_retention(retention.years.as_ref()).map_err(|reason| {
        decode_error(container, OBJECT_LOCK_ATTRIBUTE, format!("years: {reason}"))
    })?;

    let retention = match (days, years) {
        (Some(days), None) => RetentionPeriod::Days(days),
        (None, Some(years)) => RetentionPeriod::Years(years),
        (Some(_), Some(_)) => {
            return Err(decode_error(
                container,
                OBJECT_LOCK_ATTRIBUTE,
                "retention sets both days and years",
            ));
        }
        (None, None) => {
            return Err(decode_error(
                container,
                OBJECT_LOCK_ATTRIBUTE,
                "retention sets neither days nor years",
            ));
        }
    };

    Ok(Some(ObjectLockConfig { mode, retention }))
}

fn parse_retention(value: Option<&Value>) -> Result<Option<u32>, String> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(text)) if text.trim().is_empty() => return Ok(None),
        Some(Value::String(text)) => text
            .trim()
            .parse::<u32>()
            .map_err(|error| format!("'{text}' is not a retention period: {error}"))?,
        Some(Value::Number(number)) => number
            .as_u64()
            .and_then(|number| u32::try_from(number).ok())
            .ok_or_else(|| format!("{number} is not a retention period"))?,
        Some(other) => return Err(format!("expected a string, got {other}")),
    };

    Ok((parsed != 0).then_some(parsed))
}

/// Decode the `{"data": {"name": ...}}` body returned when a container is
/// created
pub(crate) fn decode_created(
    container: &ContainerName,
    body: &[u8],
) -> Result<ContainerName, RemoteError> {
    let body: Data<CreatedBody> = serde_json::from_slice(body)
        .map_err(|error| decode_error(container, "container", error))?;
    Ok(ContainerName::from(body.data.name))
}

/// Object-lock configuration in the shape the API accepts on writes
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ObjectLockPayload {
    enabled: bool,
    default_retention_setting: RetentionPayload,
}

struct RetentionPayload(ObjectLockConfig);

impl Serialize for RetentionPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("mode", &self.0.mode)?;
        match self.0.retention {
            RetentionPeriod::Days(days) => map.serialize_entry("days", &days)?,
            RetentionPeriod::Years(years) => map.serialize_entry("years", &years)?,
        }
        map.end()
    }
}

impl From<ObjectLockConfig> for ObjectLockPayload {
    fn from(config: ObjectLockConfig) -> Self {
        Self {
            enabled: true,
            default_retention_setting: RetentionPayload(config),
        }
    }
}

/// Request to create a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateContainer {
    /// Name of the new container
    pub name: ContainerName,
    /// Region to place the container in; the API picks its default when unset
    pub region: Option<String>,
    /// Object-lock configuration; can only be chosen at creation
    pub object_lock: Option<ObjectLockConfig>,
}

impl CreateContainer {
    /// Create a request for a container with the API's default region and no
    /// object lock
    pub fn new(name: impl Into<ContainerName>) -> Self {
        Self {
            name: name.into(),
            region: None,
            object_lock: None,
        }
    }

    /// Set the region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Enable object lock with the given configuration
    pub fn with_object_lock(mut self, object_lock: ObjectLockConfig) -> Self {
        self.object_lock = Some(object_lock);
        self
    }

    pub(crate) fn payload(&self) -> CreatePayload<'_> {
        CreatePayload {
            name: self.name.as_str(),
            region: self.region.as_deref().unwrap_or_default(),
            s3_object_lock: self.object_lock.map(ObjectLockPayload::from),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatePayload<'a> {
    name: &'a str,
    region: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    s3_object_lock: Option<ObjectLockPayload>,
}
