//! Wire encoding of policy documents.
//!
//! Requests carry the document as `{"policy": {...}}`, responses wrap the same
//! envelope in `{"data": ...}`, and `{"policy": null}` asks for the document
//! to be removed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::{ShapeError, optional_string, string_list};
use crate::{Conditions, Effect, PolicyDocument, PolicyError, Principal, Statement};

/// Wire names of statement fields, as reported in [`PolicyError::Structural`]
pub mod field {
    /// `Sid`
    pub const SID: &str = "Sid";
    /// `Effect`
    pub const EFFECT: &str = "Effect";
    /// `Action`
    pub const ACTION: &str = "Action";
    /// `NotAction`
    pub const NOT_ACTION: &str = "NotAction";
    /// `Resource`
    pub const RESOURCE: &str = "Resource";
    /// `NotResource`
    pub const NOT_RESOURCE: &str = "NotResource";
    /// `Condition`
    pub const CONDITION: &str = "Condition";
    /// `Principal`
    pub const PRINCIPAL: &str = "Principal";
    /// `NotPrincipal`
    pub const NOT_PRINCIPAL: &str = "NotPrincipal";
}

const REMOVAL: &[u8] = br#"{"policy":null}"#;

#[derive(Deserialize)]
struct ResponseEnvelope {
    data: Envelope,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    policy: Option<WirePolicy>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WirePolicy {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    statement: Option<Vec<WireStatement>>,
}

// Every field is kept raw so that a bad shape can be reported against the
// statement and field it came from.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireStatement {
    sid: Option<Value>,
    effect: Option<Value>,
    action: Option<Value>,
    not_action: Option<Value>,
    resource: Option<Value>,
    not_resource: Option<Value>,
    condition: Option<Value>,
    principal: Option<Value>,
    not_principal: Option<Value>,
}

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    policy: WirePolicyOut<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct WirePolicyOut<'a> {
    id: &'a str,
    version: &'a str,
    statement: Vec<WireStatementOut<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct WireStatementOut<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    sid: Option<&'a str>,
    effect: &'static str,
    #[serde(skip_serializing_if = "is_empty")]
    action: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    not_action: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    resource: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    not_resource: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    condition: Option<&'a Conditions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    principal: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    not_principal: Option<Value>,
}

fn is_empty(list: &&[String]) -> bool {
    list.is_empty()
}

impl<'a> From<&'a Statement> for WireStatementOut<'a> {
    fn from(statement: &'a Statement) -> Self {
        Self {
            sid: statement.sid.as_deref(),
            effect: statement.effect.as_str(),
            action: &statement.actions,
            not_action: &statement.not_actions,
            resource: &statement.resources,
            not_resource: &statement.not_resources,
            condition: statement
                .conditions
                .as_ref()
                .filter(|conditions| !conditions.is_empty()),
            principal: statement.principal.as_ref().map(Principal::to_wire),
            not_principal: statement.not_principal.as_ref().map(Principal::to_wire),
        }
    }
}

fn structural(statement: usize, field: &'static str) -> impl FnOnce(ShapeError) -> PolicyError {
    move |shape| PolicyError::Structural {
        statement,
        field,
        shape,
    }
}

fn effect(value: Option<Value>) -> Result<Effect, ShapeError> {
    match value {
        Some(Value::String(effect)) => effect.parse(),
        Some(other) => Err(ShapeError::new("\"Allow\" or \"Deny\"", &other)),
        None => Err(ShapeError {
            expected: "\"Allow\" or \"Deny\"",
            found: "nothing".to_string(),
        }),
    }
}

fn principal(value: Option<Value>) -> Result<Option<Principal>, ShapeError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Principal::from_wire(&value).map(Some),
    }
}

fn conditions(value: Option<Value>) -> Result<Option<Conditions>, ShapeError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => {
            let found = crate::value::describe(&value);
            serde_json::from_value::<Conditions>(value)
                .map(Some)
                .map_err(|_| ShapeError {
                    expected: "an object mapping operators to string key/value pairs",
                    found: found.to_string(),
                })
        }
    }
}

impl WireStatement {
    fn into_statement(self, index: usize) -> Result<Statement, PolicyError> {
        Ok(Statement {
            sid: optional_string(self.sid).map_err(structural(index, field::SID))?,
            effect: effect(self.effect).map_err(structural(index, field::EFFECT))?,
            actions: string_list(self.action).map_err(structural(index, field::ACTION))?,
            not_actions: string_list(self.not_action)
                .map_err(structural(index, field::NOT_ACTION))?,
            resources: string_list(self.resource).map_err(structural(index, field::RESOURCE))?,
            not_resources: string_list(self.not_resource)
                .map_err(structural(index, field::NOT_RESOURCE))?,
            conditions: conditions(self.condition).map_err(structural(index, field::CONDITION))?,
            principal: principal(self.principal).map_err(structural(index, field::PRINCIPAL))?,
            not_principal: principal(self.not_principal)
                .map_err(structural(index, field::NOT_PRINCIPAL))?,
        })
    }
}

impl WirePolicy {
    fn into_document(self) -> Result<PolicyDocument, PolicyError> {
        let statements = self
            .statement
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, statement)| statement.into_statement(index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PolicyDocument {
            id: self.id.unwrap_or_default(),
            version: self.version.unwrap_or_default(),
            statements,
        })
    }
}

/// Decode a `{"policy": {...}}` payload. A `null` or missing policy is
/// reported as [`PolicyError::Absent`].
pub fn decode(bytes: &[u8]) -> Result<PolicyDocument, PolicyError> {
    decode_envelope(bytes)?.ok_or(PolicyError::Absent)
}

/// Decode a `{"policy": ...}` payload, where `null` means "no policy"
pub fn decode_envelope(bytes: &[u8]) -> Result<Option<PolicyDocument>, PolicyError> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;
    envelope.policy.map(WirePolicy::into_document).transpose()
}

/// Decode an API response of the form `{"data": {"policy": ...}}`
pub fn decode_response(bytes: &[u8]) -> Result<Option<PolicyDocument>, PolicyError> {
    let response: ResponseEnvelope = serde_json::from_slice(bytes)?;
    response.data.policy.map(WirePolicy::into_document).transpose()
}

/// Encode a document as a `{"policy": {...}}` payload.
///
/// List fields are always emitted as arrays and omitted when empty;
/// principals use their collapsed form; conditions are omitted unless at
/// least one operator is present.
pub fn encode(document: &PolicyDocument) -> Result<Vec<u8>, PolicyError> {
    let envelope = EnvelopeOut {
        policy: WirePolicyOut {
            id: &document.id,
            version: &document.version,
            statement: document.statements.iter().map(WireStatementOut::from).collect(),
        },
    };

    serde_json::to_vec(&envelope).map_err(PolicyError::Encode)
}

/// The `{"policy": null}` payload that removes a container's policy
pub fn encode_removal() -> Vec<u8> {
    REMOVAL.to_vec()
}
