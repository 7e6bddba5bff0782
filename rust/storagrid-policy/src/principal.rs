use serde_json::{Map, Value};

use crate::value::{ShapeError, StringShape, WILDCARD};

/// Key under which AWS-style principal identifiers are carried on the wire
pub const AWS: &str = "AWS";

const PRINCIPAL_SHAPES: &str = "\"*\" or an object with a single \"AWS\" key";

/// The actor(s) a statement applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Any principal at all. Encoded as a bare `"*"`.
    Wildcard,
    /// AWS-style principals, encoded as `{"AWS": ...}`. An empty list means
    /// every AWS principal and is encoded as `{"AWS": "*"}`.
    Aws(Vec<String>),
}

impl Principal {
    /// AWS-style principals with the given identifiers
    pub fn aws<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Principal::Aws(identifiers.into_iter().map(Into::into).collect())
    }

    /// The wire form of this principal.
    ///
    /// Identifiers collapse to a bare string when there is exactly one of them
    /// and to `"*"` when there are none. A lone `"*"` identifier stays an array
    /// so that it is not read back as the empty list.
    pub fn to_wire(&self) -> Value {
        match self {
            Principal::Wildcard => Value::String(WILDCARD.to_string()),
            Principal::Aws(identifiers) => {
                let shape = match identifiers.as_slice() {
                    [single] if single == WILDCARD => StringShape::Many(identifiers.clone()),
                    _ => StringShape::collapse(identifiers),
                };
                let mut map = Map::with_capacity(1);
                map.insert(AWS.to_string(), shape.into());
                Value::Object(map)
            }
        }
    }

    /// Decode a principal from its wire form. Accepts `"*"`, `{"AWS": "*"}`,
    /// `{"AWS": "<identifier>"}` and `{"AWS": ["<identifier>", ...]}`.
    pub fn from_wire(value: &Value) -> Result<Self, ShapeError> {
        match value {
            Value::String(wildcard) if wildcard == WILDCARD => Ok(Principal::Wildcard),
            Value::Object(map) if map.len() == 1 => {
                let identifiers = map
                    .get(AWS)
                    .ok_or_else(|| ShapeError::new(PRINCIPAL_SHAPES, value))?;

                match StringShape::classify(Some(identifiers.clone()))? {
                    StringShape::One(single) if single == WILDCARD => Ok(Principal::Aws(vec![])),
                    StringShape::Absent => Err(ShapeError::new(PRINCIPAL_SHAPES, value)),
                    shape => Ok(Principal::Aws(shape.into_list())),
                }
            }
            other => Err(ShapeError::new(PRINCIPAL_SHAPES, other)),
        }
    }

    /// Whether both principals name the same actors, ignoring identifier
    /// order. A lone `"*"` identifier names the same actors as none at all.
    pub fn is_equivalent(&self, other: &Principal) -> bool {
        fn every_aws_principal(identifiers: &[String]) -> &[String] {
            match identifiers {
                [single] if single == WILDCARD => &[],
                _ => identifiers,
            }
        }

        match (self, other) {
            (Principal::Wildcard, Principal::Wildcard) => true,
            (Principal::Aws(left), Principal::Aws(right)) => crate::value::equal_elements(
                every_aws_principal(left),
                every_aws_principal(right),
            ),
            _ => false,
        }
    }
}
