use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use serde_json::Value;

use crate::Principal;
use crate::value::{ShapeError, equal_elements};

/// Condition blocks of a statement: operator name (e.g. `StringEquals`) to a
/// mapping of condition key to value
pub type Conditions = BTreeMap<String, BTreeMap<String, String>>;

/// An access-policy document attached to a container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDocument {
    /// Caller-chosen document identifier
    pub id: String,
    /// Policy language version (typically `2012-10-17`)
    pub version: String,
    /// Statements in the order they were declared
    pub statements: Vec<Statement>,
}

impl PolicyDocument {
    /// Create a document without statements
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            statements: Vec::new(),
        }
    }

    /// Append a statement
    pub fn with_statement(mut self, statement: Statement) -> Self {
        self.statements.push(statement);
        self
    }

    /// Whether both documents grant the same thing. Statement order matters,
    /// but the order of entries inside a statement's lists does not.
    pub fn is_equivalent(&self, other: &PolicyDocument) -> bool {
        self.id == other.id
            && self.version == other.version
            && self.statements.len() == other.statements.len()
            && self
                .statements
                .iter()
                .zip(&other.statements)
                .all(|(left, right)| left.is_equivalent(right))
    }
}

/// Whether a statement grants or denies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Grant the listed actions
    Allow,
    /// Refuse the listed actions
    Deny,
}

impl Effect {
    /// The wire spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }
    }
}

impl Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Effect {
    type Err = ShapeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Allow" => Ok(Effect::Allow),
            "Deny" => Ok(Effect::Deny),
            other => Err(ShapeError {
                expected: "\"Allow\" or \"Deny\"",
                found: Value::String(other.to_string()).to_string(),
            }),
        }
    }
}

/// One rule within a policy document.
///
/// Exactly one of `actions`/`not_actions` and exactly one of
/// `resources`/`not_resources` is expected to be populated. The codec carries
/// whatever it is given and leaves that convention to the caller, just as it
/// does for `principal`/`not_principal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Opaque caller-supplied identifier
    pub sid: Option<String>,
    /// Whether the statement grants or denies
    pub effect: Effect,
    /// Actions the statement covers
    pub actions: Vec<String>,
    /// Actions the statement covers by exclusion
    pub not_actions: Vec<String>,
    /// Resources the statement covers
    pub resources: Vec<String>,
    /// Resources the statement covers by exclusion
    pub not_resources: Vec<String>,
    /// Condition blocks. `None` means the statement was never given any.
    pub conditions: Option<Conditions>,
    /// Who the statement applies to
    pub principal: Option<Principal>,
    /// Who the statement applies to by exclusion
    pub not_principal: Option<Principal>,
}

impl Statement {
    /// Start building a statement with [`Effect::Allow`]
    pub fn allow() -> StatementBuilder {
        StatementBuilder::new(Effect::Allow)
    }

    /// Start building a statement with [`Effect::Deny`]
    pub fn deny() -> StatementBuilder {
        StatementBuilder::new(Effect::Deny)
    }

    /// Whether both statements grant the same thing, ignoring the order of
    /// entries in their lists
    pub fn is_equivalent(&self, other: &Statement) -> bool {
        fn same_principal(left: &Option<Principal>, right: &Option<Principal>) -> bool {
            match (left, right) {
                (None, None) => true,
                (Some(left), Some(right)) => left.is_equivalent(right),
                _ => false,
            }
        }

        fn same_conditions(left: &Option<Conditions>, right: &Option<Conditions>) -> bool {
            let empty = Conditions::new();
            left.as_ref().unwrap_or(&empty) == right.as_ref().unwrap_or(&empty)
        }

        self.sid == other.sid
            && self.effect == other.effect
            && equal_elements(&self.actions, &other.actions)
            && equal_elements(&self.not_actions, &other.not_actions)
            && equal_elements(&self.resources, &other.resources)
            && equal_elements(&self.not_resources, &other.not_resources)
            && same_conditions(&self.conditions, &other.conditions)
            && same_principal(&self.principal, &other.principal)
            && same_principal(&self.not_principal, &other.not_principal)
    }
}

/// Builder for [`Statement`]
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    statement: Statement,
}

impl StatementBuilder {
    fn new(effect: Effect) -> Self {
        Self {
            statement: Statement {
                sid: None,
                effect,
                actions: Vec::new(),
                not_actions: Vec::new(),
                resources: Vec::new(),
                not_resources: Vec::new(),
                conditions: None,
                principal: None,
                not_principal: None,
            },
        }
    }

    /// Set the statement identifier
    pub fn sid(mut self, sid: impl Into<String>) -> Self {
        self.statement.sid = Some(sid.into());
        self
    }

    /// Add an action
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.statement.actions.push(action.into());
        self
    }

    /// Add an excluded action
    pub fn not_action(mut self, action: impl Into<String>) -> Self {
        self.statement.not_actions.push(action.into());
        self
    }

    /// Add a resource
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.statement.resources.push(resource.into());
        self
    }

    /// Add an excluded resource
    pub fn not_resource(mut self, resource: impl Into<String>) -> Self {
        self.statement.not_resources.push(resource.into());
        self
    }

    /// Add a condition `key` = `value` under `operator`
    pub fn condition(
        mut self,
        operator: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.statement
            .conditions
            .get_or_insert_with(Conditions::new)
            .entry(operator.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Set the principal
    pub fn principal(mut self, principal: Principal) -> Self {
        self.statement.principal = Some(principal);
        self
    }

    /// Set the excluded principal
    pub fn not_principal(mut self, principal: Principal) -> Self {
        self.statement.not_principal = Some(principal);
        self
    }

    /// Finish the statement
    pub fn build(self) -> Statement {
        self.statement
    }
}
