// Endpoint metadata: a declarative signature per client operation, rendered
// into the schema the route layer serves for capability discovery.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{AtuykaError, Result};

/// Declared type of an operation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
        }
    }
}

/// One keyword parameter of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSignature {
    pub name: &'static str,
    pub ty: ParamType,
    pub has_default: bool,
}

impl ParamSignature {
    pub const fn optional(name: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            ty,
            has_default: true,
        }
    }

    pub const fn required(name: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            ty,
            has_default: false,
        }
    }
}

/// Static description of a client operation: its name, its doc text and the
/// keyword parameters it accepts through `PageParams`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: &'static str,
    pub doc: &'static str,
    pub params: &'static [ParamSignature],
}

impl MethodSignature {
    pub const fn new(name: &'static str, doc: &'static str) -> Self {
        Self {
            name,
            doc,
            params: &[],
        }
    }

    pub const fn with_params(mut self, params: &'static [ParamSignature]) -> Self {
        self.params = params;
        self
    }
}

/// Operations every service client must answer, even if only with
/// `UnsupportedOperation`.
pub const BASE_METHODS: &[MethodSignature] = &[
    MethodSignature::new("get_user", "Get user."),
    MethodSignature::new("get_liked_posts", "Get liked posts."),
    MethodSignature::new("get_following", "Get following users."),
    MethodSignature::new("get_followers", "Get followers."),
    MethodSignature::new("get_posts", "Get posts made by a user."),
    MethodSignature::new("get_post", "Get a post."),
    MethodSignature::new("get_comments", "Get comments."),
    MethodSignature::new("get_similar_posts", "Get similar posts."),
    MethodSignature::new("get_following_feed", "Get posts made by followed users."),
    MethodSignature::new("get_recommended_feed", "Get recommended posts."),
    MethodSignature::new("search_posts", "Search posts."),
    MethodSignature::new("search_users", "Search users."),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceMethodParameter {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub required: bool,
}

impl ServiceMethodParameter {
    pub fn new(name: impl Into<String>, description: Option<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            description,
            ty,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn to_schema(&self) -> Value {
        json!({
            "name": self.name,
            "in": "query",
            "description": self.description.as_deref().unwrap_or_default(),
            "required": self.required,
            "schema": {
                "type": self.ty.as_str(),
            },
        })
    }
}

/// Schema-ready description of one client operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceMethod {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ServiceMethodParameter>,
}

impl ServiceMethod {
    pub fn from_signature(signature: &MethodSignature) -> Self {
        let descriptions = parse_args_section(signature.doc);

        let parameters = signature
            .params
            .iter()
            .map(|param| ServiceMethodParameter {
                name: param.name.to_string(),
                description: descriptions.get(param.name).cloned(),
                ty: param.ty,
                required: !param.has_default,
            })
            .collect();

        Self {
            name: signature.name.replacen("get_", "", 1),
            description: signature.doc.lines().next().unwrap_or_default().trim().to_string(),
            parameters,
        }
    }

    /// Render as a schema. The `service` and `token` query parameters every
    /// route accepts come first.
    pub fn to_schema(&self) -> Value {
        let mut parameters = vec![
            ServiceMethodParameter::new(
                "service",
                Some("Target service slug".into()),
                ParamType::String,
            )
            .required()
            .to_schema(),
            ServiceMethodParameter::new(
                "token",
                Some("Token for the chosen service".into()),
                ParamType::String,
            )
            .to_schema(),
        ];
        parameters.extend(self.parameters.iter().map(ServiceMethodParameter::to_schema));

        json!({
            "name": self.name,
            "description": self.description,
            "parameters": parameters,
        })
    }
}

/// Parameter descriptions from an `Args:` block:
///
/// ```text
/// Args:
///     offset (int): Number of items to skip.
///         Continuation lines are appended.
/// ```
fn parse_args_section(doc: &str) -> HashMap<&str, String> {
    let mut descriptions: HashMap<&str, String> = HashMap::new();
    let lines = doc.lines().skip_while(|line| line.trim() != "Args:").skip(1);
    let mut current: Option<&str> = None;

    for line in lines {
        let trimmed = line.trim();
        // Blank line or an unindented header ends the block.
        if trimmed.is_empty() || !line.starts_with(char::is_whitespace) {
            break;
        }

        let entry = trimmed.split_once(':').and_then(|(head, text)| {
            let name = head.split_once('(').map_or(head, |(name, _)| name).trim();
            (!name.is_empty() && !name.contains(char::is_whitespace)).then_some((name, text.trim()))
        });

        match (entry, current) {
            (Some((name, text)), _) => {
                descriptions.insert(name, text.to_string());
                current = Some(name);
            }
            (None, Some(name)) => {
                if let Some(description) = descriptions.get_mut(name) {
                    description.push(' ');
                    description.push_str(trimmed);
                }
            }
            (None, None) => {}
        }
    }

    descriptions
}

/// Endpoint metadata for every base operation, keyed by operation name.
///
/// `declared` overrides the default signature of a base operation, typically
/// to document the keyword parameters a service accepts. Declaring an
/// operation that is not part of the base contract is rejected.
pub fn endpoint_metadata(declared: &[MethodSignature]) -> Result<BTreeMap<String, ServiceMethod>> {
    for signature in declared {
        if !BASE_METHODS.iter().any(|base| base.name == signature.name) {
            return Err(AtuykaError::InvalidDeclaration(format!(
                "{:?} is not a service operation",
                signature.name
            )));
        }

        let mut seen = Vec::with_capacity(signature.params.len());
        for param in signature.params {
            if seen.contains(&param.name) {
                return Err(AtuykaError::InvalidDeclaration(format!(
                    "parameter {:?} of {:?} is declared twice",
                    param.name, signature.name
                )));
            }
            seen.push(param.name);
        }
    }

    let methods = BASE_METHODS
        .iter()
        .map(|base| {
            let signature = declared
                .iter()
                .find(|signature| signature.name == base.name)
                .unwrap_or(base);
            (base.name.to_string(), ServiceMethod::from_signature(signature))
        })
        .collect();

    Ok(methods)
}
