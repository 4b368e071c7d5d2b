use thiserror::Error;

/// Problems with a schema or with a document checked against one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Unknown node type: {0}")]
    UnknownNode(String),

    #[error("Unknown mark type: {0}")]
    UnknownMark(String),

    #[error("Unknown attribute '{attr}' on {node}")]
    UnknownAttribute { node: String, attr: String },

    #[error("Invalid content expression '{expr}': {reason}")]
    InvalidContentExpression { expr: String, reason: String },

    #[error("Content of {node} does not match '{expr}'")]
    ContentMismatch { node: String, expr: String },

    #[error("Document root must be 'doc', found '{0}'")]
    InvalidRoot(String),
}

/// Returned by extension and editor lifecycle hooks.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Unknown query: {0}")]
    Unknown(String),

    #[error("Failed to decode query result: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum EditorError {
    /// A lifecycle hook failed while the editor was being built.
    #[error("Editor construction failed in '{extension}': {source}")]
    Construction {
        extension: String,
        #[source]
        source: HookError,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Invalid document JSON: {0}")]
    Decode(#[from] serde_json::Error),
}
