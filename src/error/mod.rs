use thiserror::Error;

/// A DOM operation on the host page threw.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("host document error: {0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<wasm_bindgen::JsValue> for HostError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        let message = value
            .as_string()
            .or_else(|| {
                js_sys::Reflect::get(&value, &"message".into())
                    .ok()
                    .and_then(|m| m.as_string())
            })
            .unwrap_or_else(|| format!("{value:?}"));
        Self(message)
    }
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("storage serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum OrganizerError {
    /// The current page has no session key, so nothing can be persisted.
    #[error("this conversation is not saved yet; organization cannot be persisted")]
    Unpersisted,

    #[error("group container is no longer attached to the page")]
    UnknownGroup,

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ExportError {
    #[error("export failed: {0}")]
    Host(#[from] HostError),
}

pub type OrganizerResult<T> = Result<T, OrganizerError>;
