use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("ERR_NO_ACTIVE_MODULE: items can only be created inside a module scope")]
    NoActiveModule,

    #[error("ERR_INVALID_KEY: {key} is not a valid {kind} key")]
    InvalidKey { key: String, kind: String },

    #[error("ERR_DUPLICATE_KEY: {key} is already in use")]
    DuplicateKey { key: String },

    #[error("ERR_UNKNOWN_ENTITY: {reference}")]
    UnknownEntity { reference: String },

    #[error("ERR_LABEL_MISMATCH: {key} is labelled {actual:?}, not {expected:?}")]
    LabelMismatch {
        key: String,
        expected: String,
        actual: String,
    },

    #[error("ERR_NOT_A_RELATION: {key}")]
    NotARelation { key: String },

    #[error("ERR_MULTIPLE_OBJECTS: {subject} {relation} has {count} objects")]
    MultipleObjects {
        subject: String,
        relation: String,
        count: usize,
    },

    #[error("ERR_INCONSISTENT: {subject} {relation}: {reason}")]
    Inconsistent {
        subject: String,
        relation: String,
        reason: String,
    },

    #[error("ERR_MODULE_LOADED: {uri} is already loaded")]
    ModuleAlreadyLoaded { uri: String },

    #[error("ERR_UNKNOWN_MODULE: {uri}")]
    UnknownModule { uri: String },

    #[error("ERR_PREFIX_CONFLICT: prefix {prefix} is bound to {bound}")]
    PrefixConflict { prefix: String, bound: String },

    #[error("ERR_BUILTIN_MODULE: {uri} cannot be unloaded")]
    BuiltinModule { uri: String },

    #[error("ERR_MODULE_FORMAT: {0}")]
    Format(#[from] serde_json::Error),

    #[error("ERR_IO: {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
