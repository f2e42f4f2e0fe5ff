use kgsym_ast::KgError;
use kgsym_graph::GraphError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Expr(#[from] KgError),

    #[error("ERR_MATH_MODULE_MISSING: {uri} is not loaded ({detail})")]
    MathModuleMissing { uri: String, detail: String },

    #[error("ERR_UNBOUND_SYMBOL: {name} is not linked to an item")]
    UnboundSymbol { name: String },

    #[error("ERR_UNKNOWN_MAPPING: no mapping item for {name}")]
    UnknownMapping { name: String },

    #[error("ERR_TOO_DEEP: expression nests deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("ERR_MALFORMED_NODE: {node}: {reason}")]
    Malformed { node: String, reason: String },
}
