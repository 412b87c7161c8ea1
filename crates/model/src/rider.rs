use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

/// A rider account. Referenced by ride requests and rides, never mutated by
/// dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Rider {
    pub name: String,
}

impl HasId for Rider {
    type IdType = i64;
}
