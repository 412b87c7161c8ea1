use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

/// A pickup or dropoff point, identified by its postal or geocoded address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Location {
    pub address: String,
}

impl HasId for Location {
    type IdType = i64;
}
