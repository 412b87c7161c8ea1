use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

use crate::status;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Driver {
    pub name: String,
    pub status: DriverStatus,
}

impl HasId for Driver {
    type IdType = i64;
}

status! {
    /// Only `Online` drivers can be matched. A successful match moves the
    /// driver to `OnRide`.
    DriverStatus("driver") {
        Offline => "offline",
        Online => "online",
        OnRide => "on_ride",
    }
}
