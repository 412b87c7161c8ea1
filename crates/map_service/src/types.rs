use serde::Deserialize;

pub const STATUS_OK: &str = "OK";

#[derive(Debug, Clone, Deserialize)]
pub struct DistanceMatrixResponse {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Row {
    #[serde(default)]
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Element {
    pub status: String,
    pub distance: Option<Value>,
    pub duration: Option<Value>,
}

/// Meters for distances, seconds for durations.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Value {
    pub value: f64,
}
