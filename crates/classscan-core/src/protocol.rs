//! JSON bodies exchanged between `classscand` and its clients.

use crate::image_source::ImageSource;
use crate::types::{Embedding, MatchResult, StudentRecord};
use serde::{Deserialize, Serialize};

/// `POST /encode-student` request. Exactly one image field is expected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeStudentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

impl EncodeStudentRequest {
    pub fn source(&self) -> Option<ImageSource> {
        ImageSource::from_fields(self.image_url.as_deref(), self.image_data.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeStudentResponse {
    pub success: bool,
    pub encodings: Embedding,
}

/// `POST /process-attendance` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_image_data: Option<String>,
    #[serde(default)]
    pub students: Option<Vec<StudentRecord>>,
}

impl AttendanceRequest {
    pub fn source(&self) -> Option<ImageSource> {
        ImageSource::from_fields(self.class_image_url.as_deref(), self.class_image_data.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceResponse {
    pub success: bool,
    pub results: Vec<MatchResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Error envelope. Missing-field errors carry no `success` flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub error: String,
}
