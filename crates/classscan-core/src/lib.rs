//! classscan-core — Attendance matching and face encoding.
//!
//! Decodes classroom and reference photos, extracts face embeddings with
//! SCRFD detection and ArcFace recognition (ONNX Runtime, CPU), and matches
//! detected faces against a roster of stored embeddings.

pub mod alignment;
pub mod attendance;
pub mod detector;
pub mod encoder;
pub mod image_source;
pub mod protocol;
pub mod recognizer;
pub mod types;

pub use attendance::{take_attendance, EuclideanMatcher, MatchError, Matcher, DEFAULT_TOLERANCE};
pub use detector::FaceDetector;
pub use encoder::{EncoderError, FaceEncoder, OnnxFaceEncoder};
pub use image_source::{ImageError, ImageSource};
pub use recognizer::FaceRecognizer;
pub use types::{BoundingBox, Embedding, MatchResult, StudentRecord};
