//! Face encoding capability: photo in, one embedding per detected face out.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::Embedding;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Anything that can turn a photo into face embeddings.
///
/// Embeddings are returned most-confident face first; an empty vector means
/// no face was found.
pub trait FaceEncoder {
    fn encode_faces(&mut self, image: &RgbImage) -> Result<Vec<Embedding>, EncoderError>;
}

/// SCRFD detection followed by ArcFace recognition.
pub struct OnnxFaceEncoder {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxFaceEncoder {
    pub fn new(detector: FaceDetector, recognizer: FaceRecognizer) -> Self {
        Self { detector, recognizer }
    }

    /// Load both models, failing fast if either file is missing.
    pub fn load(
        detector_path: &str,
        recognizer_path: &str,
        confidence_threshold: f32,
    ) -> Result<Self, EncoderError> {
        let detector = FaceDetector::load(detector_path, confidence_threshold)?;
        let recognizer = FaceRecognizer::load(recognizer_path)?;
        Ok(Self::new(detector, recognizer))
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode_faces(&mut self, image: &RgbImage) -> Result<Vec<Embedding>, EncoderError> {
        let faces = self.detector.detect(image)?;

        let mut embeddings = Vec::with_capacity(faces.len());
        for face in &faces {
            if face.landmarks.is_none() {
                tracing::warn!(confidence = face.confidence, "skipping face without landmarks");
                continue;
            }
            embeddings.push(self.recognizer.extract(image, face)?);
        }

        tracing::debug!(detected = faces.len(), encoded = embeddings.len(), "faces encoded");
        Ok(embeddings)
    }
}

impl<E: FaceEncoder + ?Sized> FaceEncoder for Box<E> {
    fn encode_faces(&mut self, image: &RgbImage) -> Result<Vec<Embedding>, EncoderError> {
        (**self).encode_faces(image)
    }
}
