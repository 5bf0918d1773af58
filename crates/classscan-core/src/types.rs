use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Face embedding vector.
///
/// Serialized as a bare JSON array of floats, which is how clients store and
/// send embeddings back. The length is fixed by the encoder model (512 for
/// ArcFace w600k_r50, 128 for dlib-style encoders).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f64>,
}

impl Embedding {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Compute Euclidean distance between two embeddings.
    ///
    /// Only the overlapping prefix is compared; callers that care about
    /// dimension agreement must check lengths first.
    pub fn euclidean_distance(&self, other: &Embedding) -> f64 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

impl From<Vec<f64>> for Embedding {
    fn from(values: Vec<f64>) -> Self {
        Self { values }
    }
}

/// An enrolled student as sent by the client with each attendance request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
    /// Reference embedding from the student's enrollment photo.
    #[serde(default, rename = "encodings")]
    pub embedding: Option<Embedding>,
}

impl StudentRecord {
    /// The stored embedding, if it is usable for matching.
    ///
    /// Missing, null and empty embeddings all mean "never enrolled".
    pub fn reference(&self) -> Option<&Embedding> {
        self.embedding.as_ref().filter(|e| !e.is_empty())
    }
}

/// Per-student attendance verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub id: String,
    pub name: String,
    pub is_absent: bool,
}

impl MatchResult {
    /// Fresh verdict for a roster entry; everyone starts absent.
    pub fn absent(student: &StudentRecord) -> Self {
        Self {
            id: student.id.clone(),
            name: student.name.clone(),
            is_absent: true,
        }
    }
}
