use classscan_core::{
    take_attendance, Embedding, EncoderError, EuclideanMatcher, FaceEncoder, MatchError,
    MatchResult, StudentRecord,
};
use image::RgbImage;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("encoder error: {0}")]
    Encoder(#[from] EncoderError),
    #[error("matching error: {0}")]
    Match(#[from] MatchError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from HTTP handlers to the engine thread.
enum EngineRequest {
    Encode {
        image: RgbImage,
        reply: oneshot::Sender<Result<Option<Embedding>, EngineError>>,
    },
    Attendance {
        image: RgbImage,
        roster: Vec<StudentRecord>,
        reply: oneshot::Sender<Result<Vec<MatchResult>, EngineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Embedding of the most confident face in a reference photo, `None` if no face.
    pub async fn encode(&self, image: RgbImage) -> Result<Option<Embedding>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Encode { image, reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Present/absent verdict for every roster entry given a classroom photo.
    pub async fn attendance(
        &self,
        image: RgbImage,
        roster: Vec<StudentRecord>,
    ) -> Result<Vec<MatchResult>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Attendance {
                image,
                roster,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// The encoder is owned by the thread; requests are served one at a time in
/// arrival order.
pub fn spawn_engine<E>(mut encoder: E, matcher: EuclideanMatcher) -> Result<EngineHandle, EngineError>
where
    E: FaceEncoder + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("classscan-engine".into())
        .spawn(move || {
            tracing::info!(tolerance = matcher.tolerance(), "engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Encode { image, reply } => {
                        let _ = reply.send(run_encode(&mut encoder, &image));
                    }
                    EngineRequest::Attendance { image, roster, reply } => {
                        let _ = reply.send(run_attendance(&mut encoder, &matcher, &image, &roster));
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })?;

    Ok(EngineHandle { tx })
}

fn run_encode<E: FaceEncoder>(encoder: &mut E, image: &RgbImage) -> Result<Option<Embedding>, EngineError> {
    let mut faces = encoder.encode_faces(image)?;
    tracing::info!(faces = faces.len(), "encode: reference photo processed");
    if faces.is_empty() {
        return Ok(None);
    }
    Ok(Some(faces.swap_remove(0)))
}

fn run_attendance<E: FaceEncoder>(
    encoder: &mut E,
    matcher: &EuclideanMatcher,
    image: &RgbImage,
    roster: &[StudentRecord],
) -> Result<Vec<MatchResult>, EngineError> {
    let faces = encoder.encode_faces(image)?;
    tracing::info!(faces = faces.len(), students = roster.len(), "attendance: class photo processed");
    Ok(take_attendance(matcher, &faces, roster)?)
}
