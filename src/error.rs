use thiserror::Error;

/// Malformed hex color.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid hex color {0:?}")]
pub struct ColorError(pub String);

/// Local precondition failures. These never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Pick an option first.")]
    NoSelection,
    #[error("Upload a photo or use the camera before voting.")]
    NoImage,
    #[error("Write a message before voting.")]
    EmptyMessage,
    #[error("Unknown option {0:?}")]
    UnknownOption(String),
    #[error("A vote is already being sent.")]
    SubmissionInFlight,
}

/// Failures talking to the counting service.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("could not reach the poll service: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("poll service answered {status} for {endpoint}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("unexpected response from the poll service: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("camera access was denied")]
    PermissionDenied,
    #[error("no camera available")]
    Unavailable,
    #[error("camera failure: {0}")]
    Hardware(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Start the camera first.")]
    NoActiveCamera,
    #[error("could not read a camera frame: {0}")]
    Frame(String),
    #[error("could not read the image: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error("could not decode the source image: {0}")]
    Decode(String),
    #[error("could not encode the composed image: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShareError {
    #[error("This system cannot share files. Try from a device with a share target installed.")]
    Unsupported,
    #[error("No image to share. Upload a photo or use the camera.")]
    NoImage,
    #[error("sharing failed: {0}")]
    Failed(String),
}

/// Everything the vote flow can hand back to the host for display.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Share(#[from] ShareError),
}
