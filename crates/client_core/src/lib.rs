pub mod flow;
pub mod image_source;
pub mod interpret;
pub mod presentation;
pub mod transport;

pub use flow::{Completion, FlowPhase, FlowState, PendingSubmission, SubmissionFlow};
pub use image_source::{image_from_path, pick_from_path, ImageSource, PathImageSource};
pub use interpret::interpret_reply;
pub use presentation::{Locale, Theme};
pub use transport::{CompareTransport, HttpCompareTransport, TransportOptions};
