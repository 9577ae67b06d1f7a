//! Submission flow: the two image slots, the busy marker and the last verdict.

use shared::{
    domain::{ComparisonResult, ImageSlot, SelectedImage},
    error::SubmissionError,
};
use tracing::{debug, info, warn};

use crate::{interpret::interpret_reply, transport::CompareTransport};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowState {
    pub first: Option<SelectedImage>,
    pub second: Option<SelectedImage>,
    pub busy: bool,
    pub result: Option<ComparisonResult>,
}

impl FlowState {
    pub fn image(&self, slot: ImageSlot) -> Option<&SelectedImage> {
        match slot {
            ImageSlot::First => self.first.as_ref(),
            ImageSlot::Second => self.second.as_ref(),
        }
    }

    fn image_mut(&mut self, slot: ImageSlot) -> &mut Option<SelectedImage> {
        match slot {
            ImageSlot::First => &mut self.first,
            ImageSlot::Second => &mut self.second,
        }
    }

    pub fn has_both_images(&self) -> bool {
        self.first.is_some() && self.second.is_some()
    }

    pub fn can_submit(&self) -> bool {
        self.has_both_images() && !self.busy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// In-flight half of a submission. Holds the image pair as it was when the
/// request was started, so later slot changes cannot leak into the upload.
#[derive(Debug)]
pub struct PendingSubmission {
    generation: u64,
    selection: u64,
    first: SelectedImage,
    second: SelectedImage,
}

impl PendingSubmission {
    pub fn first(&self) -> &SelectedImage {
        &self.first
    }

    pub fn second(&self) -> &SelectedImage {
        &self.second
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Applied(ComparisonResult),
    Failed(SubmissionError),
    /// The flow was reset or an image re-selected while the request was in flight.
    Stale,
}

#[derive(Debug, Default)]
pub struct SubmissionFlow {
    state: FlowState,
    phase: Option<FlowPhase>,
    last_error: Option<SubmissionError>,
    // Bumped by `reset`; a ticket from an older generation no longer owns `busy`.
    generation: u64,
    // Bumped by every slot change; a ticket from an older selection cannot set `result`.
    selection: u64,
}

impl SubmissionFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn phase(&self) -> FlowPhase {
        if self.state.busy {
            FlowPhase::Submitting
        } else {
            self.phase.unwrap_or(FlowPhase::Idle)
        }
    }

    pub fn last_error(&self) -> Option<&SubmissionError> {
        self.last_error.as_ref()
    }

    pub fn select_image(
        &mut self,
        slot: ImageSlot,
        image: SelectedImage,
    ) -> Result<(), SubmissionError> {
        if !image.has_uri() {
            return Err(SubmissionError::missing_uri());
        }
        debug!(%slot, name = %image.name, mime_type = %image.mime_type, "image selected");
        *self.state.image_mut(slot) = Some(image);
        self.state.result = None;
        self.selection = self.selection.wrapping_add(1);
        self.clear_outcome();
        Ok(())
    }

    /// Clears everything, including a busy marker. An issued request keeps
    /// running; its completion is dropped as stale.
    pub fn reset(&mut self) {
        debug!(was_busy = self.state.busy, "flow reset");
        self.state = FlowState::default();
        self.generation = self.generation.wrapping_add(1);
        self.selection = self.selection.wrapping_add(1);
        self.clear_outcome();
    }

    pub fn begin_submit(&mut self) -> Result<PendingSubmission, SubmissionError> {
        if self.state.busy {
            return Err(SubmissionError::already_submitting());
        }
        let (Some(first), Some(second)) = (self.state.first.clone(), self.state.second.clone())
        else {
            return Err(SubmissionError::missing_images());
        };

        self.state.busy = true;
        self.state.result = None;
        self.clear_outcome();
        info!(
            generation = self.generation,
            first = %first.name,
            second = %second.name,
            "comparison submitted"
        );
        Ok(PendingSubmission {
            generation: self.generation,
            selection: self.selection,
            first,
            second,
        })
    }

    pub fn finish_submit(
        &mut self,
        pending: PendingSubmission,
        outcome: Result<ComparisonResult, SubmissionError>,
    ) -> Completion {
        if pending.generation != self.generation {
            debug!(
                ticket = pending.generation,
                current = self.generation,
                "dropping stale comparison outcome"
            );
            return Completion::Stale;
        }

        self.state.busy = false;
        if pending.selection != self.selection {
            debug!("images changed during comparison, outcome discarded");
            return Completion::Stale;
        }

        match outcome {
            Ok(result) => {
                info!(
                    verified = result.verified,
                    similarity = result.similarity_percentage,
                    model = %result.model,
                    "comparison finished"
                );
                self.state.result = Some(result.clone());
                self.phase = Some(FlowPhase::Succeeded);
                Completion::Applied(result)
            }
            Err(err) => {
                warn!(code = ?err.code(), error = %err, "comparison failed");
                self.phase = Some(FlowPhase::Failed);
                self.last_error = Some(err.clone());
                Completion::Failed(err)
            }
        }
    }

    /// Full cycle: validate, send one request, interpret the reply, update state.
    pub async fn submit<T>(&mut self, transport: &T) -> Result<ComparisonResult, SubmissionError>
    where
        T: CompareTransport + ?Sized,
    {
        let pending = self.begin_submit()?;
        let outcome = transport
            .send_pair(pending.first(), pending.second())
            .await
            .and_then(|reply| interpret_reply(&reply));

        match self.finish_submit(pending, outcome) {
            Completion::Applied(result) => Ok(result),
            Completion::Failed(err) => Err(err),
            // `&mut self` is held across the await, nothing can invalidate the ticket.
            Completion::Stale => Err(SubmissionError::Transport(
                "comparison was superseded".to_string(),
            )),
        }
    }

    fn clear_outcome(&mut self) {
        self.phase = None;
        self.last_error = None;
    }
}

#[cfg(test)]
#[path = "tests/flow_tests.rs"]
mod tests;
