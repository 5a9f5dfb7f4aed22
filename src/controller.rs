//! Workflow Controller
//!
//! Owns the pipeline state and sequences upload, processing and reset. It is
//! driven entirely by [`Message`]s and never performs I/O itself: a request
//! that should reach the backend comes back as an [`Effect`] for the caller to
//! execute, and the settled response is fed back in as another message.
//!
//! ```text
//!            upload ok                 process request
//!  Idle ──► Uploading ──► DatasetReady ─────────────► Processing
//!   ▲           │              ▲   ▲                    │    │
//!   │     fail  ▼              │   └──── fail ──────────┘    │ ok
//!   └──────── Failed           └────── (re-process) ◄── ResultReady
//! ```
//!
//! Every upload and process call is tagged with a per-phase generation. A
//! response is applied only when its generation is the current one and the
//! phase is still outstanding, so responses that arrive after a reset or a
//! new upload are dropped.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::intake::{FileIntakeValidator, PatternRequest, ValidationError};
use crate::normalize::{normalize, RawProcessingPayload};
use crate::transport::{TransportError, UploadFile};
use crate::types::{Dataset, ErrorRecord, Phase, PipelineState, ProcessingResult, Row};

/// Inputs to the controller
#[derive(Debug)]
pub enum Message {
    UploadRequested(UploadFile),
    UploadSucceeded { generation: u64, dataset: Dataset },
    UploadFailed { generation: u64, error: TransportError },
    ProcessRequested { instruction: String },
    ProcessSucceeded { generation: u64, payload: RawProcessingPayload },
    ProcessFailed { generation: u64, error: TransportError },
    ResetRequested,
    ErrorDismissed,
}

/// Work the caller must perform on the controller's behalf
#[derive(Debug, Clone)]
pub enum Effect {
    StartUpload {
        generation: u64,
        file: UploadFile,
    },
    StartProcess {
        generation: u64,
        dataset: Arc<Dataset>,
        pattern: PatternRequest,
    },
}

/// What a dispatched message did
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A backend call must be started
    Dispatched(Effect),
    /// State was updated
    Applied,
    /// A response for an old generation was dropped
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} already in progress")]
    Busy(Phase),
}

#[derive(Debug, Default, Clone, Copy)]
struct PhaseTracker {
    generation: u64,
    outstanding: bool,
}

impl PhaseTracker {
    fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.outstanding = true;
        self.generation
    }

    /// Accept a response for `generation` if it is the one being waited on
    fn settle(&mut self, generation: u64) -> bool {
        if self.outstanding && generation == self.generation {
            self.outstanding = false;
            true
        } else {
            false
        }
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.outstanding = false;
    }
}

pub struct WorkflowController {
    validator: FileIntakeValidator,
    state: PipelineState,
    dataset: Option<Arc<Dataset>>,
    result: Option<ProcessingResult>,
    error: Option<ErrorRecord>,
    upload: PhaseTracker,
    process: PhaseTracker,
}

impl Default for WorkflowController {
    fn default() -> Self {
        Self::new(FileIntakeValidator::default())
    }
}

impl WorkflowController {
    pub fn new(validator: FileIntakeValidator) -> Self {
        Self {
            validator,
            state: PipelineState::Idle,
            dataset: None,
            result: None,
            error: None,
            upload: PhaseTracker::default(),
            process: PhaseTracker::default(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// State as the user experiences it: a failed upload leaves nothing loaded
    pub fn effective_state(&self) -> PipelineState {
        match self.state {
            PipelineState::Failed => PipelineState::Idle,
            other => other,
        }
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_deref()
    }

    pub fn result(&self) -> Option<&ProcessingResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&ErrorRecord> {
        self.error.as_ref()
    }

    pub fn validator(&self) -> &FileIntakeValidator {
        &self.validator
    }

    pub fn is_outstanding(&self, phase: Phase) -> bool {
        match phase {
            Phase::Upload => self.upload.outstanding,
            Phase::Process => self.process.outstanding,
            Phase::Validation | Phase::Normalize => false,
        }
    }

    /// Current request generation for `Upload` or `Process`
    pub fn generation(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Upload => self.upload.generation,
            Phase::Process => self.process.generation,
            Phase::Validation | Phase::Normalize => 0,
        }
    }

    /// Rows available for export, present only once a result is ready
    pub fn exportable_rows(&self) -> Option<&[Row]> {
        match self.state {
            PipelineState::ResultReady => self.result.as_ref().map(|r| r.processed_rows.as_slice()),
            _ => None,
        }
    }

    pub fn dispatch(&mut self, message: Message) -> Result<Outcome, ControllerError> {
        match message {
            Message::UploadRequested(file) => self.request_upload(file),
            Message::UploadSucceeded { generation, dataset } => {
                Ok(self.upload_succeeded(generation, dataset))
            }
            Message::UploadFailed { generation, error } => Ok(self.upload_failed(generation, error)),
            Message::ProcessRequested { instruction } => self.request_process(&instruction),
            Message::ProcessSucceeded { generation, payload } => {
                Ok(self.process_succeeded(generation, payload))
            }
            Message::ProcessFailed { generation, error } => Ok(self.process_failed(generation, error)),
            Message::ResetRequested => {
                self.reset();
                Ok(Outcome::Applied)
            }
            Message::ErrorDismissed => {
                self.error = None;
                if self.state == PipelineState::Failed {
                    self.state = PipelineState::Idle;
                }
                Ok(Outcome::Applied)
            }
        }
    }

    fn request_upload(&mut self, file: UploadFile) -> Result<Outcome, ControllerError> {
        if self.upload.outstanding {
            warn!(generation = self.upload.generation, "upload requested while one is outstanding");
            return Err(ControllerError::Busy(Phase::Upload));
        }

        // A new upload attempt starts from a clean slate
        self.clear();

        if let Err(err) = self.validator.validate(&file.info) {
            info!(file = %file.info.name, error = %err, "file rejected before upload");
            self.state = PipelineState::Failed;
            self.error = Some(ErrorRecord::new(Phase::Validation, err.to_string()));
            return Err(err.into());
        }

        let generation = self.upload.begin();
        self.state = PipelineState::Uploading;
        info!(generation, file = %file.info.name, size_bytes = file.info.size_bytes, "upload started");

        Ok(Outcome::Dispatched(Effect::StartUpload { generation, file }))
    }

    fn upload_succeeded(&mut self, generation: u64, dataset: Dataset) -> Outcome {
        if !self.upload.settle(generation) {
            debug!(generation, current = self.upload.generation, "discarding stale upload response");
            return Outcome::Stale;
        }

        info!(
            generation,
            columns = dataset.columns().len(),
            rows = dataset.rows().len(),
            "dataset ready"
        );
        self.dataset = Some(Arc::new(dataset));
        self.result = None;
        self.error = None;
        self.state = PipelineState::DatasetReady;
        Outcome::Applied
    }

    fn upload_failed(&mut self, generation: u64, error: TransportError) -> Outcome {
        if !self.upload.settle(generation) {
            debug!(generation, current = self.upload.generation, "discarding stale upload failure");
            return Outcome::Stale;
        }

        warn!(generation, error = %error, "upload failed");
        self.dataset = None;
        self.result = None;
        self.state = PipelineState::Failed;
        self.error = Some(ErrorRecord::new(Phase::Upload, error.to_string()));
        Outcome::Applied
    }

    fn request_process(&mut self, instruction: &str) -> Result<Outcome, ControllerError> {
        if self.process.outstanding {
            warn!(generation = self.process.generation, "process requested while one is outstanding");
            return Err(ControllerError::Busy(Phase::Process));
        }

        let dataset = match &self.dataset {
            Some(dataset) => Arc::clone(dataset),
            None => return Err(self.reject(ValidationError::NoDataset)),
        };
        if dataset.rows().is_empty() {
            return Err(self.reject(ValidationError::EmptyDataset));
        }

        let pattern = PatternRequest::parse(instruction, self.validator.max_instruction_chars())
            .map_err(|err| self.reject(err))?;

        let generation = self.process.begin();
        self.error = None;
        self.state = PipelineState::Processing;
        info!(generation, rows = dataset.rows().len(), instruction = %pattern, "processing started");

        Ok(Outcome::Dispatched(Effect::StartProcess {
            generation,
            dataset,
            pattern,
        }))
    }

    fn process_succeeded(&mut self, generation: u64, payload: RawProcessingPayload) -> Outcome {
        if !self.process.settle(generation) {
            debug!(generation, current = self.process.generation, "discarding stale process response");
            return Outcome::Stale;
        }

        match normalize(&payload) {
            Ok(result) => {
                info!(
                    generation,
                    total_rows = result.stats.total_rows,
                    matched_rows = result.stats.matched_rows,
                    replaced = result.stats.replaced_count,
                    "result ready"
                );
                self.result = Some(result);
                self.error = None;
                self.state = PipelineState::ResultReady;
            }
            Err(err) => {
                warn!(generation, error = %err, "unusable processing response");
                self.result = None;
                self.state = PipelineState::DatasetReady;
                self.error = Some(ErrorRecord::new(Phase::Normalize, err.to_string()));
            }
        }
        Outcome::Applied
    }

    fn process_failed(&mut self, generation: u64, error: TransportError) -> Outcome {
        if !self.process.settle(generation) {
            debug!(generation, current = self.process.generation, "discarding stale process failure");
            return Outcome::Stale;
        }

        warn!(generation, error = %error, "processing failed");
        self.result = None;
        self.state = PipelineState::DatasetReady;
        self.error = Some(ErrorRecord::new(Phase::Process, error.to_string()));
        Outcome::Applied
    }

    /// Record a local rejection without changing state
    fn reject(&mut self, err: ValidationError) -> ControllerError {
        debug!(error = %err, state = %self.state, "request rejected locally");
        self.error = Some(ErrorRecord::new(Phase::Validation, err.to_string()));
        ControllerError::Validation(err)
    }

    fn clear(&mut self) {
        self.process.invalidate();
        self.dataset = None;
        self.result = None;
        self.error = None;
        self.state = PipelineState::Idle;
    }

    fn reset(&mut self) {
        info!(state = %self.state, "pipeline reset");
        self.upload.invalidate();
        self.clear();
    }
}
