// Drives the workflow controller against a backend transport

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::Config;
use crate::controller::{ControllerError, Effect, Message, Outcome, WorkflowController};
use crate::export::{self, CsvDocument, NOTHING_TO_EXPORT};
use crate::intake::FileIntakeValidator;
use crate::transport::{
    HttpTransport, ProcessingTransport, Transport, TransportError, UploadFile, UploadTransport,
    UPLOAD_FALLBACK_MESSAGE,
};
use crate::types::{AppError, AppResult, Dataset, Phase, PipelineState, ProcessingResult};

/// Owns a controller and executes the effects it asks for.
///
/// Backend calls run as spawned tasks; their responses come back over a
/// channel and are applied by [`Session::poll_events`] (non-blocking, for
/// frame-driven front ends) or [`Session::settle`] (awaits one response).
pub struct Session {
    controller: WorkflowController,
    transport: Arc<dyn Transport>,
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, validator: FileIntakeValidator) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            controller: WorkflowController::new(validator),
            transport,
            tx,
            rx,
        }
    }

    /// Session backed by the HTTP client described in `config`
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config.api)?;
        Ok(Self::new(
            Arc::new(transport),
            FileIntakeValidator::from_config(&config.intake),
        ))
    }

    pub fn controller(&self) -> &WorkflowController {
        &self.controller
    }

    pub fn state(&self) -> PipelineState {
        self.controller.state()
    }

    /// Dispatch a message, starting any backend call it produces
    pub fn send(&mut self, message: Message) -> Result<Outcome, ControllerError> {
        let outcome = self.controller.dispatch(message)?;
        if let Outcome::Dispatched(effect) = &outcome {
            self.execute(effect.clone());
        }
        Ok(outcome)
    }

    /// Describe a file on disk and request its upload
    pub async fn upload_path(&mut self, path: impl AsRef<Path>) -> AppResult<Outcome> {
        let path = path.as_ref();
        let file = UploadFile::from_path(path)
            .await
            .map_err(|e| TransportError::ReadFile {
                message: UPLOAD_FALLBACK_MESSAGE.to_string(),
                path: path.display().to_string(),
                detail: e.to_string(),
            })?;
        Ok(self.send(Message::UploadRequested(file))?)
    }

    /// Apply every response that has already arrived. Returns how many were applied.
    pub fn poll_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.rx.try_recv() {
            self.apply(message);
            applied += 1;
        }
        applied
    }

    /// Wait for the next response and apply it
    pub async fn settle(&mut self) -> Option<Outcome> {
        let message = self.rx.recv().await?;
        self.apply(message)
    }

    /// Apply responses until `phase` has nothing outstanding
    pub async fn wait(&mut self, phase: Phase) {
        while self.controller.is_outstanding(phase) {
            if self.settle().await.is_none() {
                break;
            }
        }
    }

    /// Upload a file and wait for the dataset
    pub async fn upload(&mut self, file: UploadFile) -> AppResult<&Dataset> {
        self.send(Message::UploadRequested(file))?;
        self.wait(Phase::Upload).await;

        match self.controller.dataset() {
            Some(dataset) if self.state() == PipelineState::DatasetReady => Ok(dataset),
            _ => Err(self.failure("upload did not produce a dataset")),
        }
    }

    /// Process the loaded dataset and wait for the result
    pub async fn process(&mut self, instruction: &str) -> AppResult<&ProcessingResult> {
        self.send(Message::ProcessRequested {
            instruction: instruction.to_string(),
        })?;
        self.wait(Phase::Process).await;

        match self.controller.result() {
            Some(result) if self.state() == PipelineState::ResultReady => Ok(result),
            _ => Err(self.failure("processing did not produce a result")),
        }
    }

    /// Serialize the current result
    pub fn export(&self) -> AppResult<CsvDocument> {
        let rows = self.controller.exportable_rows().unwrap_or_default();
        export::serialize(rows)?.ok_or_else(|| AppError::Pipeline(NOTHING_TO_EXPORT.to_string()))
    }

    /// Serialize the current result and save it into `dir`
    pub fn download(&self, dir: &Path) -> AppResult<PathBuf> {
        let document = self.export()?;
        Ok(export::download(&document, dir)?)
    }

    pub fn reset(&mut self) {
        // Reset and dismiss never fail
        let _ = self.send(Message::ResetRequested);
    }

    pub fn dismiss_error(&mut self) {
        let _ = self.send(Message::ErrorDismissed);
    }

    fn apply(&mut self, message: Message) -> Option<Outcome> {
        match self.controller.dispatch(message) {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                debug!(error = %err, "response rejected by controller");
                None
            }
        }
    }

    fn failure(&self, fallback: &str) -> AppError {
        let message = self
            .controller
            .error()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| fallback.to_string());
        AppError::Pipeline(message)
    }

    fn execute(&self, effect: Effect) {
        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();

        match effect {
            Effect::StartUpload { generation, file } => {
                tokio::spawn(async move {
                    let message = match transport.upload(&file).await {
                        Ok(dataset) => Message::UploadSucceeded { generation, dataset },
                        Err(error) => Message::UploadFailed { generation, error },
                    };
                    if tx.send(message).is_err() {
                        debug!(generation, "session closed before upload response");
                    }
                });
            }
            Effect::StartProcess {
                generation,
                dataset,
                pattern,
            } => {
                info!(generation, "sending processing request");
                tokio::spawn(async move {
                    let message = match transport.process(&dataset, &pattern).await {
                        Ok(payload) => Message::ProcessSucceeded { generation, payload },
                        Err(error) => Message::ProcessFailed { generation, error },
                    };
                    if tx.send(message).is_err() {
                        debug!(generation, "session closed before process response");
                    }
                });
            }
        }
    }
}
