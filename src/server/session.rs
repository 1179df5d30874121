//! Per-connection session state machine.
//!
//! A session starts `Idle`, becomes `Ready` once a table has loaded, and loops reading
//! one opcode per iteration. Domain failures (bad table, bad depth, unreadable
//! snapshot, ...) are replied to the peer as text and the session carries on; only
//! stream-level failures end it.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use super::protocol::{
    expect_message, read_message, write_message, Message, ProtocolError, OP_LOAD_SNAPSHOT,
    OP_LOAD_TABLE, OP_MINE,
};
use crate::cluster::{HierarchicalMiner, Linkage};
use crate::config::StorageConfig;
use crate::data::{Dataset, DatasetSource};

/// Everything a session needs from the server, shared by all sessions.
pub struct SessionContext {
    /// Where tables come from.
    pub source: Arc<dyn DatasetSource>,
    /// Where snapshots go.
    pub storage: StorageConfig,
    /// Largest accepted frame payload.
    pub max_frame_bytes: usize,
}

/// Whether a dataset is loaded.
#[derive(Clone, Debug)]
pub enum SessionState {
    /// No dataset loaded.
    Idle,
    /// A dataset is loaded and ready to mine.
    Ready(Arc<Dataset>),
}

/// Why a step did not complete.
enum StepError {
    /// Reply with this text and keep the session.
    Refused(String),
    /// Stream is unusable; end the session.
    Fatal(ProtocolError),
}

impl From<ProtocolError> for StepError {
    fn from(e: ProtocolError) -> Self {
        Self::Fatal(e)
    }
}

impl From<crate::Error> for StepError {
    fn from(e: crate::Error) -> Self {
        Self::Refused(format!("Error: {e}"))
    }
}

type StepResult<T> = Result<T, StepError>;

fn int_field(message: &Message, field: &str) -> StepResult<i32> {
    message
        .as_int()
        .ok_or_else(|| StepError::Refused(format!("Error: expected an integer for {field}")))
}

/// Run `f` on the blocking pool so long computations never stall other sessions.
async fn blocking<T, F>(f: F) -> StepResult<T>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(StepError::from),
        Err(e) => Err(StepError::Refused(format!("Error: worker failed: {e}"))),
    }
}

/// One client connection's state and stream halves.
pub struct Session<R, W> {
    reader: R,
    writer: W,
    ctx: Arc<SessionContext>,
    state: SessionState,
    tag: String,
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create an idle session over the given stream halves.
    pub fn new(reader: R, writer: W, ctx: Arc<SessionContext>, tag: impl Into<String>) -> Self {
        Self {
            reader,
            writer,
            ctx,
            state: SessionState::Idle,
            tag: tag.into(),
        }
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Serve requests until the peer closes the stream or the stream fails.
    pub async fn run(mut self) -> Result<(), ProtocolError> {
        loop {
            let max = self.ctx.max_frame_bytes;
            let Some(message) = read_message(&mut self.reader, max).await? else {
                debug!(conn = %self.tag, "peer closed connection");
                return Ok(());
            };
            let Some(opcode) = message.as_int() else {
                return Err(ProtocolError::UnexpectedMessage { expected: "opcode" });
            };

            let outcome = match opcode {
                OP_LOAD_TABLE => self.load_table().await,
                OP_MINE => self.mine().await,
                OP_LOAD_SNAPSHOT => self.load_snapshot().await,
                other => Err(StepError::Refused(format!("Error: unknown opcode {other}"))),
            };

            match outcome {
                Ok(()) => {}
                Err(StepError::Refused(text)) => {
                    warn!(conn = %self.tag, opcode, reason = %text, "request refused");
                    self.send(Message::Text(text)).await?;
                }
                Err(StepError::Fatal(e)) => return Err(e),
            }
        }
    }

    async fn send(&mut self, message: Message) -> Result<(), ProtocolError> {
        write_message(&mut self.writer, &message).await
    }

    async fn next_message(&mut self) -> Result<Message, ProtocolError> {
        expect_message(&mut self.reader, self.ctx.max_frame_bytes).await
    }

    async fn next_text(&mut self, field: &str) -> StepResult<String> {
        self.next_message()
            .await?
            .into_text()
            .ok_or_else(|| StepError::Refused(format!("Error: expected text for {field}")))
    }


    fn snapshot_path(&self, file_name: &str) -> PathBuf {
        self.ctx.storage.snapshot_path(file_name)
    }

    /// Opcode 0: load a table and become `Ready`. On failure the state is unchanged.
    async fn load_table(&mut self) -> StepResult<()> {
        let table = self.next_text("table name").await?;

        let source = Arc::clone(&self.ctx.source);
        let name = table.clone();
        let dataset = blocking(move || Ok(source.load_dataset(&name)?)).await?;

        info!(
            conn = %self.tag,
            table = %table,
            examples = dataset.number_of_examples(),
            "dataset loaded"
        );
        debug!(conn = %self.tag, "dataset contents:\n{dataset}");
        self.state = SessionState::Ready(Arc::new(dataset));
        self.send(Message::ok()).await?;
        Ok(())
    }

    /// Opcode 1: mine the loaded dataset, reply with the dendrogram, then save it under
    /// the file name the peer sends next.
    async fn mine(&mut self) -> StepResult<()> {
        // Both fields are consumed before either is checked.
        let depth = self.next_message().await?;
        let code = self.next_message().await?;
        let depth = int_field(&depth, "depth")?;
        let code = int_field(&code, "distance type")?;

        let SessionState::Ready(dataset) = &self.state else {
            let reason = "Error: no dataset loaded; load a table first";
            return Err(StepError::Refused(reason.into()));
        };
        let dataset = Arc::clone(dataset);
        let linkage = Linkage::from_code(code)?;
        let mut miner = HierarchicalMiner::with_depth(depth)?;

        let data = Arc::clone(&dataset);
        let miner = blocking(move || {
            miner.mine(&data, &linkage)?;
            Ok(miner)
        })
        .await?;
        info!(conn = %self.tag, depth, %linkage, "dendrogram mined");

        let rendered = miner.with_data(&dataset).to_string();
        self.send(Message::ok()).await?;
        self.send(Message::Text(rendered)).await?;

        let file_name = self.next_text("file name").await?;
        let path = self.snapshot_path(&file_name);
        let save_path = path.clone();
        blocking(move || miner.save(&save_path)).await?;
        info!(conn = %self.tag, path = %path.display(), "dendrogram saved");
        self.send(Message::ok()).await?;
        Ok(())
    }

    /// Opcode 2: load a saved dendrogram and reply with its rendering.
    async fn load_snapshot(&mut self) -> StepResult<()> {
        let file_name = self.next_text("file name").await?;
        let path = self.snapshot_path(&file_name);

        let load_path = path.clone();
        let miner = blocking(move || HierarchicalMiner::load(&load_path)).await?;
        info!(
            conn = %self.tag,
            path = %path.display(),
            depth = miner.depth(),
            "dendrogram loaded"
        );

        // Examples are shown only when the loaded dataset covers every stored index.
        let rendered = match &self.state {
            SessionState::Ready(data)
                if miner
                    .dendrogram()
                    .max_index()
                    .map_or(true, |max| max < data.number_of_examples()) =>
            {
                miner.with_data(data).to_string()
            }
            _ => miner.to_string(),
        };
        self.send(Message::ok()).await?;
        self.send(Message::Text(rendered)).await?;
        Ok(())
    }
}
