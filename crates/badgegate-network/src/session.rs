//! One operator connection, from accept to close.
//!
//! While idle the session alternates between the socket and the badge
//! reader: each framing attempt that times out is followed by one scan, and
//! a scanned badge is answered with an access report. Registry commands
//! switch into a flow that waits for a badge and, for ADD and EDIT, a name.
//!
//! ```text
//!                 ┌──── WouldBlock ───> scan ─> Access Granted / Denied
//!                 │
//! AwaitingCommand ┼──── ADD ───> AddFlow ────┐
//!        ^        ├──── DELETE > DeleteFlow ─┼──> AwaitingCommand
//!        │        └──── EDIT ──> EditFlow ───┘
//!        │
//!        └─ FOO / blank line: answered or ignored in place
//! ```

use std::time::Duration;

use badgegate_core::{HolderName, TagId};
use badgegate_hardware::{CredentialReader, scan_tag, wait_for_tag};
use badgegate_protocol::{Command, CommandBuffer, CommandFramer, FrameResult, Responses};
use badgegate_storage::TagRegistry;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::SessionResult;
use crate::state::{SessionState, SessionStateMachine, StateTransition};

/// Whether the session keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Ended,
}

/// An operator session over `stream`.
///
/// The badge reader and the registry are borrowed for the duration of the
/// session; the stream is owned and dropped with the session.
pub struct Session<'a, S, R, G> {
    stream: S,
    reader: &'a mut R,
    registry: &'a G,
    framer: CommandFramer,
    buffer: CommandBuffer,
    machine: SessionStateMachine,
    cancel: CancellationToken,
}

impl<'a, S, R, G> Session<'a, S, R, G>
where
    S: AsyncRead + AsyncWrite + Unpin,
    R: CredentialReader,
    G: TagRegistry,
{
    pub fn new(stream: S, reader: &'a mut R, registry: &'a G, cancel: CancellationToken) -> Self {
        Self {
            stream,
            reader,
            registry,
            framer: CommandFramer::new(cancel.clone()),
            buffer: CommandBuffer::new(),
            machine: SessionStateMachine::new(),
            cancel,
        }
    }

    /// Set how long one socket read waits before the reader is polled.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.framer = self.framer.idle_timeout(timeout);
        self
    }

    pub fn state(&self) -> SessionState {
        self.machine.current_state()
    }

    pub fn history(&self) -> impl Iterator<Item = &StateTransition> {
        self.machine.history().iter()
    }

    /// Serve the connection until the peer leaves, shutdown is requested,
    /// or an error aborts it. The session is `Closed` afterwards.
    ///
    /// # Errors
    ///
    /// Socket, badge reader and registry failures end the session and are
    /// returned to the caller.
    pub async fn run(&mut self) -> SessionResult<()> {
        let result = self.serve().await;

        if self.state() != SessionState::Closed {
            self.transition(SessionState::Closed)?;
        }

        result
    }

    async fn serve(&mut self) -> SessionResult<()> {
        loop {
            if self.cancel.is_cancelled() {
                debug!("Session cancelled");
                return Ok(());
            }

            match self
                .framer
                .read_line(&mut self.stream, &mut self.buffer)
                .await
            {
                FrameResult::Complete(_) => {
                    let Some(line) = self.buffer.take_line() else {
                        continue;
                    };
                    if self.dispatch(Command::parse(&line)).await? == Flow::Ended {
                        return Ok(());
                    }
                }
                FrameResult::WouldBlock => self.report_scan().await?,
                FrameResult::Closed => {
                    debug!("Peer closed connection");
                    return Ok(());
                }
                FrameResult::Fatal(e) => return Err(e.into()),
            }
        }
    }

    async fn dispatch(&mut self, command: Command) -> SessionResult<Flow> {
        let flow_state = match &command {
            Command::Empty => {
                trace!("Blank line ignored");
                return Ok(Flow::Continue);
            }
            Command::Unrecognized(_) => {
                debug!(command = %command, "Unrecognized command");
                self.send(Responses::UNRECOGNIZED_COMMAND).await?;
                return Ok(Flow::Continue);
            }
            Command::Add => SessionState::AddFlow,
            Command::Delete => SessionState::DeleteFlow,
            Command::Edit => SessionState::EditFlow,
        };

        debug!(command = %command, "Command received");
        self.transition(flow_state)?;

        let flow = match flow_state {
            SessionState::AddFlow => self.add_flow().await?,
            SessionState::DeleteFlow => self.delete_flow().await?,
            _ => self.edit_flow().await?,
        };

        if flow == Flow::Continue {
            self.transition(SessionState::AwaitingCommand)?;
        }
        Ok(flow)
    }

    /// One idle scan; a decoded badge gets an access report.
    async fn report_scan(&mut self) -> SessionResult<()> {
        let Some(tag) = scan_tag(&mut *self.reader, &self.cancel).await? else {
            return Ok(());
        };

        let response = match self.registry.lookup(&tag).await? {
            Some(record) => {
                info!(tag = %tag, name = %record.holder_name, "Access granted");
                Responses::access_granted(&record.holder_name, &record.last_modified)
            }
            None => {
                warn!(tag = %tag, serial = tag.card_serial(), "Access denied");
                Responses::ACCESS_DENIED.to_string()
            }
        };

        self.send(&response).await
    }

    async fn add_flow(&mut self) -> SessionResult<Flow> {
        self.send(Responses::SCAN_TO_ADD).await?;
        let Some(tag) = self.wait_tag().await? else {
            return Ok(Flow::Ended);
        };

        if self.registry.lookup(&tag).await?.is_some() {
            self.send(Responses::ALREADY_REGISTERED).await?;
            return Ok(Flow::Continue);
        }

        self.send(Responses::ENTER_NAME).await?;
        let Some(line) = self.read_name_line().await? else {
            return Ok(Flow::Ended);
        };
        let Some(name) = self.validate_name(&line).await? else {
            return Ok(Flow::Continue);
        };

        self.registry.upsert(&tag, &name).await?;
        self.send(Responses::TAG_ADDED).await?;
        Ok(Flow::Continue)
    }

    async fn delete_flow(&mut self) -> SessionResult<Flow> {
        self.send(Responses::SCAN_TO_DELETE).await?;
        let Some(tag) = self.wait_tag().await? else {
            return Ok(Flow::Ended);
        };

        if self.registry.delete(&tag).await? {
            self.send(Responses::TAG_DELETED).await?;
        } else {
            self.send(Responses::NOT_IN_SYSTEM).await?;
        }
        Ok(Flow::Continue)
    }

    async fn edit_flow(&mut self) -> SessionResult<Flow> {
        self.send(Responses::SCAN_TO_EDIT).await?;
        let Some(tag) = self.wait_tag().await? else {
            return Ok(Flow::Ended);
        };

        if self.registry.lookup(&tag).await?.is_none() {
            self.send(Responses::NOT_IN_SYSTEM_USE_ADD).await?;
            return Ok(Flow::Continue);
        }

        self.send(Responses::ENTER_NEW_NAME).await?;
        let Some(line) = self.read_name_line().await? else {
            return Ok(Flow::Ended);
        };
        let Some(name) = self.validate_name(&line).await? else {
            return Ok(Flow::Continue);
        };

        self.registry.upsert(&tag, &name).await?;
        self.send(Responses::TAG_UPDATED).await?;
        Ok(Flow::Continue)
    }

    /// Block on the reader for the flow's target badge.
    ///
    /// `None` means shutdown was requested.
    async fn wait_tag(&mut self) -> SessionResult<Option<TagId>> {
        let tag = wait_for_tag(&mut *self.reader, &self.cancel).await?;
        if let Some(tag) = &tag {
            debug!(tag = %tag, state = %self.state(), "Target badge scanned");
        }
        Ok(tag)
    }

    /// Wait for the next line without polling the reader.
    ///
    /// `None` means the peer left or shutdown was requested.
    async fn read_name_line(&mut self) -> SessionResult<Option<Bytes>> {
        loop {
            match self
                .framer
                .read_line(&mut self.stream, &mut self.buffer)
                .await
            {
                FrameResult::Complete(_) => {
                    if let Some(line) = self.buffer.take_line() {
                        return Ok(Some(line));
                    }
                }
                FrameResult::WouldBlock if self.cancel.is_cancelled() => return Ok(None),
                FrameResult::WouldBlock => {}
                FrameResult::Closed => {
                    debug!(state = %self.state(), "Peer closed while a name was expected");
                    return Ok(None);
                }
                FrameResult::Fatal(e) => return Err(e.into()),
            }
        }
    }

    /// Parse a name line, answering `Invalid name` on rejection.
    async fn validate_name(&mut self, line: &[u8]) -> SessionResult<Option<HolderName>> {
        let name = std::str::from_utf8(line)
            .map_err(|e| e.to_string())
            .and_then(|text| HolderName::new(text).map_err(|e| e.to_string()));

        match name {
            Ok(name) => Ok(Some(name)),
            Err(reason) => {
                debug!(%reason, "Name rejected");
                self.send(Responses::INVALID_NAME).await?;
                Ok(None)
            }
        }
    }

    async fn send(&mut self, response: &str) -> SessionResult<()> {
        self.stream.write_all(response.as_bytes()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    fn transition(&mut self, state: SessionState) -> SessionResult<()> {
        let transition = self.machine.transition_to(state)?;
        debug!(from = %transition.from, to = %transition.to, "Session transition");
        Ok(())
    }
}
