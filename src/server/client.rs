use thiserror::Error;
use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use super::protocol::{
    expect_message, write_message, Message, ProtocolError, OP_LOAD_SNAPSHOT, OP_LOAD_TABLE, OP_MINE,
};

/// Errors seen by a [`Client`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connection failed or carried something unintelligible.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The server answered with an error description instead of `"OK"`.
    #[error("server refused: {0}")]
    Refused(String),
}

/// Result of a successful mine request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mined {
    /// Dendrogram rendering sent by the server.
    pub dendrogram: String,
    /// Outcome of saving the dendrogram; `Err` holds the server's error text.
    pub saved: Result<(), String>,
}

/// Typed client for the session protocol.
pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    max_frame_bytes: usize,
}

impl Client {
    /// Connect to a server.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await.map_err(ProtocolError::from)?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
            max_frame_bytes: crate::config::ServerConfig::default().max_frame_bytes,
        })
    }

    /// Send one raw message.
    pub async fn send(&mut self, message: Message) -> Result<(), ClientError> {
        write_message(&mut self.writer, &message).await?;
        Ok(())
    }

    /// Receive one raw message.
    pub async fn receive(&mut self) -> Result<Message, ClientError> {
        Ok(expect_message(&mut self.reader, self.max_frame_bytes).await?)
    }

    async fn expect_ok(&mut self) -> Result<(), ClientError> {
        match self.receive().await? {
            m if m.is_ok() => Ok(()),
            Message::Text(reason) => Err(ClientError::Refused(reason)),
            Message::Int(_) => Err(ProtocolError::UnexpectedMessage {
                expected: "reply text",
            }
            .into()),
        }
    }

    async fn expect_text(&mut self) -> Result<String, ClientError> {
        self.receive()
            .await?
            .into_text()
            .ok_or_else(|| ProtocolError::UnexpectedMessage { expected: "dendrogram text" }.into())
    }

    /// Opcode 0: load `table` on the server.
    pub async fn load_table(&mut self, table: &str) -> Result<(), ClientError> {
        self.send(Message::Int(OP_LOAD_TABLE)).await?;
        self.send(Message::text(table)).await?;
        self.expect_ok().await
    }

    /// Opcode 1: mine the loaded table and save the result as `file_name`.
    ///
    /// A refused mine returns [`ClientError::Refused`]; a refused save still returns the
    /// dendrogram, with the refusal in [`Mined::saved`].
    pub async fn mine(
        &mut self,
        depth: i32,
        distance_code: i32,
        file_name: &str,
    ) -> Result<Mined, ClientError> {
        self.send(Message::Int(OP_MINE)).await?;
        self.send(Message::Int(depth)).await?;
        self.send(Message::Int(distance_code)).await?;
        self.expect_ok().await?;
        let dendrogram = self.expect_text().await?;

        self.send(Message::text(file_name)).await?;
        let saved = match self.expect_ok().await {
            Ok(()) => Ok(()),
            Err(ClientError::Refused(reason)) => Err(reason),
            Err(e) => return Err(e),
        };
        Ok(Mined { dendrogram, saved })
    }

    /// Opcode 2: load the dendrogram saved as `file_name` and return its rendering.
    pub async fn load_snapshot(&mut self, file_name: &str) -> Result<String, ClientError> {
        self.send(Message::Int(OP_LOAD_SNAPSHOT)).await?;
        self.send(Message::text(file_name)).await?;
        self.expect_ok().await?;
        self.expect_text().await
    }
}
