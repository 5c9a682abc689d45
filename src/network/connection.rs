//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{self, BufReader, BufWriter};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::engine::{Engine, Reply, WalMode};
use crate::error::{CacheError, Result};
use crate::protocol::{parse_command, read_line, write_line, Response};
use crate::pubsub::{Subscription, SubscriptionId};

/// Write half shared by the request loop and subscription forwarders
type SharedWriter = Arc<Mutex<BufWriter<TcpStream>>>;

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer; whole lines are written under its lock
    writer: SharedWriter,

    /// Reference to the engine
    engine: Arc<Engine>,

    /// Peer address for logging
    peer_addr: String,

    /// Subscriptions opened by this connection
    subscriptions: Vec<SubscriptionId>,

    /// Threads pushing published messages to this client
    forwarders: Vec<JoinHandle<()>>,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: Arc::new(Mutex::new(BufWriter::new(write_stream))),
            engine,
            peer_addr,
            subscriptions: Vec::new(),
            forwarders: Vec::new(),
        })
    }

    /// Configure connection timeouts (0 leaves a side without a timeout)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .lock()
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads request lines in a loop and answers each one. Returns when the
    /// client disconnects or an error occurs; subscriptions opened by this
    /// connection are released either way.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);
        let result = self.serve();
        self.release_subscriptions();
        result
    }

    fn serve(&mut self) -> Result<()> {
        loop {
            let line = match read_line(&mut self.reader) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(CacheError::Parse(e)) => {
                    tracing::debug!("Unreadable request from {}: {}", self.peer_addr, e);
                    self.send_response(&Response::Invalid)?;
                    continue;
                }
                Err(CacheError::Io(ref e)) if is_disconnect(e) => {
                    tracing::debug!("Client {} went away: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Connection error: {}: {}", self.peer_addr, e);
                    return Err(CacheError::Connection(format!("{}: {}", self.peer_addr, e)));
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            tracing::trace!("Received from {}: {:?}", self.peer_addr, line);

            let (response, subscription) = self.execute_line(&line);
            self.send_response(&response)?;

            // Messages queued since SUBSCRIBE wait until the reply is out
            if let Some(subscription) = subscription {
                self.start_forwarder(subscription);
            }
        }
    }

    /// Parse and execute one request line
    ///
    /// A SUBSCRIBE also hands back its subscription, to be forwarded once
    /// the response has been written.
    fn execute_line(&self, line: &str) -> (Response, Option<Subscription>) {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!("Invalid command from {}: {}", self.peer_addr, e);
                return (Response::Invalid, None);
            }
        };

        match self.engine.execute(command, WalMode::Enabled) {
            Ok(Reply::Subscribed(subscription)) => {
                let response = Response::Subscribed(subscription.topic().to_string());
                (response, Some(subscription))
            }
            Ok(reply) => (reply.to_response(), None),
            Err(e) => {
                tracing::debug!("Command from {} failed: {}", self.peer_addr, e);
                (Response::Invalid, None)
            }
        }
    }

    /// Push messages for `subscription` to this client until either side goes away
    fn start_forwarder(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription.id());

        let writer = Arc::clone(&self.writer);
        let peer_addr = self.peer_addr.clone();
        let spawned = thread::Builder::new()
            .name(format!("sub-{}", subscription.id().0))
            .spawn(move || {
                while let Some(message) = subscription.recv() {
                    if let Err(e) = write_line(&mut *writer.lock(), &message.to_line()) {
                        tracing::debug!("Publish error: {}: {}", peer_addr, e);
                        break;
                    }
                }
            });

        match spawned {
            Ok(handle) => self.forwarders.push(handle),
            Err(e) => tracing::warn!("Could not start subscription forwarder: {}", e),
        }
    }

    /// Unregister subscriptions so their forwarders see a closed queue
    fn release_subscriptions(&mut self) {
        if self.subscriptions.is_empty() {
            return;
        }
        for id in self.subscriptions.drain(..) {
            self.engine.pubsub().unsubscribe(id);
        }
        // A forwarder stuck writing to a slow peer fails instead of blocking the join
        let _ = self.reader.get_ref().shutdown(Shutdown::Both);
        for handle in self.forwarders.drain(..) {
            let _ = handle.join();
        }
    }

    /// Send a response to the client
    ///
    /// A peer that already hung up ends the connection without an error.
    fn send_response(&mut self, response: &Response) -> Result<()> {
        match write_line(&mut *self.writer.lock(), &response.to_line()) {
            Ok(()) => Ok(()),
            Err(CacheError::Io(ref e)) if is_disconnect(e) => {
                tracing::debug!(
                    "Client {} disconnected before response could be sent: {}",
                    self.peer_addr,
                    e
                );
                Err(CacheError::Connection(format!("{} disconnected", self.peer_addr)))
            }
            Err(e) => {
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                Err(CacheError::Connection(format!("{}: {}", self.peer_addr, e)))
            }
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}
