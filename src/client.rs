//! Blocking client for the line protocol

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{CacheError, Result};
use crate::protocol::{encode_command, read_line, write_line, Command};

/// A connection to a CachedKV server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to `addr`
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Bound how long a read may block (`None` = forever)
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Send a command and return the response line
    pub fn request(&mut self, command: &Command) -> Result<String> {
        self.send_raw(&encode_command(command))
    }

    /// Send a raw request line and return the response line
    pub fn send_raw(&mut self, line: &str) -> Result<String> {
        write_line(&mut self.writer, line)?;
        self.next_line()?
            .ok_or_else(|| CacheError::Connection("server closed the connection".to_string()))
    }

    /// Next line pushed by the server (published messages after SUBSCRIBE)
    ///
    /// Returns `Ok(None)` when the server closes the connection.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        read_line(&mut self.reader)
    }

    pub fn ping(&mut self) -> Result<String> {
        self.request(&Command::Ping)
    }

    pub fn get(&mut self, key: &str) -> Result<String> {
        self.request(&Command::Get { key: key.to_string() })
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<String> {
        self.request(&Command::Set {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    pub fn del(&mut self, key: &str) -> Result<String> {
        self.request(&Command::Del { key: key.to_string() })
    }
}
