//! Opcodes and request headers
//!
//! Every connection carries exactly one request. The request header is the
//! opcode string followed by the opcode's fixed fields; an UPLOAD payload
//! follows the header and is left on the stream for the handler to consume.

use crate::common::{Error, Result};
use crate::protocol::frame::{read_size, read_string, write_size, write_string};
use std::fmt;
use std::str::FromStr;
use tokio::io::{AsyncRead, AsyncWrite};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Ping,
    List,
    Upload,
    Download,
    Remove,
}

impl Opcode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Opcode::Ping => "PING",
            Opcode::List => "LIST",
            Opcode::Upload => "UPLOAD",
            Opcode::Download => "DOWNLOAD",
            Opcode::Remove => "REMOVE",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Opcode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PING" => Ok(Opcode::Ping),
            "LIST" => Ok(Opcode::List),
            "UPLOAD" => Ok(Opcode::Upload),
            "DOWNLOAD" => Ok(Opcode::Download),
            "REMOVE" => Ok(Opcode::Remove),
            other => Err(Error::UnknownOpcode(other.to_string())),
        }
    }
}

/// A decoded request header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Ping,
    List,
    /// `size` payload bytes follow on the stream. Kept signed so a negative
    /// size can be answered with `false` instead of dropping the connection.
    Upload { name: String, size: i64 },
    Download { name: String },
    Remove { name: String },
}

impl Request {
    pub fn opcode(&self) -> Opcode {
        match self {
            Request::Ping => Opcode::Ping,
            Request::List => Opcode::List,
            Request::Upload { .. } => Opcode::Upload,
            Request::Download { .. } => Opcode::Download,
            Request::Remove { .. } => Opcode::Remove,
        }
    }

    /// Read a request header (not the UPLOAD payload).
    pub async fn read_from<R: AsyncRead + Unpin>(r: &mut R) -> Result<Self> {
        let opcode: Opcode = read_string(r).await?.parse()?;
        let request = match opcode {
            Opcode::Ping => Request::Ping,
            Opcode::List => Request::List,
            Opcode::Upload => {
                let name = read_string(r).await?;
                let size = read_size(r).await?;
                Request::Upload { name, size }
            }
            Opcode::Download => Request::Download {
                name: read_string(r).await?,
            },
            Opcode::Remove => Request::Remove {
                name: read_string(r).await?,
            },
        };
        Ok(request)
    }

    /// Write a request header (not the UPLOAD payload).
    pub async fn write_to<W: AsyncWrite + Unpin>(&self, w: &mut W) -> Result<()> {
        write_string(w, self.opcode().as_str()).await?;
        match self {
            Request::Ping | Request::List => {}
            Request::Upload { name, size } => {
                write_string(w, name).await?;
                write_size(w, *size).await?;
            }
            Request::Download { name } | Request::Remove { name } => {
                write_string(w, name).await?;
            }
        }
        Ok(())
    }
}
