//! File upload assembly. The server pushes a file at the client as a burst
//! of upload records inside file-upload packets (server type 0xC0); the
//! assembler rebuilds the image in a caller-provided buffer and verifies
//! the Fletcher checksum carried by the end-of-data record.
//!
//! No allocation is performed by the library: firmware decides how much
//! room an upload may take by handing over the buffer. Persisting the
//! finished image is the caller's concern.
use embassy_time::{Duration, Instant};

use crate::error::UploadError;
use crate::infra::codec::checksum::Fletcher16;
use crate::infra::codec::payload::PayloadReader;
use crate::protocol::packet::{ClientPacketKind, Packet, PacketBuilder};

/// Record type octets.
pub const UPLOAD_TYPE_FILE: u8 = 0x01;
pub const UPLOAD_TYPE_DATA: u8 = 0x02;
pub const UPLOAD_TYPE_END: u8 = 0x03;

/// Longest accepted file name.
pub const UPLOAD_MAX_FILENAME: usize = 64;

/// An upload that stalls longer than this is considered abandoned.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

//==================================================================================RECORD

/// One parsed upload record:
///
/// ```text
/// File name    [0x01] [file size: u24] [file name]
/// File data    [0x02] [data offset: u24] [data]
/// End of data  [0x03] [file size: u24] [fletcher C0 C1]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadRecord<'a> {
    File { size: usize, name: &'a [u8] },
    Data { offset: usize, data: &'a [u8] },
    End { size: usize, c0: u8, c1: u8 },
}

impl<'a> UploadRecord<'a> {
    /// Parse the payload of a file-upload packet.
    pub fn parse(payload: &'a [u8]) -> Result<Self, UploadError> {
        let mut reader = PayloadReader::new(payload);
        let record_type = reader.read_uint(1).map_err(|_| UploadError::Truncated)? as u8;
        let len_addr = reader.read_uint(3).map_err(|_| UploadError::Truncated)? as usize;
        let rest = reader.read_bytes(0).map_err(|_| UploadError::Truncated)?;
        match record_type {
            UPLOAD_TYPE_FILE => Ok(Self::File {
                size: len_addr,
                name: rest,
            }),
            UPLOAD_TYPE_DATA => Ok(Self::Data {
                offset: len_addr,
                data: rest,
            }),
            UPLOAD_TYPE_END => {
                // A missing checksum pair reads as (0, 0), which skips
                // verification.
                let c0 = rest.first().copied().unwrap_or(0);
                let c1 = rest.get(1).copied().unwrap_or(0);
                Ok(Self::End {
                    size: len_addr,
                    c0,
                    c1,
                })
            }
            other => Err(UploadError::RecordType { record_type: other }),
        }
    }
}

/// Assembly progress reported by [`UploadSession::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    /// File record accepted, assembly started.
    Started { size: usize },
    /// Data record stored.
    InProgress { received: usize },
    /// End record accepted; the image is complete and verified.
    Complete { size: usize },
    /// Record absorbed without action (no upload in progress). Keeps a
    /// failed upload from producing a flood of error packets.
    Ignored,
}

//==================================================================================SESSION

/// Upload assembly state for one session.
#[derive(Debug)]
pub struct UploadSession<'a> {
    buffer: &'a mut [u8],
    name_len: usize,
    name: [u8; UPLOAD_MAX_FILENAME],
    /// Assembly in progress.
    active: bool,
    started_at: Instant,
    timeout: Duration,
    /// Declared file size.
    size: usize,
    /// Bytes received so far; data records must arrive in order.
    addr: usize,
    /// Complete, checksum-verified image available.
    complete: bool,
}

impl<'a> UploadSession<'a> {
    /// Assemble uploads into `buffer`; files larger than it are rejected.
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self::with_timeout(buffer, UPLOAD_TIMEOUT)
    }

    pub fn with_timeout(buffer: &'a mut [u8], timeout: Duration) -> Self {
        Self {
            buffer,
            name_len: 0,
            name: [0; UPLOAD_MAX_FILENAME],
            active: false,
            started_at: Instant::from_ticks(0),
            timeout,
            size: 0,
            addr: 0,
            complete: false,
        }
    }

    /// True while an upload is being assembled.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True when an active upload has stalled past its timeout.
    pub fn is_expired(&self) -> bool {
        self.active && self.started_at.elapsed() > self.timeout
    }

    /// Name from the file record of the current/completed upload.
    pub fn file_name(&self) -> &[u8] {
        &self.name[..self.name_len]
    }

    /// The verified image after [`UploadStatus::Complete`].
    pub fn image(&self) -> Option<&[u8]> {
        if self.complete {
            Some(&self.buffer[..self.size])
        } else {
            None
        }
    }

    /// Abandon the current upload and release the session state.
    pub fn cancel(&mut self) {
        self.active = false;
        self.complete = false;
        self.name_len = 0;
        self.size = 0;
        self.addr = 0;
        // No need to wipe the buffer; the next upload overwrites it.
    }

    /// Process one upload record. On error the session cancels itself so a
    /// broken transfer cannot leave stale state behind; the caller queues
    /// [`error_report`] to carry the matching subcode back to the server.
    pub fn process(&mut self, record: &UploadRecord<'_>) -> Result<UploadStatus, UploadError> {
        let status = self.process_inner(record);
        if status.is_err() {
            self.cancel();
        }
        status
    }

    /// Feed the payload of one file-upload packet through the assembler.
    /// A record that does not even parse cancels the transfer exactly like
    /// a rejected one.
    pub fn process_packet(&mut self, packet: &Packet) -> Result<UploadStatus, UploadError> {
        match UploadRecord::parse(packet.payload()) {
            Ok(record) => self.process(&record),
            Err(err) => {
                self.cancel();
                Err(err)
            }
        }
    }

    fn process_inner(&mut self, record: &UploadRecord<'_>) -> Result<UploadStatus, UploadError> {
        match *record {
            UploadRecord::File { size, name } => {
                /* reset any previous upload attempt */
                self.cancel();

                if size == 0 || size > self.buffer.len() {
                    return Err(UploadError::Length { size });
                }
                if name.is_empty() || name.len() > UPLOAD_MAX_FILENAME {
                    return Err(UploadError::FileName);
                }

                self.name[..name.len()].copy_from_slice(name);
                self.name_len = name.len();
                self.size = size;
                self.addr = 0;
                self.active = true;
                self.started_at = Instant::now();
                #[cfg(feature = "defmt")]
                defmt::debug!("upload started, {} bytes", size);
                Ok(UploadStatus::Started { size })
            }

            UploadRecord::Data { offset, data } => {
                /* absorb silently when no upload is in progress */
                if !self.active {
                    return Ok(UploadStatus::Ignored);
                }

                if offset < self.addr {
                    return Err(UploadError::OffsetOverlap { offset });
                }
                if offset > self.addr {
                    return Err(UploadError::OffsetGap { offset });
                }
                if self.addr + data.len() > self.size {
                    return Err(UploadError::OffsetOverflow { offset });
                }

                self.buffer[self.addr..self.addr + data.len()].copy_from_slice(data);
                self.addr += data.len();
                Ok(UploadStatus::InProgress {
                    received: self.addr,
                })
            }

            UploadRecord::End { size, c0, c1 } => {
                /* absorb silently when no upload is in progress */
                if !self.active {
                    return Ok(UploadStatus::Ignored);
                }

                if size != self.size {
                    return Err(UploadError::Length { size });
                }
                if self.addr != self.size {
                    return Err(UploadError::OffsetGap { offset: self.addr });
                }

                /* (0, 0) means the server sent no checksum */
                if c0 != 0 || c1 != 0 {
                    let mut cksum = Fletcher16::new();
                    cksum.update(&self.buffer[..self.size]);
                    if !cksum.equals(c0, c1) {
                        #[cfg(feature = "defmt")]
                        defmt::warn!("upload checksum mismatch");
                        return Err(UploadError::ChecksumFailed);
                    }
                }

                self.active = false;
                self.complete = true;
                Ok(UploadStatus::Complete { size: self.size })
            }
        }
    }
}

//==================================================================================ERROR_REPORT

/// Client error packet for a rejected upload record: the matching
/// `ERROR_UPLOAD_*` subcode, queued at the server as `%2x`.
pub fn error_report(err: &UploadError) -> Packet {
    PacketBuilder::client(ClientPacketKind::Error)
        .hex(u32::from(err.subcode()), 2)
        .finish()
        .unwrap_or_else(|_| Packet::new(ClientPacketKind::Error.type_code()))
}

//==================================================================================TESTS

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
