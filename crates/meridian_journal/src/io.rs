//! Streaming persistence for frame logs.
//!
//! Frames are written as u32 big-endian length-prefixed MessagePack records
//! so a log can be appended during a live run and read back incrementally.
//! MessagePack is self-describing, which JSON state values require.

use std::io::{self, Read, Write};

use thiserror::Error;

use crate::frame::{FrameLog, TickFrame};

/// Journal persistence failures
#[derive(Debug, Error)]
pub enum JournalError {
    /// Underlying I/O failure
    #[error("journal io: {0}")]
    Io(#[from] io::Error),

    /// A frame failed to serialize
    #[error("frame encode: {0}")]
    Encode(String),

    /// A record failed to deserialize
    #[error("frame decode: {0}")]
    Decode(String),

    /// The stream ended inside a record
    #[error("journal truncated mid-frame")]
    Truncated,
}

/// Streaming frame writer
pub struct JournalWriter<W> {
    writer: W,
}

impl<W: Write> JournalWriter<W> {
    /// Create a writer over any `Write`
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Append one frame
    ///
    /// # Errors
    ///
    /// Returns `Encode` for serialization failures and `Io` for write
    /// failures.
    pub fn append(&mut self, frame: &TickFrame) -> Result<(), JournalError> {
        let bytes = rmp_serde::to_vec(frame).map_err(|e| JournalError::Encode(e.to_string()))?;
        let len = u32::try_from(bytes.len())
            .map_err(|_| JournalError::Encode("frame exceeds u32 length".to_string()))?;
        self.writer.write_all(&len.to_be_bytes())?;
        self.writer.write_all(&bytes)?;
        Ok(())
    }

    /// Append every frame of a log
    ///
    /// # Errors
    ///
    /// Same as [`JournalWriter::append`].
    pub fn append_log(&mut self, log: &FrameLog) -> Result<(), JournalError> {
        for frame in log.frames() {
            self.append(frame)?;
        }
        Ok(())
    }

    /// Flush the underlying writer
    ///
    /// # Errors
    ///
    /// Returns `Io` on flush failure.
    pub fn flush(&mut self) -> Result<(), JournalError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Consume and return the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Streaming frame reader
pub struct JournalReader<R> {
    reader: R,
}

impl<R: Read> JournalReader<R> {
    /// Create a reader over any `Read`
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read the next frame, `None` at a clean end of stream
    ///
    /// # Errors
    ///
    /// Returns `Truncated` when the stream ends inside a record and
    /// `Decode` for malformed records.
    pub fn next_frame(&mut self) -> Result<Option<TickFrame>, JournalError> {
        let mut len_bytes = [0u8; 4];
        match self.reader.read_exact(&mut len_bytes) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let len = u32::from_be_bytes(len_bytes) as usize;
        let mut buffer = vec![0u8; len];
        self.reader.read_exact(&mut buffer).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                JournalError::Truncated
            } else {
                JournalError::Io(e)
            }
        })?;
        rmp_serde::from_slice(&buffer)
            .map(Some)
            .map_err(|e| JournalError::Decode(e.to_string()))
    }

    /// Read every remaining frame into a log
    ///
    /// # Errors
    ///
    /// Same as [`JournalReader::next_frame`].
    pub fn read_log(&mut self) -> Result<FrameLog, JournalError> {
        let mut log = FrameLog::new();
        while let Some(frame) = self.next_frame()? {
            log.push(frame);
        }
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{RecordedInput, ResolverOutputMap};
    use meridian_core::{SessionId, StateHash};
    use proptest::prelude::*;
    use serde_json::json;

    fn demo_frame(tick: u64) -> TickFrame {
        let mut frame = TickFrame::new(tick);
        frame.inputs.push(RecordedInput::Action {
            session: SessionId::from_bytes([tick as u8; 16]),
            name: "Draw".to_string(),
            payload: json!({"count": tick}),
            resolver_outputs: ResolverOutputMap::from_iter([(
                "shuffle".to_string(),
                json!([tick, tick + 1]),
            )]),
        });
        frame.state_hash = Some(StateHash::from_raw(tick.wrapping_mul(31)));
        frame
    }

    #[test]
    fn test_streaming_round_trip() {
        let frames: Vec<TickFrame> = (0..4).map(demo_frame).collect();

        let mut buffer = Vec::new();
        {
            let mut writer = JournalWriter::new(&mut buffer);
            for frame in &frames {
                writer.append(frame).unwrap();
            }
            writer.flush().unwrap();
        }

        let mut reader = JournalReader::new(buffer.as_slice());
        let log = reader.read_log().unwrap();
        assert_eq!(log.frames(), frames.as_slice());
    }

    #[test]
    fn test_empty_stream_is_empty_log() {
        let mut reader = JournalReader::new([].as_slice());
        assert!(reader.read_log().unwrap().is_empty());
    }

    #[test]
    fn test_truncated_record_detected() {
        let mut buffer = Vec::new();
        JournalWriter::new(&mut buffer).append(&demo_frame(0)).unwrap();
        buffer.truncate(buffer.len() - 3);

        let mut reader = JournalReader::new(buffer.as_slice());
        assert!(matches!(
            reader.next_frame().unwrap_err(),
            JournalError::Truncated
        ));
    }

    #[test]
    fn test_garbage_record_is_decode_error() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&4u32.to_be_bytes());
        buffer.extend_from_slice(&[0xc1, 0xc1, 0xc1, 0xc1]);

        let mut reader = JournalReader::new(buffer.as_slice());
        assert!(matches!(
            reader.next_frame().unwrap_err(),
            JournalError::Decode(_)
        ));
    }

    proptest! {
        #[test]
        fn prop_streaming_round_trip(ticks in proptest::collection::vec(any::<u64>(), 0..16)) {
            let frames: Vec<TickFrame> = ticks.into_iter().map(demo_frame).collect();

            let mut buffer = Vec::new();
            {
                let mut writer = JournalWriter::new(&mut buffer);
                for frame in &frames {
                    writer.append(frame).unwrap();
                }
            }

            let mut reader = JournalReader::new(buffer.as_slice());
            let log = reader.read_log().unwrap();
            prop_assert_eq!(log.frames(), frames.as_slice());
        }
    }
}
