//! Coordinator wire format: fixed-width length prefix, fixed-width command header.

use std::io::{Read, Write};

use super::ReportError;

/// Width of the length prefix and of the command header.
pub const DEFAULT_HEADER_SIZE: usize = 32;

pub const STOP_QUEUE: &str = "STOP_QUEUE";
pub const POST_FILENAME_QUEUE: &str = "POST_FILENAME_QUEUE";

/// Commands this side sends to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueMessage {
    /// Feed exhausted; carries the final downloaded count.
    Stop { final_count: usize },
    /// Newly materialized files, in batch order.
    PostFilenames { ordered_paths: Vec<String> },
}

impl QueueMessage {
    pub fn command(&self) -> &'static str {
        match self {
            QueueMessage::Stop { .. } => STOP_QUEUE,
            QueueMessage::PostFilenames { .. } => POST_FILENAME_QUEUE,
        }
    }

    /// Payloads in send order (each is framed separately on the wire).
    pub fn encode(&self, header_size: usize) -> Result<Vec<Vec<u8>>, ReportError> {
        let header = command_header(self.command(), header_size)?;
        match self {
            QueueMessage::Stop { final_count } => {
                Ok(vec![format!("{}{}", header, final_count).into_bytes()])
            }
            QueueMessage::PostFilenames { ordered_paths } => {
                Ok(vec![header.into_bytes(), encode_filenames(ordered_paths)?])
            }
        }
    }
}

fn pad(value: &str, header_size: usize) -> Result<String, ReportError> {
    if value.len() > header_size {
        return Err(ReportError::HeaderTooSmall {
            value: value.to_string(),
            header_size,
        });
    }
    Ok(format!("{:<width$}", value, width = header_size))
}

/// Command name left-justified and space-padded to `header_size`.
pub fn command_header(command: &str, header_size: usize) -> Result<String, ReportError> {
    pad(command, header_size)
}

pub fn encode_filenames(paths: &[String]) -> Result<Vec<u8>, ReportError> {
    Ok(postcard::to_stdvec(paths)?)
}

pub fn decode_filenames(payload: &[u8]) -> Result<Vec<String>, ReportError> {
    Ok(postcard::from_bytes(payload)?)
}

/// Write one length-prefixed frame.
pub fn write_frame<W: Write>(w: &mut W, payload: &[u8], header_size: usize) -> Result<(), ReportError> {
    let prefix = pad(&payload.len().to_string(), header_size)?;
    w.write_all(prefix.as_bytes())?;
    w.write_all(payload)?;
    Ok(())
}

/// Read one length-prefixed frame.
pub fn read_frame<R: Read>(r: &mut R, header_size: usize) -> Result<Vec<u8>, ReportError> {
    let mut prefix = vec![0u8; header_size];
    r.read_exact(&mut prefix)?;
    let text = std::str::from_utf8(&prefix)
        .map_err(|_| ReportError::Protocol("length prefix is not UTF-8".into()))?;
    let len: usize = text
        .trim()
        .parse()
        .map_err(|_| ReportError::Protocol(format!("bad length prefix {:?}", text.trim())))?;
    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload)?;
    Ok(payload)
}

/// Read one complete command (one or two frames) from a coordinator stream.
pub fn read_message<R: Read>(r: &mut R, header_size: usize) -> Result<QueueMessage, ReportError> {
    let first = read_frame(r, header_size)?;
    if first.len() < header_size {
        return Err(ReportError::Protocol("command frame shorter than header".into()));
    }
    let (head, rest) = first.split_at(header_size);
    let command = std::str::from_utf8(head)
        .map_err(|_| ReportError::Protocol("command header is not UTF-8".into()))?
        .trim_end();
    match command {
        STOP_QUEUE => {
            let count = std::str::from_utf8(rest)
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .ok_or_else(|| ReportError::Protocol("STOP_QUEUE without a count".into()))?;
            Ok(QueueMessage::Stop { final_count: count })
        }
        POST_FILENAME_QUEUE => {
            let payload = read_frame(r, header_size)?;
            Ok(QueueMessage::PostFilenames {
                ordered_paths: decode_filenames(&payload)?,
            })
        }
        other => Err(ReportError::Protocol(format!("unknown command {:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn command_header_is_padded() {
        let h = command_header(STOP_QUEUE, 32).unwrap();
        assert_eq!(h.len(), 32);
        assert!(h.starts_with("STOP_QUEUE "));
        assert_eq!(h.trim_end(), STOP_QUEUE);
    }

    #[test]
    fn header_too_small_is_error() {
        let err = command_header(POST_FILENAME_QUEUE, 10).unwrap_err();
        assert!(matches!(err, ReportError::HeaderTooSmall { header_size: 10, .. }));
    }

    #[test]
    fn stop_frame_layout() {
        let payloads = QueueMessage::Stop { final_count: 10 }.encode(20).unwrap();
        assert_eq!(payloads.len(), 1);
        let mut wire = Vec::new();
        write_frame(&mut wire, &payloads[0], 20).unwrap();
        let text = String::from_utf8(wire).unwrap();
        assert_eq!(&text[..20], format!("{:<20}", 22));
        assert_eq!(&text[20..], format!("{:<20}10", "STOP_QUEUE"));
    }

    #[test]
    fn post_filenames_decodes_in_order() {
        let paths = vec!["out/0003.ts".to_string(), "out/0001.ts".to_string()];
        let msg = QueueMessage::PostFilenames { ordered_paths: paths.clone() };
        let mut wire = Vec::new();
        for p in msg.encode(32).unwrap() {
            write_frame(&mut wire, &p, 32).unwrap();
        }
        let decoded = read_message(&mut Cursor::new(wire), 32).unwrap();
        assert_eq!(decoded, QueueMessage::PostFilenames { ordered_paths: paths });
    }

    #[test]
    fn empty_filename_list_is_valid() {
        let bytes = encode_filenames(&[]).unwrap();
        assert!(decode_filenames(&bytes).unwrap().is_empty());
    }

    #[test]
    fn unknown_command_rejected() {
        let mut wire = Vec::new();
        write_frame(&mut wire, format!("{:<32}", "NOPE").as_bytes(), 32).unwrap();
        assert!(matches!(
            read_message(&mut Cursor::new(wire), 32),
            Err(ReportError::Protocol(_))
        ));
    }
}
