//! File appender implementation

use crate::core::{Appender, Encoding, LoggedMessage, LoggerError, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

pub struct FileAppender {
    writer: Option<BufWriter<File>>,
    encoding: Encoding,
}

impl FileAppender {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            encoding: Encoding::Utf8,
        })
    }
}

impl Appender for FileAppender {
    fn name(&self) -> &str {
        "file"
    }

    fn write(&mut self, message: &LoggedMessage<'_>) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::other("file writer already closed"))?;

        match self.encoding {
            Encoding::Utf8 => writer.write_all(message.text.as_bytes())?,
            Encoding::Ascii => {
                for c in message.text.chars() {
                    let byte = if c.is_ascii() { c as u8 } else { b'?' };
                    writer.write_all(&[byte])?;
                }
            }
        }
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
    }
}

impl Drop for FileAppender {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
