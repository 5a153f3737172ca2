//! Console appender implementation

use crate::core::{Appender, Encoding, LogLevel, LoggedMessage, Result};
use colored::Colorize;

pub struct ConsoleAppender {
    use_colors: bool,
    encoding: Encoding,
}

impl ConsoleAppender {
    pub fn new() -> Self {
        Self {
            use_colors: true,
            encoding: Encoding::Utf8,
        }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self {
            use_colors,
            ..Self::new()
        }
    }
}

impl Default for ConsoleAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl Appender for ConsoleAppender {
    fn name(&self) -> &str {
        "console"
    }

    fn write(&mut self, message: &LoggedMessage<'_>) -> Result<()> {
        let text: std::borrow::Cow<'_, str> = match self.encoding {
            Encoding::Utf8 => message.text.into(),
            Encoding::Ascii => message
                .text
                .chars()
                .map(|c| if c.is_ascii() { c } else { '?' })
                .collect::<String>()
                .into(),
        };
        let output = if self.use_colors {
            text.color(message.level.color_code()).to_string()
        } else {
            text.into_owned()
        };

        // Route Error and Fatal levels to stderr, others to stdout.
        match message.level {
            LogLevel::Error | LogLevel::Fatal => eprintln!("{}", output),
            _ => println!("{}", output),
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        use std::io::Write;
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
    }
}
