//! Prefix pattern expansion
//!
//! A pattern like `"%date %time %level %logger - "` is parsed once into a
//! chunk sequence and evaluated per record into the worker's scratch buffer.
//! Tokens are case-insensitive and accept an optional bracket form
//! (`%{date}`); anything unrecognized is emitted verbatim, `%` included.

use super::buffer::LogMessage;
use super::decode::{write_date, write_time};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Chunk {
    Literal(String),
    Date,
    Time,
    Level,
    Logger,
    Thread,
}

fn token_chunk(name: &str) -> Option<Chunk> {
    match name.to_ascii_lowercase().as_str() {
        "date" => Some(Chunk::Date),
        "time" => Some(Chunk::Time),
        "level" => Some(Chunk::Level),
        "logger" => Some(Chunk::Logger),
        "thread" => Some(Chunk::Thread),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct PatternLayout {
    chunks: Vec<Chunk>,
}

impl PatternLayout {
    pub fn parse(pattern: &str) -> Self {
        let mut chunks = Vec::new();
        let mut literal = String::new();
        let mut rest = pattern;

        while let Some(percent) = rest.find('%') {
            literal.push_str(&rest[..percent]);
            rest = &rest[percent + 1..];

            let (token, verbatim, consumed) = if let Some(stripped) = rest.strip_prefix('{') {
                match stripped.find('}') {
                    Some(end) => {
                        let name = &stripped[..end];
                        (token_chunk(name), format!("%{{{}}}", name), end + 2)
                    }
                    None => (None, format!("%{{{}}}", stripped), rest.len()),
                }
            } else {
                let end = rest
                    .find(|c: char| !c.is_ascii_alphabetic())
                    .unwrap_or(rest.len());
                let name = &rest[..end];
                (token_chunk(name), format!("%{}", name), end)
            };

            match token {
                Some(chunk) => {
                    if !literal.is_empty() {
                        chunks.push(Chunk::Literal(std::mem::take(&mut literal)));
                    }
                    chunks.push(chunk);
                }
                None => literal.push_str(&verbatim),
            }
            rest = &rest[consumed..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            chunks.push(Chunk::Literal(literal));
        }

        Self { chunks }
    }

    /// Expand the pattern for one record. Returns chars written.
    pub fn write_prefix(&self, out: &mut String, message: &LogMessage) -> usize {
        let start = out.len();
        for chunk in &self.chunks {
            match chunk {
                Chunk::Literal(text) => out.push_str(text),
                Chunk::Date => write_date(out, message.timestamp().date_naive()),
                Chunk::Time => write_time(out, message.timestamp().time()),
                Chunk::Level => out.push_str(message.level().to_str()),
                Chunk::Logger => out.push_str(message.logger_name()),
                Chunk::Thread => match message.thread_name() {
                    Some(name) => out.push_str(name),
                    None => {
                        let _ = write!(out, "{}", message.thread_id());
                    }
                },
            }
        }
        out[start..].chars().count()
    }
}
