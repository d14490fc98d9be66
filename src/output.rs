use std::io::{self, Write};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Pretty,
    Compact,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print<T: Serialize>(value: &T, mode: OutputMode) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        Self::write(&mut stdout, value, mode)
    }

    pub fn write<W: Write, T: Serialize>(
        writer: &mut W,
        value: &T,
        mode: OutputMode,
    ) -> io::Result<()> {
        let json = match mode {
            OutputMode::Pretty => serde_json::to_string_pretty(value),
            OutputMode::Compact => serde_json::to_string(value),
        }
        .map_err(io::Error::other)?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}
