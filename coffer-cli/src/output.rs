use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use std::io::Write;

/// Structured output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Write `value` to `out` in the chosen format, newline terminated.
pub fn write_value<T, W>(out: &mut W, format: OutputFormat, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    W: Write,
{
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out)?;
        }
        OutputFormat::Yaml => {
            let text = serde_yaml::to_string(value)?;
            out.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                writeln!(out)?;
            }
        }
    }
    Ok(())
}

/// Print `value` to stdout.
pub fn print_value<T: Serialize + ?Sized>(format: OutputFormat, value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    write_value(&mut lock, format, value)
}
