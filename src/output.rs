use std::io::{self, Write};

use serde::Serialize;

use crate::app::{AnswerResult, CompileResult, DownloadResult, IntegrateResult};

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_compile(result: &CompileResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_answer(result: &AnswerResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_integrate(result: &IntegrateResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_download(result: &DownloadResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl crate::app::ProgressSink for JsonOutput {
    fn event(&self, event: crate::app::ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message),
            None => tracing::debug!("{}", event.message),
        }
    }
}
