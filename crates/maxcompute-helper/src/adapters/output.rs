use std::io::{BufWriter, Write};

use serde::Serialize;

use crate::error::{AppError, AppResult};

/// One JSON document per line.
pub struct NdjsonWriter<W: Write> {
    out: BufWriter<W>,
}

impl NdjsonWriter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> NdjsonWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: BufWriter::new(out),
        }
    }

    pub fn write_json_line<T: Serialize>(&mut self, v: &T) -> AppResult<()> {
        serde_json::to_writer(&mut self.out, v)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }

    pub fn write_all_lines<T: Serialize>(&mut self, items: &[T]) -> AppResult<()> {
        for item in items {
            self.write_json_line(item)?;
        }
        Ok(())
    }

    pub fn error_line(&mut self, err: &AppError) -> AppResult<()> {
        #[derive(Serialize)]
        struct ErrLine<'a> {
            status: &'static str,
            code: &'a str,
            error: String,
        }
        self.write_json_line(&ErrLine {
            status: "error",
            code: err.code(),
            error: err.to_string(),
        })
    }

    pub fn into_inner(self) -> AppResult<W> {
        self.out
            .into_inner()
            .map_err(|e| AppError::Io(e.into_error()))
    }
}
