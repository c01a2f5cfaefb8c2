/*!
 Reads the input file and drives an exporter over its decoded groups.
*/

use std::{
    fs,
    io::{stdout, BufWriter, Write},
};

use tracing::Level;
use typedstream_archive::archiver::unarchiver::Unarchiver;

use crate::{
    app::{
        error::RuntimeError,
        options::{ExportType, Options},
    },
    Exporter, NDJSON, TXT,
};

/// Stores the application state
#[derive(Debug)]
pub struct Config {
    /// App configuration options
    pub options: Options,
    /// The raw bytes of the input file
    pub bytes: Vec<u8>,
}

impl Config {
    /// Create a new instance of the application, reading the input file
    pub fn new(options: Options) -> Result<Self, RuntimeError> {
        let bytes = fs::read(&options.path)
            .map_err(|why| RuntimeError::ReadError(why, options.path.clone()))?;
        tracing::debug!(path = %options.path.display(), bytes = bytes.len(), "read input file");
        Ok(Config { options, bytes })
    }

    /// Decode the input and write it to stdout in the selected format
    pub fn start(&self) -> Result<(), RuntimeError> {
        let writer = BufWriter::new(stdout().lock());
        match self.options.export_type {
            ExportType::Txt => self.run(TXT::new(writer)),
            ExportType::NDJSON => self.run(NDJSON::new(writer)),
        }
    }

    fn run<W: Write, E: Exporter<W>>(&self, mut exporter: E) -> Result<(), RuntimeError> {
        let result = self.export(&mut exporter);
        exporter.into_inner()?;
        result
    }

    /// Write every group that decodes, then report the first decoding failure
    ///
    /// Groups read before a failure are still written.
    pub fn export<W: Write, E: Exporter<W>>(&self, exporter: &mut E) -> Result<(), RuntimeError> {
        let mut written = 0;
        for group in Unarchiver::from_bytes(&self.bytes) {
            match group {
                Ok(group) => {
                    exporter.write_group(written, &group)?;
                    written += 1;
                }
                Err(why) => {
                    tracing::warn!(written, "stopped decoding: {why}");
                    return Err(RuntimeError::DecodeError(why));
                }
            }
        }
        tracing::debug!(written, "finished decoding");
        Ok(())
    }
}

/// Send logs to stderr, with more detail for each `-v`
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}
