#![forbid(unsafe_code)]
/*!
 Command line tool to decode `typedstream` archives and print their contents as text or NDJSON.
*/

mod app;
mod exporters;

pub use app::{
    error::RuntimeError,
    options::{from_command_line, ExportType, Options},
    runtime::Config,
};
pub use exporters::{exporter::Exporter, ndjson::NDJSON, txt::TXT};

use std::process::ExitCode;

fn main() -> ExitCode {
    // Get exporter command line args
    let args = from_command_line();
    let options = match Options::from_args(&args) {
        Ok(options) => options,
        Err(why) => {
            eprintln!("{why}");
            return ExitCode::FAILURE;
        }
    };

    app::runtime::init_logging(options.verbosity);

    match Config::new(options) {
        Ok(app) => match app.start() {
            Ok(()) => ExitCode::SUCCESS,
            Err(why) => {
                eprintln!("Unable to decode: {why}");
                ExitCode::FAILURE
            }
        },
        Err(why) => {
            eprintln!("Unable to launch: {why}");
            ExitCode::FAILURE
        }
    }
}
