/*!
 Command line options and their validation.
*/

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
};

use clap::{crate_version, Arg, ArgAction, ArgMatches, Command};

use crate::app::error::RuntimeError;

/// Option to set the input file
pub const OPTION_PATH: &str = "path";
/// Option to set the output format
pub const OPTION_FORMAT: &str = "format";
/// Option to increase log detail
pub const OPTION_VERBOSE: &str = "verbose";

/// The formats the decoded data can be written in
pub const SUPPORTED_FILE_TYPES: &str = "txt, ndjson";

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportType {
    /// An indented tree of values
    #[default]
    Txt,
    /// One JSON document per top-level group
    NDJSON,
}

impl ExportType {
    /// Given user's input, return a variant if the input matches one
    pub fn from_cli(export_type: &str) -> Option<Self> {
        match export_type.to_lowercase().as_str() {
            "txt" => Some(Self::Txt),
            "ndjson" => Some(Self::NDJSON),
            _ => None,
        }
    }
}

impl Display for ExportType {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            ExportType::Txt => write!(fmt, "txt"),
            ExportType::NDJSON => write!(fmt, "ndjson"),
        }
    }
}

/// Represents the user's selected options
#[derive(Debug, PartialEq, Eq)]
pub struct Options {
    /// Path to the file to decode
    pub path: PathBuf,
    /// The format to write decoded data in
    pub export_type: ExportType,
    /// How much detail to log: 0 for warnings, 1 for debug, 2 or more for trace
    pub verbosity: u8,
}

impl Options {
    pub fn from_args(args: &ArgMatches) -> Result<Self, RuntimeError> {
        let path = args.get_one::<String>(OPTION_PATH);
        let format = args.get_one::<String>(OPTION_FORMAT);
        let verbosity = args.get_count(OPTION_VERBOSE);

        // clap marks the path as required, but build the error ourselves in case that changes
        let path = match path {
            Some(path) => PathBuf::from(path),
            None => {
                return Err(RuntimeError::InvalidOptions(
                    "No input file provided".to_string(),
                ))
            }
        };

        let export_type = match format {
            Some(format) => ExportType::from_cli(format).ok_or_else(|| {
                RuntimeError::InvalidOptions(format!(
                    "{format} is not a valid export type! Must be one of <{SUPPORTED_FILE_TYPES}>"
                ))
            })?,
            None => ExportType::default(),
        };

        Ok(Options {
            path,
            export_type,
            verbosity,
        })
    }
}

/// Build the command line argument parser
fn get_command() -> Command {
    Command::new("typedstream-dump")
        .version(crate_version!())
        .about(concat!(
            "typedstream-dump v",
            crate_version!(),
            "\n",
            "Decode NeXT and Apple typedstream archives and print their contents"
        ))
        .arg_required_else_help(true)
        .arg(
            Arg::new(OPTION_PATH)
                .help("Path to a file containing typedstream data")
                .required(true)
                .value_name("path")
                .display_order(0),
        )
        .arg(
            Arg::new(OPTION_FORMAT)
                .short('f')
                .long(OPTION_FORMAT)
                .help("Specify the output format, defaulting to txt")
                .value_name(SUPPORTED_FILE_TYPES)
                .display_order(1),
        )
        .arg(
            Arg::new(OPTION_VERBOSE)
                .short('v')
                .long(OPTION_VERBOSE)
                .help("Log decoding details to stderr, repeat for more detail")
                .action(ArgAction::Count)
                .display_order(2),
        )
}

/// Parse arguments from the command line
pub fn from_command_line() -> ArgMatches {
    get_command().get_matches()
}
