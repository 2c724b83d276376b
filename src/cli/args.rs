//! Command-line argument parsing for the cure-sync CLI.

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Start, then print update events until Ctrl-C
    Watch,
    /// Sync one collection, or everything when no name is given
    Sync(Option<String>),
    /// List the project's languages
    Languages,
    /// Start once and print a summary (default)
    Run,
}

pub const USAGE: &str = "\
Usage: cure-sync [OPTIONS]

Options:
  --watch          start, then print content updates until Ctrl-C
  --sync [NAME]    sync one collection (or everything) and exit
  --languages      list available languages and exit
  -V, --version    print version
  -h, --help       print this help

Configuration is read from CURE_PROJECT_ID, CURE_API_KEY, CURE_PROJECT_SECRET,
CURE_SERVER_URL, CURE_SOCKET_URL, CURE_AUTO_REALTIME and CURE_DATA_DIR.";

/// Parse command-line arguments and return the appropriate command.
///
/// The first recognized flag wins.
///
/// # Examples
///
/// ```
/// use cure_sync::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["cure-sync".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    // Skip the program name
    let mut args = args.skip(1).peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => return CliCommand::Version,
            "--help" | "-h" => return CliCommand::Help,
            "--watch" => return CliCommand::Watch,
            "--languages" => return CliCommand::Languages,
            "--sync" => {
                let name = args.next_if(|next| !next.starts_with('-'));
                return CliCommand::Sync(name);
            }
            _ => {}
        }
    }
    CliCommand::Run
}
