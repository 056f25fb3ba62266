//! Command-line surface and interactive folder selection.

use crate::error::InputError;
use crate::graph::Folder;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "driveup",
    version,
    about = "Upload local files to OneDrive via the Microsoft Graph API"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and list the folders at the drive root.
    Folders {
        /// Do not open the verification page in a browser.
        #[arg(long)]
        no_browser: bool,
    },

    /// Upload one or more local files into a OneDrive folder.
    Upload {
        /// Files to upload, sent in the order given.
        files: Vec<PathBuf>,

        /// Destination folder at the drive root. Prompted for
        /// interactively when omitted.
        #[arg(long, short)]
        folder: Option<String>,

        /// Authenticate app-only with CLIENT_SECRET instead of the
        /// interactive device-code sign-in. Requires --folder.
        #[arg(long)]
        app_only: bool,

        /// Do not open the verification page in a browser.
        #[arg(long)]
        no_browser: bool,
    },

    /// Sign in and print the signed-in identity.
    Whoami {
        /// Do not open the verification page in a browser.
        #[arg(long)]
        no_browser: bool,
    },
}

/// Present a numbered folder list on stdout and read a selection from
/// stdin. Loops until the input parses; EOF is a missing selection.
pub fn prompt_folder_selection(folders: &[Folder]) -> Result<String, InputError> {
    if folders.is_empty() {
        return Err(InputError::NoFolder);
    }

    println!("Folders at the drive root:");
    for (index, folder) in folders.iter().enumerate() {
        println!("  {}. {}", index + 1, folder.display_text());
    }

    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("Upload to folder [1-{}]: ", folders.len());
        io::stdout().flush().ok();

        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => return Err(InputError::NoFolder),
            Ok(_) => {}
        }

        if let Some(index) = parse_selection(&line, folders.len()) {
            return Ok(folders[index].name.clone());
        }

        println!("Enter a number between 1 and {}.", folders.len());
    }
}

/// Parse a 1-based selection into a 0-based index.
fn parse_selection(input: &str, len: usize) -> Option<usize> {
    let choice: usize = input.trim().parse().ok()?;
    (1..=len).contains(&choice).then(|| choice - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_upload_args() {
        let cli = Cli::parse_from([
            "driveup", "upload", "a.txt", "b.txt", "--folder", "Docs", "--app-only",
        ]);

        match cli.command {
            Command::Upload {
                files,
                folder,
                app_only,
                no_browser,
            } => {
                assert_eq!(files, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
                assert_eq!(folder.as_deref(), Some("Docs"));
                assert!(app_only);
                assert!(!no_browser);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("1\n", 3), Some(0));
        assert_eq!(parse_selection(" 3 ", 3), Some(2));
        assert_eq!(parse_selection("0", 3), None);
        assert_eq!(parse_selection("4", 3), None);
        assert_eq!(parse_selection("two", 3), None);
        assert_eq!(parse_selection("", 3), None);
    }
}
