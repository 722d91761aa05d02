use std::path::PathBuf;

use clap::Parser;

/// Runs a script of editing commands against a sequence file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Sequence JSON file to edit
    #[arg(value_name = "SEQUENCE")]
    pub sequence: PathBuf,

    /// JSON array of commands to apply in order
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Editor settings JSON (defaults are used for missing fields)
    #[arg(short = 's', long = "settings", value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Media library JSON used by ImportMedia commands
    #[arg(short = 'm', long = "media", value_name = "FILE")]
    pub media: Option<PathBuf>,

    /// Where to write the edited sequence (stdout when omitted)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Fail when the sequence links to missing clips instead of dropping those links
    #[arg(long = "strict-links")]
    pub strict_links: bool,
}
