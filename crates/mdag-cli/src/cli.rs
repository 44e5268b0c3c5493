use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mdag",
    about = "MerkleDAG: content-addressed file and directory storage",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Object store directory
    #[arg(long, global = true, default_value = ".mdag")]
    pub store: PathBuf,

    /// TOML file with leaf_size, fan_out, verify_sizes, parallel
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a file or directory and print its root digest
    Add(AddArgs),
    /// Write a stored file to stdout
    Cat(DigestArgs),
    /// Restore a stored file or directory to a path
    Get(GetArgs),
    /// List the entries of a stored directory
    Ls(DigestArgs),
    /// Check every object reachable from a digest
    Verify(DigestArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct AddArgs {
    pub path: PathBuf,
}

#[derive(Args)]
pub struct DigestArgs {
    pub digest: String,
}

#[derive(Args)]
pub struct GetArgs {
    pub digest: String,
    pub out: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mdag", "add", "docs", "--store", "/tmp/objs", "--format", "json", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.store, PathBuf::from("/tmp/objs"));
        match cli.command {
            Command::Add(args) => assert_eq!(args.path, PathBuf::from("docs")),
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["mdag", "config"]).unwrap();
        assert_eq!(cli.store, PathBuf::from(".mdag"));
        assert!(cli.config.is_none());
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn get_requires_output_path() {
        assert!(Cli::try_parse_from(["mdag", "get", "abcd"]).is_err());
    }
}
