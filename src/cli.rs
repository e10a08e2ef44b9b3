use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None, arg_required_else_help(true))]
pub struct Cli {
    /// more output; repeat for trace logging
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// render a preview card
    Render {
        /// canvas size in pixels, as WIDTHxHEIGHT
        #[arg(short, long, value_parser = parse_size, default_value = "1200x630")]
        size: [u32; 2],
        /// background image
        #[arg(short, long, value_name = "FILE")]
        image: PathBuf,
        #[arg(short, long)]
        title: String,
        #[arg(long, default_value = "")]
        subtitle: String,
        /// where to write the card; the extension picks the format
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
        /// JSON layout config overriding the defaults
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// write schema files
    Schema {
        /// folder to write schemas into (will be created if it doesn't already exist)
        #[arg(short, long, value_name = "FILE", default_value = "./schemas/")]
        out_dir: PathBuf,
    },
}

pub fn parse_size(s: &str) -> Result<[u32; 2], String> {
    let (width, height) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("{v:?} is not a positive integer"))
    };
    Ok([parse(width)?, parse(height)?])
}
