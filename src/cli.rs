use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use zimdb_assets::Profile;

#[derive(Debug, Parser)]
#[command(name = "zimdb", version, about = "Convert ZIM archives into SQLite article databases for offline reading")]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert a ZIM archive into an article database
    Convert(ConvertArgs),
    /// Sum a monthly page-view dump into a page-view database
    Pageviews(PageviewsArgs),
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// ZIM archive to read
    #[arg(long, value_name = "PATH", default_value = "wikipedia.zim")]
    pub archive: PathBuf,

    /// Article database to create
    #[arg(long, value_name = "PATH", default_value = "zim_articles.db")]
    pub output: PathBuf,

    /// Convert only the articles named in this file, one title per line
    #[arg(long, value_name = "FILE")]
    pub titles: Option<PathBuf>,

    /// Shards converted in parallel; 1 converts sequentially
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: Option<u16>,

    /// Embed referenced images in article bodies
    #[arg(long)]
    pub inline_images: bool,

    /// Recompress large images before embedding them (implies --inline-images)
    #[arg(
        long,
        value_name = "PROFILE",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "aggressive",
        value_parser = parse_profile,
    )]
    pub recompress: Option<Profile>,

    /// Embed referenced stylesheets in article bodies
    #[arg(long)]
    pub inline_stylesheets: bool,

    /// Replace the output database if it already exists
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Debug, Args)]
pub struct PageviewsArgs {
    /// Page-view dump, optionally compressed; `-` reads standard input
    #[arg(long, value_name = "PATH", default_value = "-")]
    pub input: PathBuf,

    /// Page-view database to create or add to
    #[arg(long, value_name = "PATH", default_value = "pageviews.db")]
    pub database: PathBuf,

    /// Drop lines with fewer monthly views
    #[arg(long, value_name = "N")]
    pub min_views: Option<u64>,

    /// Domain to keep, e.g. `en.wikipedia`; repeatable
    #[arg(long = "domain", value_name = "DOMAIN")]
    pub domains: Vec<String>,
}

fn parse_profile(value: &str) -> Result<Profile, String> {
    value.parse::<Profile>().map_err(|err| (*err).to_string())
}
