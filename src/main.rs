//! `trova` CLI - resolve playable links from the AnimeUnity and Vavoo catalogs
//!
//! Result payloads (JSON or a bare URL) go to stdout; everything
//! diagnostic goes to stderr. Exit codes: 0 success, 2 channel not found,
//! 3 channel found but has no URL, 4 resolution failed, 5 unexpected error.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use trova::cache::{self, LinkCache};
use trova::matcher;
use trova::providers::{vavoo, AnimeUnity, Vavoo};
use trova::Domains;

const EXIT_NOT_FOUND: u8 = 2;
const EXIT_NO_URL: u8 = 3;
const EXIT_RESOLVE_FAIL: u8 = 4;
const EXIT_UNEXPECTED: u8 = 5;

#[derive(Parser)]
#[command(name = "trova")]
#[command(about = "Resolve playable video links from the AnimeUnity and Vavoo catalogs")]
#[command(version)]
struct Cli {
    /// Path to the domain config (logical source name -> current domain)
    #[arg(long, global = true, default_value = "config/domains.json")]
    config: PathBuf,

    /// Enable debug diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the anime catalog
    Search {
        /// Title to search for
        query: String,

        /// Search the dubbed archive
        #[arg(long)]
        dubbed: bool,
    },

    /// List all episodes of an anime
    Episodes {
        /// Catalog ID of the anime
        anime_id: u64,
    },

    /// Resolve an episode to its embed and direct MP4 URLs
    Stream {
        /// Catalog ID of the anime
        anime_id: u64,
        /// URL slug of the anime
        slug: String,
        /// Episode ID
        episode_id: u64,
    },

    /// Resolve a channel name (or a direct play link) to a stream URL
    Channel {
        /// Channel name, or a vavoo.to/play/ link to resolve directly
        name: String,

        /// Print the catalog link instead of resolving it
        #[arg(long)]
        original_link: bool,

        /// Region group to crawl
        #[arg(long, default_value = vavoo::DEFAULT_GROUP)]
        group: String,
    },

    /// Dump the raw channel catalog with derived aliases
    Channels {
        /// Region group to crawl
        #[arg(long, default_value = vavoo::DEFAULT_GROUP)]
        group: String,
    },

    /// Crawl the channel catalog and persist the name->URL cache
    BuildCache {
        /// Cache file destination
        #[arg(long)]
        output: Option<PathBuf>,

        /// Region group to crawl
        #[arg(long, default_value = vavoo::DEFAULT_GROUP)]
        group: String,
    },

    /// Print a previously built cache verbatim
    ShowCache {
        /// Cache file location
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "trova=debug" } else { "trova=warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_UNEXPECTED)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Search { query, dubbed } => {
            let site = animeunity(&cli.config)?;
            let results = site.search_with_fallback(&query, dubbed).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Episodes { anime_id } => {
            let site = animeunity(&cli.config)?;
            let episodes = site.episodes(anime_id).await?;
            println!("{}", serde_json::to_string_pretty(&episodes)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Stream {
            anime_id,
            slug,
            episode_id,
        } => {
            let site = animeunity(&cli.config)?;
            let stream = site.stream(anime_id, &slug, episode_id).await?;
            println!("{}", serde_json::to_string_pretty(&stream)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Channel {
            name,
            original_link,
            group,
        } => cmd_channel(&cli.config, &name, original_link, &group).await,
        Commands::Channels { group } => {
            let tv = vavoo_client(&cli.config)?;
            let channels = vavoo::with_aliases(tv.channels(&group).await?);
            println!("{}", serde_json::to_string(&channels)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::BuildCache { output, group } => {
            let tv = vavoo_client(&cli.config)?;
            let channels = tv.channels(&group).await?;
            let cache = LinkCache::build(&channels);
            let path = output.unwrap_or_else(cache::default_cache_path);
            cache.save(&path)?;
            println!("cache written to {} ({} channels)", path.display(), cache.len());
            Ok(ExitCode::SUCCESS)
        }
        Commands::ShowCache { file } => {
            let path = file.unwrap_or_else(cache::default_cache_path);
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read cache at {}", path.display()))?;
            println!("{raw}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Channel resolution: direct play links skip the catalog entirely; names
/// go through a fresh crawl and the three-tier matcher. Negative outcomes
/// are reported on stderr with their dedicated exit codes, never as errors.
async fn cmd_channel(
    config: &Path,
    name: &str,
    original_link: bool,
    group: &str,
) -> Result<ExitCode> {
    let tv = vavoo_client(config)?;

    if name.contains("vavoo.to") && name.contains("/play/") {
        eprintln!("direct play link detected");
        return match tv.resolve(name).await? {
            Some(url) => {
                println!("{url}");
                Ok(ExitCode::SUCCESS)
            }
            None => {
                eprintln!("RESOLVE_FAIL");
                Ok(ExitCode::from(EXIT_RESOLVE_FAIL))
            }
        };
    }

    let channels = tv.channels(group).await?;
    eprintln!("searching {} channels for '{name}'", channels.len());

    let Some((channel, tier)) = matcher::find_channel(name, &channels) else {
        eprintln!("NOT_FOUND");
        return Ok(ExitCode::from(EXIT_NOT_FOUND));
    };
    eprintln!("matched '{}' ({tier:?} tier)", channel.name);

    if channel.url.is_empty() {
        eprintln!("NO_URL");
        return Ok(ExitCode::from(EXIT_NO_URL));
    }

    if original_link {
        println!("{}", channel.url);
        return Ok(ExitCode::SUCCESS);
    }

    match tv.resolve(&channel.url).await? {
        Some(url) => {
            println!("{url}");
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("RESOLVE_FAIL");
            Ok(ExitCode::from(EXIT_RESOLVE_FAIL))
        }
    }
}

fn animeunity(config: &Path) -> Result<AnimeUnity> {
    let domains = Domains::load(config)?;
    Ok(AnimeUnity::new(domains.get("animeunity")?)?)
}

fn vavoo_client(config: &Path) -> Result<Vavoo> {
    let domains = Domains::load(config)?;
    Ok(Vavoo::new(domains.get("vavoo")?)?)
}
