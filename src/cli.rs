use clap::{Args, Parser, Subcommand};

pub const DEFAULT_MAL_AUTH_URL: &str = "https://myanimelist.net/v1/oauth2";
pub const DEFAULT_MAL_API_URL: &str = "https://api.myanimelist.net/v2";
pub const DEFAULT_NOTION_API_URL: &str = "https://api.notion.com/v1";

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the MyAnimeList anime list into the local snapshot.
    Fetch(FetchArgs),
    /// Push the local snapshot into the Notion database.
    Sync(SyncArgs),
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Credential file (`KEY=value` lines). Refreshed tokens are written back here.
    #[arg(long, default_value = ".env")]
    pub env_file: String,

    /// Directory holding `MyAnimeList.json`.
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// MyAnimeList OAuth base URL (token endpoint is `<base>/token`).
    #[arg(long, default_value = DEFAULT_MAL_AUTH_URL)]
    pub mal_auth_url: String,

    /// MyAnimeList API base URL.
    #[arg(long, default_value = DEFAULT_MAL_API_URL)]
    pub mal_api_url: String,
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Credential file (`KEY=value` lines).
    #[arg(long, default_value = ".env")]
    pub env_file: String,

    /// Directory holding `MyAnimeList.json` (written by `fetch`).
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Notion API base URL.
    #[arg(long, default_value = DEFAULT_NOTION_API_URL)]
    pub notion_api_url: String,

    /// Maximum entries synced at once (default: all entries at once).
    #[arg(long)]
    pub concurrency: Option<usize>,
}
