use std::path::PathBuf;

use clap::Parser;

/// Colloquy: chat with a streaming model from the terminal.
#[derive(Parser, Debug)]
#[command(name = "colloquy", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Model requested for every turn.
    #[arg(short, long, default_value = "demo-code")]
    pub model: String,

    /// Resume a stored session instead of starting a new one.
    #[arg(short, long)]
    pub session: Option<String>,

    /// Keep history in memory only.
    #[arg(long)]
    pub ephemeral: bool,

    /// Delay between streamed words, in milliseconds.
    #[arg(long, default_value_t = 40)]
    pub word_delay_ms: u64,
}

pub fn parse() -> Args {
    Args::parse()
}
