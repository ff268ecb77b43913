use clap::Subcommand;

#[derive(Subcommand)]
pub enum MemoryCommands {
    /// Show the most recent conversation turns
    History {
        /// Number of turns to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Read a stored setting
    Get {
        /// Setting category (user_profile, preferences)
        category: String,
        key: String,
    },
    /// Store a setting, replacing any previous value
    Set {
        category: String,
        key: String,
        value: String,
    },
    /// Print the memory block injected into prompts
    Context,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Print the configuration file location
    Path,
}
