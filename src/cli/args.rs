use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "qaza", version, author, about = "Log daily prayers and pay down your qaza backlog")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mark a prayer as prayed on time, or as missed
    Mark {
        /// Prayer name (fajr, dhuhr, asr, maghrib, isha)
        prayer: String,
        /// Mark as missed instead of completed
        #[arg(long)]
        missed: bool,
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Record why a missed prayer was missed
    Reason {
        /// Prayer name
        prayer: String,
        /// sleep, work, travel, health, forgot, voice, other
        reason: String,
        /// Free text, only for reason "other"
        #[arg(long)]
        text: Option<String>,
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Voice notes attached to missed prayers
    Voice {
        #[command(subcommand)]
        action: VoiceCommands,
    },
    /// Show one day's prayers
    Day {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Qaza backlog management
    Qaza {
        #[command(subcommand)]
        action: QazaCommands,
    },
    /// Monthly summary and calendar
    Month {
        /// Month (YYYY-MM), defaults to the current month
        #[arg(long)]
        month: Option<String>,
        /// Months to move from the selected month, negative to go back
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        offset: i32,
    },
    /// Show statistics
    Stats {
        /// Show the activity strip for the trailing days
        #[arg(long)]
        week: bool,
    },
    /// Set how many Ada prayers to aim for each day
    Goal {
        /// Prayers per day (1-5)
        count: u8,
    },
    /// Print a JSON snapshot of the log and ledger to stdout
    Export,
    /// Replace the log and ledger with a JSON snapshot
    Import {
        /// Path to a snapshot produced by `export`
        file: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum VoiceCommands {
    /// Attach a recorded audio file to a missed prayer
    Attach {
        /// Prayer name
        prayer: String,
        /// Audio file to import
        file: String,
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Detach and delete the voice note of a prayer
    Remove {
        /// Prayer name
        prayer: String,
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// List stored voice notes
    List,
    /// Delete stored notes no prayer refers to any more
    Prune,
}

#[derive(Subcommand, Debug)]
pub enum QazaCommands {
    /// Show the backlog per prayer
    List,
    /// Add prayers to the backlog
    Add {
        /// Prayer name
        prayer: String,
        /// How many to add
        #[arg(long, default_value = "1")]
        count: i64,
    },
    /// Record qaza prayers made up today
    Pay {
        /// Prayer name
        prayer: String,
        /// How many were prayed
        #[arg(long, default_value = "1")]
        count: i64,
    },
}
