use clap::Subcommand;
use studydesk_core::SessionLog;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's totals
    Today,
    /// All-time totals
    All,
    /// Most recent sessions
    Recent {
        #[arg(long, default_value = "10")]
        limit: u32,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let log = SessionLog::open()?;
    match action {
        StatsAction::Today => {
            println!("{}", serde_json::to_string_pretty(&log.stats_today()?)?);
        }
        StatsAction::All => {
            println!("{}", serde_json::to_string_pretty(&log.stats_all()?)?);
        }
        StatsAction::Recent { limit } => {
            println!("{}", serde_json::to_string_pretty(&log.recent(limit)?)?);
        }
    }
    Ok(())
}
