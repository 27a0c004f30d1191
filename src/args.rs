use clap::{Parser, Subcommand};
use search_intent::pipeline::search::search::{DEFAULT_RESULT_COUNT, MAX_RESULT_COUNT, MIN_RESULT_COUNT};

#[derive(Parser, Debug)]
#[command(name = "search-intent")]
#[command(about = "Infers searcher intent from the top results for a keyword")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web UI (default)
    Serve {
        /// Address to bind (overrides HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run the pipeline once and print the report
    Analyze {
        /// Search keyword
        keyword: String,

        /// Number of top results to analyze
        #[arg(
            short,
            default_value_t = DEFAULT_RESULT_COUNT,
            value_parser = clap::value_parser!(u32).range(MIN_RESULT_COUNT as i64..=MAX_RESULT_COUNT as i64)
        )]
        k: u32,

        /// Also summarize all analyses into one combined summary
        #[arg(long)]
        summarize: bool,
    },
}
