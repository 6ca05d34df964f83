use clap::{Parser, Subcommand, builder::styling};
use data_platform::{
    api,
    cli::{self, EtlOptions},
    etl::runner::{DEFAULT_OUTPUT, DEFAULT_SOURCE},
    logging,
    settings::Settings,
};
use eyre::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// Data Platform: CSV to Parquet ETL, data quality checks, ad-hoc SQL and cloud connectors
#[derive(Parser)]
#[command(name = "dataplat", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source settings and credentials from
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter adults from a raw CSV file into a processed Parquet file
    Etl {
        /// CSV file name inside the raw directory
        #[arg(short, long, default_value = DEFAULT_SOURCE)]
        source: String,

        /// Parquet file name inside the processed directory
        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: String,

        /// Download the source CSV from this S3 key instead
        #[arg(long, conflicts_with = "source")]
        s3_key: Option<String>,

        /// Also load the output into this Snowflake table
        #[arg(long)]
        snowflake_table: Option<String>,
    },

    /// Count rows failing each data quality rule in the raw input.csv
    Dq,

    /// Run a SQL query over the raw CSV and processed Parquet files
    Analytics {
        /// The SQL statement to run
        sql: String,
    },

    /// Download an object from the configured S3 bucket
    S3Download {
        /// Object key to download
        key: String,

        /// Directory to save the file to (defaults to the raw directory)
        #[arg(short, long)]
        dest: Option<PathBuf>,
    },

    /// Stage and copy a Parquet file into a Snowflake table
    SnowflakeLoad {
        /// Parquet file (relative paths resolve in the processed directory)
        file: PathBuf,

        /// Target table: TABLE, SCHEMA.TABLE or DATABASE.SCHEMA.TABLE
        table: String,
    },

    /// Serve the upload validation API
    Serve {
        /// Address to bind (defaults to API_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (defaults to API_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match dotenvy::from_filename(&cli.env) {
        Ok(_) => {}
        Err(e) if e.not_found() => {}
        Err(e) => return Err(e.into()),
    }

    let mut settings = Settings::from_env()?;
    logging::init(&settings, cli.debug)?;
    log::info!("{} ({})", settings.app_name, settings.environment);

    let result = dispatch(cli.command, &mut settings).await;
    if let Err(e) = &result {
        log::error!("{:#}", e);
    }
    logging::shutdown();
    result
}

async fn dispatch(command: Commands, settings: &mut Settings) -> Result<()> {
    match command {
        Commands::Etl {
            source,
            output,
            s3_key,
            snowflake_table,
        } => {
            let options = EtlOptions {
                source,
                output,
                s3_key,
                snowflake_table,
            };
            let path = cli::etl(settings, &options).await?;
            log::info!("✓ ETL completed: {}", path.display().bright_black());
            if let Some(table) = &options.snowflake_table {
                log::info!("✓ Loaded into Snowflake table {}", table.cyan());
            }
        }
        Commands::Dq => match cli::data_quality(settings)? {
            Some(report) => {
                println!("{}", report);
                log::info!("✓ Data quality checks completed on {} row(s)", report.rows);
            }
            None => log::warn!("Data quality checks skipped, no input file"),
        },
        Commands::Analytics { sql } => {
            let table = cli::analytics(settings, &sql).await?;
            println!("{}", table);
            log::info!("✓ Query completed");
        }
        Commands::S3Download { key, dest } => {
            let path = cli::s3_download(settings, &key, dest.as_deref()).await?;
            log::info!("✓ Downloaded {} to {}", key.cyan(), path.display().bright_black());
        }
        Commands::SnowflakeLoad { file, table } => {
            let path = cli::snowflake_load(settings, &file, &table).await?;
            log::info!(
                "✓ Loaded {} into Snowflake table {}",
                path.display().bright_black(),
                table.cyan()
            );
        }
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                settings.api_host = host;
            }
            if let Some(port) = port {
                settings.api_port = port;
            }
            api::serve(settings).await?;
        }
    }
    Ok(())
}
