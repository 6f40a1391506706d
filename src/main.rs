use clap::{Parser, Subcommand};
use salt_loader::runner::{LoadArgs, init_tracing, run_load};
use std::path::PathBuf;

#[derive(Parser, Clone)]
#[command(about = "Load the SALT Parquet datasets into a relational SQLite database")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Subcommand)]
enum Command {
    /// Recreate the SALT tables and load all four datasets
    Load {
        /// Directory holding the Parquet sources under their default names
        #[arg(long, default_value = "parquet_files")]
        source_dir: PathBuf,

        /// Address source file (overrides the file in --source-dir)
        #[arg(long)]
        addresses: Option<PathBuf>,

        /// Customer source file
        #[arg(long)]
        customers: Option<PathBuf>,

        /// Sales document source file
        #[arg(long)]
        sales_documents: Option<PathBuf>,

        /// Sales document item source file
        #[arg(long)]
        sales_document_items: Option<PathBuf>,

        /// SQLite database to create or replace
        #[arg(short, long, default_value = "salt_data.sqlite")]
        database: PathBuf,

        /// Rows per batched insert
        #[arg(short, long, default_value = "10000")]
        batch_size: usize,

        /// Quiet mode - no status lines or progress bars, warnings only
        #[arg(short, long)]
        quiet: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Load {
            source_dir,
            addresses,
            customers,
            sales_documents,
            sales_document_items,
            database,
            batch_size,
            quiet,
        } => {
            init_tracing(quiet);

            let load_args = LoadArgs {
                source_dir,
                addresses,
                customers,
                sales_documents,
                sales_document_items,
                database,
                batch_size,
                quiet,
            };

            run_load(load_args).await?;
        }
    }
    Ok(())
}
