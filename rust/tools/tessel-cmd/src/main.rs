use anyhow::Result;
use clap::{Parser, Subcommand};
use tessel_tile::{EncodingKind, ValueType};

mod commands;
mod json;
mod utils;

#[derive(Parser)]
#[command(name = "tessel-cmd")]
#[command(about = "Command-line utility for encoded array chunks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a JSON array of values into a payload file
    Encode {
        /// Type of the values
        #[arg(short = 't', long = "type", value_parser = utils::parse_value_type)]
        value_type: ValueType,

        /// Path to a JSON tile configuration
        #[arg(long)]
        config: Option<String>,

        /// Tile encoding, overrides the configuration
        #[arg(long, value_parser = utils::parse_encoding_kind)]
        encoding: Option<EncodingKind>,

        /// JSON file with the values (`null` or `{"null": reason}` for missing cells)
        input: String,

        /// Output payload file
        output: String,
    },

    /// Decode a payload file into a JSON array of values
    Decode {
        /// Type of the values
        #[arg(short = 't', long = "type", value_parser = utils::parse_value_type)]
        value_type: ValueType,

        /// Payload file
        input: String,

        /// Output file for the JSON values (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Display the segments of a payload or bitmap file
    Inspect {
        /// Print the summary as JSON instead of the segment listing
        #[arg(long)]
        json: bool,

        /// Payload or bitmap file
        path: String,
    },

    /// Copy a range of cells of a payload into a new payload
    Slice {
        /// First cell to copy
        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Number of cells to copy (defaults to the rest of the payload)
        #[arg(long)]
        count: Option<u64>,

        input: String,
        output: String,
    },

    /// Concatenate payloads of the same element kind
    Concat {
        /// Payload files, in order
        #[arg(short, long, required = true)]
        file: Vec<String>,

        output: String,
    },

    /// Build a position bitmap file
    Bitmap {
        /// JSON file with the strictly increasing populated positions
        #[arg(long, conflicts_with = "presence")]
        positions: Option<String>,

        /// Boolean payload file telling which positions are populated
        #[arg(long)]
        presence: Option<String>,

        output: String,
    },

    /// Cut a chunk down to a sub-box of its coordinates
    Cut {
        /// Value payload of the chunk
        #[arg(long)]
        payload: String,

        /// Position bitmap of the chunk
        #[arg(long)]
        bitmap: String,

        /// Lowest coordinates of the chunk box, comma separated
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
        origin_low: Vec<i64>,

        /// Highest coordinates of the chunk box, comma separated
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
        origin_high: Vec<i64>,

        /// Lowest coordinates of the result box, comma separated
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
        result_low: Vec<i64>,

        /// Highest coordinates of the result box, comma separated
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
        result_high: Vec<i64>,

        /// Output payload file
        #[arg(long)]
        out_payload: String,

        /// Output bitmap file
        #[arg(long)]
        out_bitmap: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            value_type,
            config,
            encoding,
            input,
            output,
        } => commands::encode::run(value_type, config, encoding, input, output),
        Commands::Decode {
            value_type,
            input,
            output,
        } => commands::decode::run(value_type, input, output),
        Commands::Inspect { json, path } => commands::inspect::run(json, path),
        Commands::Slice {
            offset,
            count,
            input,
            output,
        } => commands::slice::run(offset, count, input, output),
        Commands::Concat { file, output } => commands::concat::run(file, output),
        Commands::Bitmap {
            positions,
            presence,
            output,
        } => commands::bitmap::run(positions, presence, output),
        Commands::Cut {
            payload,
            bitmap,
            origin_low,
            origin_high,
            result_low,
            result_high,
            out_payload,
            out_bitmap,
        } => commands::cut::run(commands::cut::CutArgs {
            payload,
            bitmap,
            origin: (origin_low, origin_high),
            result: (result_low, result_high),
            out_payload,
            out_bitmap,
        }),
    }
}
