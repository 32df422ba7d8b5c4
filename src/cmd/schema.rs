//! The `schema` subcommand.

use clap::{Args, ValueEnum};
use schemars::schema_for;

use crate::{
    async_utils::io::write_output_json, engines::EngineStatus, prelude::*,
    result::{ExtractionReport, RecognitionResult},
};

/// The different schema types we support.
///
/// We parse these as PascalCase, because they represent type names.
#[derive(Debug, Clone, Copy, ValueEnum)]
#[clap(rename_all = "PascalCase")]
pub enum SchemaType {
    /// Output of `extract --format json`.
    ExtractionReport,
    /// The text and counts embedded in an extraction report.
    RecognitionResult,
    /// Output of `probe --format json`.
    EngineStatus,
}

/// Schema command line arguments.
#[derive(Debug, Args)]
pub struct SchemaOpts {
    /// The schema type to generate.
    #[clap(value_enum, value_name = "TYPE")]
    pub schema_type: SchemaType,

    /// The output path to write the schema to.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `schema` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_schema(schema_opts: &SchemaOpts) -> Result<()> {
    let schema = match schema_opts.schema_type {
        SchemaType::ExtractionReport => schema_for!(ExtractionReport),
        SchemaType::RecognitionResult => schema_for!(RecognitionResult),
        SchemaType::EngineStatus => schema_for!(EngineStatus),
    };
    write_output_json(schema_opts.output_path.as_deref(), &schema).await
}
