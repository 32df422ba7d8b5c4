//! The `languages` subcommand.

use crate::{async_utils::io::write_output, engines::Language, prelude::*};

/// List the languages we can pass to `extract --language`.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_languages() -> Result<()> {
    let mut out = String::new();
    for &language in Language::ALL {
        out.push_str(&format!("{:<8} {}\n", language.code(), language.display_name()));
    }
    write_output(None, out.as_bytes()).await
}
