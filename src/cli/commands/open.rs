use crate::cli::utils::output_navigation;
use crate::cli::{open_console, OutputFormat};

/// Boots the console at `fragment` and prints what the shell would show.
pub async fn handle(fragment: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let console = open_console(fragment.as_deref().unwrap_or_default())?;
    let navigation = console.boot().await;
    output_navigation(&output_format, &navigation)
}
