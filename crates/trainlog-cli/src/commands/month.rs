use crate::commands::common::{format_month_lines, resolve_window, CommandContext};
use crate::error::CliError;

pub async fn run_month(
    context: &CommandContext,
    month: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    let window = resolve_window(month, None)?;
    let session = context.open_session(window).await?;
    let view = session.month_view();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        for line in format_month_lines(&view) {
            println!("{line}");
        }
    }

    Ok(())
}
