use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use trainlog_core::{
    DateWindow, EditorConfig, EditorSession, EntryStatus, EntryStoreService, MonthView, UserId,
};

use crate::config::CliConfig;
use crate::error::CliError;

/// Everything a data command needs to open a session
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub db_path: PathBuf,
    pub user: UserId,
    pub editor: EditorConfig,
}

impl CommandContext {
    pub fn resolve(db_path: Option<PathBuf>, user: Option<String>) -> Result<Self, CliError> {
        let config = CliConfig::load().map_err(CliError::Config)?;
        Self::from_config(&config, db_path, user)
    }

    pub fn from_config(
        config: &CliConfig,
        db_path: Option<PathBuf>,
        user: Option<String>,
    ) -> Result<Self, CliError> {
        let user = config.resolve_user(user).ok_or(CliError::MissingUser)?;
        Ok(Self {
            db_path: config.resolve_db_path(db_path),
            user: UserId::new(user)?,
            editor: config.editor_config(),
        })
    }

    pub async fn open_session(
        &self,
        window: DateWindow,
    ) -> Result<EditorSession<EntryStoreService>, CliError> {
        let store = EntryStoreService::open_path(&self.db_path).await?;
        Ok(EditorSession::load(store, self.user.clone(), window, self.editor).await?)
    }
}

/// Explicit `YYYY-MM`, else the month of `fallback`, else the current month
pub fn resolve_window(
    month: Option<&str>,
    fallback: Option<NaiveDate>,
) -> Result<DateWindow, CliError> {
    let window = match month {
        Some(month) => DateWindow::parse_month(month)?,
        None => DateWindow::containing_month(fallback.unwrap_or_else(|| Local::now().date_naive()))?,
    };
    Ok(window)
}

pub fn format_month_lines(view: &MonthView) -> Vec<String> {
    let mut lines = vec![format!("{}  total {}h", view.window, view.total())];

    for day in &view.days {
        if day.rows.is_empty() && day.status == EntryStatus::Unchanged {
            continue;
        }
        lines.push(format!(
            "{} {} {:>5}h",
            day.date,
            day.status.marker(),
            day.net_total.to_string()
        ));
        for row in &day.rows {
            let label = if row.merged {
                format!("{} entries", row.ids.len())
            } else {
                row.ids.first().map(ToString::to_string).unwrap_or_default()
            };
            lines.push(format!(
                "    {} {:>4}h  {}",
                row.status.marker(),
                row.hours.to_string(),
                label
            ));
        }
    }

    lines
}
