use chrono::NaiveDate;
use serde::Serialize;
use trainlog_core::{
    CommitPayload, CommitSummary, EditAction, Entry, EntryId, EntryStore, EditorSession,
    MonthView, Period,
};

use crate::commands::common::{format_month_lines, resolve_window, CommandContext};
use crate::error::CliError;

/// One command-line edit operation
#[derive(Debug, Clone, PartialEq)]
pub enum EditOp {
    /// `add:DATE` or `add:DATE:HOURS`
    Add {
        date: NaiveDate,
        period: Option<Period>,
    },
    /// `set:ID:HOURS`
    Set { id: String, period: Period },
    /// `del:ID`
    Delete { id: String },
}

impl EditOp {
    const fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Add { date, .. } => Some(*date),
            Self::Set { .. } | Self::Delete { .. } => None,
        }
    }
}

pub fn parse_edit_op(raw: &str) -> Result<EditOp, CliError> {
    let invalid = |reason: &str| CliError::InvalidOperation(raw.to_string(), reason.to_string());
    let parts: Vec<&str> = raw.trim().split(':').map(str::trim).collect();

    let parse_date = |value: &str| {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid("expected YYYY-MM-DD"))
    };
    let parse_period = |value: &str| {
        let hours: f64 = value.parse().map_err(|_| invalid("expected hours"))?;
        Ok::<_, CliError>(Period::from_hours(hours)?)
    };
    let parse_id = |value: &str| {
        if value.is_empty() {
            Err(invalid("entry id cannot be empty"))
        } else {
            Ok(value.to_string())
        }
    };

    match parts.as_slice() {
        ["add", date] => Ok(EditOp::Add {
            date: parse_date(*date)?,
            period: None,
        }),
        ["add", date, hours] => Ok(EditOp::Add {
            date: parse_date(*date)?,
            period: Some(parse_period(*hours)?),
        }),
        ["set", id, hours] => Ok(EditOp::Set {
            id: parse_id(*id)?,
            period: parse_period(*hours)?,
        }),
        ["del", id] => Ok(EditOp::Delete { id: parse_id(*id)? }),
        _ => Err(invalid("expected add:DATE[:HOURS], set:ID:HOURS or del:ID")),
    }
}

/// Resolve a persisted id or unique id prefix against loaded entries
pub fn resolve_entry_id(entries: &[Entry], query: &str) -> Result<EntryId, CliError> {
    let persisted = || entries.iter().filter_map(Entry::persisted_id);

    if let Some(id) = persisted().find(|id| id.as_str() == query) {
        return Ok(EntryId::Persisted(id.clone()));
    }

    let matching: Vec<_> = persisted()
        .filter(|id| id.as_str().starts_with(query))
        .collect();
    match matching.as_slice() {
        [] => Err(CliError::EntryNotFound(query.to_string())),
        [id] => Ok(EntryId::Persisted((*id).clone())),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|id| id.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousEntryId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EditOutcome {
    pub month: MonthView,
    pub changes: CommitPayload,
    pub committed: Option<CommitSummary>,
}

/// Apply `ops` in order to a freshly loaded session
pub fn apply_ops<S: EntryStore>(
    session: &mut EditorSession<S>,
    ops: &[EditOp],
) -> Result<(), CliError> {
    for op in ops {
        match op {
            EditOp::Add { date, period: None } => {
                session.apply(&EditAction::Add { date: *date })?;
            }
            EditOp::Add {
                date,
                period: Some(period),
            } => {
                let mut editor = session.day_editor(*date)?;
                let id = editor.add_entry();
                editor.edit_period(&id, *period)?;
                session.save_day(editor)?;
            }
            EditOp::Set { id, period } => {
                let id = resolve_entry_id(session.working().entries(), id)?;
                session.apply(&EditAction::EditPeriod {
                    id,
                    period: *period,
                })?;
            }
            EditOp::Delete { id } => {
                let id = resolve_entry_id(session.working().entries(), id)?;
                session.apply(&EditAction::Delete { id })?;
            }
        }
        tracing::debug!("Applied {:?}", op);
    }
    Ok(())
}

pub async fn edit_month(
    context: &CommandContext,
    month: Option<&str>,
    ops: &[EditOp],
    commit: bool,
) -> Result<EditOutcome, CliError> {
    let window = resolve_window(month, ops.iter().find_map(EditOp::date))?;
    let mut session = context.open_session(window).await?;

    apply_ops(&mut session, ops)?;
    let changes = session.diff().changes.to_payload();

    let committed = if commit {
        Some(session.submit().await?)
    } else {
        None
    };

    Ok(EditOutcome {
        month: session.month_view(),
        changes,
        committed,
    })
}

pub async fn run_edit(
    context: &CommandContext,
    month: Option<&str>,
    raw_ops: &[String],
    commit: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let ops = raw_ops
        .iter()
        .map(|raw| parse_edit_op(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let outcome = edit_month(context, month, &ops, commit).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    for line in format_month_lines(&outcome.month) {
        println!("{line}");
    }
    println!(
        "{} added, {} updated, {} deleted",
        outcome.changes.added.len(),
        outcome.changes.updated.len(),
        outcome.changes.deleted.len()
    );
    match outcome.committed {
        Some(summary) if summary.is_empty() => println!("Nothing to save"),
        Some(_) => println!("Saved"),
        None if outcome.changes.is_empty() => {}
        None => println!("Not saved; rerun with --commit to save"),
    }

    Ok(())
}
