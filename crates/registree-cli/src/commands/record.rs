//! Record edits
//!
//! Usage:
//!   registree record add <TYPE> field=value...
//!   registree record set <TYPE> --key field=value... --field F --value V
//!   registree record clear <TYPE> --key field=value... --field F
//!   registree record delete <TYPE> <ID>
//!   registree record list <TYPE>
//!
//! `set` and `clear` go through the grid-edit path: a blank value deletes
//! the matching row, a value on a missing row creates it. When the key has
//! a `date` field the edit is lock-checked for `--consumer`.

use clap::{Args, Subcommand};
use registree_core::{
    ConsumerKind, EntityId, EntityType, ExError, FieldValue, LockScope, MutationIntent,
    MutationOutcome, RecordStore, RowEdit,
};

use crate::commands::values::{parse_assignment, parse_value, render, snapshot_of};
use crate::session::{self, CliResult, SessionOptions};

#[derive(Debug, Args)]
pub struct RecordArgs {
    #[command(subcommand)]
    pub command: RecordCommand,
}

#[derive(Debug, Subcommand)]
pub enum RecordCommand {
    /// Create a record from field=value pairs
    Add(AddArgs),
    /// Set one field on the row matching --key
    Set(EditArgs),
    /// Blank one field on the row matching --key, deleting the row
    Clear(ClearArgs),
    /// Delete a record by id
    Delete(DeleteArgs),
    /// Print every record of a type
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct AddArgs {
    pub entity_type: EntityType,

    #[arg(value_parser = parse_assignment, required = true)]
    pub fields: Vec<(String, FieldValue)>,
}

#[derive(Debug, Args)]
pub struct RowKeyArgs {
    pub entity_type: EntityType,

    /// Field identifying the row (repeatable)
    #[arg(long = "key", value_parser = parse_assignment, required = true)]
    pub key: Vec<(String, FieldValue)>,

    #[arg(long)]
    pub field: String,

    /// Consumer the lock check is made for
    #[arg(long, default_value = ConsumerKind::STUDENT_ROSTER)]
    pub consumer: String,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    #[command(flatten)]
    pub row: RowKeyArgs,

    #[arg(long)]
    pub value: String,
}

#[derive(Debug, Args)]
pub struct ClearArgs {
    #[command(flatten)]
    pub row: RowKeyArgs,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    pub entity_type: EntityType,
    pub id: i64,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    pub entity_type: EntityType,
}

pub fn execute(options: &SessionOptions, args: RecordArgs) -> CliResult<()> {
    match args.command {
        RecordCommand::Add(add_args) => execute_add(options, add_args),
        RecordCommand::Set(edit_args) => {
            let value = parse_value(&edit_args.value);
            execute_edit(options, edit_args.row, value)
        }
        RecordCommand::Clear(clear_args) => execute_edit(options, clear_args.row, FieldValue::Null),
        RecordCommand::Delete(delete_args) => execute_delete(options, delete_args),
        RecordCommand::List(list_args) => execute_list(options, list_args),
    }
}

fn execute_add(options: &SessionOptions, args: AddArgs) -> CliResult<()> {
    let mut session = session::open(options)?;
    let outcome = session
        .engine
        .execute(
            &session.ctx,
            MutationIntent::create(args.entity_type, snapshot_of(args.fields)),
        )
        .map_err(ExError::from)?;
    report(args.entity_type, &outcome);
    Ok(())
}

fn execute_edit(options: &SessionOptions, args: RowKeyArgs, value: FieldValue) -> CliResult<()> {
    let key = snapshot_of(args.key);
    let scope = key
        .get("date")
        .and_then(FieldValue::as_date)
        .map(|date| LockScope::new(date, ConsumerKind::new(args.consumer)));

    let mut edit = RowEdit::new(args.entity_type, key, args.field, value);
    if let Some(scope) = scope {
        edit = edit.scoped(scope);
    }

    let mut session = session::open(options)?;
    match session
        .engine
        .apply_row_edit(&session.ctx, edit)
        .map_err(ExError::from)?
    {
        Some(outcome) => report(args.entity_type, &outcome),
        None => println!("No change"),
    }
    Ok(())
}

fn execute_delete(options: &SessionOptions, args: DeleteArgs) -> CliResult<()> {
    let mut session = session::open(options)?;
    let outcome = session
        .engine
        .execute(
            &session.ctx,
            MutationIntent::delete(args.entity_type, EntityId(args.id)),
        )
        .map_err(ExError::from)?;
    report(args.entity_type, &outcome);
    Ok(())
}

fn execute_list(options: &SessionOptions, args: ListArgs) -> CliResult<()> {
    let session = session::open(options)?;
    let records = session
        .engine
        .store()
        .query(args.entity_type, &|_| true)
        .map_err(ExError::from)?;
    for record in records {
        println!("{} {}", record.id, render(&record.fields));
    }
    Ok(())
}

fn report(entity_type: EntityType, outcome: &MutationOutcome) {
    println!(
        "{} {} {} (audit #{})",
        outcome.action, entity_type, outcome.entity_id, outcome.audit_id
    );
}
