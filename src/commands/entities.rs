use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use dialoguer::Confirm;
use folio_api_types::{Analytics, EntityKind};
use serde::Serialize;
use serde_json::{Map, Value};

use super::fields::{apply_fields, describe_errors, walk_to_last_step};
use super::print::{print_json, print_warnings};
use super::{CliError, Ctx};
use crate::application::editor::EntityEditor;
use crate::application::error::AdminError;
use crate::application::uploads::UploadFile;
use crate::config::{CreateArgs, DeleteArgs, EditArgs, OverviewArgs};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Overview<'a> {
    analytics: &'a Analytics,
    counts: BTreeMap<&'static str, usize>,
    error: Option<&'a str>,
}

pub async fn overview(ctx: &mut Ctx, args: OverviewArgs) -> Result<(), CliError> {
    let loaded = ctx.dashboard.load().await;
    let state = ctx.dashboard.state();

    if args.json {
        print_json(&Overview {
            analytics: state.analytics(),
            counts: EntityKind::ALL
                .iter()
                .map(|kind| (kind.collection_path(), state.count(*kind)))
                .collect(),
            error: state.error().map(|err| err.message.as_str()),
        })?;
    } else {
        let analytics = state.analytics();
        println!(
            "views: {}  unique visitors: {}",
            analytics.total_views, analytics.unique_visitors
        );
        for kind in EntityKind::ALL {
            println!("{:<12} {}", kind.collection_path(), state.count(kind));
        }
    }

    loaded.map_err(CliError::from)
}

pub async fn create(ctx: &mut Ctx, args: CreateArgs) -> Result<(), CliError> {
    let kind = EntityKind::from(args.kind);
    let fields = read_fields(&args.input)?;
    let files = read_files(&args.images).await?;

    ctx.dashboard.load().await?;
    let mut editor = ctx.dashboard.open_create(kind)?;
    fill(&mut editor, &fields)?;
    submit(ctx, &mut editor, files).await
}

pub async fn edit(ctx: &mut Ctx, args: EditArgs) -> Result<(), CliError> {
    let kind = EntityKind::from(args.kind);
    let fields = read_fields(&args.input)?;
    let files = read_files(&args.images).await?;

    ctx.dashboard.load().await?;
    let mut editor = ctx.dashboard.open_edit(kind, &args.id)?;
    fill(&mut editor, &fields)?;
    submit(ctx, &mut editor, files).await
}

pub async fn delete(ctx: &mut Ctx, args: DeleteArgs) -> Result<(), CliError> {
    let kind = EntityKind::from(args.kind);

    ctx.dashboard.load().await?;
    let confirmation = ctx.dashboard.request_delete(kind, &args.id)?;

    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(confirmation.prompt())
            .default(false)
            .interact()
            .unwrap_or(false);
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    ctx.dashboard.confirm_delete(confirmation).await?;
    println!("Deleted {kind} {}.", args.id);
    Ok(())
}

fn fill(editor: &mut EntityEditor, fields: &Map<String, Value>) -> Result<(), CliError> {
    let wizard = editor.wizard_mut();
    apply_fields(wizard, fields)?;
    walk_to_last_step(wizard)
}

async fn submit(
    ctx: &mut Ctx,
    editor: &mut EntityEditor,
    files: Vec<UploadFile>,
) -> Result<(), CliError> {
    match ctx.dashboard.submit(editor, files).await {
        Ok(outcome) => {
            print_warnings(&outcome.warnings);
            match outcome.id.as_deref() {
                Some(id) => println!("Saved {} {id}.", outcome.kind),
                None => println!("Saved {}.", outcome.kind),
            }
            if outcome.refetched {
                println!("Reloaded the {} list.", outcome.kind.collection_path());
            }
            Ok(())
        }
        Err(AdminError::Validation(errors)) => {
            let wizard = editor.wizard();
            Err(CliError::Incomplete {
                step: wizard.current_step(),
                label: wizard.current_label().unwrap_or("unnamed"),
                details: describe_errors(&errors),
            })
        }
        Err(err) => Err(err.into()),
    }
}

fn read_fields(path: &Path) -> Result<Map<String, Value>, CliError> {
    let data = fs::read_to_string(path).map_err(|source| CliError::InputFile {
        path: path.display().to_string(),
        source,
    })?;
    match serde_json::from_str::<Value>(&data) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(CliError::InvalidInput(format!(
            "{} must contain a JSON object",
            path.display()
        ))),
        Err(err) => Err(CliError::InvalidInput(format!(
            "{} is not valid JSON: {err}",
            path.display()
        ))),
    }
}

pub(super) async fn read_files(paths: &[PathBuf]) -> Result<Vec<UploadFile>, CliError> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = UploadFile::read(path)
            .await
            .map_err(|source| CliError::InputFile {
                path: path.display().to_string(),
                source,
            })?;
        files.push(file);
    }
    Ok(files)
}
