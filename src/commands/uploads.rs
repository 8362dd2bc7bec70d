use std::sync::Arc;

use tracing::debug;

use super::entities::read_files;
use super::print::print_json;
use super::{CliError, Ctx};
use crate::application::uploads::{ProgressCallback, UploadOptions, UploadStatus};
use crate::config::UploadArgs;
use crate::domain::uploads::UploadKind;

pub async fn upload(ctx: &Ctx, args: UploadArgs) -> Result<(), CliError> {
    let files = read_files(&args.files).await?;
    let names: Vec<String> = files.iter().map(|file| file.filename.clone()).collect();

    let options = UploadOptions {
        kind: if args.document {
            UploadKind::Document
        } else {
            UploadKind::Gallery
        },
        folder: args.folder,
        tags: args.tags,
    };

    let progress: ProgressCallback = Arc::new(move |event| {
        let name = names.get(event.index).map_or("?", String::as_str);
        match event.status {
            UploadStatus::Uploading => debug!(file = name, percent = event.percent, "uploading"),
            UploadStatus::Done => eprintln!("{name}: done"),
            UploadStatus::Failed => eprintln!("{name}: failed"),
            UploadStatus::Pending => {}
        }
    });

    let tasks = ctx
        .dashboard
        .uploads()
        .upload_batch(files, &options, Some(progress))
        .await;

    let total = tasks.len();
    let mut failed = 0;
    let mut uploaded = Vec::new();
    for task in tasks {
        let filename = task.filename.clone();
        match task.into_result() {
            Ok(media) => uploaded.push(media),
            Err(err) => {
                failed += 1;
                eprintln!("{filename}: {err}");
            }
        }
    }

    print_json(&uploaded)?;
    if failed > 0 {
        return Err(CliError::Uploads { failed, total });
    }
    Ok(())
}
