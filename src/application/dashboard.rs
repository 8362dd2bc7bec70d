//! Admin dashboard: initial load, editors, and CRUD flows over the content API.

use std::fmt;
use std::mem;
use std::sync::Arc;

use folio_api_types::{
    Analytics, BlogPost, EntityKind, Experience, Project, Quote, Resume, Skill, UploadedMedia,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use super::api::{ContentApi, decode_entity, decode_list};
use super::editor::{EditorMode, EntityEditor};
use super::error::{AdminError, ApiError};
use super::reconcile::{
    OrderedCollection, Reconcilable, Reconciled, reconcile_create, reconcile_delete,
    reconcile_update,
};
use super::retry::RetryExecutor;
use super::uploads::{UploadFile, UploadOptions, UploadOrchestrator};
use crate::domain::drafts::{Draft, EntityDraft};
use crate::domain::slug::ensure_unique_slug;
use crate::domain::uploads::{UploadKind, validate_upload};

const MEDIA_FOLDER_ROOT: &str = "portfolio";

mod sealed {
    pub trait Sealed {}
}

/// An entity kind held by the dashboard.
pub trait Resource: Reconcilable + DeserializeOwned + fmt::Debug + sealed::Sealed {
    const KIND: EntityKind;

    /// Human-readable name used in prompts and logs.
    fn label(&self) -> String;

    fn slug(&self) -> Option<&str> {
        None
    }

    fn collection(state: &DashboardState) -> &OrderedCollection<Self>;

    #[doc(hidden)]
    fn slot(state: &mut DashboardState) -> &mut OrderedCollection<Self>;
}

macro_rules! resource {
    ($ty:ty, $kind:expr, $field:ident, |$this:ident| $label:expr $(, slug = |$s:ident| $slug:expr)?) => {
        impl sealed::Sealed for $ty {}

        impl Resource for $ty {
            const KIND: EntityKind = $kind;

            fn label(&self) -> String {
                let $this = self;
                $label
            }

            $(
                fn slug(&self) -> Option<&str> {
                    let $s = self;
                    $slug
                }
            )?

            fn collection(state: &DashboardState) -> &OrderedCollection<Self> {
                &state.$field
            }

            fn slot(state: &mut DashboardState) -> &mut OrderedCollection<Self> {
                &mut state.$field
            }
        }
    };
}

resource!(Project, EntityKind::Project, projects, |p| p.title.clone(), slug = |p| Some(p.slug.as_str()));
resource!(BlogPost, EntityKind::Blog, blogs, |b| b.title.clone(), slug = |b| Some(b.slug.as_str()));
resource!(Experience, EntityKind::Experience, experiences, |e| format!("{} at {}", e.position, e.company));
resource!(Quote, EntityKind::Quote, quotes, |q| format!("\"{}\" ({})", q.text, q.author));
resource!(Skill, EntityKind::Skill, skills, |s| s.name.clone());
resource!(Resume, EntityKind::Resume, resumes, |r| r.title.clone());

/// Run `$body` with `$t` aliased to the entity type of `$kind`.
macro_rules! with_resource {
    ($kind:expr, $t:ident => $body:expr) => {
        match $kind {
            EntityKind::Project => {
                type $t = Project;
                $body
            }
            EntityKind::Blog => {
                type $t = BlogPost;
                $body
            }
            EntityKind::Experience => {
                type $t = Experience;
                $body
            }
            EntityKind::Quote => {
                type $t = Quote;
                $body
            }
            EntityKind::Skill => {
                type $t = Skill;
                $body
            }
            EntityKind::Resume => {
                type $t = Resume;
                $body
            }
        }
    };
}

/// Dashboard-level failure: some required collections could not be loaded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct DashboardError {
    pub message: String,
    pub failed: Vec<EntityKind>,
}

/// Everything the dashboard holds in memory for the session.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    analytics: Analytics,
    projects: OrderedCollection<Project>,
    blogs: OrderedCollection<BlogPost>,
    experiences: OrderedCollection<Experience>,
    quotes: OrderedCollection<Quote>,
    skills: OrderedCollection<Skill>,
    resumes: OrderedCollection<Resume>,
    error: Option<DashboardError>,
    loaded: bool,
}

impl DashboardState {
    pub fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    pub fn projects(&self) -> &OrderedCollection<Project> {
        &self.projects
    }

    pub fn blogs(&self) -> &OrderedCollection<BlogPost> {
        &self.blogs
    }

    pub fn experiences(&self) -> &OrderedCollection<Experience> {
        &self.experiences
    }

    pub fn quotes(&self) -> &OrderedCollection<Quote> {
        &self.quotes
    }

    pub fn skills(&self) -> &OrderedCollection<Skill> {
        &self.skills
    }

    pub fn resumes(&self) -> &OrderedCollection<Resume> {
        &self.resumes
    }

    pub fn collection<T: Resource>(&self) -> &OrderedCollection<T> {
        T::collection(self)
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        with_resource!(kind, T => T::collection(self).len())
    }

    pub fn error(&self) -> Option<&DashboardError> {
        self.error.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Fold a reconciliation result back into the slot for `T`.
    fn store<T: Resource>(&mut self, reconciled: Reconciled<T>) -> bool {
        let refetch = reconciled.needs_refetch();
        *T::slot(self) = reconciled.into_collection();
        refetch
    }

    fn take<T: Resource>(&mut self) -> OrderedCollection<T> {
        mem::take(T::slot(self))
    }
}

/// Result of a successful editor submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub kind: EntityKind,
    /// Server id of the saved entity, when the response identified it.
    pub id: Option<String>,
    /// The response was ambiguous and the collection was reloaded.
    pub refetched: bool,
    /// Non-fatal problems, such as images that could not be uploaded.
    pub warnings: Vec<String>,
}

/// Proof that the user was asked before deleting. Only
/// [`AdminDashboard::request_delete`] can build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    kind: EntityKind,
    id: String,
    label: String,
}

impl DeleteConfirmation {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prompt(&self) -> String {
        format!(
            "Delete {} {}? This cannot be undone.",
            self.kind, self.label
        )
    }
}

struct Persisted {
    id: Option<String>,
    refetched: bool,
    warning: Option<String>,
}

pub struct AdminDashboard {
    api: Arc<dyn ContentApi>,
    retry: RetryExecutor,
    uploads: UploadOrchestrator,
    state: DashboardState,
}

impl AdminDashboard {
    pub fn new(api: Arc<dyn ContentApi>, retry: RetryExecutor, uploads: UploadOrchestrator) -> Self {
        Self {
            api,
            retry,
            uploads,
            state: DashboardState::default(),
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn uploads(&self) -> &UploadOrchestrator {
        &self.uploads
    }

    /// Fetch every collection concurrently.
    ///
    /// Analytics and resumes fall back to empty defaults. Any other failure
    /// is recorded in the dashboard error slot; collections that did load
    /// are kept, and calling `load` again retries.
    pub async fn load(&mut self) -> Result<(), DashboardError> {
        let api = self.api.as_ref();
        let retry = &self.retry;

        let (analytics, projects, blogs, experiences, quotes, skills, resumes) = tokio::join!(
            retry.run(|| api.analytics()),
            fetch::<Project>(retry, api),
            fetch::<BlogPost>(retry, api),
            fetch::<Experience>(retry, api),
            fetch::<Quote>(retry, api),
            fetch::<Skill>(retry, api),
            fetch::<Resume>(retry, api),
        );

        self.state.analytics = match analytics {
            Ok(body) => decode_entity(Some(body)).unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "analytics unavailable; showing empty statistics");
                Analytics::default()
            }
        };

        let resumes = resumes.unwrap_or_else(|err| {
            warn!(error = %err, "resumes unavailable; showing an empty list");
            Vec::new()
        });
        self.state.resumes = OrderedCollection::from_server(resumes);

        let mut failed = Vec::new();
        self.apply_listing(projects, &mut failed);
        self.apply_listing(blogs, &mut failed);
        self.apply_listing(experiences, &mut failed);
        self.apply_listing(quotes, &mut failed);
        self.apply_listing(skills, &mut failed);

        if let Some((_, first)) = failed.first() {
            let error = DashboardError {
                message: format!(
                    "Could not load {}: {}",
                    failed
                        .iter()
                        .map(|(kind, _)| kind.collection_path())
                        .collect::<Vec<_>>()
                        .join(", "),
                    first.presentation_message()
                ),
                failed: failed.iter().map(|(kind, _)| *kind).collect(),
            };
            warn!(failed = ?error.failed, "dashboard load incomplete");
            self.state.error = Some(error.clone());
            self.state.loaded = false;
            return Err(error);
        }

        self.state.error = None;
        self.state.loaded = true;
        info!(
            projects = self.state.projects.len(),
            blogs = self.state.blogs.len(),
            experiences = self.state.experiences.len(),
            quotes = self.state.quotes.len(),
            skills = self.state.skills.len(),
            resumes = self.state.resumes.len(),
            "dashboard loaded"
        );
        Ok(())
    }

    fn apply_listing<T: Resource>(
        &mut self,
        listing: Result<Vec<T>, ApiError>,
        failed: &mut Vec<(EntityKind, ApiError)>,
    ) {
        match listing {
            Ok(items) => *T::slot(&mut self.state) = OrderedCollection::from_server(items),
            Err(err) => {
                warn!(kind = %T::KIND, error = %err, "failed to load collection");
                failed.push((T::KIND, err));
            }
        }
    }

    /// Replace one collection with a fresh server listing.
    pub async fn refresh<T: Resource>(&mut self) -> Result<(), AdminError> {
        let items = fetch::<T>(&self.retry, self.api.as_ref()).await?;
        *T::slot(&mut self.state) = OrderedCollection::from_server(items);
        Ok(())
    }

    pub async fn refresh_kind(&mut self, kind: EntityKind) -> Result<(), AdminError> {
        with_resource!(kind, T => self.refresh::<T>().await)
    }

    pub fn open_create(&self, kind: EntityKind) -> Result<EntityEditor, AdminError> {
        EntityDraft::empty(kind)
            .map(EntityEditor::create)
            .ok_or(AdminError::NotEditable(kind))
    }

    pub fn open_edit(&self, kind: EntityKind, id: &str) -> Result<EntityEditor, AdminError> {
        let draft = match kind {
            EntityKind::Project => self.state.projects.get(id).map(|p| EntityDraft::Project(p.into())),
            EntityKind::Blog => self.state.blogs.get(id).map(|b| EntityDraft::Blog(b.into())),
            EntityKind::Experience => self
                .state
                .experiences
                .get(id)
                .map(|e| EntityDraft::Experience(e.into())),
            EntityKind::Quote => self.state.quotes.get(id).map(|q| EntityDraft::Quote(q.into())),
            EntityKind::Skill | EntityKind::Resume => return Err(AdminError::NotEditable(kind)),
        };
        draft
            .map(|draft| EntityEditor::edit(draft, id))
            .ok_or_else(|| AdminError::not_loaded(kind, id))
    }

    /// Persist the editor's draft, uploading `files` first.
    ///
    /// On failure the editor stays open with its draft and the error in its
    /// form slot. Images that fail to upload are skipped and reported as
    /// warnings; the entity is still saved.
    pub async fn submit(
        &mut self,
        editor: &mut EntityEditor,
        files: Vec<UploadFile>,
    ) -> Result<SubmitOutcome, AdminError> {
        let mut draft = editor.begin_submit()?;
        let kind = draft.kind();
        let mode = editor.mode().clone();

        match self.persist_draft(&mut draft, &mode, files).await {
            Ok(outcome) => {
                *editor.wizard_mut().draft_mut() = draft;
                editor.complete();
                info!(
                    %kind,
                    id = outcome.id.as_deref().unwrap_or("unknown"),
                    refetched = outcome.refetched,
                    "entity saved"
                );
                Ok(outcome)
            }
            Err(err) => {
                warn!(%kind, error = %err, "submit failed");
                Err(editor.fail(err))
            }
        }
    }

    async fn persist_draft(
        &mut self,
        draft: &mut EntityDraft,
        mode: &EditorMode,
        files: Vec<UploadFile>,
    ) -> Result<SubmitOutcome, AdminError> {
        let kind = draft.kind();
        let editing = match mode {
            EditorMode::Create => None,
            EditorMode::Edit { id } => Some(id.as_str()),
        };

        if let Some(slug) = draft.slug() {
            with_resource!(kind, T => ensure_unique_slug(
                &slug,
                T::collection(&self.state)
                    .iter()
                    .filter_map(|entity| entity.slug().map(|s| (entity.entity_id(), s))),
                editing,
            ))?;
        }

        let mut warnings = Vec::new();
        if !files.is_empty() {
            if draft.accepts_media() {
                let media = self.upload_media(kind, files, &mut warnings).await?;
                draft.attach_media(&media);
            } else {
                warnings.push(format!("{kind} entries have no media; attachments ignored"));
            }
        }

        let payload = draft
            .to_payload()
            .map_err(|err| AdminError::Encode(err.to_string()))?;

        let persisted = with_resource!(kind, T => self.persist::<T>(mode, &payload).await)?;
        warnings.extend(persisted.warning);

        Ok(SubmitOutcome {
            kind,
            id: persisted.id,
            refetched: persisted.refetched,
            warnings,
        })
    }

    /// Validate every file up front, then upload. Configuration and transfer
    /// failures become warnings.
    async fn upload_media(
        &self,
        kind: EntityKind,
        files: Vec<UploadFile>,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<UploadedMedia>, AdminError> {
        let limits = self.uploads.limits();
        let invalid: Vec<_> = files
            .iter()
            .filter_map(|file| {
                validate_upload(
                    &file.filename,
                    &file.media_type,
                    file.size(),
                    UploadKind::Gallery,
                    limits,
                )
                .err()
            })
            .collect();
        if !invalid.is_empty() {
            return Err(AdminError::InvalidMedia(invalid));
        }

        let options = UploadOptions {
            kind: UploadKind::Gallery,
            folder: Some(format!("{MEDIA_FOLDER_ROOT}/{}", kind.collection_path())),
            tags: vec![kind.as_str().to_string()],
        };

        let mut media = Vec::new();
        let mut configuration_error = None;
        for task in self.uploads.upload_batch(files, &options, None).await {
            let filename = task.filename.clone();
            match task.into_result() {
                Ok(uploaded) => media.push(uploaded),
                Err(err) if err.is_configuration() => configuration_error = Some(err),
                Err(err) => warnings.push(format!("`{filename}` was not uploaded: {err}")),
            }
        }
        if let Some(err) = configuration_error {
            warnings.push(format!("{err}; saving without those images"));
        }
        Ok(media)
    }

    async fn persist<T: Resource>(
        &mut self,
        mode: &EditorMode,
        payload: &Value,
    ) -> Result<Persisted, AdminError> {
        let api = Arc::clone(&self.api);
        let (id, reconciled) = match mode {
            EditorMode::Create => {
                let body = self.retry.run(|| api.create(T::KIND, payload)).await?;
                let entity = decode_entity::<T>(body);
                let id = entity.as_ref().map(|e| e.entity_id().to_string());
                (id, reconcile_create(self.state.take::<T>(), entity))
            }
            EditorMode::Edit { id } => {
                let body = self.retry.run(|| api.update(T::KIND, id, payload)).await?;
                let entity = decode_entity::<T>(body);
                (
                    Some(id.clone()),
                    reconcile_update(self.state.take::<T>(), id, entity),
                )
            }
        };

        if !self.state.store(reconciled) {
            return Ok(Persisted {
                id,
                refetched: false,
                warning: None,
            });
        }

        info!(kind = %T::KIND, "response did not identify the entity; reloading collection");
        let warning = match self.refresh::<T>().await {
            Ok(()) => None,
            Err(err) => {
                warn!(kind = %T::KIND, error = %err, "reload after save failed");
                Some(format!(
                    "Saved, but the {} list could not be reloaded: {}",
                    T::KIND.collection_path(),
                    err.presentation_message()
                ))
            }
        };
        Ok(Persisted {
            id,
            refetched: true,
            warning,
        })
    }

    /// First half of a delete: look the entity up and describe it so the
    /// caller can ask the user.
    pub fn request_delete(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<DeleteConfirmation, AdminError> {
        let label = with_resource!(kind, T => T::collection(&self.state).get(id).map(|entity| entity.label()))
            .ok_or_else(|| AdminError::not_loaded(kind, id))?;
        Ok(DeleteConfirmation {
            kind,
            id: id.to_string(),
            label,
        })
    }

    /// Second half of a delete. The collection only changes once the server
    /// accepts the request.
    pub async fn confirm_delete(
        &mut self,
        confirmation: DeleteConfirmation,
    ) -> Result<(), AdminError> {
        let DeleteConfirmation { kind, id, .. } = confirmation;
        let api = Arc::clone(&self.api);
        if let Err(err) = self.retry.run(|| api.delete(kind, &id)).await {
            warn!(%kind, %id, error = %err, "delete failed; list unchanged");
            return Err(err.into());
        }

        with_resource!(kind, T => {
            let remaining = reconcile_delete(self.state.take::<T>(), &id);
            *T::slot(&mut self.state) = remaining;
        });
        info!(%kind, %id, "entity deleted");
        Ok(())
    }
}

impl fmt::Debug for AdminDashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminDashboard")
            .field("retry", &self.retry)
            .field("uploads", &self.uploads)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

async fn fetch<T: Resource>(retry: &RetryExecutor, api: &dyn ContentApi) -> Result<Vec<T>, ApiError> {
    let body = retry.run(|| api.list(T::KIND)).await?;
    decode_list(body)
}

