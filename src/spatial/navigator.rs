//! # Spatial Hierarchy Navigator
//!
//! Position in the 12-level tree, the breadcrumb path leading to it and the
//! listing currently shown. Transitions (`select`, `breadcrumb_click`,
//! `go_back`) re-fetch the new view; `save` and `delete` go through the
//! injected [`SpatialMutator`] after a permission check.
//!
//! Fetches are tagged with a monotonic epoch. A result arriving for an
//! older epoch than the latest started fetch is discarded, so rapid
//! navigation never shows the listing of a view that is no longer current.

use std::sync::Arc;

use thiserror::Error;

use crate::models::spatial::{BreadcrumbItem, ParentRef, SpatialItem, SpatialLevel};
use crate::spatial::fetch::fetch_children;
use crate::spatial::form::SpatialForm;
use crate::spatial::mutation::{
    ManageRequest, ManageResponse, MutationAction, MutationError, SpatialMutator,
};
use crate::spatial::services::{
    DialogService, DialogSpec, Language, PERMISSION_SPATIAL_CREATE, PERMISSION_SPATIAL_DELETE,
    PERMISSION_SPATIAL_UPDATE, PermissionChecker,
};
use crate::store::{DocumentData, DocumentStore, StoreError};

/// Capabilities the navigator is constructed with.
#[derive(Clone)]
pub struct NavigatorServices {
    pub store: Arc<dyn DocumentStore>,
    pub mutator: Arc<dyn SpatialMutator>,
    pub dialogs: Arc<dyn DialogService>,
    pub permissions: Arc<dyn PermissionChecker>,
    pub language: Language,
}

/// Which kind of item the create form adds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AddMode {
    /// An item of the current level under the current parent
    #[default]
    Standard,
    /// A zone attached directly to the current site
    OutdoorZone,
    /// A unit attached directly to the current outdoor zone
    OutdoorUnit,
}

/// Identifies one started fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    epoch: u64,
    pub level: SpatialLevel,
    pub parent: Option<ParentRef>,
}

#[derive(Debug, Error)]
pub enum NavigatorError {
    #[error("missing permission '{code}'")]
    PermissionDenied { code: &'static str },
    #[error("cannot create a {level} without a parent")]
    MissingParent { level: SpatialLevel },
    #[error(transparent)]
    Mutation(#[from] MutationError),
}

/// Remove every field naming a parent level; parents never change after
/// creation.
fn strip_parent_fields(data: &mut DocumentData) {
    for level in SpatialLevel::ALL {
        data.remove(level.id_field());
    }
}

pub struct SpatialNavigator {
    services: NavigatorServices,
    level: SpatialLevel,
    parent: Option<ParentRef>,
    path: Vec<BreadcrumbItem>,
    items: Vec<SpatialItem>,
    loading: bool,
    last_error: Option<String>,
    epoch: u64,
}

impl SpatialNavigator {
    /// Navigator positioned at the root with an empty listing.
    pub fn new(services: NavigatorServices) -> Self {
        Self {
            services,
            level: SpatialLevel::ROOT,
            parent: None,
            path: Vec::new(),
            items: Vec::new(),
            loading: false,
            last_error: None,
            epoch: 0,
        }
    }

    pub fn level(&self) -> SpatialLevel {
        self.level
    }

    pub fn parent(&self) -> Option<&ParentRef> {
        self.parent.as_ref()
    }

    pub fn path(&self) -> &[BreadcrumbItem] {
        &self.path
    }

    pub fn items(&self) -> &[SpatialItem] {
        &self.items
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn language(&self) -> Language {
        self.services.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.services.language = language;
    }

    /// Start a fetch of the current view.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.epoch += 1;
        self.loading = true;
        FetchTicket {
            epoch: self.epoch,
            level: self.level,
            parent: self.parent.clone(),
        }
    }

    /// Apply the result of a fetch. Returns `false` when the ticket is stale
    /// and the result was dropped.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<SpatialItem>, StoreError>,
    ) -> bool {
        if ticket.epoch != self.epoch {
            tracing::debug!(
                epoch = ticket.epoch,
                latest = self.epoch,
                level = %ticket.level,
                "Discarding stale spatial listing"
            );
            return false;
        }

        self.loading = false;
        match result {
            Ok(items) => {
                self.items = items;
                self.last_error = None;
            }
            Err(err) => {
                tracing::warn!(
                    level = %ticket.level,
                    parent = ?ticket.parent,
                    error = %err,
                    "Failed to fetch spatial children"
                );
                self.last_error = Some(err.to_string());
            }
        }
        true
    }

    /// Fetch the children of the current view.
    pub async fn refresh(&mut self) -> bool {
        let ticket = self.begin_fetch();
        let store = Arc::clone(&self.services.store);
        let result = fetch_children(store.as_ref(), ticket.level, ticket.parent.as_ref()).await;
        self.complete_fetch(ticket, result)
    }

    /// Descend into `item`. Returns whether the view changed.
    pub async fn select(&mut self, item: &SpatialItem) -> bool {
        let (item_level, descends_to) = if item.is_outdoor {
            if item.item_type != SpatialLevel::Zone {
                tracing::debug!(id = %item.id, level = %item.item_type, "Ignoring outdoor non-zone item");
                return false;
            }
            (SpatialLevel::Zone, SpatialLevel::Unit)
        } else {
            let Some(child) = item.item_type.child() else {
                return false;
            };
            (item.item_type, child)
        };

        self.path.push(BreadcrumbItem {
            level: self.level,
            item_level,
            descends_to,
            id: item.id.clone(),
            name: item.display_name(self.services.language).to_string(),
        });
        self.parent = Some(ParentRef::new(item_level, item.id.clone()));
        self.level = descends_to;

        self.refresh().await;
        true
    }

    /// Jump to the crumb at `index`; `-1` returns to the root. Out-of-range
    /// indices are ignored.
    pub async fn breadcrumb_click(&mut self, index: isize) -> bool {
        if index == -1 {
            self.path.clear();
            self.parent = None;
            self.level = SpatialLevel::ROOT;
        } else {
            let Some(crumb) = usize::try_from(index)
                .ok()
                .and_then(|i| self.path.get(i))
                .cloned()
            else {
                return false;
            };
            self.path.truncate(index as usize + 1);
            self.parent = Some(crumb.parent_ref());
            self.level = crumb.descends_to;
        }

        self.refresh().await;
        true
    }

    /// Step back one crumb; no-op at the root.
    pub async fn go_back(&mut self) -> bool {
        if self.path.is_empty() {
            return false;
        }
        let index = self.path.len() as isize - 2;
        self.breadcrumb_click(index).await
    }

    async fn ensure_permission(&self, code: &'static str) -> Result<(), NavigatorError> {
        if self.services.permissions.has_permission(code) {
            return Ok(());
        }
        tracing::info!(permission = code, "Spatial action denied");
        self.services
            .dialogs
            .alert(DialogSpec::permission_denied(code))
            .await;
        Err(NavigatorError::PermissionDenied { code })
    }

    async fn submit(&mut self, request: ManageRequest) -> Result<ManageResponse, NavigatorError> {
        let mutator = Arc::clone(&self.services.mutator);
        match mutator.manage(request).await {
            Ok(response) => {
                self.refresh().await;
                Ok(response)
            }
            Err(err) => {
                self.services
                    .dialogs
                    .alert(DialogSpec::error(err.to_string()))
                    .await;
                Err(err.into())
            }
        }
    }

    /// Create an item (no `edit_target`) or update `edit_target`.
    pub async fn save(
        &mut self,
        form: &SpatialForm,
        edit_target: Option<&SpatialItem>,
        mode: AddMode,
    ) -> Result<ManageResponse, NavigatorError> {
        let (action, permission) = match edit_target {
            Some(_) => (MutationAction::Update, PERMISSION_SPATIAL_UPDATE),
            None => (MutationAction::Create, PERMISSION_SPATIAL_CREATE),
        };
        self.ensure_permission(permission).await?;

        let target = match (edit_target, mode) {
            (Some(item), _) => item.item_type,
            (None, AddMode::OutdoorZone) => SpatialLevel::Zone,
            (None, AddMode::OutdoorUnit) => SpatialLevel::Unit,
            (None, AddMode::Standard) => self.level,
        };

        let mut data = match edit_target {
            Some(_) => form.to_update_payload(target),
            None => form.to_payload(target),
        };
        match edit_target {
            Some(_) => strip_parent_fields(&mut data),
            None if target != SpatialLevel::ROOT => {
                let field = match mode {
                    AddMode::OutdoorZone => Some("site_id"),
                    AddMode::OutdoorUnit => Some("zone_id"),
                    AddMode::Standard => self
                        .parent
                        .as_ref()
                        .and_then(|parent| target.parent_field_for(parent.level)),
                };
                let (Some(field), Some(parent)) = (field, self.parent.as_ref()) else {
                    let err = NavigatorError::MissingParent { level: target };
                    self.services
                        .dialogs
                        .alert(DialogSpec::error(err.to_string()))
                        .await;
                    return Err(err);
                };
                strip_parent_fields(&mut data);
                data.insert(field.to_string(), parent.id.clone().into());
            }
            None => {}
        }

        self.submit(ManageRequest {
            target,
            action,
            doc_id: edit_target.map(|item| item.id.clone()),
            data: Some(data),
        })
        .await
    }

    /// Delete `item` after confirmation. Returns `Ok(false)` when the user
    /// cancels.
    pub async fn delete(&mut self, item: &SpatialItem) -> Result<bool, NavigatorError> {
        self.ensure_permission(PERMISSION_SPATIAL_DELETE).await?;

        let name = item.display_name(self.services.language).to_string();
        if !self
            .services
            .dialogs
            .confirm(DialogSpec::confirm_delete(&name))
            .await
        {
            return Ok(false);
        }

        self.submit(ManageRequest {
            target: item.item_type,
            action: MutationAction::Delete,
            doc_id: Some(item.id.clone()),
            data: None,
        })
        .await?;
        Ok(true)
    }
}
