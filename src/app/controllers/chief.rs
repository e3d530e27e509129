//! The project-wide root controller.
//!
//! [`ChiefController`] owns every [`DataController`] in an arena keyed by
//! [`ControllerId`]. Parent and child links are ids, so a controller keeps
//! its identity for its whole life, across reloads included. Removed
//! controllers stay in the arena flagged as removed, which keeps the ids
//! carried by published messages resolvable.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::app::controllers::data::{ControllerId, DataController, ParentLink};
use crate::app::domain::document::{DataKind, Document};
use crate::app::domain::messages::{DataFileRemoved, DataReloaded, DataSaved, ResourceAdded};
use crate::app::domain::settings::EditorSettings;
use crate::app::domain::stamp::FileStamp;
use crate::app::infrastructure::error::{AppError, Operation, Result};
use crate::app::infrastructure::filesystem::canonical_path;
use crate::app::services::loader::{Loader, ParsedTree};
use crate::app::services::publisher::Publisher;
use crate::app::services::text_ops::replace_curdir;
use crate::app::services::tree_render::SuiteNode;
use crate::app::services::writer::write_document;

/// New state for one controller, parsed before anything is mutated.
struct ReloadPlan {
    document: Document,
    stamp: Option<FileStamp>,
    children: Vec<PlannedChild>,
}

impl ReloadPlan {
    fn from_tree(tree: ParsedTree) -> Self {
        Self {
            document: tree.document,
            stamp: tree.stamp,
            children: Vec::new(),
        }
    }

    fn is_suite(&self) -> bool {
        self.document.kind != DataKind::Directory
            || self.document.source.is_some()
            || !self.children.is_empty()
    }
}

enum PlannedChild {
    /// A child that is still on disk, reloaded in place.
    Existing(ControllerId, ReloadPlan),
    /// A suite that appeared since the last load.
    New(ParsedTree),
}

/// Where a resource import of a document at `directory` points to.
pub fn resolve_import_path(directory: &Path, name: &str) -> PathBuf {
    let name = replace_curdir(name, directory);
    canonical_path(&directory.join(name))
}

pub struct ChiefController {
    controllers: HashMap<ControllerId, DataController>,
    next_id: u64,
    suite: Option<ControllerId>,
    resources: Vec<ControllerId>,
    pub(crate) publisher: Rc<Publisher>,
    pub(crate) settings: EditorSettings,
}

impl ChiefController {
    pub fn new(publisher: Rc<Publisher>, settings: EditorSettings) -> Self {
        Self {
            controllers: HashMap::new(),
            next_id: 1,
            suite: None,
            resources: Vec::new(),
            publisher,
            settings,
        }
    }

    pub fn publisher(&self) -> &Rc<Publisher> {
        &self.publisher
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    fn next_controller_id(&mut self) -> ControllerId {
        let id = ControllerId(self.next_id);
        self.next_id += 1;
        id
    }

    // --- Read access ---

    /// The top suite, if a suite is loaded.
    pub fn suite(&self) -> Option<ControllerId> {
        self.suite
    }

    /// The document of the top suite.
    pub fn data(&self) -> Option<&Document> {
        self.suite.and_then(|id| self.controller(id)).map(DataController::data)
    }

    pub fn resources(&self) -> &[ControllerId] {
        &self.resources
    }

    /// Look up any controller, removed ones included.
    pub fn controller(&self, id: ControllerId) -> Option<&DataController> {
        self.controllers.get(&id)
    }

    pub fn children(&self, id: ControllerId) -> &[ControllerId] {
        self.controller(id).map(DataController::children).unwrap_or(&[])
    }

    /// Every controller of the suite tree, parents before children.
    pub fn iter_tree(&self) -> Vec<ControllerId> {
        let mut out = Vec::new();
        let mut stack: Vec<ControllerId> = self.suite.into_iter().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Suite tree members followed by registered resources.
    fn live_ids(&self) -> Vec<ControllerId> {
        let mut ids = self.iter_tree();
        ids.extend(self.resources.iter().copied());
        ids
    }

    /// Find a live controller by the path of its file or directory.
    pub fn find_by_path(&self, path: &Path) -> Option<ControllerId> {
        let wanted = canonical_path(path);
        self.live_ids().into_iter().find(|id| {
            self.controller(*id).is_some_and(|c| {
                canonical_path(c.location()) == wanted
                    || c.source().is_some_and(|s| canonical_path(s) == wanted)
            })
        })
    }

    /// The registered resource stored at `path`, if any.
    pub fn resource_at(&self, path: &Path) -> Option<ControllerId> {
        let wanted = canonical_path(path);
        self.resources.iter().copied().find(|id| {
            self.controller(*id)
                .and_then(DataController::source)
                .is_some_and(|s| s == wanted.as_path())
        })
    }

    /// Every import entry project-wide that resolves to the resource `id`,
    /// as (importing controller, index into its imports).
    pub fn importers_of(&self, id: ControllerId) -> Vec<(ControllerId, usize)> {
        let Some(target) = self.controller(id).and_then(DataController::source) else {
            return Vec::new();
        };
        let target = canonical_path(target);
        let mut found = Vec::new();
        for importer in self.live_ids() {
            let Some(ctrl) = self.controller(importer) else { continue };
            for (index, import) in ctrl.data.setting_table.resource_imports() {
                if resolve_import_path(&ctrl.data.directory, &import.name) == target {
                    found.push((importer, index));
                }
            }
        }
        found
    }

    pub(crate) fn get(&self, id: ControllerId, operation: Operation) -> Result<&DataController> {
        self.controllers
            .get(&id)
            .ok_or_else(|| AppError::invariant(operation, format!("unknown controller {}", id)))
    }

    /// Like [`get`](Self::get) but rejects removed controllers.
    pub(crate) fn live(&self, id: ControllerId, operation: Operation) -> Result<&DataController> {
        let controller = self.get(id, operation)?;
        if controller.removed {
            return Err(AppError::invariant(
                operation,
                format!("controller {} was removed", id),
            ));
        }
        Ok(controller)
    }

    pub(crate) fn get_mut(&mut self, id: ControllerId, operation: Operation) -> Result<&mut DataController> {
        self.controllers
            .get_mut(&id)
            .ok_or_else(|| AppError::invariant(operation, format!("unknown controller {}", id)))
    }

    /// Nodes for [`render_tree`](crate::app::services::tree_render::render_tree):
    /// the suite tree, then one root per resource.
    pub fn suite_nodes(&self) -> Vec<SuiteNode> {
        let mut nodes: Vec<SuiteNode> = self.suite.iter().filter_map(|id| self.node(*id)).collect();
        nodes.extend(self.resources.iter().filter_map(|id| self.node(*id)));
        nodes
    }

    fn node(&self, id: ControllerId) -> Option<SuiteNode> {
        let ctrl = self.controller(id)?;
        Some(SuiteNode {
            name: ctrl.display_name(),
            kind: ctrl.kind(),
            dirty: ctrl.dirty,
            children: ctrl.children.iter().filter_map(|c| self.node(*c)).collect(),
        })
    }

    // --- Loading ---

    /// Load a project from `path`, replacing whatever was loaded before.
    ///
    /// A directory becomes a directory suite, a file with a test case table
    /// a file suite, and any other data file a registered resource. Nothing
    /// is replaced if any suite file fails to parse.
    pub fn load_data(&mut self, path: &Path) -> Result<ControllerId> {
        let path = canonical_path(path);
        let loader = Loader::new(&self.settings, Operation::Load);
        let tree = if path.is_dir() {
            loader.load_directory(&path)?
        } else {
            loader.load_file(&path, None)?
        };

        self.close();
        let mut added = Vec::new();
        let id = if tree.document.kind == DataKind::Resource {
            let id = self.register_resource(tree);
            added.push(id);
            id
        } else {
            let id = self.attach_tree(tree, Some(ParentLink::Chief));
            self.suite = Some(id);
            id
        };
        added.extend(self.resolve_imports());

        tracing::info!(
            path = %path.display(),
            controllers = self.iter_tree().len(),
            resources = self.resources.len(),
            "loaded project"
        );
        self.publish_resources_added(&added)?;
        Ok(id)
    }

    /// Discard the whole tree and the registry.
    pub fn close(&mut self) {
        if self.suite.is_some() || !self.resources.is_empty() {
            tracing::debug!("closing project");
        }
        self.controllers.clear();
        self.suite = None;
        self.resources.clear();
    }

    /// Return the registered resource for `path`, or register it: parsed
    /// from disk when the file exists, otherwise empty and unsaved.
    pub fn new_resource(&mut self, path: &Path) -> Result<ControllerId> {
        let path = canonical_path(path);
        if let Some(existing) = self.resource_at(&path) {
            return Ok(existing);
        }

        let exists = path.exists();
        let tree = if exists {
            Loader::new(&self.settings, Operation::NewResource).load_file(&path, Some(DataKind::Resource))?
        } else {
            ParsedTree {
                document: Document::empty_resource(&path),
                stamp: None,
                children: Vec::new(),
            }
        };
        let id = self.register_resource(tree);
        if !exists {
            self.get_mut(id, Operation::NewResource)?.dirty = true;
        }

        let mut added = vec![id];
        added.extend(self.resolve_imports());
        self.publish_resources_added(&added)?;
        Ok(id)
    }

    /// Insert a parsed tree into the arena, children first linked to their
    /// new parent id.
    fn attach_tree(&mut self, tree: ParsedTree, parent: Option<ParentLink>) -> ControllerId {
        let id = self.next_controller_id();
        let ParsedTree {
            mut document,
            stamp,
            children,
        } = tree;
        document.parent = match parent {
            Some(ParentLink::Controller(p)) => Some(p),
            _ => None,
        };
        let children = children
            .into_iter()
            .map(|child| self.attach_tree(child, Some(ParentLink::Controller(id))))
            .collect();
        self.controllers
            .insert(id, DataController::new(id, document, parent, children, stamp));
        id
    }

    fn register_resource(&mut self, tree: ParsedTree) -> ControllerId {
        let id = self.attach_tree(tree, Some(ParentLink::Chief));
        self.resources.push(id);
        id
    }

    /// Register every resource imported project-wide that is not yet known.
    /// Returns the newly registered controllers.
    ///
    /// Missing or unparsable resources are logged and skipped.
    pub(crate) fn resolve_imports(&mut self) -> Vec<ControllerId> {
        let mut added = Vec::new();
        let mut pending = self.live_ids();
        while let Some(id) = pending.pop() {
            let Some(ctrl) = self.controller(id) else { continue };
            let paths: Vec<PathBuf> = ctrl
                .data
                .setting_table
                .resource_imports()
                .map(|(_, import)| resolve_import_path(&ctrl.data.directory, &import.name))
                .collect();

            for path in paths {
                if self.resource_at(&path).is_some() {
                    continue;
                }
                if !path.is_file() {
                    tracing::warn!("resource import {} does not exist", path.display());
                    continue;
                }
                let parsed =
                    Loader::new(&self.settings, Operation::Load).load_file(&path, Some(DataKind::Resource));
                match parsed {
                    Ok(tree) => {
                        let resource = self.register_resource(tree);
                        tracing::debug!(resource = %resource, path = %path.display(), "registered resource");
                        added.push(resource);
                        pending.push(resource);
                    }
                    Err(e) => tracing::warn!("skipping resource import: {}", e),
                }
            }
        }
        added
    }

    pub(crate) fn publish_resources_added(&self, ids: &[ControllerId]) -> Result<()> {
        for id in ids {
            if let Some(source) = self.controller(*id).and_then(DataController::source) {
                self.publisher.publish(&ResourceAdded {
                    controller: *id,
                    source: source.to_path_buf(),
                })?;
            }
        }
        Ok(())
    }

    // --- Change detection ---

    pub fn has_been_modified_on_disk(&self, id: ControllerId) -> Result<bool> {
        self.get(id, Operation::CheckModified)?.has_been_modified_on_disk()
    }

    // --- Reload ---

    /// Replace a controller's data with what is on disk now.
    ///
    /// Every file involved is parsed before anything changes, so a failure
    /// leaves the tree as it was. Directories rebuild their children
    /// against the current listing: surviving children keep their ids,
    /// vanished ones are dropped, new ones are created.
    pub fn reload(&mut self, id: ControllerId) -> Result<()> {
        let op = Operation::Reload;
        let ctrl = self.live(id, op)?;
        let loader = Loader::new(&self.settings, op);
        let plan = match ctrl.kind() {
            DataKind::Directory => self.plan_directory(&loader, id, &ctrl.data.directory)?,
            kind => {
                let source = ctrl
                    .source()
                    .ok_or_else(|| AppError::invariant(op, format!("{} {} has no source", kind, id)))?;
                ReloadPlan::from_tree(loader.load_file(source, Some(kind))?)
            }
        };

        let mut dropped = Vec::new();
        let mut added = Vec::new();
        self.apply_plan(id, plan, &mut dropped, &mut added);
        let resources = self.resolve_imports();

        tracing::info!(
            controller = %id,
            dropped = dropped.len(),
            added = added.len(),
            "reloaded from disk"
        );
        self.publish_resources_added(&resources)?;
        self.publisher.publish(&DataReloaded {
            controller: id,
            dropped,
            added,
        })
    }

    fn child_at(&self, parent: ControllerId, location: &Path) -> Option<ControllerId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.controller(*c).is_some_and(|ctrl| ctrl.location() == location))
    }

    fn plan_directory(&self, loader: &Loader<'_>, id: ControllerId, directory: &Path) -> Result<ReloadPlan> {
        let mut plan = ReloadPlan::from_tree(loader.load_directory_document(directory)?);
        for candidate in loader.suite_candidates(directory)? {
            let existing = self
                .child_at(id, &candidate)
                .filter(|c| self.controller(*c).is_some_and(|ctrl| (ctrl.kind() == DataKind::Directory) == candidate.is_dir()));

            match existing {
                Some(child) if candidate.is_dir() => {
                    let child_plan = self.plan_directory(loader, child, &candidate)?;
                    if child_plan.is_suite() {
                        plan.children.push(PlannedChild::Existing(child, child_plan));
                    }
                }
                Some(child) => {
                    let tree = loader.load_file(&candidate, None)?;
                    if tree.document.kind == DataKind::TestCaseFile {
                        plan.children
                            .push(PlannedChild::Existing(child, ReloadPlan::from_tree(tree)));
                    }
                }
                None => {
                    if let Some(tree) = loader.load_suite(&candidate)? {
                        plan.children.push(PlannedChild::New(tree));
                    }
                }
            }
        }
        Ok(plan)
    }

    fn apply_plan(
        &mut self,
        id: ControllerId,
        plan: ReloadPlan,
        dropped: &mut Vec<ControllerId>,
        added: &mut Vec<ControllerId>,
    ) {
        let ReloadPlan {
            mut document,
            stamp,
            children,
        } = plan;
        let old_children = match self.controllers.get_mut(&id) {
            Some(ctrl) => {
                document.parent = ctrl.data.parent;
                ctrl.data = document;
                ctrl.stamp = stamp;
                ctrl.dirty = false;
                if ctrl.kind() != DataKind::Directory {
                    return;
                }
                std::mem::take(&mut ctrl.children)
            }
            None => return,
        };

        let mut new_children = Vec::with_capacity(children.len());
        for child in children {
            match child {
                PlannedChild::Existing(child, child_plan) => {
                    self.apply_plan(child, child_plan, dropped, added);
                    new_children.push(child);
                }
                PlannedChild::New(tree) => {
                    let child = self.attach_tree(tree, Some(ParentLink::Controller(id)));
                    added.push(child);
                    new_children.push(child);
                }
            }
        }
        for old in old_children {
            if !new_children.contains(&old) {
                self.mark_removed(old);
                if let Some(ctrl) = self.controllers.get_mut(&old) {
                    ctrl.parent = None;
                }
                dropped.push(old);
            }
        }
        if let Some(ctrl) = self.controllers.get_mut(&id) {
            ctrl.children = new_children;
        }
    }

    // --- Save ---

    /// Write a controller to disk.
    ///
    /// A directory first saves every child subtree with unsaved edits, then
    /// writes its own init file if it has one or has unsaved edits itself.
    pub fn save(&mut self, id: ControllerId) -> Result<()> {
        let ctrl = self.live(id, Operation::Save)?;
        if ctrl.kind() == DataKind::Directory {
            for child in ctrl.children.clone() {
                if self.needs_saving(child) {
                    self.save(child)?;
                }
            }
            let ctrl = self.get(id, Operation::Save)?;
            if ctrl.data.source.is_none() && !ctrl.dirty {
                return Ok(());
            }
        }
        self.write_own_data(id)
    }

    fn needs_saving(&self, id: ControllerId) -> bool {
        self.controller(id)
            .is_some_and(|c| c.dirty || c.children.iter().any(|child| self.needs_saving(*child)))
    }

    fn write_own_data(&mut self, id: ControllerId) -> Result<()> {
        let op = Operation::Save;
        let ctrl = self.get(id, op)?;
        let path = match (&ctrl.data.source, ctrl.kind()) {
            (Some(source), _) => source.clone(),
            (None, DataKind::Directory) => self.settings.new_init_file(&ctrl.data.directory),
            (None, kind) => {
                return Err(AppError::invariant(op, format!("{} {} has no source", kind, id)));
            }
        };

        write_document(&ctrl.data, &path, &self.settings).map_err(|e| AppError::io(op, &path, e))?;
        let stamp = FileStamp::of(&path).map_err(|e| AppError::io(op, &path, e))?;

        let ctrl = self.get_mut(id, op)?;
        ctrl.data.source = Some(path.clone());
        ctrl.stamp = Some(stamp);
        ctrl.dirty = false;
        self.restamp_listing_of(&path, op)?;
        tracing::debug!(controller = %id, path = %path.display(), "saved");
        self.publisher.publish(&DataSaved {
            controller: id,
            source: path,
        })
    }

    /// Restamp directory suites without an init file whose directory holds
    /// `path`. Their stamp is the directory itself, which our own writes and
    /// deletes in it change.
    pub(crate) fn restamp_listing_of(&mut self, path: &Path, op: Operation) -> Result<()> {
        let Some(directory) = path.parent().map(canonical_path) else {
            return Ok(());
        };
        let stale: Vec<ControllerId> = self
            .iter_tree()
            .into_iter()
            .filter(|id| {
                self.controller(*id).is_some_and(|c| {
                    c.kind() == DataKind::Directory
                        && c.source().is_none()
                        && canonical_path(c.directory()) == directory
                })
            })
            .collect();
        if stale.is_empty() {
            return Ok(());
        }

        let stamp = FileStamp::of(&directory).map_err(|e| AppError::io(op, &directory, e))?;
        for id in stale {
            self.get_mut(id, op)?.stamp = Some(stamp);
            tracing::debug!(controller = %id, directory = %directory.display(), "restamped directory");
        }
        Ok(())
    }

    // --- Removal ---

    /// Detach a controller from the project and publish `DataFileRemoved`.
    /// Removing an already removed controller does nothing.
    pub fn remove(&mut self, id: ControllerId) -> Result<()> {
        match self.detach(id, Operation::Remove)? {
            Some(message) => self.publisher.publish(&message),
            None => Ok(()),
        }
    }

    /// Unlink `id` from its parent, the top suite slot or the registry and
    /// mark its subtree removed. Returns the message to publish, or `None`
    /// if it was already removed.
    pub(crate) fn detach(&mut self, id: ControllerId, operation: Operation) -> Result<Option<DataFileRemoved>> {
        let ctrl = self.get(id, operation)?;
        if ctrl.removed {
            return Ok(None);
        }
        let message = DataFileRemoved {
            controller: id,
            kind: ctrl.kind(),
            source: ctrl.data.source.clone(),
        };
        let parent = ctrl.parent;

        match parent {
            Some(ParentLink::Controller(parent)) => {
                if let Some(parent) = self.controllers.get_mut(&parent) {
                    parent.children.retain(|c| *c != id);
                }
            }
            Some(ParentLink::Chief) => {
                if self.suite == Some(id) {
                    self.suite = None;
                }
                self.resources.retain(|r| *r != id);
            }
            None => {}
        }
        self.mark_removed(id);
        self.get_mut(id, operation)?.parent = None;

        tracing::info!(controller = %id, kind = %message.kind, "removed from project");
        Ok(Some(message))
    }

    fn mark_removed(&mut self, id: ControllerId) {
        let children = match self.controllers.get_mut(&id) {
            Some(ctrl) => {
                ctrl.removed = true;
                ctrl.children.clone()
            }
            None => return,
        };
        for child in children {
            self.mark_removed(child);
        }
    }

    // --- Consistency ---

    /// Verify parent/child agreement across the tree and registry
    /// uniqueness.
    pub fn check_invariants(&self) -> Result<()> {
        let op = Operation::Execute("check invariants");
        if let Some(root) = self.suite {
            let ctrl = self.live(root, op)?;
            if ctrl.parent != Some(ParentLink::Chief) || ctrl.data.parent.is_some() {
                return Err(AppError::invariant(op, format!("top suite {} is not linked to the chief", root)));
            }
        }

        for id in self.iter_tree() {
            let ctrl = self.live(id, op)?;
            if !ctrl.children.is_empty() && ctrl.kind() != DataKind::Directory {
                return Err(AppError::invariant(op, format!("{} {} has children", ctrl.kind(), id)));
            }
            for child in &ctrl.children {
                let child_ctrl = self.live(*child, op)?;
                if child_ctrl.parent != Some(ParentLink::Controller(id)) {
                    return Err(AppError::invariant(
                        op,
                        format!("child {} does not point back to {}", child, id),
                    ));
                }
                if child_ctrl.data.parent != Some(id) {
                    return Err(AppError::invariant(
                        op,
                        format!("document of {} does not name {} as parent", child, id),
                    ));
                }
            }
        }

        let mut seen: Vec<PathBuf> = Vec::new();
        for id in &self.resources {
            let ctrl = self.live(*id, op)?;
            if ctrl.kind() != DataKind::Resource || ctrl.parent != Some(ParentLink::Chief) {
                return Err(AppError::invariant(op, format!("registry entry {} is not a resource", id)));
            }
            let path = ctrl
                .source()
                .map(canonical_path)
                .ok_or_else(|| AppError::invariant(op, format!("resource {} has no source", id)))?;
            if seen.contains(&path) {
                return Err(AppError::invariant(
                    op,
                    format!("{} is registered twice", path.display()),
                ));
            }
            seen.push(path);
        }
        Ok(())
    }
}
