//! Structural edits executed against one controller through
//! [`ChiefController::execute`].

use crate::app::controllers::chief::ChiefController;
use crate::app::controllers::data::{ControllerId, DataController};
use crate::app::domain::document::{DataKind, Import, ImportKind, SettingRow, TestCase, UserKeyword};
use crate::app::domain::messages::{DataModified, InitFileRemoved};
use crate::app::domain::stamp::FileStamp;
use crate::app::infrastructure::error::{AppError, Operation, Result};
use crate::app::infrastructure::filesystem::remove_file_if_exists;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the data with what is on disk.
    Reload,
    /// Write the data to disk.
    SaveFile,
    /// Delete the file and detach the controller. Imports of it are kept.
    DeleteFile,
    /// Delete a resource file together with every import entry pointing at it.
    DeleteResourceAndImports,
    /// Delete a directory suite's init file and drop its settings.
    DeleteInitFile,
    AddTestCase { name: String },
    AddKeyword { name: String },
    AddImport { kind: ImportKind, name: String, args: Vec<String> },
    RemoveImport { index: usize },
    SetDocumentation { value: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Reload => "Reload",
            Command::SaveFile => "SaveFile",
            Command::DeleteFile => "DeleteFile",
            Command::DeleteResourceAndImports => "DeleteResourceAndImports",
            Command::DeleteInitFile => "DeleteInitFile",
            Command::AddTestCase { .. } => "AddTestCase",
            Command::AddKeyword { .. } => "AddKeyword",
            Command::AddImport { .. } => "AddImport",
            Command::RemoveImport { .. } => "RemoveImport",
            Command::SetDocumentation { .. } => "SetDocumentation",
        }
    }

    pub fn is_applicable(&self, controller: &DataController) -> bool {
        match self {
            Command::Reload | Command::SaveFile => true,
            Command::DeleteFile => controller.kind() != DataKind::Directory,
            Command::DeleteResourceAndImports => controller.kind() == DataKind::Resource,
            Command::DeleteInitFile => controller.kind() == DataKind::Directory && controller.has_format(),
            Command::AddTestCase { .. } => controller.kind() == DataKind::TestCaseFile,
            Command::AddKeyword { .. } => controller.kind() != DataKind::Directory || controller.has_format(),
            Command::AddImport { .. } | Command::RemoveImport { .. } | Command::SetDocumentation { .. } => true,
        }
    }
}

impl ChiefController {
    /// Run `command` against `target`. A command that does not apply to the
    /// target's kind fails before anything changes.
    pub fn execute(&mut self, target: ControllerId, command: Command) -> Result<()> {
        let op = Operation::Execute(command.name());
        let ctrl = self.live(target, op)?;
        if !command.is_applicable(ctrl) {
            return Err(AppError::NotApplicable {
                operation: op,
                kind: ctrl.kind(),
                path: ctrl.location().to_path_buf(),
            });
        }
        tracing::debug!(controller = %target, command = command.name(), "execute");

        match command {
            Command::Reload => self.reload(target),
            Command::SaveFile => self.save(target),
            Command::DeleteFile => self.delete_file(target, op),
            Command::DeleteResourceAndImports => self.delete_resource_and_imports(target, op),
            Command::DeleteInitFile => self.delete_init_file(target, op),
            Command::AddTestCase { name } => self.edit(target, op, |ctrl| {
                ctrl.data.testcase_table.push(TestCase { name, steps: Vec::new() });
                Ok(())
            }),
            Command::AddKeyword { name } => self.edit(target, op, |ctrl| {
                ctrl.data.keyword_table.push(UserKeyword { name, steps: Vec::new() });
                Ok(())
            }),
            Command::AddImport { kind, name, args } => {
                self.edit(target, op, |ctrl| {
                    let mut import = Import::new(kind, name);
                    import.args = args;
                    ctrl.data.setting_table.push(SettingRow::Import(import));
                    Ok(())
                })?;
                if kind == ImportKind::Resource {
                    let added = self.resolve_imports();
                    self.publish_resources_added(&added)?;
                }
                Ok(())
            }
            Command::RemoveImport { index } => self.edit(target, op, |ctrl| {
                let table = &mut ctrl.data.setting_table;
                if table.remove_import(index).is_none() {
                    return Err(AppError::invariant(
                        op,
                        format!("import {} out of range, {} has {}", index, ctrl.id, table.import_count()),
                    ));
                }
                Ok(())
            }),
            Command::SetDocumentation { value } => self.edit(target, op, |ctrl| {
                ctrl.data.setting_table.set_documentation(value);
                Ok(())
            }),
        }
    }

    /// Apply an in-memory edit, mark the controller dirty and announce it.
    fn edit<F>(&mut self, target: ControllerId, op: Operation, apply: F) -> Result<()>
    where
        F: FnOnce(&mut DataController) -> Result<()>,
    {
        let ctrl = self.get_mut(target, op)?;
        apply(ctrl)?;
        ctrl.dirty = true;
        self.publisher.publish(&DataModified { controller: target })
    }

    fn delete_file(&mut self, target: ControllerId, op: Operation) -> Result<()> {
        if let Some(path) = self.get(target, op)?.source().map(|p| p.to_path_buf()) {
            remove_file_if_exists(&path).map_err(|e| AppError::io(op, &path, e))?;
            self.restamp_listing_of(&path, op)?;
            tracing::info!("deleted {}", path.display());
        }
        match self.detach(target, op)? {
            Some(message) => self.publisher.publish(&message),
            None => Ok(()),
        }
    }

    fn delete_resource_and_imports(&mut self, target: ControllerId, op: Operation) -> Result<()> {
        let importers = self.importers_of(target);
        if let Some(path) = self.get(target, op)?.source().map(|p| p.to_path_buf()) {
            remove_file_if_exists(&path).map_err(|e| AppError::io(op, &path, e))?;
            self.restamp_listing_of(&path, op)?;
            tracing::info!(importers = importers.len(), "deleted {}", path.display());
        }

        // Indexes of one importer ascend, so removing back to front keeps
        // the remaining ones valid.
        for (importer, index) in importers.iter().rev() {
            let ctrl = self.get_mut(*importer, op)?;
            ctrl.data.setting_table.remove_import(*index);
            ctrl.dirty = true;
        }
        let removed = self.detach(target, op)?;

        let mut modified: Vec<ControllerId> = Vec::new();
        for (importer, _) in importers {
            if !modified.contains(&importer) {
                modified.push(importer);
            }
        }
        for controller in modified {
            self.publisher.publish(&DataModified { controller })?;
        }
        match removed {
            Some(message) => self.publisher.publish(&message),
            None => Ok(()),
        }
    }

    fn delete_init_file(&mut self, target: ControllerId, op: Operation) -> Result<()> {
        let ctrl = self.get(target, op)?;
        let Some(path) = ctrl.source().map(|p| p.to_path_buf()) else {
            return Ok(());
        };
        remove_file_if_exists(&path).map_err(|e| AppError::io(op, &path, e))?;
        let directory = ctrl.directory().to_path_buf();
        let stamp = FileStamp::of(&directory).map_err(|e| AppError::io(op, &directory, e))?;

        let ctrl = self.get_mut(target, op)?;
        ctrl.data.clear_tables();
        ctrl.data.source = None;
        ctrl.stamp = Some(stamp);
        tracing::info!("deleted init file {}", path.display());
        self.publisher.publish(&InitFileRemoved {
            controller: target,
            source: path,
        })
    }
}
