use super::*;
use crate::abi::{ABI_MAJOR, ABI_REVISION, MODULE_MAGIC};
use wildmatch::WildMatch;

impl ModuleRuntime {
    /// Load the module at `path`, appending the platform suffix if it's
    /// missing.
    ///
    /// The module's init callback runs before this returns, and may itself
    /// load further modules. On any error, nothing the attempt created is left
    /// behind.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<UnitId, LoadError> {
        let path = self.with_suffix(path.as_ref());
        let result = self.load_unit(path.clone());

        match &result {
            Ok(id) => {
                let unit = &self.units[id];
                tracing::info!(
                    name = unit.name(),
                    path = ?unit.path(),
                    address = format_args!("{:#x}", unit.address()),
                    abi = unit.abi_major(),
                    "Loaded module"
                );
                self.notify(ModuleEvent::Loaded {
                    name: unit.name().to_owned(),
                    path: path.clone(),
                    address: unit.address(),
                    abi_major: unit.abi_major(),
                });
            }
            Err(error @ LoadError::AlreadyLoaded(_)) => {
                tracing::info!(?path, "{}", error);
            }
            Err(error) => {
                tracing::error!(?path, "{}", error);
                self.notify(ModuleEvent::LoadFailed {
                    path,
                    error: error.clone(),
                });
            }
        }

        result
    }

    /// Make sure the module published as `name` is loaded, loading it from
    /// the module directory if it isn't.
    pub fn request(&mut self, name: &str) -> Result<UnitId, LoadError> {
        if let Some(unit) = self.find_by_name(name) {
            return Ok(unit.id());
        }

        let path = self.module_dir.join(name);
        self.load(path)
    }

    /// Try to load every module file in `dir`. A failure for one file doesn't
    /// stop the others being tried.
    pub fn load_directory(&mut self, dir: impl AsRef<Path>) -> std::io::Result<Vec<LoadOutcome>> {
        self.scan_directory(dir.as_ref(), None)
    }

    /// As [`load_directory`](Self::load_directory), but only for files whose
    /// names match the glob-style `pattern`.
    pub fn load_directory_filtered(
        &mut self,
        dir: impl AsRef<Path>,
        pattern: &str,
    ) -> std::io::Result<Vec<LoadOutcome>> {
        self.scan_directory(dir.as_ref(), Some(WildMatch::new(pattern)))
    }

    fn scan_directory(
        &mut self,
        dir: &Path,
        pattern: Option<WildMatch>,
    ) -> std::io::Result<Vec<LoadOutcome>> {
        let suffix = self.loader.suffix().to_owned();
        let mut paths = Vec::new();

        for entry in std::fs::read_dir(dir)?.flatten() {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };

            if !file_name.ends_with(&suffix) {
                continue;
            }
            if let Some(pattern) = &pattern {
                if !pattern.matches(file_name) {
                    continue;
                }
            }

            paths.push(entry.path());
        }

        // Directory order is arbitrary; keep loads reproducible
        paths.sort();

        Ok(paths
            .into_iter()
            .map(|path| {
                let result = self.load(&path);
                (path, result)
            })
            .collect())
    }

    fn load_unit(&mut self, path: PathBuf) -> Result<UnitId, LoadError> {
        // Embryonic units count: their path and name are already taken
        if self.units.values().any(|u| u.path() == path) {
            return Err(LoadError::AlreadyLoaded(path));
        }

        let code = match self.loader.open(&path) {
            Ok(code) => code,
            Err(error) => {
                return Err(LoadError::OpenFailed {
                    path,
                    reason: error.to_string(),
                })
            }
        };

        let header = match code.header() {
            Some(header) if header.magic == MODULE_MAGIC => *header,
            _ => {
                tracing::debug!(?path, "Attempted to load an incompatible module");
                return Err(LoadError::NotAnExtension(path));
            }
        };

        if header.abi_major != ABI_MAJOR {
            return Err(LoadError::AbiVersionMismatch {
                path,
                have: header.abi_major,
                want: ABI_MAJOR,
            });
        }

        if header.abi_revision != ABI_REVISION {
            return Err(LoadError::AbiRevisionMismatch {
                path,
                have: header.abi_revision,
                want: ABI_REVISION,
            });
        }

        if self.units.values().any(|u| u.has_name(header.name)) {
            return Err(LoadError::DuplicatePublishedName {
                name: header.name.to_owned(),
                path,
            });
        }

        let id = self.next_unit_id();
        let unit = ModuleUnit::new(id, path.clone(), &header, code);
        self.units.insert(id, unit);

        tracing::debug!(name = header.name, %id, ?path, "Initialising module");
        (header.init)(&mut ModuleContext::new(self, id));

        let reason = match self.units.get_mut(&id) {
            Some(unit) if unit.state == UnitState::Embryonic => {
                unit.state = UnitState::Standard;
                return Ok(id);
            }
            Some(unit) => match &unit.state {
                UnitState::Failed(reason) => reason.clone(),
                other => format!("module left initialisation in state {:?}", other),
            },
            None => "module was removed during initialisation".to_owned(),
        };

        // Anything that came to depend on it during init goes too
        let order = self.graph.teardown_order(id);
        self.teardown(&order);

        Err(LoadError::InitFailed { path, reason })
    }
}
