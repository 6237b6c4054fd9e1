//! Live uninstall-key views read through `winreg`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use winreg::enums::{
    RegType, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_READ, KEY_WOW64_32KEY, KEY_WOW64_64KEY,
};
use winreg::RegKey;

use super::{ScanBudget, SourceError, SourceView};
use crate::model::Architecture;
use crate::normalize::{Hive, RawEntry, SourceViewId};

const UNINSTALL_PATH: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall";
const APP_PATHS_PATH: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\App Paths";
const WOW_APP_PATHS_PATH: &str = r"SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\App Paths";

/// `App Paths` locations searched for an executable, first hit wins.
const APP_PATHS: [(Hive, &str, u32); 4] = [
    (Hive::LocalMachine, APP_PATHS_PATH, KEY_WOW64_64KEY),
    (Hive::LocalMachine, WOW_APP_PATHS_PATH, KEY_WOW64_32KEY),
    (Hive::CurrentUser, APP_PATHS_PATH, KEY_WOW64_64KEY),
    (Hive::CurrentUser, WOW_APP_PATHS_PATH, KEY_WOW64_32KEY),
];

/// Lower-cased executable name to its registered path (or none).
type AppPathCache = Arc<Mutex<HashMap<String, Option<String>>>>;

/// One hive seen through the 64- or 32-bit registry view.
#[derive(Debug, Clone)]
pub struct RegistryView {
    name: String,
    id: SourceViewId,
    app_paths: AppPathCache,
}

impl RegistryView {
    pub fn new(hive: Hive, architecture: Architecture) -> Self {
        Self::with_cache(hive, architecture, AppPathCache::default())
    }

    fn with_cache(hive: Hive, architecture: Architecture, app_paths: AppPathCache) -> Self {
        let id = SourceViewId::new(hive, architecture);
        Self { name: id.tag(), id, app_paths }
    }

    /// The four views in precedence order: machine before user, 64 before 32.
    /// They share one `App Paths` cache.
    pub fn all() -> Vec<Self> {
        let cache = AppPathCache::default();
        vec![
            Self::with_cache(Hive::LocalMachine, Architecture::X64, cache.clone()),
            Self::with_cache(Hive::LocalMachine, Architecture::X86, cache.clone()),
            Self::with_cache(Hive::CurrentUser, Architecture::X64, cache.clone()),
            Self::with_cache(Hive::CurrentUser, Architecture::X86, cache),
        ]
    }

    fn access_flags(&self) -> u32 {
        match self.id.architecture {
            Architecture::X86 => KEY_READ | KEY_WOW64_32KEY,
            _ => KEY_READ | KEY_WOW64_64KEY,
        }
    }

    fn root(&self) -> RegKey {
        predef(self.id.hive)
    }
}

fn predef(hive: Hive) -> RegKey {
    match hive {
        Hive::LocalMachine => RegKey::predef(HKEY_LOCAL_MACHINE),
        Hive::CurrentUser => RegKey::predef(HKEY_CURRENT_USER),
    }
}

fn lookup_app_path(exe_name: &str) -> Option<String> {
    APP_PATHS.iter().find_map(|(hive, base, view)| {
        let key = predef(*hive)
            .open_subkey_with_flags(format!(r"{base}\{exe_name}"), KEY_READ | view)
            .ok()?;
        key.get_value::<String, _>("").ok().filter(|path| !path.trim().is_empty())
    })
}

fn value_text(key: &RegKey, name: &str, vtype: &RegType) -> Option<String> {
    match vtype {
        RegType::REG_SZ | RegType::REG_EXPAND_SZ => key.get_value::<String, _>(name).ok(),
        RegType::REG_DWORD => key.get_value::<u32, _>(name).ok().map(|v| v.to_string()),
        RegType::REG_QWORD => key.get_value::<u64, _>(name).ok().map(|v| v.to_string()),
        _ => None,
    }
}

impl SourceView for RegistryView {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> SourceViewId {
        self.id
    }

    fn enumerate(&self, budget: &ScanBudget) -> Result<Vec<RawEntry>, SourceError> {
        let flags = self.access_flags();
        let uninstall = self
            .root()
            .open_subkey_with_flags(UNINSTALL_PATH, flags)
            .map_err(|e| SourceError::Unavailable(format!("{UNINSTALL_PATH}: {e}")))?;

        let mut out = Vec::new();
        for key_name in uninstall.enum_keys() {
            if budget.exhausted() {
                return Err(SourceError::Interrupted);
            }
            let Ok(key_name) = key_name else { continue };
            // Individual keys may be locked down; skip them, not the view.
            let Ok(subkey) = uninstall.open_subkey_with_flags(&key_name, flags) else { continue };

            let mut raw = RawEntry::new(self.id, format!(r"{UNINSTALL_PATH}\{key_name}"));
            for value in subkey.enum_values() {
                let Ok((name, data)) = value else { continue };
                if let Some(text) = value_text(&subkey, &name, &data.vtype) {
                    raw.values.insert(name, text);
                }
            }
            out.push(raw);
        }
        Ok(out)
    }

    fn app_path(&self, exe_name: &str) -> Option<String> {
        let key = exe_name.to_lowercase();
        if let Some(hit) = self.app_paths.lock().ok().and_then(|cache| cache.get(&key).cloned()) {
            return hit;
        }
        let resolved = lookup_app_path(exe_name);
        if let Ok(mut cache) = self.app_paths.lock() {
            cache.insert(key, resolved.clone());
        }
        resolved
    }
}
