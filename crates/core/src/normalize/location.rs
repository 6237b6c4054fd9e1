//! Install-location cleanup and fallback resolution.
//!
//! Many uninstall keys leave `InstallLocation` blank; the executable paths in
//! `DisplayIcon` or `UninstallString` usually point into the install folder.
//! When they only name an executable, the `App Paths` registration for it is
//! tried last. `%VAR%` references and a leading `~` are expanded.

use std::sync::LazyLock;

use regex::Regex;

use super::raw::{value_names, RawEntry};

/// Placeholder text some installers write instead of a path.
const PLACEHOLDER_LOCATIONS: &[&str] = &["unknown", "n/a", "na", "none", "null"];

/// System hosts that appear in uninstall commands but say nothing about
/// where the application lives.
const SYSTEM_HOSTS: &[&str] =
    &["msiexec.exe", "rundll32.exe", "regsvr32.exe", "cmd.exe", "powershell.exe", "pwsh.exe"];

/// Values consulted, in order, when `InstallLocation` is missing.
const FALLBACK_VALUES: &[&str] = &[
    value_names::DISPLAY_ICON,
    value_names::UNINSTALL_STRING,
    value_names::QUIET_UNINSTALL_STRING,
    value_names::MODIFY_PATH,
];

static ENV_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([^%=\\/:]+)%").expect("ENV_REFERENCE must compile"));

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn no_app_path(_exe_name: &str) -> Option<String> {
    None
}

const PROCESS_ENV: Lookup<'static> = &process_env;
const NO_APP_PATH: Lookup<'static> = &no_app_path;

/// Outside information the resolver may consult beyond the record itself.
#[derive(Clone, Copy)]
pub struct LocationLookups<'a> {
    /// Environment variables for `%NAME%` and `~` expansion.
    pub env: Lookup<'a>,
    /// Registered full path for an executable name, e.g. from `App Paths`.
    pub app_path: Lookup<'a>,
}

impl<'a> LocationLookups<'a> {
    /// The process environment and no `App Paths` registrations.
    pub fn process() -> Self {
        Self { env: PROCESS_ENV, app_path: NO_APP_PATH }
    }

    pub fn with_env(self, env: Lookup<'a>) -> Self {
        Self { env, ..self }
    }

    pub fn with_app_path(self, app_path: Lookup<'a>) -> Self {
        Self { app_path, ..self }
    }
}

/// Resolve the install folder for a raw entry using the process environment.
pub fn resolve_install_location(raw: &RawEntry) -> Option<String> {
    resolve_install_location_with(raw, LocationLookups::process())
}

/// Resolve the install folder: `InstallLocation`, then paths inside the
/// fallback commands, then `App Paths` for the executables they name.
pub fn resolve_install_location_with(
    raw: &RawEntry,
    lookups: LocationLookups<'_>,
) -> Option<String> {
    let clean = |text: &str| clean_location_with(text, lookups.env);
    if let Some(location) = raw.text(value_names::INSTALL_LOCATION).and_then(clean) {
        return Some(location);
    }

    let commands = || FALLBACK_VALUES.iter().filter_map(|name| raw.text(name));
    if let Some(location) = commands().filter_map(command_path).find_map(|path| clean(&path)) {
        return Some(location);
    }
    commands()
        .filter_map(exe_name)
        .filter_map(|exe| (lookups.app_path)(&exe))
        .find_map(|path| clean(&path))
}

/// Strip quotes and placeholders and expand variables from the process
/// environment; an executable path becomes its folder.
pub fn clean_location(raw: &str) -> Option<String> {
    clean_location_with(raw, PROCESS_ENV)
}

/// [`clean_location`] with an explicit environment.
pub fn clean_location_with(raw: &str, env: Lookup<'_>) -> Option<String> {
    let path = raw.trim().trim_matches('"').trim();
    if path.is_empty() {
        return None;
    }
    let folded = path.to_ascii_lowercase();
    if PLACEHOLDER_LOCATIONS.contains(&folded.as_str()) || folded.starts_with("unknown") {
        return None;
    }

    let path = expand_env_vars_with(path, env);
    // ASCII lower-casing keeps byte offsets, so `idx` is valid in `path`.
    let folded = path.to_ascii_lowercase();
    if let Some(idx) = folded.find(".exe") {
        return parent_dir(&path[..idx + 4]).map(str::to_string);
    }
    Some(path.trim_end_matches(['\\', '/']).to_string()).filter(|p| !p.is_empty())
}

/// Expand a leading `~` and `%NAME%` references. Unknown variables are left
/// as written.
pub fn expand_env_vars_with(text: &str, env: Lookup<'_>) -> String {
    let text = match text.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['\\', '/']) => {
            match env("USERPROFILE").or_else(|| env("HOME")) {
                Some(home) => format!("{home}{rest}"),
                None => text.to_string(),
            }
        }
        _ => text.to_string(),
    };
    ENV_REFERENCE
        .replace_all(&text, |caps: &regex::Captures<'_>| {
            env(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Pull an executable path out of a command line, ignoring system hosts.
pub fn command_path(raw: &str) -> Option<String> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(quoted) = text.strip_prefix('"') {
        let end = quoted.find('"')?;
        let candidate = &quoted[..end];
        return (!candidate.is_empty() && !is_system_host(candidate))
            .then(|| candidate.to_string());
    }
    let folded = text.to_ascii_lowercase();
    let candidate = if let Some(idx) = folded.find(".exe") {
        text[..idx + 4].split(',').next().unwrap_or_default().trim()
    } else if text.as_bytes().get(1) == Some(&b':') {
        text.split(' ').next().unwrap_or_default().split(',').next().unwrap_or_default().trim()
    } else {
        return None;
    };
    (!candidate.is_empty() && !is_system_host(candidate)).then(|| candidate.to_string())
}

/// File name of the executable a command runs (`foo.exe`), if it is one.
fn exe_name(raw: &str) -> Option<String> {
    let path = command_path(raw)?;
    let name = file_name(&path);
    name.to_ascii_lowercase().ends_with(".exe").then(|| name.to_string())
}

fn file_name(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

fn parent_dir(path: &str) -> Option<&str> {
    let idx = path.rfind(['\\', '/'])?;
    let parent = &path[..idx];
    (!parent.is_empty()).then_some(parent)
}

fn is_system_host(path: &str) -> bool {
    let name = file_name(path.trim().trim_matches('"')).to_lowercase();
    SYSTEM_HOSTS.contains(&name.as_str())
}
