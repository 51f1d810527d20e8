//! Event source registration against the Application event log registry tree.
//!
//! The OS renders events from a registered source using the message resource
//! file recorded under `SYSTEM\CurrentControlSet\Services\EventLog\Application`.

use std::path::PathBuf;

use anyhow::Result;
use log::{debug, info};

/// Registry root under HKEY_LOCAL_MACHINE for Application log sources.
pub const APPLICATION_LOG_ROOT: &str = r"SYSTEM\CurrentControlSet\Services\EventLog\Application";

pub const EVENTLOG_ERROR_TYPE: u32 = 0x0001;
pub const EVENTLOG_WARNING_TYPE: u32 = 0x0002;
pub const EVENTLOG_INFORMATION_TYPE: u32 = 0x0004;

/// Registration request for a new event source.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub name: String,
    pub message_file: PathBuf,
    pub uses_event_message_file: bool,
    pub event_types_supported: u32,
}

/// What a query of an existing source key found. Diagnostic only: existence
/// of the key alone drives the registrar's verdict.
#[derive(Debug, Clone, Default)]
pub struct SourceKeyInfo {
    pub value_names: Vec<String>,
    pub custom_source: Option<u32>,
}

/// Access to the event log service registry tree. Implemented by the live
/// registry on Windows and by in-memory stubs in tests.
pub trait SourceRegistry {
    /// Opens `<application root>\<subkey>` for query access. `Err` means the
    /// key could not be opened, whatever the cause.
    fn query_source(&self, subkey: &str) -> Result<SourceKeyInfo>;

    /// Creates the source descriptor key and its values.
    fn install_source(&self, spec: &SourceSpec) -> Result<()>;
}

/// Checks for and installs event source descriptors.
pub struct Registrar<'a> {
    registry: &'a dyn SourceRegistry,
}

impl<'a> Registrar<'a> {
    pub fn new(registry: &'a dyn SourceRegistry) -> Self {
        Self { registry }
    }

    /// Approximate existence check: any key that opens counts as registered,
    /// even when its values are missing or unreadable. Any open failure
    /// counts as absent, with the cause not distinguished.
    pub fn exists_source(&self, name: &str) -> bool {
        info!("Looking for {}\\{}", APPLICATION_LOG_ROOT, name);
        match self.registry.query_source(name) {
            Ok(found) => {
                debug!("value names: {:?}", found.value_names);
                match found.custom_source {
                    Some(value) => debug!("CustomSource = {}", value),
                    None => debug!("CustomSource value not readable"),
                }
                true
            }
            Err(err) => {
                debug!("{:#}", err);
                false
            }
        }
    }

    /// Installs the source descriptor. Errors propagate unchanged; there is
    /// no retry and no post-install verification.
    pub fn install_source(&self, spec: &SourceSpec) -> Result<()> {
        info!("Registering event source {}", spec.name);
        self.registry.install_source(spec)
    }
}

/// Live registry access rooted at HKEY_LOCAL_MACHINE.
pub struct WindowsRegistry;

impl WindowsRegistry {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceRegistry for WindowsRegistry {
    fn query_source(&self, subkey: &str) -> Result<SourceKeyInfo> {
        #[cfg(target_os = "windows")]
        {
            query_source_windows(subkey)
        }
        #[cfg(not(target_os = "windows"))]
        {
            let _ = subkey;
            log::warn!("registry access is only available on Windows");
            anyhow::bail!("event source lookup requires Windows")
        }
    }

    fn install_source(&self, spec: &SourceSpec) -> Result<()> {
        #[cfg(target_os = "windows")]
        {
            install_source_windows(spec)
        }
        #[cfg(not(target_os = "windows"))]
        {
            let _ = spec;
            log::warn!("registry access is only available on Windows");
            anyhow::bail!("event source installation requires Windows")
        }
    }
}

#[cfg(target_os = "windows")]
fn query_source_windows(subkey: &str) -> Result<SourceKeyInfo> {
    use windows::core::{PCWSTR, PWSTR};
    use windows::Win32::Foundation::ERROR_NO_MORE_ITEMS;
    use windows::Win32::System::Registry::{
        RegCloseKey, RegEnumValueW, RegOpenKeyExW, RegQueryValueExW, HKEY, HKEY_LOCAL_MACHINE,
        KEY_QUERY_VALUE, REG_DWORD, REG_VALUE_TYPE,
    };

    use crate::sys::to_wide;

    let path = to_wide(&format!("{}\\{}", APPLICATION_LOG_ROOT, subkey));
    let mut key = HKEY::default();
    let status = unsafe {
        RegOpenKeyExW(
            HKEY_LOCAL_MACHINE,
            PCWSTR::from_raw(path.as_ptr()),
            0,
            KEY_QUERY_VALUE,
            &mut key,
        )
    };
    if status.is_err() {
        anyhow::bail!("RegOpenKeyExW failed with code {}", status.0);
    }

    let mut info = SourceKeyInfo::default();

    // Value names are diagnostic only; enumeration is capped at 10.
    for index in 0..10u32 {
        let mut name_buf = [0u16; 256];
        let mut name_len = name_buf.len() as u32;
        let status = unsafe {
            RegEnumValueW(
                key,
                index,
                PWSTR::from_raw(name_buf.as_mut_ptr()),
                &mut name_len,
                None,
                None,
                None,
                None,
            )
        };
        if status.is_err() {
            if status != ERROR_NO_MORE_ITEMS {
                debug!("RegEnumValueW failed with code {}", status.0);
            }
            break;
        }
        info.value_names
            .push(String::from_utf16_lossy(&name_buf[..name_len as usize]));
    }

    let value_name = to_wide("CustomSource");
    let mut data = 0u32;
    let mut data_len = std::mem::size_of::<u32>() as u32;
    let mut value_type = REG_VALUE_TYPE::default();
    let status = unsafe {
        RegQueryValueExW(
            key,
            PCWSTR::from_raw(value_name.as_ptr()),
            None,
            Some(&mut value_type),
            Some(&mut data as *mut u32 as *mut u8),
            Some(&mut data_len),
        )
    };
    if status.is_ok() && value_type == REG_DWORD {
        info.custom_source = Some(data);
    } else {
        debug!("CustomSource query failed with code {}", status.0);
    }

    unsafe {
        let _ = RegCloseKey(key);
    }
    Ok(info)
}

#[cfg(target_os = "windows")]
fn install_source_windows(spec: &SourceSpec) -> Result<()> {
    use windows::core::PCWSTR;
    use windows::Win32::System::Registry::{
        RegCloseKey, RegCreateKeyExW, HKEY, HKEY_LOCAL_MACHINE, KEY_SET_VALUE,
        REG_CREATE_KEY_DISPOSITION, REG_OPTION_NON_VOLATILE,
    };

    use crate::sys::to_wide;

    let path = to_wide(&format!("{}\\{}", APPLICATION_LOG_ROOT, spec.name));
    let mut key = HKEY::default();
    let mut disposition = REG_CREATE_KEY_DISPOSITION::default();
    let status = unsafe {
        RegCreateKeyExW(
            HKEY_LOCAL_MACHINE,
            PCWSTR::from_raw(path.as_ptr()),
            0,
            PCWSTR::null(),
            REG_OPTION_NON_VOLATILE,
            KEY_SET_VALUE,
            None,
            &mut key,
            Some(&mut disposition),
        )
    };
    if status.is_err() {
        anyhow::bail!("RegCreateKeyExW failed with code {}", status.0);
    }

    let result = write_source_values(key, spec);
    unsafe {
        let _ = RegCloseKey(key);
    }
    result
}

#[cfg(target_os = "windows")]
fn write_source_values(key: windows::Win32::System::Registry::HKEY, spec: &SourceSpec) -> Result<()> {
    set_dword(key, "CustomSource", 1)?;
    if spec.uses_event_message_file {
        set_expand_string(key, "EventMessageFile", &spec.message_file.to_string_lossy())?;
    }
    set_dword(key, "TypesSupported", spec.event_types_supported)?;
    Ok(())
}

#[cfg(target_os = "windows")]
fn set_dword(key: windows::Win32::System::Registry::HKEY, name: &str, value: u32) -> Result<()> {
    use windows::core::PCWSTR;
    use windows::Win32::System::Registry::{RegSetValueExW, REG_DWORD};

    let name_wide = crate::sys::to_wide(name);
    let status = unsafe {
        RegSetValueExW(
            key,
            PCWSTR::from_raw(name_wide.as_ptr()),
            0,
            REG_DWORD,
            Some(&value.to_le_bytes()),
        )
    };
    if status.is_err() {
        anyhow::bail!("failed to set {} (code {})", name, status.0);
    }
    Ok(())
}

#[cfg(target_os = "windows")]
fn set_expand_string(
    key: windows::Win32::System::Registry::HKEY,
    name: &str,
    value: &str,
) -> Result<()> {
    use windows::core::PCWSTR;
    use windows::Win32::System::Registry::{RegSetValueExW, REG_EXPAND_SZ};

    let name_wide = crate::sys::to_wide(name);
    let data: Vec<u8> = crate::sys::to_wide(value)
        .iter()
        .flat_map(|unit| unit.to_le_bytes())
        .collect();
    let status = unsafe {
        RegSetValueExW(
            key,
            PCWSTR::from_raw(name_wide.as_ptr()),
            0,
            REG_EXPAND_SZ,
            Some(&data),
        )
    };
    if status.is_err() {
        anyhow::bail!("failed to set {} (code {})", name, status.0);
    }
    Ok(())
}
