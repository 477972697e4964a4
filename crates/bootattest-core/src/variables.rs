//! Firmware-variable reader (C3).
//!
//! A capability-typed strategy selected once at construction (REDESIGN
//! FLAGS §9: no inline platform-string branching at read time).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::Result;

/// A single firmware variable's raw contents and attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableValue {
    pub data: Vec<u8>,
    pub attributes: u32,
}

/// Key used throughout baseline/diff: `"NAME-guid-lowercase"`.
pub fn variable_key(name: &str, guid: &str) -> String {
    format!("{name}-{guid}")
}

/// How variables are obtained for this invocation, chosen once.
pub enum VariableSource {
    /// Read `NAME-GUID` files from an override directory (tests, CI fixtures).
    Override(PathBuf),
    /// Read the Linux firmware-variables pseudo-filesystem.
    LinuxFirmwareFs(PathBuf),
    /// Query the Windows native firmware-variable retrieval entry point.
    WindowsNative,
    /// No variable source is available on this platform.
    Unsupported,
}

impl VariableSource {
    /// Resolve which strategy applies given an optional override directory.
    pub fn resolve(override_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = override_dir {
            return VariableSource::Override(dir);
        }
        if cfg!(target_os = "linux") {
            return VariableSource::LinuxFirmwareFs(PathBuf::from(
                "/sys/firmware/efi/efivars",
            ));
        }
        if cfg!(target_os = "windows") {
            return VariableSource::WindowsNative;
        }
        VariableSource::Unsupported
    }

    pub fn read(&self) -> Result<BTreeMap<(String, String), VariableValue>> {
        match self {
            VariableSource::Override(dir) | VariableSource::LinuxFirmwareFs(dir) => {
                read_directory(dir)
            }
            VariableSource::WindowsNative => read_windows_native(),
            VariableSource::Unsupported => Ok(BTreeMap::new()),
        }
    }
}

/// Read every regular `NAME-GUID` file from `root` (used for both the
/// override directory and the Linux firmware-variables pseudo-filesystem:
/// they share a byte layout, only the directory differs).
fn read_directory(root: &Path) -> Result<BTreeMap<(String, String), VariableValue>> {
    let mut out = BTreeMap::new();
    if !root.is_dir() {
        return Ok(out);
    }

    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        // The GUID is the canonical 36-character suffix; it contains dashes
        // itself, so splitting on the last '-' would cut into it. Take the
        // fixed-width suffix instead and require a separating '-' before it.
        const GUID_LEN: usize = 36;
        if file_name.len() < GUID_LEN + 2 {
            continue;
        }
        let split_at = file_name.len() - GUID_LEN;
        let (name_with_sep, guid_raw) = file_name.split_at(split_at);
        let Some(name) = name_with_sep.strip_suffix('-') else {
            continue;
        };
        let Ok(guid) = Uuid::parse_str(guid_raw) else {
            continue;
        };

        let bytes = std::fs::read(entry.path())?;
        if bytes.len() < 4 {
            continue;
        }
        let attributes = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let data = bytes[4..].to_vec();

        out.insert(
            (name.to_string(), guid.hyphenated().to_string()),
            VariableValue { data, attributes },
        );
    }

    Ok(out)
}

#[cfg_attr(not(any(target_os = "windows", test)), allow(dead_code))]
const EFI_GLOBAL_VARIABLE_GUID: &str = "8be4df61-93ca-11d2-aa0d-00e098032b8c";
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
const CURATED_NAMES: &[&str] = &["SecureBoot", "PK", "KEK", "db", "dbx", "BootOrder"];
/// Capped from the full `Boot0000..BootFFF` (4096 probes): most of that
/// range misses, and anything past this cap is negligible for attestation.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
const BOOT_ENTRY_PROBE_LIMIT: u32 = 0x0100;

#[cfg(target_os = "windows")]
fn read_windows_native() -> Result<BTreeMap<(String, String), VariableValue>> {
    let mut out = BTreeMap::new();
    for name in CURATED_NAMES {
        if let Some(value) = win_get_firmware_variable(name, EFI_GLOBAL_VARIABLE_GUID)? {
            out.insert((name.to_string(), EFI_GLOBAL_VARIABLE_GUID.to_string()), value);
        }
    }
    for num in 0..BOOT_ENTRY_PROBE_LIMIT {
        let name = format!("Boot{num:04X}");
        if let Some(value) = win_get_firmware_variable(&name, EFI_GLOBAL_VARIABLE_GUID)? {
            out.insert((name, EFI_GLOBAL_VARIABLE_GUID.to_string()), value);
        }
    }
    Ok(out)
}

/// Call the native firmware-variable retrieval entry point for a single
/// variable. Returns `Ok(None)` when the platform reports the variable is
/// absent, access is not held, or the call is otherwise unsupported on this
/// system; any other failure is a platform error.
#[cfg(target_os = "windows")]
#[allow(unsafe_code)]
fn win_get_firmware_variable(name: &str, guid: &str) -> Result<Option<VariableValue>> {
    use crate::error::AttestError;
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{
        GetLastError, ERROR_ENVVAR_NOT_FOUND, ERROR_FILE_NOT_FOUND, ERROR_INVALID_FUNCTION,
        ERROR_PRIVILEGE_NOT_HELD,
    };
    use windows::Win32::System::SystemServices::GetFirmwareEnvironmentVariableExW;

    const BUFFER_SIZE: usize = 65536;

    let brace_guid = format!("{{{}}}", guid.to_uppercase());
    let wide_name: Vec<u16> = name.encode_utf16().chain(Some(0)).collect();
    let wide_guid: Vec<u16> = brace_guid.encode_utf16().chain(Some(0)).collect();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut attributes: u32 = 0;

    // SAFETY: both wide strings are NUL-terminated and outlive the call; the
    // buffer pointer/length pair describes `buffer` exactly; `attributes` is
    // a valid out-param. A short/zero return is handled below rather than
    // trusted to have written through the buffer.
    let written = unsafe {
        GetFirmwareEnvironmentVariableExW(
            PCWSTR(wide_name.as_ptr()),
            PCWSTR(wide_guid.as_ptr()),
            Some(buffer.as_mut_ptr() as *mut core::ffi::c_void),
            BUFFER_SIZE as u32,
            Some(&mut attributes),
        )
    };

    if written == 0 {
        let err = unsafe { GetLastError() }.0;
        return match err {
            e if e == ERROR_FILE_NOT_FOUND.0
                || e == ERROR_ENVVAR_NOT_FOUND.0
                || e == ERROR_PRIVILEGE_NOT_HELD.0
                || e == ERROR_INVALID_FUNCTION.0 =>
            {
                Ok(None)
            }
            other => Err(AttestError::platform(format!(
                "GetFirmwareEnvironmentVariableExW({name}) failed: error {other}"
            ))),
        };
    }

    // A truncation return (written == BUFFER_SIZE) is treated identically to
    // success returning the buffer's full byte count, per the resource model.
    let len = (written as usize).min(BUFFER_SIZE);
    buffer.truncate(len);
    Ok(Some(VariableValue {
        data: buffer,
        attributes,
    }))
}

#[cfg(not(target_os = "windows"))]
fn read_windows_native() -> Result<BTreeMap<(String, String), VariableValue>> {
    unreachable!("VariableSource::WindowsNative is only constructed on target_os = \"windows\"")
}

/// Project a variable map into `"NAME-guid" -> hex_sha256(data)`.
pub fn hash_variables(vars: &BTreeMap<(String, String), VariableValue>) -> BTreeMap<String, String> {
    vars.iter()
        .map(|((name, guid), value)| {
            let digest = Sha256::digest(&value.data);
            (variable_key(name, guid), hex::encode(digest))
        })
        .collect()
}
