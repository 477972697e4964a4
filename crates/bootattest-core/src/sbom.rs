//! Software bill-of-materials export (A6).
//!
//! Walks the same parsed event stream as the differ and projects boot-stage
//! EFI images and firmware variables into a flat component list. Grounded on
//! the original `export_sbom` routine: EFI-variable-driver-config,
//! boot-services/runtime-services driver, and application events become
//! `efi_image` components (path sniffed out of the event's UTF-8 payload
//! between an `\EFI\`/`/EFI/` marker and the next `.efi`); every firmware
//! variable becomes a `uefi_variable` component.

use serde::Serialize;

use crate::error::Result;
use crate::tcg::{
    AlgorithmId, Event, EV_EFI_BOOT_SERVICES_APPLICATION, EV_EFI_BOOT_SERVICES_DRIVER,
    EV_EFI_RUNTIME_SERVICES_DRIVER, EV_EFI_VARIABLE_DRIVER_CONFIG,
};
use crate::variables::VariableValue;

pub const SBOM_SCHEMA_VERSION: u32 = 1;
pub const GENERATOR_NAME: &str = "bootattest";
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Component {
    #[serde(rename = "efi_image")]
    EfiImage {
        pcr: u32,
        path: String,
        digests: std::collections::BTreeMap<String, String>,
    },
    #[serde(rename = "uefi_variable")]
    UefiVariable {
        name: String,
        guid: String,
        sha256: String,
        size: usize,
        attrs: u32,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Generator {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Sbom {
    pub schema_version: u32,
    pub generator: Generator,
    pub generated_at: u64,
    pub components: Vec<Component>,
}

fn sniff_efi_path(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    for marker in ["\\EFI\\", "/EFI/"] {
        if let Some(start) = text.find(marker)
            && let Some(rel_end) = text[start..].find(".efi") {
                let end = start + rel_end + ".efi".len();
                return text[start..end].to_string();
            }
    }
    String::new()
}

const IMAGE_EVENT_TYPES: [u32; 4] = [
    EV_EFI_VARIABLE_DRIVER_CONFIG,
    EV_EFI_BOOT_SERVICES_APPLICATION,
    EV_EFI_BOOT_SERVICES_DRIVER,
    EV_EFI_RUNTIME_SERVICES_DRIVER,
];

fn image_components(events: &[Event]) -> Vec<Component> {
    events
        .iter()
        .filter(|ev| IMAGE_EVENT_TYPES.contains(&ev.event_type))
        .map(|ev| {
            let digests = ev
                .digests
                .iter()
                .map(|(alg, digest): (&AlgorithmId, &Vec<u8>)| (format!("alg{}", alg.0), hex::encode(digest)))
                .collect();
            Component::EfiImage {
                pcr: ev.register_index,
                path: sniff_efi_path(&ev.data),
                digests,
            }
        })
        .collect()
}

fn variable_components(
    variables: &std::collections::BTreeMap<(String, String), VariableValue>,
) -> Vec<Component> {
    variables
        .iter()
        .map(|((name, guid), value)| {
            use sha2::{Digest, Sha256};
            Component::UefiVariable {
                name: name.clone(),
                guid: guid.clone(),
                sha256: hex::encode(Sha256::digest(&value.data)),
                size: value.data.len(),
                attrs: value.attributes,
            }
        })
        .collect()
}

/// Build an SBOM from parsed events and the current variable set.
/// `generated_at` is supplied by the caller (epoch seconds) so this function
/// stays a pure projection, matching the rest of the core library.
pub fn build_sbom(
    events: &[Event],
    variables: &std::collections::BTreeMap<(String, String), VariableValue>,
    generated_at: u64,
) -> Result<Sbom> {
    let mut components = image_components(events);
    components.extend(variable_components(variables));
    Ok(Sbom {
        schema_version: SBOM_SCHEMA_VERSION,
        generator: Generator {
            name: GENERATOR_NAME.to_string(),
            version: GENERATOR_VERSION.to_string(),
        },
        generated_at,
        components,
    })
}
