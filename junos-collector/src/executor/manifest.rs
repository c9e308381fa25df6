//! Manifest types: the ordered list of commands a run collects.
//!
//! Each entry's `output_name` becomes a file name inside the output
//! directory, so names must be unique plain file names. `Manifest::new`
//! enforces this instead of de-duplicating at run time.

use crate::utils::errors::{CollectorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Built-in Junos collection, in execution order.
const JUNOS_COMMANDS: &[(&str, &str)] = &[
    ("config_xml", "show configuration | display xml | display inheritance | no-more"),
    ("interfaces_xml", "show interfaces | display xml | no-more"),
    ("arp_xml", "show arp | display xml | no-more"),
    ("ipv6_neighbor_xml", "show ipv6 neighbor | display xml | no-more"),
    ("service_xml", "show configuration groups junos-defaults applications | display xml | no-more"),
    ("route_local", "show route protocol local active-path all | display xml | no-more"),
    ("route_direct", "show route protocol direct active-path all | display xml | no-more"),
    ("route_static", "show route protocol static active-path all | display xml | no-more"),
    ("route_ospf", "show route protocol ospf active-path all | display xml | no-more"),
    ("route_rip", "show route protocol rip active-path all | display xml | no-more"),
    ("route_bgp", "show route protocol bgp active-path all extensive | display xml | no-more"),
    ("route_mpls", "show route protocol mpls active-path all | display xml | no-more"),
    ("route_evpn", "show route protocol evpn active-path all | display xml | no-more"),
    ("route_bgp_all", "show route table ?"),
    ("route_bgp.l3vpn0", "show route table bgp.l3vpn0"),
    ("route_bgp.l3vpn0 extensive", "show route table bgp.l3vpn0 extensive"),
];

/// A single (output name, command) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub output_name: String,
    pub command: String,
}

impl ManifestEntry {
    pub fn new(output_name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            output_name: output_name.into(),
            command: command.into(),
        }
    }
}

/// Ordered, validated list of manifest entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build a manifest, rejecting entries that would collide or escape the
    /// output directory.
    pub fn new(entries: Vec<ManifestEntry>) -> Result<Self> {
        let mut seen = HashSet::new();

        for entry in &entries {
            validate_output_name(&entry.output_name)?;

            if entry.command.trim().is_empty() {
                return Err(CollectorError::Manifest(format!(
                    "empty command for '{}'",
                    entry.output_name
                )));
            }

            if !seen.insert(entry.output_name.as_str()) {
                return Err(CollectorError::Manifest(format!(
                    "duplicate output name '{}'",
                    entry.output_name
                )));
            }
        }

        Ok(Self { entries })
    }

    /// The standard Junos diagnostic collection.
    pub fn junos_default() -> Self {
        Self {
            entries: JUNOS_COMMANDS
                .iter()
                .map(|(name, command)| ManifestEntry::new(*name, *command))
                .collect(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ManifestEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a ManifestEntry;
    type IntoIter = std::slice::Iter<'a, ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn validate_output_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CollectorError::Manifest("empty output name".to_string()));
    }

    if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(CollectorError::Manifest(format!(
            "output name '{}' is not a plain file name",
            name
        )));
    }

    Ok(())
}
