//! Scene parsing — node stanzas, parameters, flags, and connections.
//!
//! The HIP node format is an undocumented, stanza-delimited text format that
//! varies across Houdini releases, so the parser is deliberately lenient and
//! linear: unrecognized lines are tolerated, malformed stanzas are dropped,
//! and a (possibly empty) [`Scene`] is always produced. The only errors that
//! escape are container-level [`ArchiveFormatError`]s.

mod category;
mod header;
mod node;
pub mod value;

pub use category::infer_category;

use crate::archive::{is_text_entry, read_archive};
use crate::error::ArchiveFormatError;
use crate::types::{ArchiveEntry, Scene};

/// Filenames whose contents hold scene-level header metadata.
const HEADER_NAMES: [&str; 4] = [".hip", "Houdini", ".OPfallbacks", "houdini.hip"];

/// Parse a raw HIP container into a [`Scene`].
pub fn parse_scene(bytes: &[u8]) -> Result<Scene, ArchiveFormatError> {
    let entries = read_archive(bytes)?;
    let text: Vec<&ArchiveEntry> = entries.iter().filter(|e| is_text_entry(e)).collect();
    Ok(build_scene(&text))
}

/// Assemble a scene from pre-filtered text entries.
pub(crate) fn build_scene(entries: &[&ArchiveEntry]) -> Scene {
    let mut scene = Scene::default();

    let (headers, bodies): (Vec<&ArchiveEntry>, Vec<&ArchiveEntry>) = entries
        .iter()
        .copied()
        .partition(|e| is_header_entry(&e.path));

    let scanner = header::HeaderScanner::new();
    let header_text: String = headers
        .iter()
        .map(|e| String::from_utf8_lossy(&e.data))
        .collect::<Vec<_>>()
        .join("\n");
    scanner.scan(&header_text, &mut scene);

    for entry in &bodies {
        node::parse_entry(entry, &mut scene);
    }

    // Some exporters bury the version in a node entry instead of the header.
    if scene.hip_version.is_empty() {
        for entry in &bodies {
            let text = String::from_utf8_lossy(&entry.data);
            if let Some(version) = scanner.find_version(&text) {
                scene.hip_version = version;
                break;
            }
        }
    }

    scene
}

fn is_header_entry(path: &str) -> bool {
    let base = path.rsplit('/').next().unwrap_or(path);
    HEADER_NAMES.contains(&base) || path.ends_with(".def")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeCategory;

    fn entry(path: &str, body: &str) -> ArchiveEntry {
        ArchiveEntry {
            path: path.to_string(),
            mode: 0o100644,
            size: body.len() as u64,
            data: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn header_entry_detection() {
        assert!(is_header_entry(".hip"));
        assert!(is_header_entry("Houdini"));
        assert!(is_header_entry(".OPfallbacks"));
        assert!(is_header_entry("houdini.hip"));
        assert!(is_header_entry("opdef/sop_tools.def"));
        assert!(!is_header_entry("obj/geo1/box1"));
    }

    #[test]
    fn scene_from_header_and_node_entries() {
        let header = entry(".hip", "_HIP_SAVEVERSION = \"20.5.332\"\nauthor = \"jb\"\n");
        let body = entry("obj/geo1/box1", "type = box\nname = box1\n");
        let scene = build_scene(&[&header, &body]);

        assert_eq!(scene.hip_version, "20.5.332");
        assert_eq!(scene.metadata.get("author").map(String::as_str), Some("jb"));
        assert_eq!(scene.nodes.len(), 1);
        assert_eq!(scene.nodes[0].path, "/obj/geo1/box1/box1");
    }

    #[test]
    fn version_fallback_scans_node_entries() {
        let body = entry(
            "obj/geo1/box1",
            "houdini_version = '19.5.640'\ntype = box\n",
        );
        let scene = build_scene(&[&body]);
        assert_eq!(scene.hip_version, "19.5.640");
    }

    #[test]
    fn two_node_pyro_scene() {
        let body = entry(
            "obj/geo1/pyro_solver1",
            "type = pyrosolver::2.0\nname = pyro_solver1\nparm {\n  name dissipation\n  value 0.05\n}\nparm {\n  name cooling_rate\n  value 0.3\n  parmdef\n}\n",
        );
        let scene = build_scene(&[&body]);

        assert_eq!(scene.nodes.len(), 1);
        let node = &scene.nodes[0];
        assert_eq!(node.path, "/obj/geo1/pyro_solver1/pyro_solver1");
        assert_eq!(node.node_type, "pyrosolver::2.0");
        assert_eq!(node.category, NodeCategory::Dop);
        assert_eq!(node.parameters.len(), 2);

        let dissipation = &node.parameters[0];
        assert_eq!(dissipation.name, "dissipation");
        assert_eq!(dissipation.value, crate::types::ParamValue::Float(0.05));
        assert!(dissipation.is_default);

        let cooling = &node.parameters[1];
        assert_eq!(cooling.name, "cooling_rate");
        assert_eq!(cooling.value, crate::types::ParamValue::Float(0.3));
        assert!(!cooling.is_default);
    }

    #[test]
    fn scene_invariants_hold() {
        let body = entry(
            "obj/geo1/mixed",
            "type = merge\nname = merge1\nparm {\n  name count\n  value 3\n  expression $F * 2\n}\nwire /obj/a 0 /obj/b 1\n",
        );
        let scene = build_scene(&[&body]);

        for node in &scene.nodes {
            assert!(node.path.starts_with('/'));
            for parameter in &node.parameters {
                assert!(!parameter.name.is_empty());
                if parameter.expression.is_some() {
                    assert!(!parameter.is_default);
                }
            }
        }
    }
}
