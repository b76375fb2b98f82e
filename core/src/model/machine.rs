use crate::error::Result;
use crate::schema::{child, text, FromNode};
use log::debug;
use roxmltree::{Document, Node};
use std::path::Path;

/// Root element name of a machine document
pub const MACHINE_ROOT: &str = "FullMachine";

/// Treatment machine description
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Machine {
    pub name: String,
}

impl FromNode for Machine {
    fn from_node(node: Node<'_, '_>) -> Result<Self> {
        let brief = child(child(node, "machine")?, "briefMachine")?;
        Ok(Machine {
            name: text(child(brief, "machineName")?),
        })
    }
}

impl Machine {
    /// Attempts to read a machine from the document at `path`
    ///
    /// Returns `None` if the file cannot be read or parsed, or if it is not
    /// a machine document. Candidates are probed silently.
    pub fn probe_file(path: &Path) -> Option<Self> {
        let xml = std::fs::read_to_string(path).ok()?;
        let machine = Self::probe_str(&xml);
        if machine.is_none() {
            debug!("{} is not a machine document", path.display());
        }
        machine
    }

    fn probe_str(xml: &str) -> Option<Self> {
        let doc = Document::parse(xml).ok()?;
        let root = doc
            .root_element()
            .children()
            .find(|c| c.has_tag_name(MACHINE_ROOT))?;
        Self::from_node(root).ok()
    }
}
