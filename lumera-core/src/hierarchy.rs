use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum NodeKind {
    Group,
    PhotoSet,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFilter {
    Group,
    PhotoSet,
    Any,
}

impl KindFilter {
    pub fn matches(self, kind: NodeKind) -> bool {
        match self {
            KindFilter::Group => kind == NodeKind::Group,
            KindFilter::PhotoSet => kind == NodeKind::PhotoSet,
            KindFilter::Any => true,
        }
    }
}

/// One container in the account hierarchy. Groups carry their children in
/// `elements`; photo sets carry an upload URL instead. Sibling titles are
/// unique on the service side, which is what makes title paths unambiguous.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HierarchyNode {
    #[serde(rename = "$type")]
    pub kind: NodeKind,
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub elements: Vec<HierarchyNode>,
    #[serde(default)]
    pub upload_url: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
}

impl HierarchyNode {
    /// Walks a delimited title path down from this node, which must be the
    /// tree root: one leading empty segment is dropped, the first remaining
    /// segment must equal the root title, and each further segment picks the
    /// first child with that title. The kind filter applies to the final
    /// node only; a path holding just the root title resolves to the root.
    pub fn resolve(&self, path: &str, delimiter: char, filter: KindFilter) -> Option<&HierarchyNode> {
        let mut segments: Vec<&str> = path.split(delimiter).collect();
        if segments.first() == Some(&"") {
            segments.remove(0);
        }
        let (root_title, rest) = segments.split_first()?;
        if *root_title != self.title {
            return None;
        }
        let mut node = self;
        for segment in rest {
            node = node
                .elements
                .iter()
                .find(|child| child.title == *segment)?;
        }
        filter.matches(node.kind).then_some(node)
    }
}
