use crate::scan::NodeShape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageNodeId(usize);

#[derive(Debug, Clone)]
enum PageNodeKind {
    Element {
        local_name: String,
        classes: Vec<String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct PageNode {
    parent: Option<PageNodeId>,
    row: Option<usize>,
    kind: PageNodeKind,
}

/// Arena of page nodes. Nodes are never removed.
#[derive(Debug, Clone, Default)]
pub struct NodeTree {
    nodes: Vec<PageNode>,
}

impl NodeTree {
    pub fn element(
        &mut self,
        local_name: &str,
        classes: &[&str],
        parent: Option<PageNodeId>,
        row: Option<usize>,
    ) -> PageNodeId {
        self.push(PageNode {
            parent,
            row,
            kind: PageNodeKind::Element {
                local_name: local_name.to_string(),
                classes: classes.iter().map(|class| class.to_string()).collect(),
            },
        })
    }

    pub fn text(&mut self, text: &str, parent: Option<PageNodeId>, row: Option<usize>) -> PageNodeId {
        self.push(PageNode {
            parent,
            row,
            kind: PageNodeKind::Text(text.to_string()),
        })
    }

    fn push(&mut self, node: PageNode) -> PageNodeId {
        let id = PageNodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn shape(&self, id: PageNodeId) -> Option<NodeShape<'_>> {
        match &self.nodes.get(id.0)?.kind {
            PageNodeKind::Element {
                local_name,
                classes,
            } => Some(NodeShape {
                local_name: local_name.as_str(),
                classes: classes.as_slice(),
            }),
            PageNodeKind::Text(_) => None,
        }
    }

    pub fn parent(&self, id: PageNodeId) -> Option<PageNodeId> {
        self.nodes.get(id.0)?.parent
    }

    pub fn row(&self, id: PageNodeId) -> Option<usize> {
        self.nodes.get(id.0)?.row
    }

    pub fn describe(&self, id: PageNodeId) -> String {
        let Some(node) = self.nodes.get(id.0) else {
            return format!("#{} (unknown)", id.0);
        };
        let row = node
            .row
            .map(|row| format!(" row={row}"))
            .unwrap_or_default();
        match &node.kind {
            PageNodeKind::Element {
                local_name,
                classes,
            } => format!("<{local_name} class=\"{}\">#{}{row}", classes.join(" "), id.0),
            PageNodeKind::Text(text) => format!("#text({text:?})#{}{row}", id.0),
        }
    }
}
