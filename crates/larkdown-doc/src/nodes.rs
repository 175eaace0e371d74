//! Wiki node services: trees, search, paths, and Markdown insertion.

use crate::compose::MarkdownComposer;
use crate::error::{DocError, DocResult};
use futures::future::BoxFuture;
use larkdown_api::{CreateNode, Node, NodeType, ObjType, WikiApi};
use larkdown_util::urls::{extract_token, ResourceKind};
use tracing::{debug, warn};

/// A wiki node with its recursively fetched children.
#[derive(Debug, Clone)]
pub struct NodeTree {
    pub node: Node,
    pub children: Vec<NodeTree>,
}

/// Path from a space root down to a node.
#[derive(Debug, Clone)]
pub struct NodePath {
    /// Nodes from the root to the target, in order.
    pub nodes: Vec<Node>,
    /// Titles joined with " / ".
    pub path: String,
}

/// How [`NodeExplorer::insert_markdown`] targets a document.
#[derive(Debug, Clone)]
pub enum InsertMode {
    /// Create a new docx node under the URL's node and write into it.
    Create { title: Option<String> },
    /// Append to the document behind the URL's node.
    Append,
}

/// Result of a Markdown insertion.
#[derive(Debug, Clone)]
pub struct InsertOutcome {
    /// The node written to (the new node in `Create` mode).
    pub node: Node,
    /// The docx document id behind that node.
    pub document_id: String,
    /// Whether a new node was created.
    pub created: bool,
}

/// High-level wiki node operations on top of [`WikiApi`].
pub struct NodeExplorer {
    wiki: WikiApi,
    composer: MarkdownComposer,
}

impl NodeExplorer {
    pub fn new(wiki: WikiApi, composer: MarkdownComposer) -> Self {
        Self { wiki, composer }
    }

    /// Resolve a resource URL to its wiki node.
    pub async fn node_by_url(&self, url: &str) -> DocResult<Node> {
        let token = extract_token(url);

        let obj_type = match token.kind {
            ResourceKind::WikiNode => ObjType::Wiki,
            ResourceKind::Document => ObjType::Docx,
            ResourceKind::Doc => ObjType::Doc,
            ResourceKind::Spreadsheet => ObjType::Sheet,
            ResourceKind::Base => ObjType::Bitable,
            _ => return Err(DocError::invalid_url(url)),
        };

        Ok(self.wiki.get_node(&token.token, obj_type).await?)
    }

    /// Rename the node behind a URL.
    pub async fn update_title_by_url(&self, url: &str, title: &str) -> DocResult<()> {
        let node = self.node_by_url(url).await?;
        if node.space_id.is_empty() {
            return Err(DocError::IncompleteNode("space_id"));
        }

        self.wiki
            .update_node_title(&node.space_id, &node.node_token, title)
            .await?;
        Ok(())
    }

    /// Create a child node under the node behind a URL.
    pub async fn create_child_by_url(
        &self,
        url: &str,
        title: &str,
        obj_type: ObjType,
    ) -> DocResult<Node> {
        let parent = self.node_by_url(url).await?;
        if parent.space_id.is_empty() {
            return Err(DocError::IncompleteNode("space_id"));
        }

        Ok(self
            .wiki
            .create_node(
                &parent.space_id,
                &CreateNode {
                    obj_type,
                    parent_node_token: parent.node_token.clone(),
                    node_type: NodeType::Origin,
                    title: title.to_string(),
                    origin_node_token: None,
                },
            )
            .await?)
    }

    /// Fetch a node and its descendants as a tree, bounded by `max_depth`.
    pub async fn node_tree(&self, node_token: &str, max_depth: u32) -> DocResult<NodeTree> {
        let node = self.wiki.get_node(node_token, ObjType::Wiki).await?;

        let children = if node.has_child && !node.space_id.is_empty() {
            self.collect(&node.space_id, node_token, max_depth).await?
        } else {
            Vec::new()
        };

        Ok(NodeTree { node, children })
    }

    /// Fetch all descendants of a node, bounded by `max_depth`.
    pub async fn descendants(&self, node_token: &str, max_depth: u32) -> DocResult<Vec<NodeTree>> {
        let node = self.wiki.get_node(node_token, ObjType::Wiki).await?;
        if node.space_id.is_empty() {
            return Err(DocError::IncompleteNode("space_id"));
        }

        self.collect(&node.space_id, node_token, max_depth).await
    }

    fn collect<'a>(
        &'a self,
        space_id: &'a str,
        parent_token: &'a str,
        depth: u32,
    ) -> BoxFuture<'a, DocResult<Vec<NodeTree>>> {
        Box::pin(async move {
            if depth == 0 {
                warn!(parent = %parent_token, "Max depth reached, stopping descent");
                return Ok(Vec::new());
            }

            let nodes = self.wiki.list_all_child_nodes(space_id, parent_token).await?;
            let mut trees = Vec::with_capacity(nodes.len());

            for node in nodes {
                let children = if node.has_child {
                    // A broken subtree degrades to a leaf instead of
                    // aborting the whole walk.
                    match self.collect(space_id, &node.node_token, depth - 1).await {
                        Ok(children) => children,
                        Err(e) => {
                            warn!(
                                node = %node.node_token,
                                title = node.title.as_deref().unwrap_or(""),
                                error = %e,
                                "Failed to fetch subtree"
                            );
                            Vec::new()
                        }
                    }
                } else {
                    Vec::new()
                };

                trees.push(NodeTree { node, children });
            }

            Ok(trees)
        })
    }

    /// Find nodes with an exact title under `root_token`.
    pub async fn find_by_title(
        &self,
        space_id: &str,
        title: &str,
        root_token: &str,
    ) -> DocResult<Vec<Node>> {
        let mut matches = Vec::new();
        let mut stack = vec![root_token.to_string()];

        while let Some(parent) = stack.pop() {
            for node in self.wiki.list_all_child_nodes(space_id, &parent).await? {
                if node.title.as_deref() == Some(title) {
                    matches.push(node.clone());
                }
                if node.has_child {
                    stack.push(node.node_token.clone());
                }
            }
        }

        Ok(matches)
    }

    /// Walk parent pointers up to the space root.
    pub async fn node_path(&self, node_token: &str) -> DocResult<NodePath> {
        let mut nodes: Vec<Node> = Vec::new();
        let mut current = node_token.to_string();

        loop {
            let node = self.wiki.get_node(&current, ObjType::Wiki).await?;
            let parent = node.parent_node_token.clone();
            nodes.insert(0, node);

            match parent {
                Some(token) if !token.is_empty() => current = token,
                _ => break,
            }
        }

        let path = nodes
            .iter()
            .map(|n| n.title.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join(" / ");

        Ok(NodePath { nodes, path })
    }

    /// Write Markdown into the wiki.
    ///
    /// `Create` mode makes a fresh docx node under the URL's node; `Append`
    /// mode writes into the document the URL already points at.
    pub async fn insert_markdown(
        &self,
        url: &str,
        markdown: &str,
        mode: InsertMode,
    ) -> DocResult<InsertOutcome> {
        match mode {
            InsertMode::Create { title } => {
                let title = title.unwrap_or_else(|| "Untitled".to_string());
                let node = self
                    .create_child_by_url(url, &title, ObjType::Docx)
                    .await?;

                if node.obj_token.is_empty() {
                    return Err(DocError::IncompleteNode("obj_token"));
                }

                debug!(node = %node.node_token, doc = %node.obj_token, "Created document node");
                self.composer.append(&node.obj_token, markdown).await?;

                Ok(InsertOutcome {
                    document_id: node.obj_token.clone(),
                    node,
                    created: true,
                })
            }
            InsertMode::Append => {
                let node = self.node_by_url(url).await?;
                if node.obj_token.is_empty() {
                    return Err(DocError::IncompleteNode("obj_token"));
                }

                self.composer.append(&node.obj_token, markdown).await?;

                Ok(InsertOutcome {
                    document_id: node.obj_token.clone(),
                    node,
                    created: false,
                })
            }
        }
    }
}
