//! Wiki space node API.

use crate::client::{ApiClient, Page};
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type of the object a wiki node points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjType {
    Doc,
    Docx,
    Sheet,
    Mindnote,
    Bitable,
    File,
    Slides,
    Wiki,
}

impl ObjType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjType::Doc => "doc",
            ObjType::Docx => "docx",
            ObjType::Sheet => "sheet",
            ObjType::Mindnote => "mindnote",
            ObjType::Bitable => "bitable",
            ObjType::File => "file",
            ObjType::Slides => "slides",
            ObjType::Wiki => "wiki",
        }
    }
}

/// Whether a node is an original document or a shortcut to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Origin,
    Shortcut,
}

/// A wiki space node.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Node {
    #[serde(default)]
    pub space_id: String,
    #[serde(default)]
    pub node_token: String,
    /// Token of the underlying object (the docx document id for docx nodes).
    #[serde(default)]
    pub obj_token: String,
    #[serde(default)]
    pub obj_type: Option<ObjType>,
    #[serde(default)]
    pub parent_node_token: Option<String>,
    #[serde(default)]
    pub node_type: Option<String>,
    #[serde(default)]
    pub origin_node_token: Option<String>,
    #[serde(default)]
    pub origin_space_id: Option<String>,
    #[serde(default)]
    pub has_child: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub obj_create_time: Option<String>,
    #[serde(default)]
    pub obj_edit_time: Option<String>,
    #[serde(default)]
    pub node_create_time: Option<String>,
}

/// Parameters for creating a node.
#[derive(Debug, Clone, Serialize)]
pub struct CreateNode {
    pub obj_type: ObjType,
    pub parent_node_token: String,
    pub node_type: NodeType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_node_token: Option<String>,
}

/// Parameters for copying a node.
#[derive(Debug, Clone, Serialize)]
pub struct CopyNode {
    pub target_parent_token: String,
    pub target_space_id: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct NodeHolder {
    node: Node,
}

/// Client for the wiki space node endpoints.
#[derive(Clone)]
pub struct WikiApi {
    client: ApiClient,
}

impl WikiApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Fetch a node by token.
    pub async fn get_node(&self, token: &str, obj_type: ObjType) -> ApiResult<Node> {
        let holder: NodeHolder = self
            .client
            .get(
                "/wiki/v2/spaces/get_node",
                &[
                    ("token", token.to_string()),
                    ("obj_type", obj_type.as_str().to_string()),
                ],
            )
            .await?;
        Ok(holder.node)
    }

    /// Create a node in a space.
    ///
    /// Shortcut nodes must name the node they point at.
    pub async fn create_node(&self, space_id: &str, params: &CreateNode) -> ApiResult<Node> {
        if params.node_type == NodeType::Shortcut && params.origin_node_token.is_none() {
            return Err(ApiError::invalid_response(
                "origin_node_token is required when creating a shortcut node",
            ));
        }

        let holder: NodeHolder = self
            .client
            .post(&format!("/wiki/v2/spaces/{space_id}/nodes"), params)
            .await?;
        Ok(holder.node)
    }

    /// Rename a node.
    pub async fn update_node_title(
        &self,
        space_id: &str,
        node_token: &str,
        title: &str,
    ) -> ApiResult<Value> {
        let body = serde_json::json!({ "title": title });
        self.client
            .post(
                &format!("/wiki/v2/spaces/{space_id}/nodes/{node_token}/update_title"),
                &body,
            )
            .await
    }

    /// Copy a node (and its subtree) to another parent.
    pub async fn copy_node(
        &self,
        space_id: &str,
        node_token: &str,
        params: &CopyNode,
    ) -> ApiResult<Node> {
        let holder: NodeHolder = self
            .client
            .post(
                &format!("/wiki/v2/spaces/{space_id}/nodes/{node_token}/copy"),
                params,
            )
            .await?;
        Ok(holder.node)
    }

    /// Move a node under another parent.
    pub async fn move_node(
        &self,
        space_id: &str,
        node_token: &str,
        target_parent_token: &str,
        target_space_id: Option<&str>,
    ) -> ApiResult<Node> {
        let body = serde_json::json!({
            "target_parent_token": target_parent_token,
            "target_space_id": target_space_id,
        });

        let holder: NodeHolder = self
            .client
            .post(
                &format!("/wiki/v2/spaces/{space_id}/nodes/{node_token}/move"),
                &body,
            )
            .await?;
        Ok(holder.node)
    }

    /// Fetch one page of a node's children.
    pub async fn list_child_nodes(
        &self,
        space_id: &str,
        parent_node_token: &str,
        page_token: Option<&str>,
    ) -> ApiResult<Page<Node>> {
        let mut query = vec![("parent_node_token", parent_node_token.to_string())];
        if let Some(token) = page_token {
            query.push(("page_token", token.to_string()));
        }

        self.client
            .get(&format!("/wiki/v2/spaces/{space_id}/nodes"), &query)
            .await
    }

    /// Fetch all children of a node, following pagination.
    pub async fn list_all_child_nodes(
        &self,
        space_id: &str,
        parent_node_token: &str,
    ) -> ApiResult<Vec<Node>> {
        let mut all = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_child_nodes(space_id, parent_node_token, page_token.as_deref())
                .await?;
            let next = page.next_token().map(|t| t.to_string());
            all.extend(page.items);

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(all)
    }
}
