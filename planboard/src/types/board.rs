//! Board-level types: Board, List

use super::ids::{BoardId, ListId};
use super::position::Ordinal;
use serde::{Deserialize, Serialize};

/// The board - metadata only. List order lives on the lists' positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Board {
    /// Create a new board with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: BoardId::new(),
            name: name.into(),
            description: None,
        }
    }

    /// Use a specific id
    pub fn with_id(mut self, id: impl Into<BoardId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A list is an ordered column of tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub id: ListId,
    pub board: BoardId,
    pub name: String,
    pub position: Ordinal,
}

impl List {
    pub fn new(id: ListId, board: BoardId, name: impl Into<String>, position: Ordinal) -> Self {
        Self {
            id,
            board,
            name: name.into(),
            position,
        }
    }
}
