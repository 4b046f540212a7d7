use crate::layer::{FolderId, RowId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by timeline edits
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimelineError {
    #[error("unknown row {0}")]
    UnknownRow(RowId),
    #[error("unknown frame folder {0}")]
    UnknownFolder(FolderId),
    #[error("frame folder {new} would overlap {existing}")]
    Overlap { new: FolderId, existing: FolderId },
    #[error("frame folder length must be at least 1")]
    ZeroLength,
    #[error("frame numbers start at 1")]
    ZeroFrame,
}

/// An ordered timeline lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub name: String,
}

/// A timeline cell spanning `length` contiguous frames starting at `frame_index`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameFolder {
    #[serde(rename = "rowId")]
    pub row: RowId,
    pub frame_index: u32,
    #[serde(default = "default_length")]
    pub length: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Display name, persisted separately in the document's `folderNames`
    #[serde(skip)]
    pub name: Option<String>,
}

fn default_length() -> u32 {
    1
}

impl FrameFolder {
    pub fn new(row: RowId, frame_index: u32, length: u32) -> Self {
        Self {
            row,
            frame_index,
            length: length.max(1),
            image_url: None,
            file_name: None,
            name: None,
        }
    }

    pub fn id(&self) -> FolderId {
        FolderId::new(self.row, self.frame_index)
    }

    /// One past the last frame this folder covers
    pub fn end(&self) -> u32 {
        self.frame_index.saturating_add(self.length)
    }

    /// `frame_index <= frame < frame_index + length`
    pub fn contains(&self, frame: u32) -> bool {
        self.frame_index <= frame && frame < self.end()
    }

    fn overlaps(&self, start: u32, end: u32) -> bool {
        self.frame_index < end && start < self.end()
    }
}

/// Rows x frame-folders grid
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Timeline {
    rows: Vec<Row>,
    folders: Vec<FrameFolder>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted parts, rejecting overlapping folders
    pub fn from_parts(rows: Vec<Row>, folders: Vec<FrameFolder>) -> Result<Self, TimelineError> {
        let mut timeline = Self {
            rows,
            folders: Vec::with_capacity(folders.len()),
        };
        for folder in folders {
            timeline.insert_folder(folder)?;
        }
        Ok(timeline)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub fn folders(&self) -> &[FrameFolder] {
        &self.folders
    }

    pub fn folder(&self, id: FolderId) -> Option<&FrameFolder> {
        self.folders.iter().find(|folder| folder.id() == id)
    }

    pub fn folder_mut(&mut self, id: FolderId) -> Option<&mut FrameFolder> {
        self.folders.iter_mut().find(|folder| folder.id() == id)
    }

    /// Append a row with the next free id
    pub fn add_row(&mut self, name: impl Into<String>) -> RowId {
        let next = self.rows.iter().map(|row| row.id.0).max().unwrap_or(0) + 1;
        let id = RowId(next);
        self.rows.push(Row {
            id,
            name: name.into(),
        });
        id
    }

    pub fn rename_row(&mut self, id: RowId, name: impl Into<String>) -> Result<(), TimelineError> {
        let row = self
            .rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(TimelineError::UnknownRow(id))?;
        row.name = name.into();
        Ok(())
    }

    /// Remove a row and return the folders that lived in it
    pub fn remove_row(&mut self, id: RowId) -> Result<Vec<FrameFolder>, TimelineError> {
        let index = self
            .rows
            .iter()
            .position(|row| row.id == id)
            .ok_or(TimelineError::UnknownRow(id))?;
        self.rows.remove(index);

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.folders)
            .into_iter()
            .partition(|folder| folder.row == id);
        self.folders = kept;
        Ok(removed)
    }

    /// The folder of `row` that covers `frame`
    pub fn folder_at(&self, row: RowId, frame: u32) -> Option<&FrameFolder> {
        self.folders
            .iter()
            .find(|folder| folder.row == row && folder.contains(frame))
    }

    /// Folders covering `frame`, in row order (first row is drawn first)
    pub fn folders_at(&self, frame: u32) -> Vec<&FrameFolder> {
        self.rows
            .iter()
            .filter_map(|row| self.folder_at(row.id, frame))
            .collect()
    }

    /// Insert a folder, keeping folders within a row non-overlapping
    pub fn insert_folder(&mut self, folder: FrameFolder) -> Result<FolderId, TimelineError> {
        if folder.length == 0 {
            return Err(TimelineError::ZeroLength);
        }
        if folder.frame_index == 0 {
            return Err(TimelineError::ZeroFrame);
        }
        if self.row(folder.row).is_none() {
            return Err(TimelineError::UnknownRow(folder.row));
        }
        self.check_free(folder.row, folder.frame_index, folder.end(), None)?;

        let id = folder.id();
        self.folders.push(folder);
        self.folders.sort_by_key(|folder| (folder.row, folder.frame_index));
        Ok(id)
    }

    pub fn remove_folder(&mut self, id: FolderId) -> Result<FrameFolder, TimelineError> {
        let index = self
            .folders
            .iter()
            .position(|folder| folder.id() == id)
            .ok_or(TimelineError::UnknownFolder(id))?;
        Ok(self.folders.remove(index))
    }

    /// Change how many frames a folder holds; fails if it would run into a neighbour
    pub fn set_length(&mut self, id: FolderId, length: u32) -> Result<(), TimelineError> {
        if length == 0 {
            return Err(TimelineError::ZeroLength);
        }
        let start = id.frame_index;
        self.check_free(id.row, start, start.saturating_add(length), Some(id))?;
        let folder = self.folder_mut(id).ok_or(TimelineError::UnknownFolder(id))?;
        folder.length = length;
        Ok(())
    }

    /// Last frame number covered by any folder (at least 1)
    pub fn max_frame(&self) -> u32 {
        self.folders
            .iter()
            .map(|folder| folder.end().saturating_sub(1))
            .max()
            .unwrap_or(1)
            .max(1)
    }

    fn check_free(&self, row: RowId, start: u32, end: u32, ignore: Option<FolderId>) -> Result<(), TimelineError> {
        let new = FolderId::new(row, start);
        match self
            .folders
            .iter()
            .filter(|folder| folder.row == row && Some(folder.id()) != ignore)
            .find(|folder| folder.overlaps(start, end))
        {
            Some(existing) => Err(TimelineError::Overlap {
                new,
                existing: existing.id(),
            }),
            None => Ok(()),
        }
    }
}
