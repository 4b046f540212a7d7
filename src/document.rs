use crate::layer::{FolderId, LayerDirection, LayerProps, LayerRef, RowId};
use crate::stroke::{Stroke, StrokeId};
use crate::timeline::{FrameFolder, Timeline, TimelineError};
use egui::Pos2;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by the stroke/layer store
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("unknown layer {0}")]
    UnknownLayer(LayerRef),
    #[error("unknown frame folder {0}")]
    UnknownFolder(FolderId),
    #[error("the main layer of {0} cannot be removed")]
    MainLayerRequired(FolderId),
    #[error("layer {layer} listed in the order of {folder} belongs to another folder")]
    ForeignLayer { folder: FolderId, layer: LayerRef },
    #[error(transparent)]
    Timeline(#[from] TimelineError),
}

/// The drawable content of a scene: the four facets captured by undo snapshots,
/// plus the storage keys of uploaded frame assets so undo brings them back too.
///
/// Stroke lists are shared (`Arc`) and copied on first write, so cloning a
/// `Document` for the history costs one map clone, not a copy of every point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    layer_strokes: HashMap<LayerRef, Arc<Vec<Stroke>>>,
    layers: HashMap<LayerRef, LayerProps>,
    timeline: Timeline,
    layer_order: HashMap<FolderId, Vec<LayerRef>>,
    asset_keys: HashMap<FolderId, String>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a document from persisted facets.
    ///
    /// Layers referenced by a folder's order but missing a stroke list or
    /// display props get empty/default ones; a folder without an order entry
    /// gets just its main layer.
    pub fn from_parts(
        timeline: Timeline,
        mut layers: HashMap<LayerRef, LayerProps>,
        layer_strokes: HashMap<LayerRef, Vec<Stroke>>,
        mut layer_order: HashMap<FolderId, Vec<LayerRef>>,
    ) -> Result<Self, DocumentError> {
        let mut layer_strokes: HashMap<LayerRef, Arc<Vec<Stroke>>> = layer_strokes
            .into_iter()
            .map(|(layer, strokes)| (layer, Arc::new(strokes)))
            .collect();

        layer_order.retain(|folder, _| timeline.folder(*folder).is_some());
        for folder in timeline.folders() {
            let id = folder.id();
            let order = layer_order.entry(id).or_default();
            if !order.contains(&id.main_layer()) {
                order.insert(0, id.main_layer());
            }
            for layer in order.iter() {
                if layer.folder() != id {
                    return Err(DocumentError::ForeignLayer { folder: id, layer: *layer });
                }
                layer_strokes.entry(*layer).or_default();
                layers
                    .entry(*layer)
                    .or_insert_with(|| LayerProps::named(layer.default_name()));
            }
        }

        let mut document = Self {
            layer_strokes,
            layers,
            timeline,
            layer_order,
            asset_keys: HashMap::new(),
        };
        document.drop_unordered_layers();
        Ok(document)
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn folder(&self, id: FolderId) -> Option<&FrameFolder> {
        self.timeline.folder(id)
    }

    // ---- rows & folders -------------------------------------------------

    pub fn add_row(&mut self, name: impl Into<String>) -> RowId {
        self.timeline.add_row(name)
    }

    pub fn rename_row(&mut self, id: RowId, name: impl Into<String>) -> Result<(), DocumentError> {
        Ok(self.timeline.rename_row(id, name)?)
    }

    /// Remove a row together with its folders, layers and strokes
    pub fn remove_row(&mut self, id: RowId) -> Result<(), DocumentError> {
        for folder in self.timeline.remove_row(id)? {
            self.forget_folder_layers(folder.id());
        }
        Ok(())
    }

    /// Create a folder with its (empty) main layer
    pub fn add_folder(&mut self, row: RowId, frame_index: u32, length: u32) -> Result<FolderId, DocumentError> {
        let id = self
            .timeline
            .insert_folder(FrameFolder::new(row, frame_index, length))?;
        let main = id.main_layer();
        self.layer_order.insert(id, vec![main]);
        self.layer_strokes.insert(main, Arc::default());
        self.layers.insert(main, LayerProps::named(main.default_name()));
        Ok(id)
    }

    /// Remove a folder and everything drawn in it
    pub fn remove_folder(&mut self, id: FolderId) -> Result<FrameFolder, DocumentError> {
        let folder = self.timeline.remove_folder(id)?;
        self.forget_folder_layers(id);
        Ok(folder)
    }

    pub fn set_folder_length(&mut self, id: FolderId, length: u32) -> Result<(), DocumentError> {
        Ok(self.timeline.set_length(id, length)?)
    }

    /// Bind (or clear) the raster asset of a folder's main layer
    pub fn set_folder_image(
        &mut self,
        id: FolderId,
        image_url: Option<String>,
        file_name: Option<String>,
    ) -> Result<(), DocumentError> {
        let folder = self
            .timeline
            .folder_mut(id)
            .ok_or(DocumentError::UnknownFolder(id))?;
        folder.image_url = image_url;
        folder.file_name = file_name;
        Ok(())
    }

    /// Storage keys of uploaded frame assets, by folder
    pub fn asset_keys(&self) -> &HashMap<FolderId, String> {
        &self.asset_keys
    }

    /// Remember where a folder's asset was uploaded
    pub fn set_asset_key(&mut self, id: FolderId, key: impl Into<String>) -> Result<(), DocumentError> {
        if self.timeline.folder(id).is_none() {
            return Err(DocumentError::UnknownFolder(id));
        }
        self.asset_keys.insert(id, key.into());
        Ok(())
    }

    pub fn set_folder_name(&mut self, id: FolderId, name: Option<String>) -> Result<(), DocumentError> {
        let folder = self
            .timeline
            .folder_mut(id)
            .ok_or(DocumentError::UnknownFolder(id))?;
        folder.name = name;
        Ok(())
    }

    // ---- layers ---------------------------------------------------------

    /// Bottom-to-top layer order of a folder
    pub fn layer_order(&self, folder: FolderId) -> &[LayerRef] {
        self.layer_order
            .get(&folder)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn layer_orders(&self) -> &HashMap<FolderId, Vec<LayerRef>> {
        &self.layer_order
    }

    pub fn layer_props(&self, layer: LayerRef) -> Option<&LayerProps> {
        self.layers.get(&layer)
    }

    pub fn layer_props_mut(&mut self, layer: LayerRef) -> Result<&mut LayerProps, DocumentError> {
        self.layers
            .get_mut(&layer)
            .ok_or(DocumentError::UnknownLayer(layer))
    }

    pub fn has_layer(&self, layer: LayerRef) -> bool {
        self.layers.contains_key(&layer)
    }

    /// Add a vector-only layer on top of the folder's stack
    pub fn add_extra_layer(&mut self, folder: FolderId) -> Result<LayerRef, DocumentError> {
        let order = self
            .layer_order
            .get_mut(&folder)
            .ok_or(DocumentError::UnknownFolder(folder))?;
        let next = order
            .iter()
            .filter_map(|layer| match layer {
                LayerRef::Extra(_, index) => Some(*index),
                LayerRef::Main(_) => None,
            })
            .max()
            .map_or(1, |max| max + 1);

        let layer = LayerRef::Extra(folder, next);
        order.push(layer);
        self.layer_strokes.insert(layer, Arc::default());
        self.layers.insert(layer, LayerProps::named(layer.default_name()));
        Ok(layer)
    }

    /// Remove an extra layer and its strokes
    pub fn remove_layer(&mut self, layer: LayerRef) -> Result<(), DocumentError> {
        if let LayerRef::Main(folder) = layer {
            return Err(DocumentError::MainLayerRequired(folder));
        }
        let order = self
            .layer_order
            .get_mut(&layer.folder())
            .ok_or(DocumentError::UnknownLayer(layer))?;
        let index = order
            .iter()
            .position(|l| *l == layer)
            .ok_or(DocumentError::UnknownLayer(layer))?;
        order.remove(index);
        self.layer_strokes.remove(&layer);
        self.layers.remove(&layer);
        Ok(())
    }

    /// Move a layer one step within its folder. Returns false at either end of the stack.
    pub fn reorder_layer(
        &mut self,
        folder: FolderId,
        layer: LayerRef,
        direction: LayerDirection,
    ) -> Result<bool, DocumentError> {
        let order = self
            .layer_order
            .get_mut(&folder)
            .ok_or(DocumentError::UnknownFolder(folder))?;
        let index = order
            .iter()
            .position(|l| *l == layer)
            .ok_or(DocumentError::UnknownLayer(layer))?;
        let target = match direction {
            LayerDirection::Up if index + 1 < order.len() => index + 1,
            LayerDirection::Down if index > 0 => index - 1,
            _ => return Ok(false),
        };
        order.swap(index, target);
        Ok(true)
    }

    // ---- strokes --------------------------------------------------------

    /// Strokes of a layer in paint order (empty for unknown layers)
    pub fn strokes(&self, layer: LayerRef) -> &[Stroke] {
        self.layer_strokes
            .get(&layer)
            .map(|strokes| strokes.as_slice())
            .unwrap_or(&[])
    }

    pub fn layer_strokes(&self) -> impl Iterator<Item = (&LayerRef, &[Stroke])> {
        self.layer_strokes
            .iter()
            .map(|(layer, strokes)| (layer, strokes.as_slice()))
    }

    pub fn stroke(&self, layer: LayerRef, id: StrokeId) -> Option<&Stroke> {
        self.strokes(layer).iter().find(|stroke| stroke.id == id)
    }

    /// Total number of points over all strokes of a layer
    pub fn point_count(&self, layer: LayerRef) -> usize {
        self.strokes(layer).iter().map(|s| s.points.len()).sum()
    }

    pub fn add_stroke(&mut self, layer: LayerRef, stroke: Stroke) -> Result<(), DocumentError> {
        self.strokes_mut(layer)?.push(stroke);
        Ok(())
    }

    /// Append a point to a stroke being drawn. Returns false if the stroke is gone.
    pub fn append_point(&mut self, layer: LayerRef, id: StrokeId, point: Pos2) -> Result<bool, DocumentError> {
        let strokes = self.strokes_mut(layer)?;
        match strokes.iter_mut().rev().find(|stroke| stroke.id == id) {
            Some(stroke) => {
                stroke.add_point(point);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove every stroke matching `predicate`, returning the removed strokes in order
    pub fn remove_strokes(
        &mut self,
        layer: LayerRef,
        predicate: impl Fn(&Stroke) -> bool,
    ) -> Result<Vec<Stroke>, DocumentError> {
        if !self.strokes_known(layer)?.iter().any(&predicate) {
            return Ok(Vec::new());
        }
        let strokes = self.strokes_mut(layer)?;
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(strokes)
            .into_iter()
            .partition(|stroke| predicate(stroke));
        *strokes = kept;
        Ok(removed)
    }

    /// Map every point of the listed strokes through `f`. Returns how many strokes changed.
    pub fn transform_strokes(
        &mut self,
        layer: LayerRef,
        ids: &[StrokeId],
        f: impl Fn(Pos2) -> Pos2,
    ) -> Result<usize, DocumentError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut touched = 0;
        for stroke in self.strokes_mut(layer)?.iter_mut() {
            if ids.contains(&stroke.id) {
                for point in &mut stroke.points {
                    *point = f(*point);
                }
                touched += 1;
            }
        }
        Ok(touched)
    }

    /// Overwrite strokes by id with the given versions, leaving others alone
    pub fn update_strokes(&mut self, layer: LayerRef, updated: &[Stroke]) -> Result<(), DocumentError> {
        if updated.is_empty() {
            return Ok(());
        }
        for stroke in self.strokes_mut(layer)?.iter_mut() {
            if let Some(new) = updated.iter().find(|s| s.id == stroke.id) {
                stroke.points.clone_from(&new.points);
            }
        }
        Ok(())
    }

    /// Replace a layer's whole stroke list
    pub fn replace_strokes(&mut self, layer: LayerRef, strokes: Vec<Stroke>) -> Result<(), DocumentError> {
        *self.strokes_mut(layer)? = strokes;
        Ok(())
    }

    /// Check that every ordered layer has props and a stroke list
    pub fn check_integrity(&self) -> Result<(), DocumentError> {
        for (folder, order) in &self.layer_order {
            if self.timeline.folder(*folder).is_none() {
                return Err(DocumentError::UnknownFolder(*folder));
            }
            for layer in order {
                if !self.layer_strokes.contains_key(layer) || !self.layers.contains_key(layer) {
                    return Err(DocumentError::UnknownLayer(*layer));
                }
            }
        }
        Ok(())
    }

    fn strokes_known(&self, layer: LayerRef) -> Result<&[Stroke], DocumentError> {
        self.layer_strokes
            .get(&layer)
            .map(|strokes| strokes.as_slice())
            .ok_or(DocumentError::UnknownLayer(layer))
    }

    fn strokes_mut(&mut self, layer: LayerRef) -> Result<&mut Vec<Stroke>, DocumentError> {
        self.layer_strokes
            .get_mut(&layer)
            .map(Arc::make_mut)
            .ok_or(DocumentError::UnknownLayer(layer))
    }

    fn forget_folder_layers(&mut self, folder: FolderId) {
        self.asset_keys.remove(&folder);
        if let Some(order) = self.layer_order.remove(&folder) {
            for layer in order {
                self.layer_strokes.remove(&layer);
                self.layers.remove(&layer);
            }
        }
    }

    fn drop_unordered_layers(&mut self) {
        let ordered: std::collections::HashSet<LayerRef> =
            self.layer_order.values().flatten().copied().collect();
        self.layer_strokes.retain(|layer, _| ordered.contains(layer));
        self.layers.retain(|layer, _| ordered.contains(layer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::DrawingTool;
    use egui::{Color32, Vec2};

    fn document() -> (Document, FolderId) {
        let mut doc = Document::new();
        let row = doc.add_row("Row 1");
        let folder = doc.add_folder(row, 1, 1).unwrap();
        (doc, folder)
    }

    fn stroke(layer: LayerRef, x: f32) -> Stroke {
        let mut stroke = Stroke::new(layer, DrawingTool::Pencil, Color32::BLACK, 2.0, Pos2::new(x, 0.0));
        stroke.add_point(Pos2::new(x, 10.0));
        stroke
    }

    #[test]
    fn test_new_folder_has_main_layer() {
        let (doc, folder) = document();
        assert_eq!(doc.layer_order(folder), &[folder.main_layer()]);
        assert!(doc.strokes(folder.main_layer()).is_empty());
        assert_eq!(doc.layer_props(folder.main_layer()).unwrap().name, "Main");
        doc.check_integrity().unwrap();
    }

    #[test]
    fn test_extra_layers_and_reorder() {
        let (mut doc, folder) = document();
        let a = doc.add_extra_layer(folder).unwrap();
        let b = doc.add_extra_layer(folder).unwrap();
        assert_eq!(a, LayerRef::Extra(folder, 1));
        assert_eq!(b, LayerRef::Extra(folder, 2));

        assert!(doc.reorder_layer(folder, b, LayerDirection::Down).unwrap());
        assert_eq!(doc.layer_order(folder), &[folder.main_layer(), b, a]);
        assert!(!doc.reorder_layer(folder, a, LayerDirection::Up).unwrap());

        doc.remove_layer(b).unwrap();
        assert_eq!(doc.layer_order(folder), &[folder.main_layer(), a]);
        assert!(doc.remove_layer(folder.main_layer()).is_err());
        doc.check_integrity().unwrap();
    }

    #[test]
    fn test_stroke_mutations() {
        let (mut doc, folder) = document();
        let layer = folder.main_layer();
        let s1 = stroke(layer, 0.0);
        let s2 = stroke(layer, 50.0);
        doc.add_stroke(layer, s1.clone()).unwrap();
        doc.add_stroke(layer, s2.clone()).unwrap();

        assert!(doc.append_point(layer, s1.id, Pos2::new(0.0, 20.0)).unwrap());
        assert_eq!(doc.stroke(layer, s1.id).unwrap().points.len(), 3);

        doc.transform_strokes(layer, &[s2.id], |p| p + Vec2::new(1.0, 1.0)).unwrap();
        assert_eq!(doc.stroke(layer, s2.id).unwrap().points[0], Pos2::new(51.0, 1.0));

        let removed = doc.remove_strokes(layer, |s| s.id == s1.id).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(doc.strokes(layer).len(), 1);
    }

    #[test]
    fn test_snapshots_share_untouched_layers() {
        let (mut doc, folder) = document();
        let layer = folder.main_layer();
        doc.add_stroke(layer, stroke(layer, 0.0)).unwrap();

        let snapshot = doc.clone();
        doc.add_stroke(layer, stroke(layer, 5.0)).unwrap();

        assert_eq!(snapshot.strokes(layer).len(), 1);
        assert_eq!(doc.strokes(layer).len(), 2);
    }

    #[test]
    fn test_removing_folder_drops_its_layers() {
        let (mut doc, folder) = document();
        let extra = doc.add_extra_layer(folder).unwrap();
        doc.add_stroke(extra, stroke(extra, 1.0)).unwrap();
        doc.remove_folder(folder).unwrap();
        assert!(!doc.has_layer(extra));
        assert!(doc.strokes(extra).is_empty());
        doc.check_integrity().unwrap();
    }

    #[test]
    fn test_unknown_layer_is_an_error() {
        let (mut doc, folder) = document();
        let ghost = LayerRef::Extra(folder, 9);
        assert_eq!(
            doc.add_stroke(ghost, stroke(ghost, 0.0)),
            Err(DocumentError::UnknownLayer(ghost))
        );
    }
}
