use eframe_animate::command::{Command, ToolKind};
use eframe_animate::config::EditorConfig;
use eframe_animate::geometry::points_bounds;
use eframe_animate::input::InputEvent;
use eframe_animate::layer::{FolderId, LayerRef, RowId};
use eframe_animate::state::EditorSession;
use eframe_animate::tools::EraserMode;
use egui::{Pos2, Rect};

// Helper: a session with one row and a three-frame folder at frame 1
fn session_with_folder() -> (EditorSession, FolderId) {
    let mut session = EditorSession::new(EditorConfig::default());
    session.apply_command(Command::AddRow { name: "Ink".into() }).unwrap();
    let row = session.selected_row().unwrap();
    session
        .apply_command(Command::AddFolder { row, frame_index: 1, length: 3 })
        .unwrap();
    (session, FolderId::new(row, 1))
}

fn drag(session: &mut EditorSession, points: &[(f32, f32)]) {
    let pos = |(x, y): (f32, f32)| Pos2::new(x, y);
    session.handle_input(InputEvent::PointerDown { pos: pos(points[0]) }).unwrap();
    for point in &points[1..] {
        session.handle_input(InputEvent::PointerMove { pos: pos(*point) }).unwrap();
    }
    let last = points[points.len() - 1];
    session.handle_input(InputEvent::PointerUp { pos: pos(last) }).unwrap();
}

fn main_strokes_bounds(session: &EditorSession, folder: FolderId) -> Rect {
    let strokes = session.document().strokes(folder.main_layer());
    assert_eq!(strokes.len(), 1);
    points_bounds(&strokes[0].points)
}

fn assert_rect_near(actual: Rect, expected: Rect) {
    let close = |a: f32, b: f32| (a - b).abs() < 1e-3;
    assert!(
        close(actual.min.x, expected.min.x)
            && close(actual.min.y, expected.min.y)
            && close(actual.max.x, expected.max.x)
            && close(actual.max.y, expected.max.y),
        "{actual:?} != {expected:?}"
    );
}

#[test]
fn test_draw_erase_undo_redo() {
    let (mut session, folder) = session_with_folder();
    let layer = folder.main_layer();

    let line: Vec<(f32, f32)> = (0..=10).map(|i| (i as f32 * 10.0, 0.0)).collect();
    drag(&mut session, &line);
    assert_eq!(session.document().point_count(layer), 11);
    let drawn = session.document().clone();

    session.apply_command(Command::SetTool(ToolKind::Eraser)).unwrap();
    session.apply_command(Command::SetEraserMode(EraserMode::Precision)).unwrap();
    session.apply_command(Command::SetEraserSize(5.0)).unwrap();
    drag(&mut session, &[(50.0, 0.0), (50.0, 1.0)]);
    assert_eq!(session.document().point_count(layer), 10);
    let erased = session.document().clone();

    session.apply_command(Command::Undo).unwrap();
    assert_eq!(session.document(), &drawn);
    session.apply_command(Command::Redo).unwrap();
    assert_eq!(session.document(), &erased);
}

#[test]
fn test_precision_erase_over_one_of_two_strokes() {
    let (mut session, folder) = session_with_folder();
    let layer = folder.main_layer();
    drag(&mut session, &[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
    drag(&mut session, &[(0.0, 100.0), (10.0, 100.0), (20.0, 100.0)]);
    let second = session.document().strokes(layer)[1].clone();
    let undo_steps = session.history().undo_len();

    session.apply_command(Command::SetTool(ToolKind::Eraser)).unwrap();
    session.apply_command(Command::SetEraserMode(EraserMode::Precision)).unwrap();
    session.apply_command(Command::SetEraserSize(5.0)).unwrap();
    drag(&mut session, &[(10.0, 0.0), (10.0, 1.0)]);

    let strokes = session.document().strokes(layer);
    assert_eq!(strokes.len(), 2);
    assert_eq!(strokes[0].points, vec![Pos2::new(0.0, 0.0), Pos2::new(20.0, 0.0)]);
    assert_eq!(strokes[1], second);
    assert_eq!(session.history().undo_len(), undo_steps + 1);
}

#[test]
fn test_stroke_eraser_removes_whole_strokes() {
    let (mut session, folder) = session_with_folder();
    drag(&mut session, &[(0.0, 0.0), (100.0, 0.0)]);
    drag(&mut session, &[(0.0, 50.0), (100.0, 50.0)]);

    session.apply_command(Command::SetTool(ToolKind::Eraser)).unwrap();
    session.apply_command(Command::SetEraserMode(EraserMode::Stroke)).unwrap();
    session.apply_command(Command::SetEraserSize(5.0)).unwrap();
    drag(&mut session, &[(200.0, 200.0), (101.0, 1.0)]);

    let strokes = session.document().strokes(folder.main_layer());
    assert_eq!(strokes.len(), 1);
    assert_eq!(strokes[0].points[0], Pos2::new(0.0, 50.0));
}

#[test]
fn test_undo_redo_walks_every_edit() {
    let (mut session, folder) = session_with_folder();
    let mut snapshots = vec![session.document().clone()];

    drag(&mut session, &[(5.0, 5.0), (25.0, 25.0)]);
    snapshots.push(session.document().clone());
    session.apply_command(Command::AddLayer(folder)).unwrap();
    snapshots.push(session.document().clone());
    session
        .apply_command(Command::RenameLayer {
            layer: LayerRef::Extra(folder, 1),
            name: "Shadows".into(),
        })
        .unwrap();
    snapshots.push(session.document().clone());
    session
        .apply_command(Command::SetFolderLength { folder, length: 6 })
        .unwrap();
    snapshots.push(session.document().clone());

    for expected in snapshots.iter().rev().skip(1) {
        session.apply_command(Command::Undo).unwrap();
        assert_eq!(session.document(), expected);
    }
    // row and folder creation are still on the stack
    assert_eq!(session.history().undo_len(), 2);

    for expected in snapshots.iter().skip(1) {
        session.apply_command(Command::Redo).unwrap();
        assert_eq!(session.document(), expected);
    }
    assert!(!session.can_redo());
}

#[test]
fn test_new_edit_clears_redo() {
    let (mut session, _) = session_with_folder();
    drag(&mut session, &[(5.0, 5.0), (25.0, 25.0)]);
    session.apply_command(Command::Undo).unwrap();
    assert!(session.can_redo());
    drag(&mut session, &[(40.0, 40.0), (45.0, 45.0)]);
    assert!(!session.can_redo());
}

fn select_square_stroke(session: &mut EditorSession) {
    drag(session, &[(10.0, 10.0), (60.0, 10.0), (60.0, 60.0)]);
    session.apply_command(Command::SetTool(ToolKind::Move)).unwrap();
    drag(session, &[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]);
    assert!(session.state().has_selection());
    assert_rect_near(
        session.resize_box().unwrap().rect,
        Rect::from_min_max(Pos2::new(10.0, 10.0), Pos2::new(60.0, 60.0)),
    );
}

#[test]
fn test_resize_from_corner_scales_strokes() {
    let (mut session, folder) = session_with_folder();
    select_square_stroke(&mut session);

    drag(&mut session, &[(60.0, 60.0), (85.0, 85.0), (110.0, 110.0)]);
    let expected = Rect::from_min_max(Pos2::new(10.0, 10.0), Pos2::new(110.0, 110.0));
    assert_rect_near(main_strokes_bounds(&session, folder), expected);
    assert_rect_near(session.resize_box().unwrap().rect, expected);
    let corner = session.document().strokes(folder.main_layer())[0].points[1];
    assert!((corner.x - 110.0).abs() < 1e-3 && (corner.y - 10.0).abs() < 1e-3);

    // one resize, one undo step
    session.apply_command(Command::Undo).unwrap();
    assert_rect_near(
        main_strokes_bounds(&session, folder),
        Rect::from_min_max(Pos2::new(10.0, 10.0), Pos2::new(60.0, 60.0)),
    );
}

#[test]
fn test_resize_is_floored_at_minimum_size() {
    let (mut session, folder) = session_with_folder();
    select_square_stroke(&mut session);

    drag(&mut session, &[(60.0, 60.0), (0.0, 0.0)]);
    assert_rect_near(
        main_strokes_bounds(&session, folder),
        Rect::from_min_max(Pos2::new(10.0, 10.0), Pos2::new(20.0, 20.0)),
    );
}

#[test]
fn test_move_selection_by_dragging_inside_lasso() {
    let (mut session, folder) = session_with_folder();
    select_square_stroke(&mut session);

    drag(&mut session, &[(30.0, 30.0), (40.0, 50.0)]);
    assert_rect_near(
        main_strokes_bounds(&session, folder),
        Rect::from_min_max(Pos2::new(20.0, 30.0), Pos2::new(70.0, 80.0)),
    );
    assert!(session.state().has_selection());
}

#[test]
fn test_cancel_restores_document() {
    let (mut session, folder) = session_with_folder();
    let before = session.document().clone();
    let undo_steps = session.history().undo_len();
    session.handle_input(InputEvent::PointerDown { pos: Pos2::new(1.0, 1.0) }).unwrap();
    session.handle_input(InputEvent::PointerMove { pos: Pos2::new(9.0, 9.0) }).unwrap();
    assert!(session.in_progress_stroke().is_some());

    session.handle_input(InputEvent::Cancel).unwrap();
    assert_eq!(session.document(), &before);
    assert!(session.document().strokes(folder.main_layer()).is_empty());
    assert_eq!(session.history().undo_len(), undo_steps);
}

#[test]
fn test_folder_spans_its_frames() {
    let (mut session, folder) = session_with_folder();
    let row = folder.row;
    let timeline = session.document().timeline();
    for frame in 1..=3 {
        assert_eq!(timeline.folder_at(row, frame).map(|f| f.id()), Some(folder));
    }
    assert!(timeline.folder_at(row, 4).is_none());

    let overlap = session.apply_command(Command::AddFolder { row, frame_index: 3, length: 2 });
    assert!(overlap.is_err());
    session
        .apply_command(Command::AddFolder { row, frame_index: 4, length: 2 })
        .unwrap();
    assert_eq!(session.document().timeline().max_frame(), 5);
}

#[test]
fn test_drawing_on_a_held_frame_targets_the_folder() {
    let (mut session, folder) = session_with_folder();
    session.apply_command(Command::SelectFrame(3)).unwrap();
    assert_eq!(session.selected_layer(), Some(folder.main_layer()));

    drag(&mut session, &[(1.0, 1.0), (2.0, 2.0)]);
    assert_eq!(session.document().strokes(folder.main_layer()).len(), 1);
}

#[test]
fn test_empty_frame_has_no_target_layer() {
    let (mut session, _) = session_with_folder();
    session.apply_command(Command::SelectFrame(7)).unwrap();
    assert_eq!(session.selected_layer(), None);
    let before = session.document().clone();
    drag(&mut session, &[(1.0, 1.0), (2.0, 2.0)]);
    assert_eq!(session.document(), &before);
}

#[test]
fn test_deleting_a_row_drops_its_folders() {
    let (mut session, folder) = session_with_folder();
    session.apply_command(Command::AddRow { name: "BG".into() }).unwrap();
    session.apply_command(Command::DeleteRow(folder.row)).unwrap();

    let timeline = session.document().timeline();
    assert!(timeline.folders().is_empty());
    assert_eq!(timeline.rows().len(), 1);
    assert_eq!(session.selected_row(), Some(RowId(2)));
    assert!(session.document().layer_props(folder.main_layer()).is_none());
}

#[test]
fn test_undoing_a_delete_brings_back_asset_keys() {
    let (mut session, folder) = session_with_folder();
    session
        .apply_command(Command::SetFolderImage {
            folder,
            image_url: Some("file:///assets/plate.png".into()),
            file_name: Some("plate.png".into()),
        })
        .unwrap();
    session.set_asset_key(folder, "shot/assets/frames/row-1/1/1-plate.png".into()).unwrap();

    session.apply_command(Command::DeleteFolder(folder)).unwrap();
    assert!(session.asset_keys().is_empty());
    session.apply_command(Command::Undo).unwrap();
    assert_eq!(
        session.asset_keys().get(&folder).map(String::as_str),
        Some("shot/assets/frames/row-1/1/1-plate.png")
    );

    session.apply_command(Command::DeleteRow(folder.row)).unwrap();
    assert!(session.asset_keys().is_empty());
    session.apply_command(Command::Undo).unwrap();
    assert!(session.asset_keys().contains_key(&folder));
    assert_eq!(
        session.document().folder(folder).unwrap().image_url.as_deref(),
        Some("file:///assets/plate.png")
    );
}
