use chart_core::{
    history::HistoryError,
    primitives::{MusicalPosition, RationalPosition},
    ChartDocument, ChartError, Note,
};

mod common;

fn note(lane: chart_core::geometry::LaneId, measure: u32, kind: &str) -> Note {
    Note::new(
        lane,
        MusicalPosition::new(measure, RationalPosition::new(1, 4)),
        RationalPosition::new(1, 4),
        1,
        kind,
    )
}

#[test]
fn undo_then_redo_restores_state() {
    let mut chart = common::chart(16);
    let lane = common::lane(&mut chart, 4, &[(0, (0, 4), 4.0), (8, (0, 4), 4.0)]);

    let mut ids = Vec::new();
    for measure in 0..4 {
        ids.push(chart.add_note(note(lane, measure, "tap")).unwrap());
        assert!(chart.save().unwrap());
    }
    let head = chart.add_note(note(lane, 5, "hold")).unwrap();
    let tail = chart.add_note(note(lane, 6, "tap")).unwrap();
    chart.add_note_line(head, tail).unwrap();
    chart.save().unwrap();
    chart.remove_note(ids[1]).unwrap();
    chart.save().unwrap();
    chart.remove_note(tail).unwrap();
    chart.save().unwrap();

    let expected = chart.snapshot();
    for k in 1..=7 {
        for _ in 0..k {
            assert!(chart.undo().unwrap());
        }
        for _ in 0..k {
            assert!(chart.redo().unwrap());
        }
        assert_eq!(chart.snapshot(), expected, "after {} steps", k);
    }
    assert!(!chart.redo().unwrap());
}

#[test]
fn undo_restores_note_lines() {
    let mut chart = common::chart(16);
    let lane = common::lane(&mut chart, 4, &[(0, (0, 4), 4.0), (8, (0, 4), 4.0)]);
    let head = chart.add_note(note(lane, 1, "hold")).unwrap();
    let tail = chart.add_note(note(lane, 2, "tap")).unwrap();
    let line = chart.add_note_line(head, tail).unwrap();
    chart.save().unwrap();
    chart.remove_note(head).unwrap();
    assert!(chart.note_line(line).is_none());
    chart.save().unwrap();

    chart.undo().unwrap();
    assert_eq!(chart.note_line(line).unwrap().head, head);
    assert_eq!(chart.lane_notes(lane).count(), 2);
}

#[test]
fn unsaved_changes_are_replaced_by_undo() {
    let mut chart = common::chart(16);
    let lane = common::lane(&mut chart, 4, &[(0, (0, 4), 4.0), (8, (0, 4), 4.0)]);
    chart.add_note(note(lane, 1, "tap")).unwrap();
    chart.save().unwrap();
    chart.add_note(note(lane, 2, "tap")).unwrap();
    assert!(chart.undo().unwrap());
    assert_eq!(chart.notes().count(), 0);
    assert!(matches!(
        chart.add_note(note(lane, 2, "unknown")),
        Err(ChartError::UnknownNoteKind(_))
    ));
}

#[test]
fn capacity_limits_undo_depth() {
    let mut chart = chart_core::Chart::new(chart_core::EditorConfig {
        measure_count: 16,
        history_capacity: 2,
        ..Default::default()
    });
    let lane = common::lane(&mut chart, 4, &[(0, (0, 4), 4.0), (8, (0, 4), 4.0)]);
    for measure in 0..5 {
        chart.add_note(note(lane, measure, "tap")).unwrap();
        chart.save().unwrap();
    }
    assert!(chart.undo().unwrap());
    assert!(chart.undo().unwrap());
    assert!(!chart.can_undo());
    assert_eq!(chart.notes().count(), 3);
}

#[test]
fn undo_does_not_restore_notes_of_removed_lane() {
    let mut chart = common::chart(16);
    let kept = common::lane(&mut chart, 4, &[(0, (0, 4), 4.0)]);
    let removed = common::lane(&mut chart, 4, &[(0, (0, 4), 4.0)]);
    chart.add_note(note(kept, 1, "tap")).unwrap();
    chart.add_note(note(removed, 2, "tap")).unwrap();
    chart.save().unwrap();
    chart.remove_lane(removed).unwrap();
    chart.save().unwrap();

    assert!(matches!(
        chart.undo(),
        Err(ChartError::History(HistoryError::Inconsistent(_)))
    ));
    assert_eq!(chart.notes().count(), 1);
    assert_eq!(chart.lane_notes(kept).count(), 1);
    assert!(!chart.can_undo());
    assert!(matches!(
        chart.redo(),
        Err(ChartError::History(HistoryError::Disabled))
    ));

    let json = chart.to_document().to_json().unwrap();
    let document = ChartDocument::from_json(&json).unwrap();
    assert_eq!(document.notes.len(), 1);
}

#[test]
fn redo_does_not_restore_notes_beyond_last_measure() {
    let mut chart = common::chart(16);
    let lane = common::lane(&mut chart, 4, &[(0, (0, 4), 4.0)]);
    chart.add_note(note(lane, 1, "tap")).unwrap();
    chart.save().unwrap();
    chart.add_note(note(lane, 12, "tap")).unwrap();
    chart.save().unwrap();
    assert!(chart.undo().unwrap());
    chart.regenerate_measures(8).unwrap();

    assert!(matches!(
        chart.redo(),
        Err(ChartError::History(HistoryError::Inconsistent(_)))
    ));
    assert_eq!(chart.notes().count(), 1);
    assert!(chart.history().is_disabled());
}
