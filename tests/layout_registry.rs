use memorial_grounds::config::{FieldConfig, LayoutConfig};
use memorial_grounds::layout::{layout, MAX_HEIGHT_SCALE, MIN_HEIGHT_SCALE};
use memorial_grounds::record::{Record, MAX_VISIBLE_RECORDS};
use memorial_grounds::scene::HeadlessRenderer;
use memorial_grounds::MemorialField;

fn records(count: usize) -> Vec<Record> {
    (0..count).map(|i| Record::new(format!("r{i}"), format!("Rec {i}"), "~".repeat(i * 3))).collect()
}

#[test]
fn layout_is_deterministic() {
    let input = records(37);
    let first = layout(&input, &LayoutConfig::default());
    let second = layout(&input, &LayoutConfig::default());
    assert_eq!(first, second);
    assert_eq!(first.side, 7);
    for placement in &first.placements {
        assert!(placement.height_scale >= MIN_HEIGHT_SCALE && placement.height_scale <= MAX_HEIGHT_SCALE);
        let half = first.bounds() / 2.0;
        assert!(placement.position.x.abs() <= half && placement.position.z.abs() <= half);
    }
}

#[test]
fn registry_mirrors_visible_markers() {
    let mut field = MemorialField::new(FieldConfig::default(), HeadlessRenderer::new());
    let input = records(200);
    field.set_records(input.clone()).expect("scene builds");

    assert_eq!(field.records().len(), 200);
    assert_eq!(field.marker_count(), MAX_VISIBLE_RECORDS);
    let registry = field.registry().expect("mounted");
    assert_eq!(registry.len(), MAX_VISIBLE_RECORDS);
    let placements = &field.layout().expect("mounted").placements;
    for (record, placement) in input.iter().zip(placements) {
        assert_eq!(registry.position_of(&record.id), Some(placement.position));
    }
    for record in &input[MAX_VISIBLE_RECORDS..] {
        assert!(!registry.has(&record.id), "{} is past the cap", record.id);
    }
    assert_eq!(field.renderer().live_visuals(), MAX_VISIBLE_RECORDS);
}

#[test]
fn shrinking_the_record_set_drops_stale_ids() {
    let mut field = MemorialField::new(FieldConfig::default(), HeadlessRenderer::new());
    field.set_records(records(20)).expect("scene builds");
    field.set_records(records(4)).expect("rebuild");
    let registry = field.registry().expect("mounted");
    assert_eq!(registry.len(), 4);
    assert!(!registry.has("r10"));
    assert!(!field.focus_on("r10"));
    assert!(field.focus_on("r3"));
}

#[test]
fn custom_cap_limits_markers() {
    let mut config = FieldConfig::default();
    config.layout.max_markers = 9;
    let mut field = MemorialField::new(config, HeadlessRenderer::new());
    field.set_records(records(30)).expect("scene builds");
    assert_eq!(field.marker_count(), 9);
    assert_eq!(field.layout().expect("mounted").side, 3);
    assert_eq!(field.search("Rec 2").len(), 8, "search still covers every loaded record");
}
