use std::cell::RefCell;
use std::collections::HashSet;
use std::io::Write;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use memorial_grounds::config::FieldConfig;
use memorial_grounds::events::FieldEvent;
use memorial_grounds::field::{STATUS_LOADING, STATUS_LOAD_FAILED};
use memorial_grounds::layout::Placement;
use memorial_grounds::minimap::{MinimapFrame, MinimapSurface};
use memorial_grounds::record::{JsonFileSource, LoadError, Record, RecordSource};
use memorial_grounds::scene::{FrameView, HeadlessRenderer, MarkerVisual, SceneRenderer};
use memorial_grounds::MemorialField;
use tempfile::NamedTempFile;
use winit::dpi::PhysicalSize;

fn wait_for_load<R: SceneRenderer>(field: &mut MemorialField<R>) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if field.poll_load().expect("scene builds") {
            return true;
        }
        if !field.is_loading() {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("record load did not finish in time");
}

struct SlowSource {
    delay: Duration,
    records: Vec<Record>,
}

impl RecordSource for SlowSource {
    fn load_records(&self) -> Result<Vec<Record>, LoadError> {
        thread::sleep(self.delay);
        Ok(self.records.clone())
    }
}

#[test]
fn loads_records_from_json_file() {
    let mut temp = NamedTempFile::new().expect("temp records");
    write!(
        temp,
        r#"[
            {{"agent_id":"a1","name":"Crusty","epitaph":"Itâ€™s quiet","last_post_title":"gm"}},
            {{"agent_id":"a2","name":"  Shelly  "}},
            {{"agent_id":"","name":"ghost"}},
            {{"id":"a3","name":"Pinch","text":"short"}}
        ]"#
    )
    .expect("write records");

    let mut field = MemorialField::new(FieldConfig::default(), HeadlessRenderer::new());
    assert_eq!(field.status(), STATUS_LOADING);
    field.begin_load(JsonFileSource::new(temp.path()));
    assert!(wait_for_load(&mut field));

    assert_eq!(field.status(), "3 memorials in the garden");
    assert_eq!(field.marker_count(), 3);
    let names: Vec<&str> = field.records().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Crusty", "Shelly", "Pinch"]);
    assert_eq!(field.records()[0].text, "It's quiet");
    assert_eq!(field.records()[0].note.as_deref(), Some("gm"));
    assert!(field
        .drain_events()
        .contains(&FieldEvent::StatusChanged { status: "3 memorials in the garden".into() }));
}

#[test]
fn missing_file_reports_failure_status() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut field = MemorialField::new(FieldConfig::default(), HeadlessRenderer::new());
    field.begin_load(JsonFileSource::new(dir.path().join("absent.json")));
    assert!(!wait_for_load(&mut field));
    assert_eq!(field.status(), STATUS_LOAD_FAILED);
    assert!(!field.is_mounted());
}

#[test]
fn malformed_json_reports_failure_status() {
    let mut temp = NamedTempFile::new().expect("temp records");
    write!(temp, "{{ not json").expect("write");
    let mut field = MemorialField::new(FieldConfig::default(), HeadlessRenderer::new());
    field.begin_load(JsonFileSource::new(temp.path()));
    assert!(!wait_for_load(&mut field));
    assert_eq!(field.status(), STATUS_LOAD_FAILED);
}

#[test]
fn newer_load_supersedes_older_one() {
    let mut field = MemorialField::new(FieldConfig::default(), HeadlessRenderer::new());
    field.begin_load(SlowSource { delay: Duration::from_millis(150), records: vec![Record::new("old", "Old", "")] });
    field.begin_load(SlowSource { delay: Duration::from_millis(1), records: vec![Record::new("new", "New", "")] });
    assert!(wait_for_load(&mut field));
    thread::sleep(Duration::from_millis(250));
    assert!(!field.poll_load().expect("poll"));
    assert!(field.marker_position("new").is_some());
    assert!(field.marker_position("old").is_none());
}

#[test]
fn teardown_discards_late_results() {
    let mut field = MemorialField::new(FieldConfig::default(), HeadlessRenderer::new());
    field.begin_load(SlowSource { delay: Duration::from_millis(100), records: vec![Record::new("late", "Late", "")] });
    field.teardown();
    thread::sleep(Duration::from_millis(200));
    assert!(!field.poll_load().expect("poll"));
    field.frame().expect("frame");
    assert!(!field.is_mounted());
    assert_eq!(field.status(), STATUS_LOADING);
}

#[test]
fn marker_failure_after_load_reports_and_keeps_running() {
    let mut field = MemorialField::new(FieldConfig::default(), HeadlessRenderer::failing_after(1));
    let records = (0..3).map(|i| Record::new(format!("r{i}"), "n", "")).collect();
    field.begin_load(SlowSource { delay: Duration::ZERO, records });
    assert!(!wait_for_load(&mut field));
    assert!(!field.is_loading());
    assert_eq!(field.status(), STATUS_LOAD_FAILED);
    assert!(!field.is_mounted());
    assert_eq!(field.renderer().live_visuals(), 0);
    field.frame().expect("a failed rebuild does not end the frame loop");
}

#[derive(Clone, Default)]
struct SharedRenderer {
    live: Rc<RefCell<HashSet<MarkerVisual>>>,
    built: Rc<RefCell<u64>>,
    fail_on: Option<&'static str>,
}

impl SceneRenderer for SharedRenderer {
    fn build_marker(&mut self, record: &Record, _placement: &Placement) -> Result<MarkerVisual> {
        if self.fail_on == Some(record.id.as_str()) {
            bail!("cannot build {}", record.id);
        }
        let mut built = self.built.borrow_mut();
        *built += 1;
        let visual = MarkerVisual(*built);
        self.live.borrow_mut().insert(visual);
        Ok(visual)
    }

    fn release_marker(&mut self, visual: MarkerVisual) {
        self.live.borrow_mut().remove(&visual);
    }

    fn set_highlight(&mut self, _visual: MarkerVisual, _highlighted: bool) {}

    fn resize(&mut self, _size: PhysicalSize<u32>) {}

    fn render(&mut self, _frame: &FrameView<'_>) {}

    fn render_minimap(&mut self, _surface: MinimapSurface, _frame: &MinimapFrame) {}
}

fn records(count: usize) -> Vec<Record> {
    (0..count).map(|i| Record::new(format!("r{i}"), format!("Rec {i}"), "")).collect()
}

#[test]
fn dropping_the_field_releases_every_visual() {
    let renderer = SharedRenderer::default();
    let live = Rc::clone(&renderer.live);
    {
        let mut field = MemorialField::new(FieldConfig::default(), renderer);
        field.set_records(records(12)).expect("scene builds");
        assert_eq!(live.borrow().len(), 12);
    }
    assert!(live.borrow().is_empty());
}

#[test]
fn construction_error_releases_partial_markers() {
    let renderer = SharedRenderer { fail_on: Some("r7"), ..SharedRenderer::default() };
    let live = Rc::clone(&renderer.live);
    let mut field = MemorialField::new(FieldConfig::default(), renderer);
    let err = field.set_records(records(12)).unwrap_err();
    assert!(format!("{err:#}").contains("r7"));
    assert!(live.borrow().is_empty());
    assert!(!field.is_mounted());
    assert!(field.registry().is_none());
}

#[test]
fn rebuilding_never_leaks_visuals() {
    let renderer = SharedRenderer::default();
    let live = Rc::clone(&renderer.live);
    let mut field = MemorialField::new(FieldConfig::default(), renderer);
    for count in [5, 200, 0, 3] {
        field.set_records(records(count)).expect("scene builds");
        assert_eq!(live.borrow().len(), count.min(160));
    }
}
