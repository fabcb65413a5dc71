//! Browsing and reading plain-text books through the full session.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crosspoint_core::screens::ActiveScreen;
use crosspoint_core::test_display::{Flush, TestDisplay};
use crosspoint_core::{
    AppState, Button, FileSystem, FixedBattery, InputEvent, MockFileSystem, MonoShaper, Renderer,
    ScreenKind, Session, SessionConfig, SharedFileSystem, TextBookStore,
};

const WAIT: Duration = Duration::from_secs(5);

type TextSession = Session<TestDisplay, MonoShaper, TextBookStore>;

fn long_chapter(title: &str, paragraphs: usize) -> String {
    let mut text = format!("{}\n\n", title);
    for i in 0..paragraphs {
        text.push_str(&format!(
            "Paragraph {} of {} rolls on with plenty of ordinary words to wrap across the page.\n",
            i, title
        ));
    }
    text
}

fn library() -> MockFileSystem {
    let mut fs = MockFileSystem::new();
    fs.add_directory("/classics");
    let book = [long_chapter("Opening", 120), long_chapter("Middle", 5), long_chapter("Ending", 5)].join("\x0C");
    fs.add_file("/classics/tale.txt", book);
    fs.add_file("/classics/cover.jpg", [0u8; 4]);
    fs.add_file("/readme.txt", "Short.");
    fs
}

fn session(storage: MockFileSystem) -> (TextSession, Arc<Mutex<MockFileSystem>>) {
    let storage = Arc::new(Mutex::new(storage));
    let fs: SharedFileSystem = storage.clone();
    let mut config = SessionConfig::default()
        .with_render_stack_bytes(512 * 1024)
        .without_sleep_delay();
    config.render_tick = Duration::from_millis(1);
    let session = Session::new(
        config,
        Renderer::new(TestDisplay::default_size(), MonoShaper).into_shared(),
        fs.clone(),
        Arc::new(FixedBattery(42)),
        TextBookStore::new(fs),
    );
    (session, storage)
}

fn settle(session: &TextSession) {
    match session.active_screen() {
        Some(ActiveScreen::Reader(reader)) => assert!(reader.wait_until_idle(WAIT)),
        Some(ActiveScreen::FileSelection(files)) => assert!(files.wait_until_idle(WAIT)),
        _ => {}
    }
}

fn press(session: &mut TextSession, button: Button) {
    session.poll_once(InputEvent::press(button));
    settle(session);
}

fn position(session: &TextSession) -> Option<(usize, usize)> {
    session
        .active_screen()
        .and_then(ActiveScreen::as_reader)
        .and_then(|reader| reader.position())
}

#[test]
fn browse_into_folder_and_open_book() {
    let (mut session, storage) = session(library());
    session.start();
    settle(&session);

    let files = session.active_screen().and_then(ActiveScreen::as_file_selection).unwrap();
    let listing = files.listing().unwrap();
    let names: Vec<_> = listing.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["classics", "readme.txt"]);

    press(&mut session, Button::Confirm);
    press(&mut session, Button::Confirm);
    assert_eq!(session.active_kind(), Some(ScreenKind::Reader));
    assert_eq!(position(&session), Some((0, 0)));

    // First open indexes the chapter behind a banner
    let renderer = session.renderer();
    let flushes = renderer.lock().unwrap().display().flushes().to_vec();
    assert!(flushes.iter().any(|flush| matches!(flush, Flush::Region { .. })));
    assert_eq!(flushes.last(), Some(&Flush::Full));

    let mut storage = storage.lock().unwrap();
    let state = AppState::load(&mut *storage, "/.crosspoint");
    assert_eq!(state.open_document.as_deref(), Some("/classics/tale.txt"));
    let cache_dirs = storage.list_files("/.crosspoint").unwrap();
    assert!(cache_dirs.iter().any(|entry| entry.is_directory && entry.name.starts_with("txt_")));
}

#[test]
fn long_chapter_spans_pages_and_crosses_into_next() {
    let (mut session, _) = session(library());
    session.start();
    session.open_document("/classics/tale.txt");
    settle(&session);

    press(&mut session, Button::Right);
    assert_eq!(position(&session), Some((0, 1)));

    session.poll_once(InputEvent::hold(Button::Right, 900));
    settle(&session);
    assert_eq!(position(&session), Some((1, 0)));

    press(&mut session, Button::Right);
    assert_eq!(position(&session), Some((2, 0)));

    press(&mut session, Button::Left);
    assert_eq!(position(&session), Some((1, 0)));
}

#[test]
fn reboot_resumes_book_and_page_without_reindexing() {
    let (mut first, storage) = session(library());
    first.start();
    first.open_document("/classics/tale.txt");
    settle(&first);
    press(&mut first, Button::VolumeDown);
    press(&mut first, Button::VolumeDown);
    assert_eq!(position(&first), Some((0, 2)));
    drop(first);

    let saved = std::mem::take(&mut *storage.lock().unwrap());
    let (mut second, _) = session(saved);
    second.start();
    settle(&second);
    assert_eq!(second.active_kind(), Some(ScreenKind::Reader));
    assert_eq!(position(&second), Some((0, 2)));

    let renderer = second.renderer();
    let flushes = renderer.lock().unwrap().display().flushes().to_vec();
    assert!(!flushes.iter().any(|flush| matches!(flush, Flush::Region { .. })));
}
