mod common;

use common::Fixture;
use pmofiles::{EntryKind, FilesError, Root, list};

#[test]
fn test_music_listing() {
    let fixture = Fixture::new();
    let root = Root::new(&fixture.root).unwrap();
    let music = root.resolve("Music").unwrap();

    let listing = list(&music).unwrap();
    assert_eq!(listing.path, "Music");
    assert_eq!(listing.name, "Music");
    assert_eq!(listing.parent.as_deref(), Some(""));

    let names: Vec<_> = listing.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        ["Disco", "a.mp3", "broken.flac", "My Song.mp3", "notes.txt"]
    );

    let disco = &listing.entries[0];
    assert_eq!(disco.kind, EntryKind::Directory);
    assert_eq!(disco.child_count, Some(1));
    assert_eq!(disco.path, "Music/Disco");
    assert_eq!(disco.size, None);

    let a = &listing.entries[1];
    assert_eq!(a.kind, EntryKind::File);
    assert_eq!(a.size, Some(2048));
    assert_eq!(a.human_size().as_deref(), Some("2.0KB"));
    assert!(a.is_audio);
    assert_eq!(a.album.as_deref(), Some(""));

    let notes = &listing.entries[4];
    assert!(!notes.is_audio);
    assert_eq!(notes.album, None);
}

#[test]
fn test_album_in_listing() {
    let fixture = Fixture::new();
    let root = Root::new(&fixture.root).unwrap();
    let listing = list(&root.resolve("Music").unwrap()).unwrap();

    let song = listing
        .entries
        .iter()
        .find(|e| e.name == "My Song.mp3")
        .unwrap();
    assert_eq!(song.album.as_deref(), Some("Hits"));

    // A corrupt audio file is listed with an empty album
    let broken = listing
        .entries
        .iter()
        .find(|e| e.name == "broken.flac")
        .unwrap();
    assert!(broken.is_audio);
    assert_eq!(broken.album.as_deref(), Some(""));
}

#[test]
fn test_root_listing_has_no_parent() {
    let fixture = Fixture::new();
    let root = Root::new(&fixture.root).unwrap();
    let listing = list(&root.resolve("").unwrap()).unwrap();

    assert_eq!(listing.parent, None);
    assert_eq!(listing.path, "");
    assert_eq!(listing.entries.len(), 1);
    assert_eq!(listing.entries[0].name, "Music");
}

#[test]
fn test_listing_a_file_fails() {
    let fixture = Fixture::new();
    let root = Root::new(&fixture.root).unwrap();
    let file = root.resolve("Music/a.mp3").unwrap();
    assert!(matches!(list(&file), Err(FilesError::NotADirectory)));
}

#[test]
fn test_empty_directory() {
    let fixture = Fixture::new();
    std::fs::create_dir(fixture.path("Empty")).unwrap();
    let root = Root::new(&fixture.root).unwrap();

    let top = list(&root.resolve("").unwrap()).unwrap();
    let empty = top.entries.iter().find(|e| e.name == "Empty").unwrap();
    assert_eq!(empty.child_count, Some(0));

    let listing = list(&root.resolve("Empty").unwrap()).unwrap();
    assert!(listing.entries.is_empty());
}

#[cfg(unix)]
#[test]
fn test_symlinks_leading_outside_are_hidden() {
    let fixture = Fixture::new();
    std::os::unix::fs::symlink(fixture.outside(), fixture.path("Music/escape")).unwrap();
    let root = Root::new(&fixture.root).unwrap();

    let listing = list(&root.resolve("Music").unwrap()).unwrap();
    assert!(listing.entries.iter().all(|e| e.name != "escape"));
}
