use super::*;
use std::path::Path;
use std::sync::Arc;
use std::thread;

fn lib() -> Library {
    Library::open_in_memory().unwrap()
}

#[test]
fn add_is_idempotent_per_path() {
    let lib = lib();
    assert!(lib.add(Path::new("/music/a.mp3"), "a.mp3").unwrap());
    assert!(!lib.add(Path::new("/music/a.mp3"), "renamed").unwrap());

    let all = lib.all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "a.mp3");
    assert_eq!(all[0].play_count, 0);
}

#[test]
fn add_accepts_paths_missing_from_disk() {
    let lib = lib();
    assert!(lib.add(Path::new("/definitely/not/here.wav"), "ghost").unwrap());
    assert!(lib.get(Path::new("/definitely/not/here.wav")).unwrap().is_some());
}

#[test]
fn search_is_case_insensitive_substring() {
    let lib = lib();
    lib.add(Path::new("/m/1.mp3"), "Black Sabbath - Paranoid").unwrap();
    lib.add(Path::new("/m/2.mp3"), "Metallica - Blackened").unwrap();
    lib.add(Path::new("/m/3.mp3"), "Abba - Waterloo").unwrap();

    let titles: Vec<String> = lib
        .search("black")
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["Black Sabbath - Paranoid", "Metallica - Blackened"]);

    assert_eq!(lib.search("WATER").unwrap().len(), 1);
    assert!(lib.search("zzz").unwrap().is_empty());
    // LIKE wildcards have no special meaning.
    assert!(lib.search("%").unwrap().is_empty());
}

#[test]
fn increment_play_count_ignores_unknown_paths() {
    let lib = lib();
    lib.increment_play_count(Path::new("/nowhere.mp3")).unwrap();
    assert!(lib.all().unwrap().is_empty());
}

#[test]
fn recommendations_sorted_by_count_then_insertion() {
    let lib = lib();
    for name in ["a", "b", "c", "d"] {
        lib.add(&Path::new("/m").join(name), name).unwrap();
    }
    lib.increment_play_count(Path::new("/m/c")).unwrap();
    lib.increment_play_count(Path::new("/m/c")).unwrap();
    lib.increment_play_count(Path::new("/m/b")).unwrap();
    lib.increment_play_count(Path::new("/m/d")).unwrap();

    let recs = lib.recommendations().unwrap();
    let order: Vec<&str> = recs.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(order, vec!["c", "b", "d", "a"]);
    assert!(recs.windows(2).all(|w| w[0].play_count >= w[1].play_count));
}

#[test]
fn play_counts_never_decrease() {
    let lib = lib();
    let p = Path::new("/m/x.ogg");
    lib.add(p, "x").unwrap();
    let mut last = 0;
    for _ in 0..5 {
        lib.increment_play_count(p).unwrap();
        let now = lib.get(p).unwrap().unwrap().play_count;
        assert!(now > last);
        last = now;
    }
    // Re-adding does not reset the count.
    lib.add(p, "x").unwrap();
    assert_eq!(lib.get(p).unwrap().unwrap().play_count, 5);
}

#[test]
fn remove_deletes_the_row() {
    let lib = lib();
    lib.add(Path::new("/m/a"), "a").unwrap();
    lib.add(Path::new("/m/b"), "b").unwrap();
    lib.remove(Path::new("/m/a")).unwrap();

    let all = lib.all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "b");
    // Removing again is harmless.
    lib.remove(Path::new("/m/a")).unwrap();
}

#[test]
fn open_creates_parent_dirs_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("nested").join("library.db");
    {
        let lib = Library::open(&db).unwrap();
        lib.add(Path::new("/m/a.wav"), "a").unwrap();
        lib.increment_play_count(Path::new("/m/a.wav")).unwrap();
    }
    let lib = Library::open(&db).unwrap();
    let track = lib.get(Path::new("/m/a.wav")).unwrap().unwrap();
    assert_eq!(track.play_count, 1);
}

#[test]
fn concurrent_writers_and_readers_see_whole_rows() {
    let lib = Arc::new(lib());
    let writer = {
        let lib = Arc::clone(&lib);
        thread::spawn(move || {
            for i in 0..50 {
                let p = format!("/m/{i}.mp3");
                lib.add(Path::new(&p), &format!("song {i}")).unwrap();
                lib.increment_play_count(Path::new(&p)).unwrap();
            }
        })
    };

    for _ in 0..50 {
        for t in lib.recommendations().unwrap() {
            assert!(t.title.starts_with("song "));
        }
        let _ = lib.search("song").unwrap();
    }
    writer.join().unwrap();

    let recs = lib.recommendations().unwrap();
    assert_eq!(recs.len(), 50);
    assert!(recs.iter().all(|t| t.play_count == 1));
}

#[test]
fn label_matches_listbox_format() {
    let t = Track {
        path: "/m/a.mp3".into(),
        title: "a.mp3".into(),
        play_count: 3,
    };
    assert_eq!(t.label(), "a.mp3 (Listens: 3)");
}

#[test]
fn title_for_path_falls_back_to_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("Some Song.mp3");
    std::fs::write(&p, b"not a real mp3").unwrap();
    assert_eq!(title_for_path(&p), "Some Song.mp3");
}
