//! End-to-end scenarios against the public facade, each starting from a
//! freshly formatted image.

use microfat::{layout, FileSystem};
use tempfile::NamedTempFile;

fn fresh_image() -> (FileSystem, NamedTempFile) {
    let _ = env_logger::try_init();
    let tmp = NamedTempFile::new().expect("create temp file");
    // FileSystem::open creates its own backing file at the given path;
    // drop and recreate so the zero-length tempfile doesn't collide with
    // the "already the right size" fast path.
    let path = tmp.path().to_path_buf();
    std::fs::remove_file(&path).ok();
    let fs = FileSystem::open(&path).expect("open fresh image");
    (fs, tmp)
}

#[test]
fn s1_create_write_read() {
    let (mut fs, _guard) = fresh_image();

    fs.create_file("A.TXT", None).unwrap();
    fs.write_file("A.TXT", b"hello", None).unwrap();
    assert_eq!(fs.read_file("A.TXT", None).unwrap(), b"hello");

    let entry = fs.lookup(fs.current_dir(), "A.TXT").unwrap().unwrap();
    assert_eq!(entry.file_size, 5);
    assert_ne!(entry.first_cluster, 0);
}

#[test]
fn s2_overwrite_shrinks_frees_space() {
    let (mut fs, _guard) = fresh_image();

    fs.create_file("A.TXT", None).unwrap();
    fs.write_file("A.TXT", &vec![b'x'; layout::CLUSTER_SIZE * 3], None)
        .unwrap();
    let free_after_big = fs.free_space();

    fs.write_file("A.TXT", b"hi", None).unwrap();
    assert_eq!(fs.read_file("A.TXT", None).unwrap(), b"hi");
    assert!(fs.free_space() > free_after_big);
}

#[test]
fn s3_append_across_cluster_boundary() {
    let (mut fs, _guard) = fresh_image();

    fs.create_file("B.BIN", None).unwrap();
    let chunk = vec![0xABu8; layout::CLUSTER_SIZE];
    for _ in 0..3 {
        fs.append_to_file("B.BIN", &chunk, None).unwrap();
    }

    let content = fs.read_file("B.BIN", None).unwrap();
    assert_eq!(content.len(), 3 * layout::CLUSTER_SIZE);
    assert!(content.iter().all(|&b| b == 0xAB));
}

#[test]
fn s4_directory_extension_preserves_insertion_order() {
    let (mut fs, _guard) = fresh_image();

    let capacity = layout::CLUSTER_SIZE / layout::DIR_ENTRY_SIZE;
    let names: Vec<String> = (0..=capacity).map(|i| format!("F{i}.TXT")).collect();
    for name in &names {
        fs.create_file(name, None).unwrap();
    }

    let root = fs.current_dir();
    let listed = fs.list_directory(root).unwrap();
    assert_eq!(listed.len(), names.len());

    let listed_names: Vec<String> = listed.iter().map(|e| e.clean_name()).collect();
    assert_eq!(listed_names, names);
}

#[test]
fn s5_rmdir_nonempty_is_rejected() {
    let (mut fs, _guard) = fresh_image();

    fs.create_directory("D", None).unwrap();
    let d = fs.lookup(fs.current_dir(), "D").unwrap().unwrap();
    fs.create_file("X", Some(d.first_cluster as usize)).unwrap();

    let free_before = fs.free_space();
    let err = fs.remove_directory("D", None).unwrap_err();
    assert!(matches!(err, microfat::Error::DirectoryNotEmpty { .. }));

    assert!(fs.lookup(fs.current_dir(), "D").unwrap().is_some());
    assert_eq!(fs.free_space(), free_before);
}

#[test]
fn s6_name_normalization_and_clean_form() {
    let (mut fs, _guard) = fresh_image();

    fs.create_file("hello.txt", None).unwrap();
    let entry = fs.lookup(fs.current_dir(), "HELLO.TXT").unwrap().unwrap();

    assert_eq!(&entry.name, b"HELLO   TXT");
    assert_eq!(entry.clean_name(), "HELLO.TXT");
}

#[test]
fn chain_walk_terminates_within_cluster_budget() {
    let (mut fs, _guard) = fresh_image();

    fs.create_file("BIG.BIN", None).unwrap();
    let content = vec![0u8; layout::CLUSTER_SIZE * 5 + 17];
    fs.write_file("BIG.BIN", &content, None).unwrap();

    let entry = fs.lookup(fs.current_dir(), "BIG.BIN").unwrap().unwrap();
    // read_file walks the chain internally; a non-terminating chain would
    // surface CorruptedFat here instead of returning.
    assert_eq!(
        fs.read_file("BIG.BIN", None).unwrap().len(),
        entry.file_size as usize
    );
}

#[test]
fn delete_increases_free_count_and_forgets_entry() {
    let (mut fs, _guard) = fresh_image();

    fs.create_file("A.TXT", None).unwrap();
    fs.write_file("A.TXT", &vec![b'z'; layout::CLUSTER_SIZE * 2], None)
        .unwrap();
    let free_before = fs.free_space();

    fs.delete_file("A.TXT", None).unwrap();
    assert!(fs.free_space() > free_before);
    assert!(fs.lookup(fs.current_dir(), "A.TXT").unwrap().is_none());
}

#[test]
fn copy_produces_independent_identical_content() {
    let (mut fs, _guard) = fresh_image();

    fs.create_file("S.TXT", None).unwrap();
    fs.write_file("S.TXT", b"shared payload", None).unwrap();
    fs.copy_file("S.TXT", "D.TXT", None).unwrap();

    assert_eq!(fs.read_file("D.TXT", None).unwrap(), fs.read_file("S.TXT", None).unwrap());

    fs.write_file("D.TXT", b"changed", None).unwrap();
    assert_eq!(fs.read_file("S.TXT", None).unwrap(), b"shared payload");
}

#[test]
fn disk_full_during_overwrite_leaves_prior_content_intact() {
    let (mut fs, _guard) = fresh_image();

    fs.create_file("A.TXT", None).unwrap();
    fs.write_file("A.TXT", b"keep me", None).unwrap();

    // Exhaust free space with a second file so the next overwrite of A.TXT
    // cannot allocate a new chain.
    fs.create_file("FILLER.BIN", None).unwrap();
    let free_clusters = fs.free_space() / layout::CLUSTER_SIZE;
    let filler = vec![0u8; free_clusters * layout::CLUSTER_SIZE];
    fs.write_file("FILLER.BIN", &filler, None).unwrap();

    let err = fs.write_file("A.TXT", b"this allocation cannot fit", None).unwrap_err();
    assert!(matches!(err, microfat::Error::DiskFull { .. }));

    assert_eq!(fs.read_file("A.TXT", None).unwrap(), b"keep me");
}
