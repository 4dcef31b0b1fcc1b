use std::path::Path;
use std::time::{Duration, SystemTime};

use stowage_core::{Compression, OsUtils, RealOs};
use stowage_pack::{PackError, PackWriter, create_zip_file};
use tempfile::TempDir;

/// Source layout used across tests: `a/b.txt` and `a/c/d.txt`.
fn write_nested_tree(root: &Path) {
    std::fs::create_dir_all(root.join("a/c")).unwrap();
    std::fs::write(root.join("a/b.txt"), "content b").unwrap();
    std::fs::write(root.join("a/c/d.txt"), "content d").unwrap();
}

/// Force a file's mtime to a fixed offset from the epoch, so two source
/// trees can carry deliberately different timestamps.
fn set_mtime(path: &Path, secs_from_epoch: u64) {
    let file = std::fs::OpenOptions::new()
        .write(true)
        .open(path)
        .unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs_from_epoch))
        .unwrap();
}

fn entry_names(archive: &Path) -> Vec<String> {
    let file = std::fs::File::open(archive).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_owned())
        .collect()
}

// ── Entry names ──

#[test]
fn nested_tree_gets_slash_relative_arcnames() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("app");
    write_nested_tree(&source);
    let outfile = tmp.path().join("out.zip");

    create_zip_file(&source, &outfile, &RealOs, Compression::Deflate).unwrap();

    let mut names = entry_names(&outfile);
    names.sort();
    assert_eq!(names, vec!["a/b.txt", "a/c/d.txt"]);
}

#[test]
fn explicit_arcname_loses_leading_separator() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("file.txt");
    std::fs::write(&source, "x").unwrap();
    let outfile = tmp.path().join("out.zip");

    let mut writer = PackWriter::create(&outfile, &RealOs, Compression::Deflate).unwrap();
    writer
        .add_file(&source, Some("/abs/name.txt"), None)
        .unwrap();
    writer.finish().unwrap();

    assert_eq!(entry_names(&outfile), vec!["abs/name.txt"]);
}

#[test]
fn arcname_defaults_to_normalized_source_path() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("app.py");
    std::fs::write(&source, "x").unwrap();
    let outfile = tmp.path().join("out.zip");

    let mut writer = PackWriter::create(&outfile, &RealOs, Compression::Deflate).unwrap();
    writer.add_file(&source, None, None).unwrap();
    writer.finish().unwrap();

    let names = entry_names(&outfile);
    assert_eq!(names.len(), 1);
    assert!(names[0].ends_with("app.py"));
    assert!(!names[0].starts_with('/'));
    assert!(!names[0].contains('\\'));
}

// ── Reproducibility ──

#[test]
fn identical_content_produces_identical_bytes_despite_mtimes_and_paths() {
    let tmp = TempDir::new().unwrap();
    let first = tmp.path().join("build-one/app");
    let second = tmp.path().join("elsewhere/nested/app");
    write_nested_tree(&first);
    write_nested_tree(&second);
    set_mtime(&first.join("a/b.txt"), 1_000_000);
    set_mtime(&second.join("a/b.txt"), 2_000_000);
    set_mtime(&first.join("a/c/d.txt"), 1_500_000);
    set_mtime(&second.join("a/c/d.txt"), 2_500_000);

    let out_one = tmp.path().join("one.zip");
    let out_two = tmp.path().join("two.zip");
    create_zip_file(&first, &out_one, &RealOs, Compression::Deflate).unwrap();
    create_zip_file(&second, &out_two, &RealOs, Compression::Deflate).unwrap();

    let bytes_one = std::fs::read(&out_one).unwrap();
    let bytes_two = std::fs::read(&out_two).unwrap();
    assert_eq!(bytes_one, bytes_two);
}

#[test]
fn entry_timestamp_is_always_the_1980_constant() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("app");
    write_nested_tree(&source);
    let outfile = tmp.path().join("out.zip");

    create_zip_file(&source, &outfile, &RealOs, Compression::Deflate).unwrap();

    let file = std::fs::File::open(&outfile).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    for i in 0..zip.len() {
        let entry = zip.by_index(i).unwrap();
        let dt = entry.last_modified();
        assert_eq!(
            (dt.year(), dt.month(), dt.day(), dt.hour(), dt.minute(), dt.second()),
            (1980, 1, 1, 0, 0, 0),
            "entry {} carries a real mtime",
            entry.name()
        );
    }
}

// ── Single-file scenario ──

#[test]
fn single_file_archive_matches_expected_metadata() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("app");
    std::fs::create_dir(&source).unwrap();
    let file = source.join("app.py");
    std::fs::write(&file, "print(1)").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o644)).unwrap();
    }
    let outfile = tmp.path().join("out.zip");

    create_zip_file(&source, &outfile, &RealOs, Compression::Deflate).unwrap();

    let archive = std::fs::File::open(&outfile).unwrap();
    let mut zip = zip::ZipArchive::new(archive).unwrap();
    assert_eq!(zip.len(), 1);
    let entry = zip.by_index(0).unwrap();
    assert_eq!(entry.name(), "app.py");
    assert_eq!(entry.size(), 8);
    #[cfg(unix)]
    assert_eq!(entry.unix_mode().map(|m| m & 0o777), Some(0o644));
}

#[cfg(unix)]
#[test]
fn setuid_and_sticky_bits_survive_in_entry_mode() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("app");
    std::fs::create_dir(&source).unwrap();
    let suid = source.join("elevated");
    let sticky = source.join("pinned");
    std::fs::write(&suid, "x").unwrap();
    std::fs::write(&sticky, "y").unwrap();
    std::fs::set_permissions(&suid, std::fs::Permissions::from_mode(0o4755)).unwrap();
    std::fs::set_permissions(&sticky, std::fs::Permissions::from_mode(0o1644)).unwrap();
    let outfile = tmp.path().join("out.zip");

    create_zip_file(&source, &outfile, &RealOs, Compression::Deflate).unwrap();

    let file = std::fs::File::open(&outfile).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    let mut modes = std::collections::HashMap::new();
    for i in 0..zip.len() {
        let entry = zip.by_index(i).unwrap();
        modes.insert(
            entry.name().to_owned(),
            entry.unix_mode().unwrap() & 0o7777,
        );
    }
    assert_eq!(modes["elevated"], 0o4755);
    assert_eq!(modes["pinned"], 0o1644);
}

// ── Round trip ──

#[test]
fn extracting_restores_content_and_permissions() {
    let os = RealOs;
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("app");
    write_nested_tree(&source);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(
            source.join("a/b.txt"),
            std::fs::Permissions::from_mode(0o755),
        )
        .unwrap();
    }
    let outfile = tmp.path().join("out.zip");
    create_zip_file(&source, &outfile, &os, Compression::Deflate).unwrap();

    let unpack = os.temp_dir().unwrap();
    os.extract_zip(&outfile, unpack.path()).unwrap();

    assert_eq!(
        std::fs::read(unpack.path().join("a/b.txt")).unwrap(),
        std::fs::read(source.join("a/b.txt")).unwrap()
    );
    assert_eq!(
        std::fs::read(unpack.path().join("a/c/d.txt")).unwrap(),
        std::fs::read(source.join("a/c/d.txt")).unwrap()
    );
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(unpack.path().join("a/b.txt"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

// ── Compression selection ──

#[test]
fn store_method_leaves_entries_uncompressed() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("app");
    write_nested_tree(&source);
    let outfile = tmp.path().join("out.zip");

    create_zip_file(&source, &outfile, &RealOs, Compression::Store).unwrap();

    let file = std::fs::File::open(&outfile).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    for i in 0..zip.len() {
        let entry = zip.by_index(i).unwrap();
        assert_eq!(entry.compression(), zip::CompressionMethod::Stored);
    }
}

#[test]
fn per_entry_compression_overrides_archive_default() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("file.txt");
    std::fs::write(&source, "x".repeat(256)).unwrap();
    let outfile = tmp.path().join("out.zip");

    let mut writer = PackWriter::create(&outfile, &RealOs, Compression::Deflate).unwrap();
    writer
        .add_file(&source, Some("stored.txt"), Some(Compression::Store))
        .unwrap();
    writer.finish().unwrap();

    let file = std::fs::File::open(&outfile).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    let entry = zip.by_index(0).unwrap();
    assert_eq!(entry.compression(), zip::CompressionMethod::Stored);
}

// ── Failure paths ──

#[test]
fn missing_source_fails_and_writes_no_entry() {
    let tmp = TempDir::new().unwrap();
    let outfile = tmp.path().join("out.zip");

    let mut writer = PackWriter::create(&outfile, &RealOs, Compression::Deflate).unwrap();
    let result = writer.add_file(&tmp.path().join("ghost.txt"), Some("ghost.txt"), None);
    assert!(matches!(result, Err(PackError::Os(_))));

    // The archive is still structurally valid, just incomplete.
    writer.finish().unwrap();
    assert!(entry_names(&outfile).is_empty());
}
