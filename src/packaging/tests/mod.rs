use crate::error::{Error, PackageError};
use crate::packaging::*;
use crate::types::ComicId;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create an album folder the way the download library lays one out
fn create_album(base: &Path, name: &str) -> std::path::PathBuf {
    let folder = base.join(name);
    fs::create_dir_all(folder.join("chapter 2")).unwrap();
    fs::write(folder.join("00001.jpg"), b"first page").unwrap();
    fs::write(folder.join("00002.jpg"), b"second page").unwrap();
    fs::write(folder.join("chapter 2").join("00001.webp"), b"third page").unwrap();
    folder
}

/// Backend that always fails
struct FailingBackend {
    calls: AtomicUsize,
}

impl ArchiveBackend for FailingBackend {
    fn extension(&self) -> &'static str {
        "7z"
    }

    fn compress(&self, source: &Path, dest: &Path, _: &str, _: Option<&str>) -> crate::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Leave a partial file behind like a crashed archiver would
        fs::write(dest, b"half").unwrap();
        Err(PackageError::CompressionFailed {
            folder: source.to_path_buf(),
            archive: dest.to_path_buf(),
            reason: "simulated failure".to_string(),
        }
        .into())
    }

    fn opens_with(&self, _: &Path, _: Option<&str>) -> bool {
        false
    }
}

/// Backend that "succeeds" but writes a zero-byte file
struct EmptyBackend;

impl ArchiveBackend for EmptyBackend {
    fn extension(&self) -> &'static str {
        "7z"
    }

    fn compress(&self, _: &Path, dest: &Path, _: &str, _: Option<&str>) -> crate::Result<()> {
        fs::File::create(dest)?;
        Ok(())
    }

    fn opens_with(&self, _: &Path, _: Option<&str>) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Password policy
// ---------------------------------------------------------------------------

#[test]
fn test_default_password_is_deterministic() {
    let first = derive_password("", "jm", &ComicId::parse("999").unwrap());
    let second = derive_password("", "jm", &ComicId::parse("999").unwrap());
    assert_eq!(first, "jm999");
    assert_eq!(first, second);
}

#[test]
fn test_custom_password_overrides_default() {
    let id = ComicId::parse("999").unwrap();
    assert_eq!(derive_password("letmein", "jm", &id), "letmein");
}

// ---------------------------------------------------------------------------
// 7z packaging
// ---------------------------------------------------------------------------

#[test]
fn test_package_encrypted_7z_and_remove_source() {
    let temp = TempDir::new().unwrap();
    let folder = create_album(temp.path(), "42_My Comic");
    let archive = temp.path().join("archives").join("42.7z");

    let packager = Packager::sevenz(9);
    assert_eq!(packager.extension(), "7z");

    let outcome = packager
        .package(&folder, &archive, Some("jm42"), "42_My Comic")
        .unwrap();

    assert_eq!(outcome.archive, archive);
    assert!(outcome.size_bytes > 0);
    assert!(outcome.source_removed);
    assert!(!folder.exists(), "source folder should be deleted");
    assert_eq!(archive_size(&archive), Some(outcome.size_bytes));
    assert!(!temp.path().join("archives").join("42.7z.partial").exists());

    // The archive opens with the password and keeps the renamed root
    let out = temp.path().join("out");
    sevenz_rust::decompress_file_with_password(&archive, &out, "jm42".into()).unwrap();
    let root = out.join("42_My Comic");
    assert_eq!(fs::read(root.join("00001.jpg")).unwrap(), b"first page");
    assert_eq!(fs::read(root.join("00002.jpg")).unwrap(), b"second page");
    assert_eq!(
        fs::read(root.join("chapter 2").join("00001.webp")).unwrap(),
        b"third page"
    );
}

#[test]
fn test_encrypted_archive_requires_password() {
    let temp = TempDir::new().unwrap();
    let folder = create_album(temp.path(), "7");
    let archive = temp.path().join("7.7z");

    Packager::sevenz(1)
        .package(&folder, &archive, Some("jm7"), "7")
        .unwrap();

    let out = temp.path().join("out");
    assert!(sevenz_rust::decompress_file(&archive, &out).is_err());
}

#[test]
fn test_encrypted_archive_hides_file_names() {
    let temp = TempDir::new().unwrap();
    let folder = create_album(temp.path(), "42_Secret Title");
    let archive = temp.path().join("42.7z");

    Packager::sevenz(1)
        .package(&folder, &archive, Some("jm42"), "42_Secret Title")
        .unwrap();

    // Listing needs the header, so it must fail without the password
    assert!(sevenz_rust::SevenZReader::open(&archive, sevenz_rust::Password::empty()).is_err());

    let reader = sevenz_rust::SevenZReader::open(&archive, "jm42".into()).unwrap();
    let names: Vec<&str> = reader
        .archive()
        .files
        .iter()
        .map(|entry| entry.name.as_str())
        .collect();
    assert!(names.contains(&"42_Secret Title/00001.jpg"), "got {names:?}");
}

#[test]
fn test_opens_with_matches_only_the_packaging_password() {
    let temp = TempDir::new().unwrap();
    let packager = Packager::sevenz(1);

    let locked = temp.path().join("12.7z");
    packager
        .package(&create_album(temp.path(), "12"), &locked, Some("jm12"), "12")
        .unwrap();
    assert!(packager.opens_with(&locked, Some("jm12")));
    assert!(!packager.opens_with(&locked, Some("secret")));
    assert!(!packager.opens_with(&locked, None));

    let plain = temp.path().join("13.7z");
    packager
        .package(&create_album(temp.path(), "13"), &plain, None, "13")
        .unwrap();
    assert!(packager.opens_with(&plain, None));
    assert!(packager.opens_with(&plain, Some("")));
    assert!(!packager.opens_with(&plain, Some("jm13")), "plain archive is not protected");

    assert!(!packager.opens_with(&temp.path().join("missing.7z"), None));
}

#[test]
fn test_package_without_password_is_plain_7z() {
    let temp = TempDir::new().unwrap();
    let folder = create_album(temp.path(), "Title - 5");
    let archive = temp.path().join("5.7z");

    Packager::sevenz(1)
        .package(&folder, &archive, None, "Title - 5")
        .unwrap();

    let out = temp.path().join("out");
    sevenz_rust::decompress_file(&archive, &out).unwrap();
    assert!(out.join("Title - 5").join("00001.jpg").is_file());
}

#[test]
fn test_empty_password_means_unencrypted() {
    let temp = TempDir::new().unwrap();
    let folder = create_album(temp.path(), "6");
    let archive = temp.path().join("6.7z");

    Packager::sevenz(1)
        .package(&folder, &archive, Some(""), "6")
        .unwrap();

    let out = temp.path().join("out");
    sevenz_rust::decompress_file(&archive, &out).unwrap();
    assert!(out.join("6").join("00002.jpg").is_file());
}

#[test]
fn test_existing_archive_is_replaced() {
    let temp = TempDir::new().unwrap();
    let folder = create_album(temp.path(), "8");
    let archive = temp.path().join("8.7z");
    fs::write(&archive, b"stale archive").unwrap();

    let outcome = Packager::sevenz(1)
        .package(&folder, &archive, None, "8")
        .unwrap();

    assert_ne!(fs::read(&archive).unwrap(), b"stale archive");
    assert_eq!(archive_size(&archive), Some(outcome.size_bytes));
}

// ---------------------------------------------------------------------------
// Source folder survives every failure
// ---------------------------------------------------------------------------

#[test]
fn test_compression_failure_keeps_source() {
    let temp = TempDir::new().unwrap();
    let folder = create_album(temp.path(), "42_My Comic");
    let archive = temp.path().join("42.7z");

    let backend = Arc::new(FailingBackend {
        calls: AtomicUsize::new(0),
    });
    let packager = Packager::new(backend.clone());
    let result = packager.package(&folder, &archive, Some("jm42"), "42_My Comic");

    assert!(matches!(
        result,
        Err(Error::Package(PackageError::CompressionFailed { .. }))
    ));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    assert!(folder.join("00001.jpg").is_file(), "source must survive");
    assert!(!archive.exists());
    assert!(!temp.path().join("42.7z.partial").exists(), "staging file removed");
}

#[test]
fn test_empty_archive_keeps_source() {
    let temp = TempDir::new().unwrap();
    let folder = create_album(temp.path(), "9");
    let archive = temp.path().join("9.7z");

    let result = Packager::new(Arc::new(EmptyBackend)).package(&folder, &archive, None, "9");

    assert!(matches!(
        result,
        Err(Error::Package(PackageError::EmptyArchive { .. }))
    ));
    assert!(folder.is_dir());
    assert!(!archive.exists());
}

#[test]
fn test_failed_repackage_keeps_previous_archive() {
    let temp = TempDir::new().unwrap();
    let folder = create_album(temp.path(), "10");
    let archive = temp.path().join("10.7z");
    fs::write(&archive, b"previous good archive").unwrap();

    let result = Packager::new(Arc::new(EmptyBackend)).package(&folder, &archive, None, "10");

    assert!(result.is_err());
    assert_eq!(fs::read(&archive).unwrap(), b"previous good archive");
    assert!(folder.is_dir());
}

#[test]
fn test_missing_source_is_reported() {
    let temp = TempDir::new().unwrap();
    let result = Packager::sevenz(1).package(
        &temp.path().join("absent"),
        &temp.path().join("1.7z"),
        None,
        "absent",
    );
    assert!(matches!(
        result,
        Err(Error::Package(PackageError::MissingSource { .. }))
    ));
}

#[test]
fn test_inner_name_must_be_single_component() {
    let temp = TempDir::new().unwrap();
    let folder = create_album(temp.path(), "11");

    for bad in ["", ".", "..", "a/b", "..\\x"] {
        let result =
            Packager::sevenz(1).package(&folder, &temp.path().join("11.7z"), None, bad);
        assert!(
            matches!(result, Err(Error::Package(PackageError::InvalidPath { .. }))),
            "{bad:?} should be rejected"
        );
    }
    assert!(folder.is_dir());
}

#[test]
fn test_archive_size_rejects_empty_and_missing() {
    let temp = TempDir::new().unwrap();
    let empty = temp.path().join("empty.7z");
    fs::File::create(&empty).unwrap();

    assert_eq!(archive_size(&empty), None);
    assert_eq!(archive_size(&temp.path().join("missing.7z")), None);
    assert_eq!(archive_size(temp.path()), None, "directories are not archives");
}
