//! Custom assertions for archive contents

use super::fixtures::PAGES;
use std::path::Path;

/// Extract `archive` with `password` and check it holds every fake page under `root`
pub fn assert_album_archive(archive: &Path, password: Option<&str>, root: &str) {
    let out = tempfile::tempdir().expect("Failed to create extraction dir");

    match password {
        Some(password) => {
            sevenz_rust::decompress_file_with_password(archive, out.path(), password.into())
                .expect("archive should open with the password")
        }
        None => sevenz_rust::decompress_file(archive, out.path())
            .expect("archive should open without a password"),
    }

    let root_dir = out.path().join(root);
    assert!(root_dir.is_dir(), "archive root {root:?} missing");
    for (name, content) in PAGES {
        let extracted = std::fs::read(root_dir.join(name))
            .unwrap_or_else(|e| panic!("page {name} missing from archive: {e}"));
        assert_eq!(extracted, content, "page {name} differs");
    }
}

/// Assert the archive can be neither extracted nor listed without a password
pub fn assert_requires_password(archive: &Path) {
    let out = tempfile::tempdir().expect("Failed to create extraction dir");
    assert!(
        sevenz_rust::decompress_file(archive, out.path()).is_err(),
        "archive opened without a password"
    );
    assert!(
        sevenz_rust::SevenZReader::open(archive, sevenz_rust::Password::empty()).is_err(),
        "file names readable without a password"
    );
}
