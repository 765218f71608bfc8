use super::common::*;
use crate::board::artifacts::mint_address;
use crate::board::{
    ArtifactAddress, ArtifactError, ArtifactStore, FsArtifactStore, MemoryArtifactStore,
    ResumeFormat, SeekerId, StoredArtifact, ValidationError, MAX_RESUME_BYTES,
};

const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[test]
fn accepts_pdf_doc_and_docx() {
    assert_eq!(upload(PDF, 10).validate(), Ok(ResumeFormat::Pdf));
    assert_eq!(
        upload("application/msword", 10).validate(),
        Ok(ResumeFormat::Doc)
    );
    assert_eq!(upload(DOCX, 10).validate(), Ok(ResumeFormat::Docx));
}

#[test]
fn mime_parameters_and_case_are_ignored() {
    assert_eq!(
        upload("Application/PDF; charset=binary", 10).validate(),
        Ok(ResumeFormat::Pdf)
    );
}

#[test]
fn plain_text_is_unsupported() {
    assert_eq!(
        upload("text/plain", 10).validate(),
        Err(ValidationError::UnsupportedFileType {
            declared: "text/plain".to_string()
        })
    );
    assert!(matches!(
        upload("", 10).validate(),
        Err(ValidationError::UnsupportedFileType { .. })
    ));
}

#[test]
fn six_mebibytes_is_too_large() {
    assert_eq!(
        upload(PDF, mib(6)).validate(),
        Err(ValidationError::FileTooLarge {
            size: mib(6) as u64,
            limit: MAX_RESUME_BYTES,
        })
    );
}

#[test]
fn exactly_five_mebibytes_is_accepted() {
    assert_eq!(upload(PDF, mib(5)).validate(), Ok(ResumeFormat::Pdf));
    assert!(upload(PDF, mib(5) + 1).validate().is_err());
}

#[test]
fn type_is_checked_before_size() {
    assert!(matches!(
        upload("image/png", mib(7)).validate(),
        Err(ValidationError::UnsupportedFileType { .. })
    ));
}

#[test]
fn minted_addresses_are_namespaced_and_unique() {
    let first = mint_address(SeekerId(7), ResumeFormat::Pdf, epoch());
    let second = mint_address(SeekerId(7), ResumeFormat::Pdf, epoch());

    assert!(first.as_str().starts_with("resumes/seeker-7/"));
    assert!(first.as_str().ends_with(".pdf"));
    assert_ne!(first, second);
    assert!(mint_address(SeekerId(7), ResumeFormat::Docx, epoch())
        .as_str()
        .ends_with(".docx"));
}

fn artifact(bytes: &[u8]) -> StoredArtifact {
    StoredArtifact {
        mime: PDF.to_string(),
        bytes: bytes.to_vec(),
    }
}

#[test]
fn filesystem_store_round_trips_bytes_and_mime() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FsArtifactStore::new(dir.path());
    let address = ArtifactAddress("resumes/seeker-1/1700000000000-1.pdf".to_string());

    store
        .put(&address, &artifact(b"%PDF-1.7 resume"))
        .expect("stored");
    assert!(dir
        .path()
        .join("resumes/seeker-1/1700000000000-1.pdf.meta.json")
        .exists());

    let reopened = FsArtifactStore::new(dir.path());
    let fetched = reopened
        .fetch(&address)
        .expect("fetch")
        .expect("artifact present");
    assert_eq!(fetched, artifact(b"%PDF-1.7 resume"));
}

#[test]
fn filesystem_store_refuses_escaping_addresses() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FsArtifactStore::new(dir.path().join("artifacts"));

    for raw in ["../outside.pdf", "/etc/passwd", "resumes\\seeker-1\\a.pdf", ""] {
        let address = ArtifactAddress(raw.to_string());
        assert!(
            store.fetch(&address).expect("lookup").is_none(),
            "{raw} should resolve to nothing"
        );
        assert!(matches!(
            store.put(&address, &artifact(b"x")),
            Err(ArtifactError::InvalidAddress { .. })
        ));
    }
}

#[test]
fn discard_removes_data_and_sidecar_and_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FsArtifactStore::new(dir.path());
    let address = ArtifactAddress("resumes/seeker-2/1-1.pdf".to_string());

    store.put(&address, &artifact(b"bytes")).expect("stored");
    store.discard(&address).expect("discarded");
    store.discard(&address).expect("second discard is a no-op");

    assert!(store.fetch(&address).expect("lookup").is_none());
    assert!(!dir.path().join("resumes/seeker-2/1-1.pdf.meta.json").exists());
}

#[test]
fn truncated_artifact_is_reported_corrupt() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FsArtifactStore::new(dir.path());
    let address = ArtifactAddress("resumes/seeker-3/1-1.pdf".to_string());
    store.put(&address, &artifact(b"complete")).expect("stored");

    std::fs::write(dir.path().join("resumes/seeker-3/1-1.pdf"), b"cut").expect("truncate");
    assert!(matches!(
        store.fetch(&address),
        Err(ArtifactError::Corrupt { .. })
    ));
}

#[test]
fn memory_store_tracks_contents() {
    let store = MemoryArtifactStore::default();
    let address = ArtifactAddress("resumes/seeker-1/1-1.pdf".to_string());
    assert!(store.is_empty());

    store.put(&address, &artifact(b"pdf")).expect("stored");
    assert_eq!(store.len(), 1);
    assert_eq!(
        store.fetch(&address).expect("fetch"),
        Some(artifact(b"pdf"))
    );

    store.discard(&address).expect("discarded");
    assert!(store.is_empty());
}

#[test]
fn directories_sidecars_and_orphans_read_as_absent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FsArtifactStore::new(dir.path());
    let address = ArtifactAddress("resumes/seeker-1/100-1.pdf".to_string());
    store.put(&address, &artifact(b"resume")).expect("stored");

    let orphan = dir.path().join("resumes/seeker-1/200-1.pdf");
    std::fs::write(&orphan, b"no sidecar").expect("orphan data");
    std::fs::write(dir.path().join("resumes/seeker-1/.tmpA1b2C3"), b"staged").expect("staged");

    for raw in [
        "resumes",
        "resumes/seeker-1",
        "resumes/seeker-1/100-1.pdf.meta.json",
        "resumes/seeker-1/200-1.pdf",
        "resumes/seeker-1/.tmpA1b2C3",
    ] {
        let outcome = store.fetch(&ArtifactAddress(raw.to_string()));
        assert!(
            matches!(outcome, Ok(None)),
            "{raw} should read as absent, got {outcome:?}"
        );
    }
    assert!(store.fetch(&address).expect("fetch").is_some());
}

fn entry_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("listing")
        .map(|entry| {
            entry
                .expect("entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}

#[test]
fn writes_leave_no_staging_files_behind() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FsArtifactStore::new(dir.path());
    let address = ArtifactAddress("resumes/seeker-4/1-1.pdf".to_string());
    store.put(&address, &artifact(b"resume")).expect("stored");

    assert_eq!(
        entry_names(&dir.path().join("resumes/seeker-4")),
        vec!["1-1.pdf".to_string(), "1-1.pdf.meta.json".to_string()]
    );
}

#[test]
fn filesystem_store_never_overwrites_an_address() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FsArtifactStore::new(dir.path());
    let address = ArtifactAddress("resumes/seeker-5/1-1.pdf".to_string());
    store.put(&address, &artifact(b"first")).expect("stored");

    match store.put(&address, &artifact(b"second upload")) {
        Err(ArtifactError::AddressTaken { address: taken }) => {
            assert_eq!(taken, address.to_string())
        }
        other => panic!("expected address taken, got {other:?}"),
    }
    assert_eq!(
        store.fetch(&address).expect("fetch"),
        Some(artifact(b"first"))
    );
    assert_eq!(
        entry_names(&dir.path().join("resumes/seeker-5")),
        vec!["1-1.pdf".to_string(), "1-1.pdf.meta.json".to_string()]
    );
}

#[test]
fn memory_store_never_overwrites_an_address() {
    let store = MemoryArtifactStore::default();
    let address = ArtifactAddress("resumes/seeker-1/1-1.pdf".to_string());
    store.put(&address, &artifact(b"first")).expect("stored");

    assert!(matches!(
        store.put(&address, &artifact(b"second")),
        Err(ArtifactError::AddressTaken { .. })
    ));
    assert_eq!(
        store.fetch(&address).expect("fetch"),
        Some(artifact(b"first"))
    );
}
