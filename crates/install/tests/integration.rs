//! Integration tests for install crate

#[cfg(test)]
mod tests {
    use hotswap_config::Config;
    use hotswap_errors::ErrorKind;
    use hotswap_install::*;
    use hotswap_types::{BinaryInfo, EntrySource, PackageMetadata, UpdateState};
    use httpmock::prelude::*;
    use minisign::KeyPair;
    use std::io::{Cursor, Write};
    use std::path::Path;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    const ENTRY: &str = "index.bundle";

    fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            for (name, contents) in files {
                writer
                    .start_file(*name, SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(contents).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    async fn expected_hash(files: &[(&str, &[u8])]) -> String {
        let dir = TempDir::new().unwrap();
        for (name, contents) in files {
            let path = dir.path().join(name);
            tokio::fs::create_dir_all(path.parent().unwrap())
                .await
                .unwrap();
            tokio::fs::write(&path, contents).await.unwrap();
        }
        hotswap_hash::compute_package_hash(dir.path())
            .await
            .unwrap()
            .to_hex()
    }

    fn sign(kp: &KeyPair, hash: &str) -> String {
        minisign::sign(
            Some(&kp.pk),
            &kp.sk,
            Cursor::new(hash.as_bytes()),
            Some("hotswap release"),
            Some("test"),
        )
        .unwrap()
        .into_string()
    }

    fn config(root: &Path) -> Config {
        let mut config = Config::default();
        config.paths.root_dir = Some(root.to_path_buf());
        config
    }

    fn binary() -> BinaryInfo {
        BinaryInfo::new(1_000, "1.0.0")
    }

    async fn serve(server: &MockServer, path: &str, body: Vec<u8>) -> String {
        server
            .mock_async(|when, then| {
                when.method(GET).path(path.to_string());
                then.status(200).body(body);
            })
            .await;
        server.url(path)
    }

    fn metadata(hash: &str, url: String) -> PackageMetadata {
        PackageMetadata::new(hash)
            .with_download_url(url)
            .with_app_version("1.0.0")
            .with_label("v-test")
    }

    async fn download_and_install(
        session: &UpdateSession,
        meta: &PackageMetadata,
    ) -> PackageMetadata {
        let mut progress = session.progress_throttle(|_| {});
        let stored = session.download(meta, ENTRY, &mut progress).await.unwrap();
        session.install(&stored).await.unwrap();
        stored
    }

    #[tokio::test]
    async fn test_round_trip_and_first_run() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let files: &[(&str, &[u8])] = &[("dist/index.bundle", b"app v1"), ("dist/logo.png", b"png")];
        let hash = expected_hash(files).await;
        let url = serve(&server, "/v1.zip", zip_bytes(files)).await;

        let session = UpdateSession::open(config(temp.path()), binary(), None)
            .await
            .unwrap();
        let stored = download_and_install(&session, &metadata(&hash, url)).await;

        assert_eq!(stored.relative_bundle_path.as_deref(), Some("dist/index.bundle"));
        assert_eq!(stored.binary_modified_time.as_deref(), Some("1000"));
        assert_eq!(session.get_current_package().await.unwrap(), Some(stored.clone()));
        assert!(session.is_pending(Some(&hash)).await.unwrap());
        assert_eq!(
            session
                .get_update_metadata(UpdateState::Pending)
                .await
                .unwrap()
                .map(|m| m.package_hash),
            Some(hash.clone())
        );
        assert!(session
            .get_update_metadata(UpdateState::Running)
            .await
            .unwrap()
            .is_none());
        drop(session);

        let mut session = UpdateSession::open(config(temp.path()), binary(), None)
            .await
            .unwrap();
        assert!(session.did_update());
        assert!(session.is_first_run(&hash).await.unwrap());
        assert!(!session.is_pending(None).await.unwrap());
        assert_eq!(
            session.resolve_entry_file(ENTRY).await.unwrap(),
            EntrySource::Package(session.store().package_path(&hash).join("dist/index.bundle"))
        );
        assert!(!session.is_running_binary_version());

        session.confirm_ready().await.unwrap();
        drop(session);

        let session = UpdateSession::open(config(temp.path()), binary(), None)
            .await
            .unwrap();
        assert_eq!(session.restart_outcome(), &RestartOutcome::NoPendingUpdate);
        assert!(!session.did_update());
        assert_eq!(
            session.get_current_package().await.unwrap().unwrap().package_hash,
            hash
        );
    }

    #[tokio::test]
    async fn test_crash_before_ready_rolls_back() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let v1: &[(&str, &[u8])] = &[("index.bundle", b"v1")];
        let v2: &[(&str, &[u8])] = &[("index.bundle", b"v2")];
        let h1 = expected_hash(v1).await;
        let h2 = expected_hash(v2).await;
        let u1 = serve(&server, "/v1.zip", zip_bytes(v1)).await;
        let u2 = serve(&server, "/v2.zip", zip_bytes(v2)).await;

        let session = UpdateSession::open(config(temp.path()), binary(), None)
            .await
            .unwrap();
        download_and_install(&session, &metadata(&h1, u1)).await;
        drop(session);

        // First run of v1, confirmed
        let session = UpdateSession::open(config(temp.path()), binary(), None)
            .await
            .unwrap();
        session.confirm_ready().await.unwrap();
        download_and_install(&session, &metadata(&h2, u2)).await;
        drop(session);

        // First run of v2 arms the record, then the process dies
        let session = UpdateSession::open(config(temp.path()), binary(), None)
            .await
            .unwrap();
        assert!(session.did_update());
        drop(session);

        let session = UpdateSession::open(config(temp.path()), binary(), None)
            .await
            .unwrap();
        assert_eq!(
            session.restart_outcome(),
            &RestartOutcome::RolledBack {
                failed_hash: h2.clone(),
                restored: Some(h1.clone()),
            }
        );
        assert!(session.need_to_report_rollback());
        assert_eq!(
            session.get_current_package().await.unwrap().unwrap().package_hash,
            h1
        );
        assert!(session.get_previous_package().await.unwrap().is_none());
        assert!(session.records().get_pending_update().await.unwrap().is_none());
        assert!(session.is_failed_hash(&h2).await.unwrap());
        assert!(!session.store().package_path(&h2).exists());
    }

    #[tokio::test]
    async fn test_install_over_unrun_update_discards_it() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let mut hashes = Vec::new();
        let session = UpdateSession::open(config(temp.path()), binary(), None)
            .await
            .unwrap();

        let bodies: [&[u8]; 3] = [b"one", b"two", b"three"];
        for (i, body) in bodies.into_iter().enumerate() {
            let files: &[(&str, &[u8])] = &[(ENTRY, body)];
            let hash = expected_hash(files).await;
            let url = serve(&server, &format!("/p{i}.zip"), zip_bytes(files)).await;
            download_and_install(&session, &metadata(&hash, url)).await;
            if i == 0 {
                session.confirm_ready().await.unwrap();
            }
            hashes.push(hash);
        }

        // The second package never ran, so the third replaced it
        let pointers = session.store().pointers().await.unwrap();
        assert_eq!(pointers.current_package.as_deref(), Some(hashes[2].as_str()));
        assert_eq!(pointers.previous_package.as_deref(), Some(hashes[0].as_str()));
        assert!(!session.store().package_path(&hashes[1]).exists());
    }

    #[tokio::test]
    async fn test_foreign_signature_is_rejected() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let trusted = KeyPair::generate_unencrypted_keypair().unwrap();
        let attacker = KeyPair::generate_unencrypted_keypair().unwrap();

        let content: &[(&str, &[u8])] = &[(ENTRY, b"evil")];
        let hash = expected_hash(content).await;
        let token = sign(&attacker, &hash);
        let url = serve(
            &server,
            "/signed.zip",
            zip_bytes(&[(ENTRY, b"evil"), (".hotswaprelease", token.as_bytes())]),
        )
        .await;

        let mut cfg = config(temp.path());
        cfg.security.public_key = Some(trusted.pk.to_base64());
        let session = UpdateSession::open(cfg, binary(), None).await.unwrap();

        let mut progress = session.progress_throttle(|_| {});
        let err = session
            .download(&metadata(&hash, url), ENTRY, &mut progress)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SignatureVerification);
        assert!(!session.store().package_path(&hash).exists());
        assert!(session.is_failed_hash(&hash).await.unwrap());
        assert!(session.get_current_package().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_trusted_signature_is_accepted() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let trusted = KeyPair::generate_unencrypted_keypair().unwrap();

        let content: &[(&str, &[u8])] = &[(ENTRY, b"good")];
        let hash = expected_hash(content).await;
        let token = sign(&trusted, &hash);
        let url = serve(
            &server,
            "/signed.zip",
            zip_bytes(&[(ENTRY, b"good"), (".hotswaprelease", token.as_bytes())]),
        )
        .await;

        let mut cfg = config(temp.path());
        cfg.security.public_key = Some(trusted.pk.to_base64());
        let (tx, mut rx) = hotswap_events::channel();
        let session = UpdateSession::open(cfg, binary(), Some(tx)).await.unwrap();
        download_and_install(&session, &metadata(&hash, url)).await;

        let verified = std::iter::from_fn(|| rx.try_recv().ok()).any(|event| {
            matches!(
                event,
                hotswap_events::AppEvent::Update(hotswap_events::UpdateEvent::Downloaded {
                    verified_signature: true,
                    ..
                })
            )
        });
        assert!(verified);
    }

    #[tokio::test]
    async fn test_unsigned_package_with_key_is_invalid() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let trusted = KeyPair::generate_unencrypted_keypair().unwrap();
        let content: &[(&str, &[u8])] = &[(ENTRY, b"plain")];
        let hash = expected_hash(content).await;
        let url = serve(&server, "/plain.zip", zip_bytes(content)).await;

        let mut cfg = config(temp.path());
        cfg.security.public_key = Some(trusted.pk.to_base64());
        let session = UpdateSession::open(cfg, binary(), None).await.unwrap();

        let mut progress = session.progress_throttle(|_| {});
        let err = session
            .download(&metadata(&hash, url), ENTRY, &mut progress)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUpdate);
        assert!(!session.store().package_path(&hash).exists());
    }

    #[tokio::test]
    async fn test_raw_bundle_with_key_is_invalid() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let trusted = KeyPair::generate_unencrypted_keypair().unwrap();
        let url = serve(&server, "/evil.bundle", b"evil()".to_vec()).await;

        let mut cfg = config(temp.path());
        cfg.security.public_key = Some(trusted.pk.to_base64());
        let session = UpdateSession::open(cfg, binary(), None).await.unwrap();

        let mut progress = session.progress_throttle(|_| {});
        let err = session
            .download(&metadata("rawsigned", url), ENTRY, &mut progress)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidUpdate);
        assert!(!session.store().package_path("rawsigned").exists());
        assert!(!session.store().download_file_path().exists());
        assert!(session.is_failed_hash("rawsigned").await.unwrap());
        assert!(session.get_current_package().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redownload_of_current_package_keeps_it() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let url = serve(&server, "/h1.bundle", b"v1".to_vec()).await;
        let gone = server
            .mock_async(|when, then| {
                when.method(GET).path("/gone.bundle");
                then.status(404);
            })
            .await;

        let session = UpdateSession::open(config(temp.path()), binary(), None)
            .await
            .unwrap();
        let installed = download_and_install(&session, &metadata("h1", url)).await;

        let mut progress = session.progress_throttle(|_| {});
        let again = session
            .download(&metadata("h1", server.url("/gone.bundle")), ENTRY, &mut progress)
            .await
            .unwrap();

        assert_eq!(again, installed);
        assert_eq!(gone.hits_async().await, 0);
        assert_eq!(
            session.get_current_package().await.unwrap().map(|m| m.package_hash),
            Some("h1".to_string())
        );
        let bundle = session.store().package_path("h1").join(ENTRY);
        assert_eq!(tokio::fs::read(bundle).await.unwrap(), b"v1");
    }

    #[tokio::test]
    async fn test_signed_package_without_key_still_checks_hash() {
        let temp = TempDir::new().unwrap();
        let signer = KeyPair::generate_unencrypted_keypair().unwrap();
        tokio::fs::write(temp.path().join(ENTRY), b"signed").await.unwrap();
        let hash = expected_hash(&[(ENTRY, b"signed")]).await;
        tokio::fs::write(temp.path().join(".hotswaprelease"), sign(&signer, &hash))
            .await
            .unwrap();

        let err = verify_package(temp.path(), "0000", None, false, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HashMismatch);

        let verification = verify_package(temp.path(), &hash, None, false, None)
            .await
            .unwrap();
        assert_eq!(
            verification,
            Verification {
                hash_checked: true,
                signature_verified: false,
            }
        );
    }

    #[tokio::test]
    async fn test_unsigned_full_archive_without_key_skips_hash() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let url = serve(&server, "/loose.zip", zip_bytes(&[(ENTRY, b"loose")])).await;

        let session = UpdateSession::open(config(temp.path()), binary(), None)
            .await
            .unwrap();
        let stored = download_and_install(&session, &metadata("not-the-real-hash", url)).await;
        assert_eq!(stored.package_hash, "not-the-real-hash");
        assert!(!session.is_failed_hash("not-the-real-hash").await.unwrap());

        let dir = session.store().package_path("not-the-real-hash");
        let verification = verify_package(&dir, "not-the-real-hash", None, false, None)
            .await
            .unwrap();
        assert_eq!(verification, Verification::default());
    }

    #[tokio::test]
    async fn test_rollback_without_current_package_reports_nothing() {
        let temp = TempDir::new().unwrap();
        let mut session = UpdateSession::open(config(temp.path()), binary(), None)
            .await
            .unwrap();

        assert_eq!(session.rollback().await.unwrap(), None);
        assert!(!session.need_to_report_rollback());
        assert!(session.failed_updates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_diff_update_merges_and_checks_hash() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let full: &[(&str, &[u8])] = &[(ENTRY, b"bundle"), ("a.txt", b"a"), ("b.txt", b"b")];
        let h1 = expected_hash(full).await;
        let u1 = serve(&server, "/full.zip", zip_bytes(full)).await;

        let merged: &[(&str, &[u8])] = &[(ENTRY, b"bundle"), ("b.txt", b"b modified")];
        let h2 = expected_hash(merged).await;
        let diff = zip_bytes(&[
            ("b.txt", b"b modified"),
            ("hotswap.json", br#"{"deletedFiles":["a.txt"]}"#),
        ]);
        let u2 = serve(&server, "/diff.zip", diff.clone()).await;
        let u3 = serve(&server, "/diff-bad.zip", diff).await;

        let session = UpdateSession::open(config(temp.path()), binary(), None)
            .await
            .unwrap();
        download_and_install(&session, &metadata(&h1, u1)).await;

        // A wrong expected hash is caught for diff packages even without a key
        let mut progress = session.progress_throttle(|_| {});
        let err = session
            .download(&metadata("0000", u3), ENTRY, &mut progress)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HashMismatch);

        download_and_install(&session, &metadata(&h2, u2)).await;
        let dir = session.store().package_path(&h2);
        assert!(!dir.join("a.txt").exists());
        assert!(!dir.join("hotswap.json").exists());
        assert_eq!(
            tokio::fs::read(dir.join("b.txt")).await.unwrap(),
            b"b modified"
        );
        assert_eq!(tokio::fs::read(dir.join(ENTRY)).await.unwrap(), b"bundle");
    }

    #[tokio::test]
    async fn test_archive_without_entry_file_is_invalid() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let url = serve(&server, "/noentry.zip", zip_bytes(&[("main.js", b"x")])).await;

        let session = UpdateSession::open(config(temp.path()), binary(), None)
            .await
            .unwrap();
        let mut progress = session.progress_throttle(|_| {});
        let err = session
            .download(&metadata("h-noentry", url), ENTRY, &mut progress)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidUpdate);
        assert!(!session.store().package_path("h-noentry").exists());
        assert!(!session.store().download_file_path().exists());
        assert!(!session.store().unzipped_path().exists());
    }

    #[tokio::test]
    async fn test_raw_bundle_payload() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let url = serve(&server, "/index.bundle", b"console.log(1)".to_vec()).await;

        let session = UpdateSession::open(config(temp.path()), binary(), None)
            .await
            .unwrap();
        download_and_install(&session, &metadata("raw1", url)).await;

        let bundle = session
            .store()
            .current_bundle_path(ENTRY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tokio::fs::read(bundle).await.unwrap(), b"console.log(1)");
    }

    #[tokio::test]
    async fn test_new_binary_purges_stale_updates() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let files: &[(&str, &[u8])] = &[(ENTRY, b"old")];
        let hash = expected_hash(files).await;
        let url = serve(&server, "/old.zip", zip_bytes(files)).await;

        let session = UpdateSession::open(config(temp.path()), binary(), None)
            .await
            .unwrap();
        download_and_install(&session, &metadata(&hash, url)).await;
        drop(session);

        let upgraded = BinaryInfo::new(2_000, "1.1.0");
        let mut session = UpdateSession::open(config(temp.path()), upgraded, None)
            .await
            .unwrap();
        assert_eq!(session.restart_outcome(), &RestartOutcome::Superseded);
        assert!(!session.did_update());

        assert_eq!(
            session.resolve_entry_file(ENTRY).await.unwrap(),
            EntrySource::Binary
        );
        assert!(session.is_running_binary_version());
        assert!(session.get_current_package().await.unwrap().is_none());
        assert!(!session.is_pending(None).await.unwrap());
    }

    #[tokio::test]
    async fn test_debug_rebuild_keeps_updates_on_disk() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let files: &[(&str, &[u8])] = &[(ENTRY, b"dev")];
        let hash = expected_hash(files).await;
        let url = serve(&server, "/dev.zip", zip_bytes(files)).await;

        let session = UpdateSession::open(config(temp.path()), binary(), None)
            .await
            .unwrap();
        download_and_install(&session, &metadata(&hash, url)).await;
        session.confirm_ready().await.unwrap();
        drop(session);

        let mut cfg = config(temp.path());
        cfg.runtime.debug_mode = true;
        let rebuilt = BinaryInfo::new(1_500, "1.0.0");
        let mut session = UpdateSession::open(cfg, rebuilt, None).await.unwrap();

        assert_eq!(
            session.resolve_entry_file(ENTRY).await.unwrap(),
            EntrySource::Binary
        );
        assert_eq!(
            session.get_current_package().await.unwrap().unwrap().package_hash,
            hash
        );
    }

    #[tokio::test]
    async fn test_clear_updates_and_replace_guard() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let files: &[(&str, &[u8])] = &[(ENTRY, b"x")];
        let hash = expected_hash(files).await;
        let url = serve(&server, "/x.zip", zip_bytes(files)).await;
        let replacement = serve(&server, "/replacement.bundle", b"y".to_vec()).await;

        let session = UpdateSession::open(config(temp.path()), binary(), None)
            .await
            .unwrap();
        download_and_install(&session, &metadata(&hash, url)).await;

        let err = session
            .replace_current_bundle(&replacement, ENTRY)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUpdate);

        session.clear_updates().await.unwrap();
        assert!(session.get_current_package().await.unwrap().is_none());
        assert!(!session.is_pending(None).await.unwrap());
        assert!(session.failed_updates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_current_bundle_in_test_configuration() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let files: &[(&str, &[u8])] = &[(ENTRY, b"x")];
        let hash = expected_hash(files).await;
        let url = serve(&server, "/x.zip", zip_bytes(files)).await;
        let replacement = serve(&server, "/replacement.bundle", b"y".to_vec()).await;

        let mut cfg = config(temp.path());
        cfg.runtime.test_configuration = true;
        let session = UpdateSession::open(cfg, binary(), None).await.unwrap();
        download_and_install(&session, &metadata(&hash, url)).await;
        assert!(session
            .store()
            .root()
            .ends_with("Updates/TestPackages"));

        session
            .replace_current_bundle(&replacement, ENTRY)
            .await
            .unwrap();
        let bundle = session.store().package_path(&hash).join(ENTRY);
        assert_eq!(tokio::fs::read(bundle).await.unwrap(), b"y");
    }
}
