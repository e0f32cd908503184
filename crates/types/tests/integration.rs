//! Integration tests for types

#[cfg(test)]
mod tests {
    use hotswap_types::*;
    use proptest::prelude::*;

    #[test]
    fn test_metadata_preserves_unknown_keys() {
        let raw = r#"{
            "packageHash": "abc",
            "downloadUrl": "https://cdn.example.com/abc.zip",
            "appVersion": "1.0.0",
            "isMandatory": true,
            "deploymentKey": "prod-key",
            "failedInstall": false
        }"#;
        let meta: PackageMetadata = serde_json::from_str(raw).unwrap();
        assert_eq!(meta.package_hash, "abc");
        assert!(meta.is_mandatory);
        assert_eq!(meta.extra["deploymentKey"], "prod-key");

        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["deploymentKey"], "prod-key");
        assert_eq!(value["failedInstall"], false);
        assert!(value.get("bundlePath").is_none());
    }

    #[test]
    fn test_bundle_path_alias() {
        let meta: PackageMetadata =
            serde_json::from_str(r#"{"packageHash":"a","relativeBundlePath":"dist/index.bundle"}"#)
                .unwrap();
        assert_eq!(meta.relative_bundle_path.as_deref(), Some("dist/index.bundle"));
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["bundlePath"], "dist/index.bundle");
    }

    #[test]
    fn test_binary_build_marker() {
        let mut meta = PackageMetadata::new("a");
        assert!(matches!(meta.binary_build_marker(), Ok(None)));
        meta.binary_modified_time = Some("1700000000".into());
        assert!(matches!(meta.binary_build_marker(), Ok(Some(1_700_000_000))));
        meta.binary_modified_time = Some("yesterday".into());
        assert!(meta.binary_build_marker().is_err());
    }

    #[test]
    fn test_install_state_from_pending() {
        assert_eq!(InstallState::from(None), InstallState::NoPendingUpdate);
        let armed = InstallState::from(Some(PendingUpdate {
            hash: "h".into(),
            is_loading: true,
        }));
        assert!(armed.is_armed());
        assert_eq!(armed.hash(), Some("h"));
        let confirmed = InstallState::from(Some(PendingUpdate {
            hash: "h".into(),
            is_loading: false,
        }));
        assert_eq!(confirmed, InstallState::PendingConfirmed { hash: "h".into() });
    }

    #[test]
    fn test_pending_record_wire_format() {
        let pending = PendingUpdate {
            hash: "h".into(),
            is_loading: true,
        };
        assert_eq!(
            serde_json::to_string(&pending).unwrap(),
            r#"{"hash":"h","isLoading":true}"#
        );
    }

    #[test]
    fn test_payload_kind_from_header() {
        assert_eq!(
            PayloadKind::from_header(&[0x50, 0x4B, 0x03, 0x04, 0x14]),
            PayloadKind::Archive
        );
        assert_eq!(PayloadKind::from_header(b"var"), PayloadKind::RawBundle);
        assert_eq!(PayloadKind::from_header(b"PK\x05\x06"), PayloadKind::RawBundle);
    }

    proptest! {
        #[test]
        fn progress_completes_only_when_counts_match(total in 0u64..10_000, received in 0u64..10_000) {
            let progress = DownloadProgress::new(total, received);
            prop_assert_eq!(progress.is_completed(), total == received);
        }
    }
}
