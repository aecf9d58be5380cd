//! Object store operations against a live endpoint, in both signing modes.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bucketfs_client::{AuthMode, ListOptions, ObjectStore, RequestBody};
    use bytes::Bytes;

    use crate::{cleanup_bucket, connection, create_test_bucket, test_bucket_name};

    fn put_get_head_delete(auth_mode: AuthMode) {
        let conn = connection(auth_mode);
        let bucket = create_test_bucket(&conn, "crud");
        assert!(conn.bucket_exists(&bucket).expect("bucket_exists"));

        let key = "dir/hello world.txt";
        conn.put(
            &bucket,
            key,
            &[("owner", "alice")],
            RequestBody::from_bytes(Bytes::from_static(b"hello, bucketfs")),
            &[("Content-Type", "text/plain")],
        )
        .expect("put");

        let content = conn.get_content(&bucket, key).expect("get_content");
        assert_eq!(content, Bytes::from_static(b"hello, bucketfs"));

        let meta = conn.get_metadata(&bucket, key).expect("metadata");
        assert_eq!(meta.content_length, 15);
        assert_eq!(meta.content_type.as_deref(), Some("text/plain"));
        assert_eq!(meta.metadata.get("Owner"), Some("alice"));

        conn.delete(&bucket, key).expect("delete");
        assert!(conn.get_metadata(&bucket, key).is_none());

        cleanup_bucket(&conn, &bucket);
    }

    #[test]
    #[ignore = "requires running server"]
    fn test_should_round_trip_object_with_legacy_signing() {
        put_get_head_delete(AuthMode::Legacy);
    }

    #[test]
    #[ignore = "requires running server"]
    fn test_should_round_trip_object_with_sigv4_signing() {
        put_get_head_delete(AuthMode::SigV4);
    }

    #[test]
    #[ignore = "requires running server"]
    fn test_should_report_missing_bucket() {
        let conn = connection(AuthMode::SigV4);
        let bucket = test_bucket_name("missing");
        assert!(!conn.bucket_exists(&bucket).expect("bucket_exists"));
    }

    #[test]
    #[ignore = "requires running server"]
    fn test_should_list_with_delimiter_and_pages() {
        let conn = connection(AuthMode::SigV4);
        let bucket = create_test_bucket(&conn, "list");
        for key in ["a.txt", "b.txt", "p/1.txt", "p/2.txt", "q/1.txt"] {
            conn.put(&bucket, key, &[], RequestBody::from_bytes(Bytes::from_static(b"x")), &[])
                .expect("put");
        }

        let top = conn
            .list_bucket(
                &bucket,
                ListOptions {
                    delimiter: Some("/"),
                    ..ListOptions::default()
                },
            )
            .expect("list");
        let keys: Vec<&str> = top.result.contents.iter().map(|e| e.key.as_str()).collect();
        let prefixes: Vec<&str> = top
            .result
            .common_prefixes
            .iter()
            .map(|p| p.prefix.as_str())
            .collect();
        assert_eq!(keys, vec!["a.txt", "b.txt"]);
        assert_eq!(prefixes, vec!["p/", "q/"]);

        let first = conn
            .list_bucket(
                &bucket,
                ListOptions {
                    max_keys: Some(2),
                    ..ListOptions::default()
                },
            )
            .expect("list page");
        assert!(first.result.is_truncated);
        let marker = first.result.continuation_marker().expect("marker");
        let second = conn
            .list_bucket(
                &bucket,
                ListOptions {
                    marker: Some(&marker),
                    ..ListOptions::default()
                },
            )
            .expect("list next page");
        assert_eq!(second.result.contents.len(), 3);

        cleanup_bucket(&conn, &bucket);
    }

    #[test]
    #[ignore = "requires running server"]
    fn test_should_download_through_presigned_url() {
        for auth_mode in [AuthMode::Legacy, AuthMode::SigV4] {
            let conn = connection(auth_mode);
            let bucket = create_test_bucket(&conn, "presign");
            conn.put(
                &bucket,
                "shared file.bin",
                &[],
                RequestBody::from_bytes(Bytes::from_static(b"payload")),
                &[],
            )
            .expect("put");

            let url = conn.direct_url(&bucket, "shared file.bin", Duration::from_secs(300));
            let body = reqwest::blocking::get(&url)
                .and_then(reqwest::blocking::Response::error_for_status)
                .and_then(reqwest::blocking::Response::bytes)
                .expect("download");
            assert_eq!(body.as_ref(), b"payload");

            cleanup_bucket(&conn, &bucket);
        }
    }

    #[test]
    #[ignore = "requires running server"]
    fn test_should_keep_error_body_for_missing_object() {
        let conn = connection(AuthMode::SigV4);
        let bucket = create_test_bucket(&conn, "errors");

        let err = conn.get_content(&bucket, "nope").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("NoSuchKey"));

        cleanup_bucket(&conn, &bucket);
    }
}
