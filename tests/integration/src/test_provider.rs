//! File store facade against a live endpoint.

#[cfg(test)]
mod tests {
    use bucketfs_client::{AuthMode, RequestBody};
    use bucketfs_core::{FileStoreRegistry, PathSearch};
    use bytes::Bytes;
    use std::sync::Arc;

    use crate::{cleanup_bucket, connection, test_provider};

    fn body(text: &'static str) -> RequestBody {
        RequestBody::from_bytes(Bytes::from_static(text.as_bytes()))
    }

    #[test]
    #[ignore = "requires running server"]
    fn test_should_manage_paths_and_files() {
        let (provider, bucket) = test_provider("tree", AuthMode::SigV4);

        provider.add_path("albums").expect("add_path");
        provider
            .add_update_file("albums/2024", "beach.jpg", body("jpeg"))
            .expect("add file");
        provider
            .add_update_file("", "readme.txt", body("hello"))
            .expect("add file");

        assert_eq!(provider.get_paths("").expect("paths"), vec!["albums"]);
        assert_eq!(
            provider.get_paths("albums").expect("paths"),
            vec!["albums/2024"]
        );
        assert!(provider.get_files("albums", PathSearch::TopLevelPathOnly).expect("files").is_empty());
        assert_eq!(
            provider.get_files("", PathSearch::AllPaths).expect("files").len(),
            2
        );

        let file = provider
            .get_file("albums/2024", "beach.jpg")
            .expect("get_file")
            .expect("exists");
        assert_eq!(file.content_length, 4);

        provider.delete_path("albums").expect("delete_path");
        assert!(provider.get_paths("").expect("paths").is_empty());

        provider.delete_all().expect("delete_all");
        assert!(provider.get_files("", PathSearch::AllPaths).expect("files").is_empty());

        cleanup_bucket(&connection(AuthMode::SigV4), &bucket);
    }

    #[test]
    #[ignore = "requires running server"]
    fn test_should_add_unique_files_with_legacy_signing() {
        let (provider, bucket) = test_provider("unique", AuthMode::Legacy);

        let first = provider.add_file("docs", "a.txt", body("1"), true).expect("add");
        let second = provider.add_file("docs", "a.txt", body("2"), true).expect("add");

        assert_eq!(first.file_name, "a.txt");
        assert_eq!(second.file_name, "a-1.txt");
        assert_eq!(
            provider.get_content("docs", "a-1.txt").expect("content"),
            Bytes::from_static(b"2")
        );

        cleanup_bucket(&connection(AuthMode::Legacy), &bucket);
    }

    #[test]
    #[ignore = "requires running server"]
    fn test_should_read_through_registered_store() {
        let (provider, bucket) = test_provider("registry", AuthMode::SigV4);
        let provider = Arc::new(provider);
        let registry = FileStoreRegistry::new();
        registry.register(Arc::clone(&provider));

        let file = provider
            .add_update_file("", "x.bin", body("bytes"))
            .expect("add");
        assert_eq!(
            file.open_read(&registry).expect("read"),
            Some(Bytes::from_static(b"bytes"))
        );
        assert!(!file.download_url(&registry).is_empty());

        cleanup_bucket(&connection(AuthMode::SigV4), &bucket);
    }
}
